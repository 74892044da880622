// What you SEE:
// • The live camera fills the window (cropped, never letterboxed).
// • Make the selection gesture: a dashed outline follows your hand.
//   Yellow = too small to keep, red = will be kept.
// • Let go: the rect flashes white, then freezes into the collage.
// • G cycles gesture mode (CLOSE / FAR / FIST), F toggles fading,
//   C clears the collage, L shows the raw landmarks. ESC quits.
// • Without a landmark helper the mouse stands in for a hand:
//   hold the left button to pinch.

mod blend;
mod camera;
mod config;
mod draw;
mod error;
mod gesture;
mod landmarks;
mod layout;
mod selection;
mod snapshot;
mod types;

use blend::{blit, fill_rect, GammaLut};
use camera::CameraCapture;
use clap::Parser;
use config::{Config, GestureMode, TrackerConfig, TrackerKind};
use draw::{
    draw_dashed_rect, draw_line, draw_ring, draw_text_5x7, draw_text_centered, fill_circle,
    Drawer, GREEN, RED, WHITE, YELLOW,
};
use error::Error;
use gesture::{Gesture, GestureTracker, TrackedGesture};
use landmarks::{index, Hand, LandmarkSource, MouseSource, SubprocessSource, TrackerContext};
use layout::FeedLayout;
use selection::{Event, Phase, Selection};
use snapshot::{capture, FadePolicy, SnapshotStore};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use types::{FrameBuffer, Point};

/// Gesture-driven webcam collage.
#[derive(Parser, Debug)]
#[command(name = "chronotope", version, about)]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "chronotope.toml")]
    config: PathBuf,

    /// Camera index (overrides the config).
    #[arg(long)]
    camera: Option<u32>,

    /// Where hand landmarks come from.
    #[arg(long, value_enum)]
    tracker: Option<TrackerKind>,

    /// Starting gesture mode.
    #[arg(long, value_enum)]
    mode: Option<GestureMode>,

    /// Show the camera as-is instead of mirrored.
    #[arg(long)]
    no_mirror: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(index) = self.camera {
            config.camera.index = index;
        }
        if let Some(kind) = self.tracker {
            config.tracker.kind = kind;
        }
        if let Some(mode) = self.mode {
            config.gesture.mode = mode;
        }
        if self.no_mirror {
            config.camera.mirror = false;
        }
    }
}

/// Consecutive camera failures tolerated before giving up.
const MAX_CAMERA_FAILURES: u32 = 30;

/// Back-to-back failures of one kind; the run ends once `limit` is reached.
struct FailureStreak {
    count: u32,
    limit: u32,
}

impl FailureStreak {
    fn new(limit: u32) -> Self {
        Self { count: 0, limit }
    }

    fn ok(&mut self) {
        self.count = 0;
    }

    /// Log a failure; hands the error back once the streak is too long.
    fn fail(&mut self, e: Error) -> Result<(), Error> {
        self.count += 1;
        if self.count >= self.limit {
            return Err(e);
        }
        log::warn!("{e} ({} in a row)", self.count);
        Ok(())
    }
}

const MARKER_DIAMETER: f32 = 24.0;

fn open_source(config: &TrackerConfig) -> Box<dyn LandmarkSource> {
    match config.kind {
        TrackerKind::Mouse => Box::new(MouseSource::new()),
        TrackerKind::Subprocess => {
            match SubprocessSource::spawn(&config.command, &config.args, config.min_confidence) {
                Ok(source) => Box::new(source),
                Err(e) => {
                    log::warn!("{e}; falling back to mouse hands");
                    Box::new(MouseSource::new())
                }
            }
        }
    }
}

fn phase_label(phase: Phase) -> &'static str {
    match phase {
        Phase::Released => "RELEASED",
        Phase::Selecting { .. } => "SELECTING",
        Phase::Developing { .. } => "DEVELOPING",
    }
}

/// Tips green, everything else red, each labelled with its index.
/// Handedness and confidence sit under the wrist.
fn draw_landmarks(screen: &mut FrameBuffer, hands: &[Hand], layout: &FeedLayout) {
    const TIPS: [usize; 5] = [
        index::THUMB_TIP,
        index::INDEX_FINGER_TIP,
        index::MIDDLE_FINGER_TIP,
        index::RING_FINGER_TIP,
        index::PINKY_TIP,
    ];
    for hand in hands {
        for i in 0..hand.landmarks.len() {
            let p = hand.point(i, layout);
            let color = if TIPS.contains(&i) { GREEN } else { RED };
            fill_circle(screen, p, hand.marker_diameter(i), color);
            draw_text_centered(screen, Point::new(p.x, p.y - 10.0), &i.to_string(), WHITE);
        }
        let wrist = hand.point(index::WRIST, layout);
        draw_text_centered(screen, Point::new(wrist.x, wrist.y + 14.0), &hand.label(), YELLOW);
    }
}

/// Anchor marker plus the FAR-mode index tips.
fn draw_markers(screen: &mut FrameBuffer, tracked: &TrackedGesture, selection: &Selection) {
    let reading = &tracked.reading;

    if let [a, b] = reading.markers.as_slice() {
        draw_line(screen, *a, *b, 2, GREEN);
        fill_circle(screen, *a, 12.0, GREEN);
        fill_circle(screen, *b, 12.0, GREEN);
    }

    let Some(c) = reading.centroid else { return };
    match selection.outline() {
        Some(rect) if selection.is_selecting() => {
            let color = if selection.undersized(&rect) { YELLOW } else { RED };
            fill_circle(screen, c, MARKER_DIAMETER, color);
        }
        _ => draw_ring(screen, c, MARKER_DIAMETER, 2.0, WHITE),
    }
}

fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::load_or_default(&args.config);
    args.apply(&mut config);

    /* --- Camera + window setup ---
       Visual: window opens with the live camera filling it. */
    let mut cam = CameraCapture::open(&config.camera)?;
    let (cw, ch) = cam.resolution();
    let win_w = if config.window.width > 0 { config.window.width } else { cw as usize };
    let win_h = if config.window.height > 0 { config.window.height } else { ch as usize };
    let mut drawer = Drawer::new("Chronotope", win_w, win_h)?;
    let mut screen = FrameBuffer::new(win_w, win_h);

    /* --- Landmarks + gesture pipeline ---
       Visual: decides when the outline appears and where its corner sits. */
    let mut source = open_source(&config.tracker);
    log::info!("Landmark source: {}", source.name());
    let mut gestures = GestureTracker::new(&config.gesture);
    let mut selection = Selection::new(config.selection.min_size, config.selection.development());

    /* --- Collage ---
       Visual: developed snapshots stay put and fade after a while. */
    let fade = if config.snapshots.fade {
        FadePolicy::After {
            delay: Duration::from_millis(config.snapshots.fade_delay_ms),
            duration: Duration::from_millis(config.snapshots.fade_duration_ms),
        }
    } else {
        FadePolicy::Disabled
    };
    let mut store = SnapshotStore::new(config.snapshots.limit, fade);
    let lut = GammaLut::new();

    /* --- HUD / FPS --- */
    let mut last_fps_time = Instant::now();
    let mut frames_this_second: u32 = 0;
    let mut hud_fps_text = String::from("FPS 0.0");
    let mut show_landmarks = false;
    let mut camera_failures = FailureStreak::new(MAX_CAMERA_FAILURES);
    let mut tracker_failures: u32 = 0;

    /* ------------------------------ Main loop ------------------------------ */
    while drawer.is_open() && !drawer.esc_pressed() {
        let now = Instant::now();

        /* 1) Grab a fresh live frame.
           A dropped frame just skips this iteration; a dead camera ends the run. */
        let live = match cam.next_frame() {
            Ok(frame) => {
                camera_failures.ok();
                frame
            }
            Err(e) => {
                camera_failures.fail(e)?;
                // Re-show the last frame so the window keeps pumping events.
                drawer.present(&screen)?;
                continue;
            }
        };
        // The camera may renegotiate its resolution mid-stream.
        let layout = FeedLayout::cover(win_w, win_h, live.width, live.height);

        /* 2) Inputs */
        if drawer.g_pressed_once() {
            gestures.set_mode(gestures.mode().next()); // visual: HUD mode label changes
        }
        if drawer.f_pressed_once() {
            let on = store.toggle_fade();
            log::info!("Fading {}", if on { "on" } else { "off" });
        }
        if drawer.c_pressed_once() && !store.is_empty() {
            log::info!("Cleared {} snapshots", store.len());
            store.clear(); // visual: only the live feed remains
        }
        if drawer.l_pressed_once() {
            show_landmarks = !show_landmarks;
        }

        /* 3) Landmarks for this frame.
           A failing tracker means "no hands"; the feed keeps running. */
        let ctx = TrackerContext {
            pointer: drawer.mouse_pos().map(|p| layout.screen_to_normalized(p)),
            pressed: drawer.left_mouse_down(),
            mode: gestures.mode(),
            view: (layout.scaled_w, layout.scaled_h),
        };
        let hands = match source.detect(&live, &ctx) {
            Ok(hands) => {
                if tracker_failures > 0 {
                    log::info!("Landmark source recovered after {tracker_failures} failed frames");
                    tracker_failures = 0;
                }
                hands
            }
            Err(e) => {
                if tracker_failures % 100 == 0 {
                    log::warn!("{e}");
                }
                tracker_failures += 1;
                Vec::new()
            }
        };

        /* 4) Gesture -> selection lifecycle */
        let tracked = gestures.update(&hands, &layout);
        let selecting = tracked.confirmed == Gesture::Selecting;
        match selection.update(selecting, tracked.reading.centroid, now) {
            Some(Event::Started(at)) => log::debug!("Selection started at ({:.0}, {:.0})", at.x, at.y),
            Some(Event::Discarded(rect)) => {
                log::debug!("Selection {:.0}x{:.0} too small, discarded", rect.w, rect.h)
            }
            Some(Event::Developing(rect)) => {
                log::info!("Developing {:.0}x{:.0} at ({:.0}, {:.0})", rect.w, rect.h, rect.x, rect.y)
            }
            Some(Event::Developed(rect)) => match capture(&live, rect, &layout, now) {
                // Snapshot comes from the frame at the END of development.
                Some(snap) => {
                    if store.push(snap).is_some() {
                        log::debug!("Snapshot limit reached, oldest evicted");
                    }
                    log::info!("Snapshot captured ({} on canvas)", store.len());
                }
                None => log::warn!("Selection lies outside the feed, nothing captured"),
            },
            None => {}
        }

        let pruned = store.prune(now);
        if pruned > 0 {
            log::debug!("{pruned} snapshots faded out");
        }

        /* 5) Compose: live feed, then snapshots oldest first (newest on top). */
        layout.draw_feed(&live, &mut screen);
        for (snap, opacity) in store.visible(now) {
            let (x, y) = (snap.rect.x.round() as i32, snap.rect.y.round() as i32);
            blit(&mut screen, &snap.image, x, y, opacity, &lut);
        }

        /* 6) Selection outline + development flash */
        if let Some(rect) = selection.outline() {
            let color = if selection.undersized(&rect) { YELLOW } else { RED };
            draw_dashed_rect(&mut screen, rect, 5, 5, 2, color);
        }
        if let Some(flash) = selection.flash() {
            if let Some(opacity) = flash.opacity(now) {
                fill_rect(&mut screen, flash.rect, WHITE, opacity, &lut); // visual: white fading to clear
            }
        }

        /* 7) Markers, optional landmark overlay, HUD */
        draw_markers(&mut screen, &tracked, &selection);
        if show_landmarks {
            draw_landmarks(&mut screen, &hands, &layout);
        }

        let hand_tag = if hands.is_empty() { "NO HAND" } else { "HAND" };
        let hud = format!(
            "{} | {} | {} | SNAPS {} | FADE {} | {}",
            gestures.mode().label(),
            phase_label(selection.phase()),
            hand_tag,
            store.len(),
            if store.fade_enabled() { "ON" } else { "OFF" },
            hud_fps_text
        );
        draw_text_5x7(&mut screen, 8, 8, &hud, WHITE);

        /* 8) Present to the window. */
        drawer.present(&screen)?;

        /* 9) FPS counter (log + HUD once per second) */
        frames_this_second += 1;
        if now.duration_since(last_fps_time) >= Duration::from_secs(1) {
            let secs = now.duration_since(last_fps_time).as_secs_f32();
            let fps = frames_this_second as f32 / secs;
            log::debug!("FPS: {:.1}", fps);
            hud_fps_text = format!("FPS {:.1}", fps);
            frames_this_second = 0;
            last_fps_time = now;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_streak_ends_run_at_limit() {
        let mut streak = FailureStreak::new(3);
        assert!(streak.fail(Error::CameraFrame("a".into())).is_ok());
        assert!(streak.fail(Error::CameraFrame("b".into())).is_ok());
        assert!(matches!(streak.fail(Error::CameraFrame("c".into())), Err(Error::CameraFrame(m)) if m == "c"));
    }

    #[test]
    fn good_frame_resets_failure_streak() {
        let mut streak = FailureStreak::new(2);
        assert!(streak.fail(Error::CameraFrame("a".into())).is_ok());
        streak.ok();
        assert!(streak.fail(Error::CameraFrame("b".into())).is_ok());
        assert!(streak.fail(Error::CameraFrame("c".into())).is_err());
    }

    #[test]
    fn cli_overrides_config() {
        let args = Args::parse_from(["chronotope", "--camera", "2", "--mode", "fist", "--tracker", "subprocess", "--no-mirror"]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.camera.index, 2);
        assert_eq!(config.gesture.mode, GestureMode::Fist);
        assert_eq!(config.tracker.kind, TrackerKind::Subprocess);
        assert!(!config.camera.mirror);
    }
}
