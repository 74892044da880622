//! Hand landmarks and where they come from.
//!
//! The sketch only ever sees [`Hand`]s: 21 normalized keypoints in the
//! orientation of the displayed feed. Two [`LandmarkSource`]s produce them:
//!
//! * [`MouseSource`] synthesizes hands from the pointer (hold the left button
//!   to pinch), so the whole selection lifecycle works without a model.
//! * [`SubprocessSource`] streams frames to an external hand landmark helper
//!   (e.g. a MediaPipe script) and reads one JSON line back per frame.

use crate::config::GestureMode;
use crate::error::Error;
use crate::layout::FeedLayout;
use crate::types::{FrameBuffer, Point};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

/// Landmark indices (MediaPipe hand landmark model convention).
#[allow(dead_code)]
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

pub const HAND_LANDMARKS: usize = 21;

/// A single keypoint; x/y are 0..1 across the displayed feed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Clone, Debug)]
pub struct Hand {
    pub landmarks: [Landmark; HAND_LANDMARKS],
    pub confidence: f32,
    pub handedness: String,
}

impl Hand {
    /// Landmark `i` in window pixels.
    pub fn point(&self, i: usize, layout: &FeedLayout) -> Point {
        let lm = &self.landmarks[i];
        layout.normalized_to_screen(lm.x, lm.y)
    }

    /// Overlay dot size for landmark `i`; nearer the camera (negative z) is bigger.
    pub fn marker_diameter(&self, i: usize) -> f32 {
        (8.0 - self.landmarks[i].z * 40.0).clamp(4.0, 14.0)
    }

    /// e.g. `LEFT 0.92`
    pub fn label(&self) -> String {
        format!("{} {:.2}", self.handedness.to_uppercase(), self.confidence)
    }
}

/// What a source may look at besides the frame itself.
pub struct TrackerContext {
    /// Pointer position in normalized feed coordinates, if over the window.
    pub pointer: Option<(f32, f32)>,
    pub pressed: bool,
    pub mode: GestureMode,
    /// On-screen size of the feed in pixels.
    pub view: (f32, f32),
}

pub trait LandmarkSource {
    fn name(&self) -> &'static str;

    /// Hands visible in `frame`, best first. An empty list means "no hands".
    fn detect(&mut self, frame: &FrameBuffer, ctx: &TrackerContext) -> Result<Vec<Hand>, Error>;
}

// ════════════════════════════════════════════════════════════════════════════
// MouseSource: pointer-driven simulation
// ════════════════════════════════════════════════════════════════════════════

/// Pixel offsets of a hand with thumb, index and middle tips pinched and the
/// ring/pinky curled, roughly 110 px from wrist to middle tip.
const CLOSED_POSE: [(f32, f32); HAND_LANDMARKS] = [
    (0.0, 110.0),
    (-25.0, 85.0), (-22.0, 50.0), (-12.0, 8.0), (-4.0, 2.0),
    (-18.0, 22.0), (-14.0, 10.0), (-8.0, 2.0), (-2.0, -2.0),
    (0.0, 20.0), (2.0, 10.0), (3.0, 4.0), (3.0, 0.0),
    (16.0, 24.0), (18.0, 16.0), (15.0, 14.0), (12.0, 14.0),
    (30.0, 30.0), (30.0, 24.0), (27.0, 22.0), (24.0, 22.0),
];

/// Pixel offsets of a relaxed open palm, fingers up.
const OPEN_POSE: [(f32, f32); HAND_LANDMARKS] = [
    (0.0, 110.0),
    (-30.0, 85.0), (-50.0, 55.0), (-45.0, 0.0), (-60.0, -10.0),
    (-20.0, 20.0), (-23.0, -15.0), (-24.0, -50.0), (-25.0, -80.0),
    (0.0, 20.0), (0.0, -20.0), (0.0, -60.0), (0.0, -95.0),
    (18.0, 24.0), (21.0, -15.0), (23.0, -55.0), (25.0, -85.0),
    (34.0, 34.0), (40.0, 0.0), (45.0, -30.0), (50.0, -60.0),
];

/// Index tip gap of the two simulated hands in [`GestureMode::Far`].
const FAR_GAP_PRESSED: f32 = 20.0;
const FAR_GAP_RELEASED: f32 = 200.0;

/// Left mouse button = closed hand, released = open hand.
#[derive(Default)]
pub struct MouseSource;

impl MouseSource {
    pub fn new() -> Self {
        Self
    }
}

/// Place `pose` so that the point `anchor` (in pose pixels) lands on `at`.
fn place_pose(
    pose: &[(f32, f32); HAND_LANDMARKS],
    anchor: Point,
    at: Point,
    flip_x: bool,
    view: (f32, f32),
    handedness: &str,
) -> Hand {
    let (vw, vh) = (view.0.max(1.0), view.1.max(1.0));
    let mut landmarks = [Landmark::default(); HAND_LANDMARKS];
    for (lm, &(dx, dy)) in landmarks.iter_mut().zip(pose.iter()) {
        let dx = if flip_x { -(dx - anchor.x) } else { dx - anchor.x };
        let dy = dy - anchor.y;
        *lm = Landmark { x: (at.x + dx) / vw, y: (at.y + dy) / vh, z: 0.0 };
    }
    Hand { landmarks, confidence: 1.0, handedness: handedness.to_string() }
}

fn pose_point(pose: &[(f32, f32); HAND_LANDMARKS], i: usize) -> Point {
    Point::new(pose[i].0, pose[i].1)
}

impl LandmarkSource for MouseSource {
    fn name(&self) -> &'static str {
        "mouse"
    }

    fn detect(&mut self, _frame: &FrameBuffer, ctx: &TrackerContext) -> Result<Vec<Hand>, Error> {
        let Some((nx, ny)) = ctx.pointer else {
            return Ok(Vec::new());
        };
        if !(0.0..=1.0).contains(&nx) || !(0.0..=1.0).contains(&ny) {
            return Ok(Vec::new());
        }
        let at = Point::new(nx * ctx.view.0, ny * ctx.view.1);

        let hands = match ctx.mode {
            GestureMode::Close | GestureMode::Fist => {
                let pose = if ctx.pressed { &CLOSED_POSE } else { &OPEN_POSE };
                // Keep the gesture's own anchor under the pointer in both poses.
                let anchor = if ctx.mode == GestureMode::Close {
                    Point::centroid(&[
                        pose_point(pose, index::THUMB_TIP),
                        pose_point(pose, index::INDEX_FINGER_TIP),
                        pose_point(pose, index::MIDDLE_FINGER_TIP),
                    ])
                    .unwrap_or_default()
                } else {
                    pose_point(pose, index::MIDDLE_FINGER_MCP)
                };
                vec![place_pose(pose, anchor, at, false, ctx.view, "Right")]
            }
            GestureMode::Far => {
                let half = (if ctx.pressed { FAR_GAP_PRESSED } else { FAR_GAP_RELEASED }) / 2.0;
                let tip = pose_point(&OPEN_POSE, index::INDEX_FINGER_TIP);
                let left = place_pose(&OPEN_POSE, tip, Point::new(at.x - half, at.y), true, ctx.view, "Left");
                let right = place_pose(&OPEN_POSE, tip, Point::new(at.x + half, at.y), false, ctx.view, "Right");
                vec![left, right]
            }
        };
        Ok(hands)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SubprocessSource: external landmark helper
// ════════════════════════════════════════════════════════════════════════════

/// JSON structures for parsing the helper's output
#[derive(Deserialize, Debug)]
struct LandmarkJson {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: String,
    score: f32,
    landmarks: Vec<LandmarkJson>,
}

#[derive(Deserialize, Debug)]
struct DetectionResult {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Turn one response line into hands, dropping weak or malformed ones.
pub fn parse_response(line: &str, min_confidence: f32) -> Result<Vec<Hand>, Error> {
    let result: DetectionResult = serde_json::from_str(line.trim())
        .map_err(|e| Error::TrackerFrame(format!("Bad JSON from helper ({e}): {}", line.trim())))?;

    if let Some(error) = result.error {
        log::warn!("Landmark helper error: {error}");
        return Ok(Vec::new());
    }

    let mut hands = Vec::with_capacity(result.hands.len());
    for hand in result.hands {
        if hand.score < min_confidence {
            log::debug!("Skipping {} hand (confidence {:.2})", hand.handedness, hand.score);
            continue;
        }
        if hand.landmarks.len() != HAND_LANDMARKS {
            log::warn!("Expected {HAND_LANDMARKS} landmarks, got {}", hand.landmarks.len());
            continue;
        }
        let mut landmarks = [Landmark::default(); HAND_LANDMARKS];
        for (dst, src) in landmarks.iter_mut().zip(&hand.landmarks) {
            *dst = Landmark { x: src.x, y: src.y, z: src.z };
        }
        hands.push(Hand { landmarks, confidence: hand.score, handedness: hand.handedness });
    }
    Ok(hands)
}

/// Hand tracker running as a child process.
///
/// Protocol: the helper prints `READY` once. For each frame we send a
/// little-endian `u32` header (width, height, channels = 3) followed by packed
/// RGB bytes; the helper answers with a single JSON line.
pub struct SubprocessSource {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    min_confidence: f32,
    rgb: Vec<u8>, // reused per frame
}

impl SubprocessSource {
    pub fn spawn(command: &str, args: &[String], min_confidence: f32) -> Result<Self, Error> {
        log::info!("Starting landmark helper: {command} {}", args.join(" "));

        let mut process = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| Error::TrackerInit(format!("Spawn {command}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| Error::TrackerInit("Helper stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| Error::TrackerInit("Helper stdout unavailable".into()))?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout.read_line(&mut ready)?;
        if ready.trim() != "READY" {
            let _ = process.kill();
            return Err(Error::TrackerInit(format!(
                "Helper did not signal ready, got: {:?}",
                ready.trim()
            )));
        }
        log::info!("Landmark helper ready");

        Ok(Self { process, stdin, stdout, min_confidence, rgb: Vec::new() })
    }
}

impl LandmarkSource for SubprocessSource {
    fn name(&self) -> &'static str {
        "subprocess"
    }

    fn detect(&mut self, frame: &FrameBuffer, _ctx: &TrackerContext) -> Result<Vec<Hand>, Error> {
        if frame.width == 0 || frame.height == 0 {
            return Ok(Vec::new());
        }

        self.rgb.clear();
        self.rgb.reserve(frame.pixels.len() * 3);
        for &px in &frame.pixels {
            // px = 0x00RRGGBB
            self.rgb.extend_from_slice(&[(px >> 16) as u8, (px >> 8) as u8, px as u8]);
        }

        self.stdin.write_all(&(frame.width as u32).to_le_bytes())?;
        self.stdin.write_all(&(frame.height as u32).to_le_bytes())?;
        self.stdin.write_all(&3u32.to_le_bytes())?;
        self.stdin.write_all(&self.rgb)?;
        self.stdin.flush()?;

        let mut response = String::new();
        if self.stdout.read_line(&mut response)? == 0 {
            return Err(Error::TrackerFrame("Helper closed its output".into()));
        }
        parse_response(&response, self.min_confidence)
    }
}

impl Drop for SubprocessSource {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(pointer: Option<(f32, f32)>, pressed: bool, mode: GestureMode) -> TrackerContext {
        TrackerContext { pointer, pressed, mode, view: (640.0, 480.0) }
    }

    fn hand_json(score: f32, count: usize) -> String {
        let lms: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, i as f32 / 40.0))
            .collect();
        format!(r#"{{"handedness":"Left","score":{score},"landmarks":[{}]}}"#, lms.join(","))
    }

    #[test]
    fn parses_hands_and_filters_weak_ones() {
        let line = format!(
            r#"{{"hands":[{},{},{}],"error":null}}"#,
            hand_json(0.9, 21),
            hand_json(0.1, 21),
            hand_json(0.8, 5)
        );
        let hands = parse_response(&line, 0.3).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].handedness, "Left");
        assert_eq!(hands[0].landmarks[20].x, 0.5);
    }

    #[test]
    fn depth_and_label_come_from_the_helper() {
        let mut lms: Vec<String> = (0..21).map(|_| r#"{"x":0.5,"y":0.5,"z":0.0}"#.to_string()).collect();
        lms[8] = r#"{"x":0.5,"y":0.5,"z":-0.1}"#.to_string();
        lms[0] = r#"{"x":0.5,"y":0.5,"z":0.5}"#.to_string();
        let line = format!(
            r#"{{"hands":[{{"handedness":"Right","score":0.9,"landmarks":[{}]}}]}}"#,
            lms.join(",")
        );
        let hands = parse_response(&line, 0.3).unwrap();
        assert_eq!(hands[0].label(), "RIGHT 0.90");
        assert_eq!(hands[0].marker_diameter(1), 8.0);
        assert!((hands[0].marker_diameter(8) - 12.0).abs() < 1e-4);
        assert_eq!(hands[0].marker_diameter(0), 4.0);
    }

    #[test]
    fn helper_error_means_no_hands() {
        let hands = parse_response(r#"{"hands":[],"error":"model not loaded"}"#, 0.3).unwrap();
        assert!(hands.is_empty());
    }

    #[test]
    fn garbage_is_a_frame_error() {
        assert!(matches!(parse_response("not json", 0.3), Err(Error::TrackerFrame(_))));
    }

    #[test]
    fn mouse_without_pointer_sees_nothing() {
        let frame = FrameBuffer::new(4, 4);
        let hands = MouseSource::new().detect(&frame, &ctx(None, true, GestureMode::Close)).unwrap();
        assert!(hands.is_empty());
        let hands = MouseSource::new()
            .detect(&frame, &ctx(Some((1.5, 0.5)), true, GestureMode::Close))
            .unwrap();
        assert!(hands.is_empty());
    }

    #[test]
    fn mouse_close_keeps_pinch_centroid_on_pointer() {
        let frame = FrameBuffer::new(4, 4);
        let layout = FeedLayout::cover(640, 480, 640, 480);
        for pressed in [true, false] {
            let hands = MouseSource::new()
                .detect(&frame, &ctx(Some((0.5, 0.5)), pressed, GestureMode::Close))
                .unwrap();
            assert_eq!(hands.len(), 1);
            let c = Point::centroid(&[
                hands[0].point(index::THUMB_TIP, &layout),
                hands[0].point(index::INDEX_FINGER_TIP, &layout),
                hands[0].point(index::MIDDLE_FINGER_TIP, &layout),
            ])
            .unwrap();
            assert!(c.dist(Point::new(320.0, 240.0)) < 0.01, "pressed={pressed} c={c:?}");
        }
    }

    #[test]
    fn mouse_far_makes_two_hands_around_pointer() {
        let frame = FrameBuffer::new(4, 4);
        let layout = FeedLayout::cover(640, 480, 640, 480);
        let hands = MouseSource::new()
            .detect(&frame, &ctx(Some((0.5, 0.5)), false, GestureMode::Far))
            .unwrap();
        assert_eq!(hands.len(), 2);
        let a = hands[0].point(index::INDEX_FINGER_TIP, &layout);
        let b = hands[1].point(index::INDEX_FINGER_TIP, &layout);
        assert!((a.dist(b) - FAR_GAP_RELEASED).abs() < 0.01);
        assert!(a.midpoint(b).dist(Point::new(320.0, 240.0)) < 0.01);
    }
}
