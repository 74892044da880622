// Developed selections: captured sub-images of the feed that stay on the
// canvas and (optionally) fade away.
// Visual: each snapshot sits exactly where it was selected, frozen in time,
// while the live feed keeps moving underneath.

use crate::layout::FeedLayout;
use crate::types::{FrameBuffer, Rect};
use image::{imageops, ImageBuffer, Rgb, RgbImage};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// How a snapshot's opacity evolves with age.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FadePolicy {
    /// Snapshots stay fully opaque until evicted.
    Disabled,
    /// Fully opaque for `delay`, then linearly transparent over `duration`.
    After { delay: Duration, duration: Duration },
}

impl FadePolicy {
    /// Opacity in [0, 1] for a snapshot of this age.
    pub fn opacity(&self, age: Duration) -> f32 {
        match *self {
            FadePolicy::Disabled => 1.0,
            FadePolicy::After { delay, duration } => {
                let Some(fading) = age.checked_sub(delay) else { return 1.0 };
                if duration.is_zero() {
                    return if fading.is_zero() { 1.0 } else { 0.0 };
                }
                let t = fading.as_secs_f32() / duration.as_secs_f32();
                (1.0 - t).clamp(0.0, 1.0)
            }
        }
    }
}

pub struct Snapshot {
    pub image: FrameBuffer, // already sized to `rect`
    pub rect: Rect,         // where it sits in the window
    pub created: Instant,
}

/// Copy the part of `live` under the window rect `rect` into a new snapshot.
/// Returns `None` if the rect does not overlap the feed.
pub fn capture(live: &FrameBuffer, rect: Rect, layout: &FeedLayout, now: Instant) -> Option<Snapshot> {
    let out_w = rect.w.round() as u32;
    let out_h = rect.h.round() as u32;
    if out_w == 0 || out_h == 0 || live.width == 0 || live.height == 0 {
        return None;
    }

    // Window rect -> camera pixels, clamped to the frame.
    let v = layout.rect_to_video(rect);
    let x0 = v.x.floor().max(0.0) as u32;
    let y0 = v.y.floor().max(0.0) as u32;
    let x1 = ((v.x + v.w).ceil() as u32).min(live.width as u32);
    let y1 = ((v.y + v.h).ceil() as u32).min(live.height as u32);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let crop: RgbImage = ImageBuffer::from_fn(x1 - x0, y1 - y0, |x, y| {
        let px = live.get((x0 + x) as usize, (y0 + y) as usize);
        Rgb([(px >> 16) as u8, (px >> 8) as u8, px as u8])
    });
    let sized = if crop.dimensions() == (out_w, out_h) {
        crop
    } else {
        imageops::resize(&crop, out_w, out_h, imageops::FilterType::Triangle)
    };

    let pixels = sized
        .pixels()
        .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
        .collect();

    Some(Snapshot {
        image: FrameBuffer { width: out_w as usize, height: out_h as usize, pixels },
        rect,
        created: now,
    })
}

/// Ordered, bounded collection of snapshots (oldest first).
pub struct SnapshotStore {
    items: VecDeque<Snapshot>,
    limit: usize,
    fade: FadePolicy,
    fade_enabled: bool,
}

impl SnapshotStore {
    pub fn new(limit: usize, fade: FadePolicy) -> Self {
        let limit = limit.max(1);
        Self {
            items: VecDeque::with_capacity(limit + 1),
            limit,
            fade_enabled: fade != FadePolicy::Disabled,
            fade,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a snapshot; returns the evicted oldest one when over the limit.
    pub fn push(&mut self, snapshot: Snapshot) -> Option<Snapshot> {
        self.items.push_back(snapshot);
        if self.items.len() > self.limit {
            self.items.pop_front()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn fade_enabled(&self) -> bool {
        self.fade_enabled
    }

    /// Flip fading on/off (no effect when no fade policy is configured).
    pub fn toggle_fade(&mut self) -> bool {
        if self.fade != FadePolicy::Disabled {
            self.fade_enabled = !self.fade_enabled;
        }
        self.fade_enabled
    }

    fn opacity_of(&self, s: &Snapshot, now: Instant) -> f32 {
        if !self.fade_enabled {
            return 1.0;
        }
        self.fade.opacity(now.saturating_duration_since(s.created))
    }

    /// Drop fully faded snapshots; returns how many went.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        if self.fade_enabled {
            let fade = self.fade;
            self.items
                .retain(|s| fade.opacity(now.saturating_duration_since(s.created)) > 0.0);
        }
        before - self.items.len()
    }

    /// Snapshots with their current opacity, oldest first (draw in this order).
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = (&Snapshot, f32)> + '_ {
        self.items
            .iter()
            .map(move |s| (s, self.opacity_of(s, now)))
            .filter(|(_, a)| *a > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(created: Instant, tag: u32) -> Snapshot {
        Snapshot {
            image: FrameBuffer { width: 1, height: 1, pixels: vec![tag] },
            rect: Rect { x: 0.0, y: 0.0, w: 1.0, h: 1.0 },
            created,
        }
    }

    const LONG_DWELL: FadePolicy = FadePolicy::After {
        delay: Duration::from_secs(120),
        duration: Duration::from_secs(10),
    };

    #[test]
    fn fade_is_flat_then_linear() {
        let f = LONG_DWELL;
        assert_eq!(f.opacity(Duration::ZERO), 1.0);
        assert_eq!(f.opacity(Duration::from_secs(120)), 1.0);
        assert!((f.opacity(Duration::from_secs(125)) - 0.5).abs() < 1e-5);
        assert_eq!(f.opacity(Duration::from_secs(130)), 0.0);
        assert_eq!(f.opacity(Duration::from_secs(500)), 0.0);
        assert_eq!(FadePolicy::Disabled.opacity(Duration::from_secs(500)), 1.0);
    }

    #[test]
    fn store_evicts_oldest_past_limit() {
        let t0 = Instant::now();
        let mut store = SnapshotStore::new(3, FadePolicy::Disabled);
        for tag in 0..3 {
            assert!(store.push(snap(t0, tag)).is_none());
        }
        let evicted = store.push(snap(t0, 3)).unwrap();
        assert_eq!(evicted.image.pixels, vec![0]);
        let order: Vec<u32> = store.visible(t0).map(|(s, _)| s.image.pixels[0]).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn prune_removes_faded_only() {
        let t0 = Instant::now();
        let mut store = SnapshotStore::new(20, LONG_DWELL);
        store.push(snap(t0, 0));
        store.push(snap(t0 + Duration::from_secs(60), 1));

        let now = t0 + Duration::from_secs(131);
        let seen: Vec<(u32, f32)> = store.visible(now).map(|(s, a)| (s.image.pixels[0], a)).collect();
        assert_eq!(seen, vec![(1, 1.0)]);
        assert_eq!(store.prune(now), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn toggling_fade_freezes_opacity() {
        let t0 = Instant::now();
        let mut store = SnapshotStore::new(20, LONG_DWELL);
        store.push(snap(t0, 0));
        assert!(!store.toggle_fade());
        let now = t0 + Duration::from_secs(200);
        assert_eq!(store.prune(now), 0);
        assert_eq!(store.visible(now).count(), 1);
        assert!(store.toggle_fade());
        assert_eq!(store.prune(now), 1);
        assert!(store.is_empty());

        let mut no_fade = SnapshotStore::new(20, FadePolicy::Disabled);
        assert!(!no_fade.toggle_fade());
    }

    #[test]
    fn capture_copies_the_selected_region() {
        // 8x8 frame where each pixel encodes its coordinates.
        let mut live = FrameBuffer::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                live.pixels[y * 8 + x] = ((x as u32) << 16) | ((y as u32) << 8);
            }
        }
        let layout = FeedLayout::cover(8, 8, 8, 8);
        let rect = Rect { x: 2.0, y: 3.0, w: 4.0, h: 2.0 };
        let s = capture(&live, rect, &layout, Instant::now()).unwrap();
        assert_eq!((s.image.width, s.image.height), (4, 2));
        assert_eq!(s.image.pixels[0], (2 << 16) | (3 << 8));
        assert_eq!(s.image.pixels[7], (5 << 16) | (4 << 8));
        assert_eq!(s.rect, rect);
    }

    #[test]
    fn capture_outside_feed_is_none() {
        let live = FrameBuffer::new(8, 8);
        let layout = FeedLayout::cover(8, 8, 8, 8);
        let rect = Rect { x: 20.0, y: 20.0, w: 4.0, h: 4.0 };
        assert!(capture(&live, rect, &layout, Instant::now()).is_none());
        let empty = Rect { x: 1.0, y: 1.0, w: 0.0, h: 4.0 };
        assert!(capture(&live, empty, &layout, Instant::now()).is_none());
    }
}
