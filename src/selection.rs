//! The selection lifecycle: `Released → Selecting → Developing → Released`.
//!
//! Driven once per frame by the *confirmed* (debounced) gesture and the
//! current anchor point. Development is the short flash between letting go
//! and the snapshot becoming part of the collage.

use crate::types::{Point, Rect};
use std::time::{Duration, Instant};

/// Peak flash opacity at the start of development (240 of 255).
pub const FLASH_PEAK: f32 = 240.0 / 255.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Released,
    Selecting { start: Point, end: Point },
    Developing { rect: Rect, since: Instant },
}

/// Something worth reacting to (capture, logging).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    Started(Point),
    /// Let go on a selection that was too small.
    Discarded(Rect),
    /// Let go on a valid selection; the flash is running.
    Developing(Rect),
    /// Development finished: snapshot this rect from the current frame.
    Developed(Rect),
}

/// White overlay fading out over the rect being developed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Flash {
    pub rect: Rect,
    started: Instant,
    duration: Duration,
}

impl Flash {
    /// Linear fade from [`FLASH_PEAK`] to zero; `None` once finished.
    pub fn opacity(&self, now: Instant) -> Option<f32> {
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= self.duration {
            return None;
        }
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32();
        Some(FLASH_PEAK * (1.0 - t))
    }
}

pub struct Selection {
    phase: Phase,
    min_size: f32,
    development: Duration,
    flash: Option<Flash>,
}

impl Selection {
    pub fn new(min_size: f32, development: Duration) -> Self {
        Self { phase: Phase::Released, min_size, development, flash: None }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn flash(&self) -> Option<&Flash> {
        self.flash.as_ref()
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.phase, Phase::Selecting { .. })
    }

    /// Rectangle to outline: the live selection or the one being developed.
    pub fn outline(&self) -> Option<Rect> {
        match self.phase {
            Phase::Released => None,
            Phase::Selecting { start, end } => Some(Rect::from_corners(start, end)),
            Phase::Developing { rect, .. } => Some(rect),
        }
    }

    /// Outline colour rule: both sides still short of the minimum.
    /// A rect exactly `min_size` wide already counts as big enough here.
    pub fn undersized(&self, rect: &Rect) -> bool {
        rect.below(self.min_size)
    }

    /// Advance one frame.
    /// `selecting` is the confirmed gesture, `anchor` this frame's centroid.
    pub fn update(&mut self, selecting: bool, anchor: Option<Point>, now: Instant) -> Option<Event> {
        if let Some(flash) = &self.flash {
            if flash.opacity(now).is_none() {
                self.flash = None;
            }
        }

        match self.phase {
            Phase::Developing { rect, since } => {
                if now.saturating_duration_since(since) >= self.development {
                    self.phase = Phase::Released;
                    return Some(Event::Developed(rect));
                }
                None
            }
            Phase::Released => {
                let anchor = anchor.filter(|_| selecting)?;
                self.phase = Phase::Selecting { start: anchor, end: anchor };
                Some(Event::Started(anchor))
            }
            Phase::Selecting { start, end } if selecting => {
                let end = anchor.unwrap_or(end);
                self.phase = Phase::Selecting { start, end };
                None
            }
            Phase::Selecting { start, end } => {
                let rect = Rect::from_corners(start, end);
                if rect.exceeds(self.min_size) {
                    self.phase = Phase::Developing { rect, since: now };
                    self.flash = Some(Flash { rect, started: now, duration: self.development });
                    Some(Event::Developing(rect))
                } else {
                    self.phase = Phase::Released;
                    Some(Event::Discarded(rect))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEV: Duration = Duration::from_millis(750);

    fn ms(t0: Instant, n: u64) -> Instant {
        t0 + Duration::from_millis(n)
    }

    #[test]
    fn full_lifecycle() {
        let t0 = Instant::now();
        let mut s = Selection::new(80.0, DEV);

        assert_eq!(s.update(false, Some(Point::new(10.0, 10.0)), t0), None);
        assert_eq!(s.phase(), Phase::Released);

        let start = Point::new(100.0, 100.0);
        assert_eq!(s.update(true, Some(start), ms(t0, 16)), Some(Event::Started(start)));
        assert!(s.is_selecting());

        assert_eq!(s.update(true, Some(Point::new(150.0, 120.0)), ms(t0, 33)), None);
        assert_eq!(s.update(true, Some(Point::new(250.0, 180.0)), ms(t0, 50)), None);
        let rect = Rect { x: 100.0, y: 100.0, w: 150.0, h: 80.0 };
        assert_eq!(s.outline(), Some(rect));

        // Let go: the anchor of the release frame is not used.
        let ev = s.update(false, Some(Point::new(400.0, 400.0)), ms(t0, 66));
        assert_eq!(ev, Some(Event::Developing(rect)));
        assert!(s.flash().is_some());

        // A new pinch during development is ignored.
        assert_eq!(s.update(true, Some(start), ms(t0, 300)), None);
        assert_eq!(s.outline(), Some(rect));

        assert_eq!(s.update(false, None, ms(t0, 66 + 750)), Some(Event::Developed(rect)));
        assert_eq!(s.phase(), Phase::Released);
        assert!(s.flash().is_none());
    }

    #[test]
    fn small_selection_is_discarded() {
        let t0 = Instant::now();
        let mut s = Selection::new(80.0, DEV);
        s.update(true, Some(Point::new(100.0, 100.0)), t0);
        s.update(true, Some(Point::new(160.0, 150.0)), ms(t0, 16));
        let ev = s.update(false, None, ms(t0, 33));
        assert_eq!(ev, Some(Event::Discarded(Rect { x: 100.0, y: 100.0, w: 60.0, h: 50.0 })));
        assert_eq!(s.phase(), Phase::Released);
        assert!(s.flash().is_none());
    }

    #[test]
    fn one_long_side_is_enough() {
        let t0 = Instant::now();
        let mut s = Selection::new(80.0, DEV);
        s.update(true, Some(Point::new(0.0, 0.0)), t0);
        s.update(true, Some(Point::new(120.0, 4.0)), t0);
        assert!(matches!(s.update(false, None, t0), Some(Event::Developing(_))));
    }

    #[test]
    fn outline_is_undersized_only_below_minimum() {
        let s = Selection::new(80.0, DEV);
        assert!(s.undersized(&Rect { x: 0.0, y: 0.0, w: 79.0, h: 40.0 }));
        assert!(!s.undersized(&Rect { x: 0.0, y: 0.0, w: 80.0, h: 40.0 }));
        assert!(!s.undersized(&Rect { x: 0.0, y: 0.0, w: 20.0, h: 120.0 }));
    }

    #[test]
    fn selecting_without_anchor_does_not_start() {
        let t0 = Instant::now();
        let mut s = Selection::new(80.0, DEV);
        assert_eq!(s.update(true, None, t0), None);
        assert_eq!(s.phase(), Phase::Released);
    }

    #[test]
    fn lost_anchor_keeps_last_end() {
        let t0 = Instant::now();
        let mut s = Selection::new(80.0, DEV);
        s.update(true, Some(Point::new(0.0, 0.0)), t0);
        s.update(true, Some(Point::new(90.0, 90.0)), t0);
        s.update(true, None, t0);
        assert_eq!(s.outline(), Some(Rect { x: 0.0, y: 0.0, w: 90.0, h: 90.0 }));
    }

    #[test]
    fn flash_fades_linearly() {
        let t0 = Instant::now();
        let rect = Rect { x: 0.0, y: 0.0, w: 100.0, h: 100.0 };
        let f = Flash { rect, started: t0, duration: Duration::from_millis(1000) };
        assert!((f.opacity(t0).unwrap() - FLASH_PEAK).abs() < 1e-6);
        assert!((f.opacity(ms(t0, 500)).unwrap() - FLASH_PEAK / 2.0).abs() < 1e-3);
        assert_eq!(f.opacity(ms(t0, 1000)), None);
    }
}
