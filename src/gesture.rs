//! Per-frame gesture classification and frame-count debouncing.
//!
//! A classifier turns the hands of one frame into a raw [`Reading`]
//! (selecting or released, plus the anchor point). The [`Debouncer`] only
//! lets a raw gesture through after it has held for `frame_threshold`
//! consecutive frames, so single-frame landmark jitter never starts or ends
//! a selection.

use crate::config::{GestureConfig, GestureMode};
use crate::landmarks::{index, Hand};
use crate::layout::FeedLayout;
use crate::types::Point;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Selecting,
    Released,
}

/// One frame's raw classification.
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub gesture: Gesture,
    /// Interaction anchor in window pixels; `None` when nothing is tracked.
    pub centroid: Option<Point>,
    /// Extra points worth showing (the two index tips in FAR mode).
    pub markers: Vec<Point>,
}

impl Reading {
    fn nothing() -> Self {
        Self { gesture: Gesture::Released, centroid: None, markers: Vec::new() }
    }

    fn at(gesture: Gesture, centroid: Point) -> Self {
        Self { gesture, centroid: Some(centroid), markers: Vec::new() }
    }
}

/// Thumb, index and middle tips pinched around their centroid.
/// The threshold scales with apparent hand size (wrist to middle tip), so the
/// gesture works at any distance from the camera.
pub fn classify_close(
    hand: Option<&Hand>,
    layout: &FeedLayout,
    base_threshold: f32,
    reference_hand_size: f32,
) -> Reading {
    let Some(hand) = hand else { return Reading::nothing() };

    let wrist = hand.point(index::WRIST, layout);
    let thumb = hand.point(index::THUMB_TIP, layout);
    let index_tip = hand.point(index::INDEX_FINGER_TIP, layout);
    let middle = hand.point(index::MIDDLE_FINGER_TIP, layout);

    let hand_size = wrist.dist(middle);
    let threshold = hand_size / reference_hand_size * base_threshold;

    let centroid = Point::centroid(&[thumb, index_tip, middle]).unwrap_or(index_tip);
    let pinched = [thumb, index_tip, middle]
        .iter()
        .all(|p| p.dist(centroid) < threshold);

    let gesture = if pinched { Gesture::Selecting } else { Gesture::Released };
    Reading::at(gesture, centroid)
}

/// Fingers curled: tip close to its base joint on at least four fingers.
/// Once a selection is running only a clearly open hand (three or more
/// fingers extended past `open_threshold`) ends it, so a half-opened hand
/// keeps selecting.
pub fn classify_fist(
    hand: Option<&Hand>,
    layout: &FeedLayout,
    fist_threshold: f32,
    open_threshold: f32,
    selecting: bool,
) -> Reading {
    let Some(hand) = hand else { return Reading::nothing() };

    const PAIRS: [(usize, usize); 5] = [
        (index::THUMB_TIP, index::THUMB_IP),
        (index::INDEX_FINGER_TIP, index::INDEX_FINGER_MCP),
        (index::MIDDLE_FINGER_TIP, index::MIDDLE_FINGER_MCP),
        (index::RING_FINGER_TIP, index::RING_FINGER_MCP),
        (index::PINKY_TIP, index::PINKY_MCP),
    ];

    let mut curled = 0;
    let mut open = 0;
    for (tip, base) in PAIRS {
        let d = hand.point(tip, layout).dist(hand.point(base, layout));
        if d < fist_threshold { curled += 1; }
        if d > open_threshold { open += 1; }
    }

    let fist = if selecting { open < 3 } else { curled >= 4 };

    let anchor = hand.point(index::MIDDLE_FINGER_MCP, layout);
    let gesture = if fist { Gesture::Selecting } else { Gesture::Released };
    Reading::at(gesture, anchor)
}

/// Moving average of a point over the last `window` samples.
pub struct PointSmoother {
    window: usize,
    xs: VecDeque<f32>,
    ys: VecDeque<f32>,
}

impl PointSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self { window, xs: VecDeque::with_capacity(window), ys: VecDeque::with_capacity(window) }
    }

    pub fn push(&mut self, p: Point) -> Point {
        self.xs.push_back(p.x);
        self.ys.push_back(p.y);
        if self.xs.len() > self.window {
            self.xs.pop_front();
            self.ys.pop_front();
        }
        let n = self.xs.len() as f32;
        Point::new(self.xs.iter().sum::<f32>() / n, self.ys.iter().sum::<f32>() / n)
    }

    pub fn reset(&mut self) {
        self.xs.clear();
        self.ys.clear();
    }
}

/// Index tips of two hands brought together.
pub struct FarClassifier {
    threshold: f32,
    left: PointSmoother,
    right: PointSmoother,
}

impl FarClassifier {
    pub fn new(threshold: f32, window: usize) -> Self {
        Self { threshold, left: PointSmoother::new(window), right: PointSmoother::new(window) }
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    pub fn classify(&mut self, hands: &[Hand], layout: &FeedLayout) -> Reading {
        if hands.len() < 2 {
            self.reset();
            return Reading::nothing();
        }

        // Order by x so each smoother keeps following the same side.
        let mut a = hands[0].point(index::INDEX_FINGER_TIP, layout);
        let mut b = hands[1].point(index::INDEX_FINGER_TIP, layout);
        if b.x < a.x {
            std::mem::swap(&mut a, &mut b);
        }
        let a = self.left.push(a);
        let b = self.right.push(b);

        let gesture = if a.dist(b) < self.threshold { Gesture::Selecting } else { Gesture::Released };
        Reading { gesture, centroid: Some(a.midpoint(b)), markers: vec![a, b] }
    }
}

/// Consecutive-frame debounce between the two gestures.
pub struct Debouncer {
    threshold: u32,
    selecting_frames: u32,
    released_frames: u32,
    confirmed: Gesture,
}

impl Debouncer {
    pub fn new(threshold: u32) -> Self {
        Self { threshold, selecting_frames: 0, released_frames: 0, confirmed: Gesture::Released }
    }

    /// Feed one raw gesture; returns the confirmed one.
    pub fn update(&mut self, raw: Gesture) -> Gesture {
        match raw {
            Gesture::Selecting => {
                self.selecting_frames = self.selecting_frames.saturating_add(1);
                self.released_frames = 0;
                if self.selecting_frames >= self.threshold {
                    self.confirmed = Gesture::Selecting;
                }
            }
            Gesture::Released => {
                self.released_frames = self.released_frames.saturating_add(1);
                self.selecting_frames = 0;
                if self.released_frames >= self.threshold {
                    self.confirmed = Gesture::Released;
                }
            }
        }
        self.confirmed
    }

    pub fn confirmed(&self) -> Gesture {
        self.confirmed
    }

    /// Forget partial streaks (the confirmed gesture stays).
    pub fn clear_counts(&mut self) {
        self.selecting_frames = 0;
        self.released_frames = 0;
    }
}

/// Output of one [`GestureTracker::update`].
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedGesture {
    pub confirmed: Gesture,
    pub reading: Reading,
}

/// The active classifier plus the debouncer.
pub struct GestureTracker {
    mode: GestureMode,
    params: GestureConfig,
    far: FarClassifier,
    debouncer: Debouncer,
}

impl GestureTracker {
    pub fn new(params: &GestureConfig) -> Self {
        Self {
            mode: params.mode,
            params: params.clone(),
            far: FarClassifier::new(params.far_threshold, params.smoothing_window),
            debouncer: Debouncer::new(params.frame_threshold),
        }
    }

    pub fn mode(&self) -> GestureMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GestureMode) {
        if mode != self.mode {
            log::info!("Gesture mode: {}", mode.label());
            self.mode = mode;
            self.far.reset();
            self.debouncer.clear_counts();
        }
    }

    pub fn update(&mut self, hands: &[Hand], layout: &FeedLayout) -> TrackedGesture {
        let p = &self.params;
        let reading = match self.mode {
            GestureMode::Close => classify_close(
                hands.first(),
                layout,
                p.base_centroid_threshold,
                p.reference_hand_size,
            ),
            GestureMode::Far => self.far.classify(hands, layout),
            GestureMode::Fist => classify_fist(
                hands.first(),
                layout,
                p.fist_threshold,
                p.open_threshold,
                self.debouncer.confirmed() == Gesture::Selecting,
            ),
        };
        let confirmed = self.debouncer.update(reading.gesture);
        TrackedGesture { confirmed, reading }
    }
}
