// Core types shared by the capture, gesture and drawing code.

#[derive(Clone)]
pub struct FrameBuffer {
    pub width: usize,      // how wide the frame is on screen (pixels)
    pub height: usize,     // how tall the frame is on screen (pixels)
    pub pixels: Vec<u32>,  // each entry is 0x00RRGGBB for minifb
}

impl FrameBuffer {
    /// A black frame of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    pub fn fill(&mut self, color: u32) {
        for p in &mut self.pixels { *p = color; }
    }
}

/// A position in window pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dist(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Mean of a non-empty set of points.
    pub fn centroid(points: &[Point]) -> Option<Point> {
        if points.is_empty() {
            return None;
        }
        let n = points.len() as f32;
        let (sx, sy) = points.iter().fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
        Some(Point::new(sx / n, sy / n))
    }
}

/// Axis-aligned rectangle in window pixels; `w` and `h` are never negative.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Normalized bounds spanned by two corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            w: (a.x - b.x).abs(),
            h: (a.y - b.y).abs(),
        }
    }

    /// True when either side is longer than `min_size`.
    pub fn exceeds(&self, min_size: f32) -> bool {
        self.w > min_size || self.h > min_size
    }

    /// True when both sides are shorter than `min_size`.
    pub fn below(&self, min_size: f32) -> bool {
        self.w < min_size && self.h < min_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_from_corners_is_order_independent() {
        let a = Point::new(120.0, 40.0);
        let b = Point::new(20.0, 90.0);
        let r = Rect::from_corners(a, b);
        assert_eq!(r, Rect { x: 20.0, y: 40.0, w: 100.0, h: 50.0 });
        assert_eq!(Rect::from_corners(b, a), r);
    }

    #[test]
    fn exceeds_needs_only_one_side() {
        let r = Rect { x: 0.0, y: 0.0, w: 81.0, h: 5.0 };
        assert!(r.exceeds(80.0));
        let r = Rect { x: 0.0, y: 0.0, w: 80.0, h: 80.0 };
        assert!(!r.exceeds(80.0));
    }

    #[test]
    fn below_needs_both_sides_short() {
        assert!(Rect { x: 0.0, y: 0.0, w: 79.0, h: 79.0 }.below(80.0));
        assert!(!Rect { x: 0.0, y: 0.0, w: 80.0, h: 10.0 }.below(80.0));
        assert!(!Rect { x: 0.0, y: 0.0, w: 10.0, h: 80.0 }.below(80.0));
    }

    #[test]
    fn centroid_of_three_points() {
        let c = Point::centroid(&[
            Point::new(0.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(0.0, 30.0),
        ])
        .unwrap();
        assert_eq!(c, Point::new(10.0, 10.0));
        assert!(Point::centroid(&[]).is_none());
    }
}
