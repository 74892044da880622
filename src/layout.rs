// Where the camera image sits inside the window.
// Visual: the feed always covers the whole window; the longer side is
// cropped equally on both ends (no black bars).

use crate::types::{FrameBuffer, Point, Rect};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FeedLayout {
    pub x: f32,          // left edge of the scaled feed (may be negative)
    pub y: f32,          // top edge of the scaled feed (may be negative)
    pub scaled_w: f32,   // feed width on screen
    pub scaled_h: f32,   // feed height on screen
    pub video_w: f32,    // native camera width
    pub video_h: f32,    // native camera height
}

impl FeedLayout {
    /// Cover-fit a `video_w`×`video_h` feed into a `canvas_w`×`canvas_h` window.
    pub fn cover(canvas_w: usize, canvas_h: usize, video_w: usize, video_h: usize) -> Self {
        let (cw, ch) = (canvas_w as f32, canvas_h as f32);
        let (vw, vh) = (video_w.max(1) as f32, video_h.max(1) as f32);

        let (mut x, mut y, mut w, mut h) = (0.0, 0.0, cw, ch);
        // cw/ch > vw/vh, cross-multiplied
        if cw * vh > ch * vw {
            // Canvas is wider: fill width, overflow top/bottom.
            h = cw * vh / vw;
            y = (ch - h) / 2.0;
        } else {
            // Canvas is taller (or equal): fill height, overflow left/right.
            w = ch * vw / vh;
            x = (cw - w) / 2.0;
        }

        Self { x, y, scaled_w: w, scaled_h: h, video_w: vw, video_h: vh }
    }

    /// Normalized feed coordinates (0..1) -> window pixels.
    pub fn normalized_to_screen(&self, nx: f32, ny: f32) -> Point {
        Point::new(self.x + nx * self.scaled_w, self.y + ny * self.scaled_h)
    }

    /// Window pixels -> normalized feed coordinates (0..1 when on the feed).
    pub fn screen_to_normalized(&self, p: Point) -> (f32, f32) {
        ((p.x - self.x) / self.scaled_w, (p.y - self.y) / self.scaled_h)
    }

    /// Window pixels -> native camera pixels.
    pub fn screen_to_video(&self, p: Point) -> (f32, f32) {
        let (nx, ny) = self.screen_to_normalized(p);
        (nx * self.video_w, ny * self.video_h)
    }

    /// A window rectangle expressed in native camera pixels.
    pub fn rect_to_video(&self, r: Rect) -> Rect {
        let (x0, y0) = self.screen_to_video(Point::new(r.x, r.y));
        let (x1, y1) = self.screen_to_video(Point::new(r.x + r.w, r.y + r.h));
        Rect::from_corners(Point::new(x0, y0), Point::new(x1, y1))
    }

    /// Paint `live` into `screen` through this layout (nearest neighbour).
    /// Visual: the camera fills the window exactly as the landmarks expect.
    pub fn draw_feed(&self, live: &FrameBuffer, screen: &mut FrameBuffer) {
        if live.width == screen.width && live.height == screen.height && self.x == 0.0 && self.y == 0.0 {
            screen.pixels.copy_from_slice(&live.pixels);
            return;
        }
        if live.width == 0 || live.height == 0 {
            screen.fill(0);
            return;
        }

        // Column lookup once per frame; rows are looked up as we go.
        let sx_to_vx: Vec<usize> = (0..screen.width)
            .map(|sx| {
                let v = ((sx as f32 + 0.5 - self.x) * self.video_w / self.scaled_w) as isize;
                v.clamp(0, live.width as isize - 1) as usize
            })
            .collect();

        for sy in 0..screen.height {
            let vy = ((sy as f32 + 0.5 - self.y) * self.video_h / self.scaled_h) as isize;
            let vy = vy.clamp(0, live.height as isize - 1) as usize;
            let src_row = &live.pixels[vy * live.width..(vy + 1) * live.width];
            let dst_row = &mut screen.pixels[sy * screen.width..(sy + 1) * screen.width];
            for (dst, &vx) in dst_row.iter_mut().zip(&sx_to_vx) {
                *dst = src_row[vx];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_size_is_identity() {
        let l = FeedLayout::cover(640, 480, 640, 480);
        assert_eq!((l.x, l.y, l.scaled_w, l.scaled_h), (0.0, 0.0, 640.0, 480.0));
        assert_eq!(l.screen_to_video(Point::new(100.0, 50.0)), (100.0, 50.0));
    }

    #[test]
    fn wide_canvas_overflows_vertically() {
        // 16:9 window, 4:3 camera
        let l = FeedLayout::cover(1600, 900, 640, 480);
        assert_eq!(l.scaled_w, 1600.0);
        assert_eq!(l.scaled_h, 1200.0);
        assert_eq!(l.x, 0.0);
        assert_eq!(l.y, -150.0);
        let top_left_visible = l.screen_to_video(Point::new(0.0, 0.0));
        assert_eq!(top_left_visible, (0.0, 60.0));
    }

    #[test]
    fn tall_canvas_overflows_horizontally() {
        let l = FeedLayout::cover(480, 480, 640, 480);
        assert_eq!(l.scaled_h, 480.0);
        assert_eq!(l.scaled_w, 640.0);
        assert_eq!(l.x, -80.0);
        let p = l.normalized_to_screen(0.5, 0.5);
        assert_eq!(p, Point::new(240.0, 240.0));
    }

    #[test]
    fn normalized_round_trips_through_screen() {
        let l = FeedLayout::cover(1280, 720, 640, 480);
        let p = l.normalized_to_screen(0.25, 0.75);
        let (nx, ny) = l.screen_to_normalized(p);
        assert!((nx - 0.25).abs() < 1e-5);
        assert!((ny - 0.75).abs() < 1e-5);
    }

    #[test]
    fn feed_is_scaled_into_screen() {
        // 2x2 camera into 4x4 window: each camera pixel becomes a 2x2 block.
        let live = FrameBuffer { width: 2, height: 2, pixels: vec![1, 2, 3, 4] };
        let mut screen = FrameBuffer::new(4, 4);
        FeedLayout::cover(4, 4, 2, 2).draw_feed(&live, &mut screen);
        assert_eq!(
            screen.pixels,
            vec![1, 1, 2, 2, 1, 1, 2, 2, 3, 3, 4, 4, 3, 3, 4, 4]
        );
    }
}
