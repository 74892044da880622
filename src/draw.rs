// Window + software drawing utilities.
// Visual pieces provided here:
// 1) The window that shows the feed, snapshots and overlays.
// 2) Lines, dashed rectangles and discs for the selection UI.
// 3) A tiny 5x7 bitmap font for the HUD.

use crate::error::Error;
use crate::types::{FrameBuffer, Point, Rect};
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

pub const WHITE: u32 = 0x00_FF_FF_FF;
pub const BLACK: u32 = 0x00_00_00_00;
pub const RED: u32 = 0x00_FF_00_00;
pub const YELLOW: u32 = 0x00_FF_FF_00;
pub const GREEN: u32 = 0x00_00_FF_00;

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Open a window of the given size.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let mut window = Window::new(title, width, height, WindowOptions::default())
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        // The camera already paces us; this only caps idle redraws.
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    /// False once the user closes the window.
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Mouse position in window pixels, if the pointer is over the window.
    pub fn mouse_pos(&self) -> Option<Point> {
        self.window
            .get_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| Point::new(x, y))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    fn pressed_once(&self, key: Key) -> bool {
        self.window.is_key_pressed(key, KeyRepeat::No)
    }

    /// G: cycle gesture mode.
    pub fn g_pressed_once(&self) -> bool { self.pressed_once(Key::G) }

    /// F: toggle snapshot fading.
    pub fn f_pressed_once(&self) -> bool { self.pressed_once(Key::F) }

    /// C: clear all snapshots.
    pub fn c_pressed_once(&self) -> bool { self.pressed_once(Key::C) }

    /// L: toggle the landmark overlay.
    pub fn l_pressed_once(&self) -> bool { self.pressed_once(Key::L) }
}

/* ---------- Software drawing ---------- */

/// Put a pixel on the framebuffer if (x,y) is inside bounds.
#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    fb.pixels[y * fb.width + x] = color;
}

/// Straight line between two points (Bresenham), `thickness` pixels wide.
pub fn draw_line(fb: &mut FrameBuffer, a: Point, b: Point, thickness: i32, color: u32) {
    let (mut x0, mut y0) = (a.x.round() as i32, a.y.round() as i32);
    let (x1, y1) = (b.x.round() as i32, b.y.round() as i32);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let t = thickness.max(1);
    loop {
        for oy in 0..t {
            for ox in 0..t {
                put_pixel(fb, x0 + ox, y0 + oy, color);
            }
        }
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// Rectangle outline with a dash pattern running around the perimeter.
/// Visual: `on` pixels drawn, `off` pixels skipped, `thickness` wide (inwards).
pub fn draw_dashed_rect(fb: &mut FrameBuffer, rect: Rect, on: u32, off: u32, thickness: i32, color: u32) {
    let x0 = rect.x.round() as i32;
    let y0 = rect.y.round() as i32;
    let x1 = (rect.x + rect.w).round() as i32;
    let y1 = (rect.y + rect.h).round() as i32;
    let period = (on + off).max(1);
    let t = thickness.max(1);
    let mut step = 0u32;

    let mut dash = |fb: &mut FrameBuffer, x: i32, y: i32, nx: i32, ny: i32| {
        if step % period < on {
            for k in 0..t {
                put_pixel(fb, x + nx * k, y + ny * k, color);
            }
        }
        step += 1;
    };

    // Clockwise from the top-left corner; (nx, ny) points into the rect.
    for x in x0..x1 { dash(fb, x, y0, 0, 1); }
    for y in y0..y1 { dash(fb, x1, y, -1, 0); }
    for x in (x0 + 1..=x1).rev() { dash(fb, x, y1, 0, -1); }
    for y in (y0 + 1..=y1).rev() { dash(fb, x0, y, 1, 0); }
}

/// Filled disc of the given diameter.
pub fn fill_circle(fb: &mut FrameBuffer, c: Point, diameter: f32, color: u32) {
    let r = diameter / 2.0;
    let r2 = r * r;
    let (cx, cy) = (c.x, c.y);
    for y in (cy - r).floor() as i32..=(cy + r).ceil() as i32 {
        for x in (cx - r).floor() as i32..=(cx + r).ceil() as i32 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            if dx * dx + dy * dy <= r2 {
                put_pixel(fb, x, y, color);
            }
        }
    }
}

/// Circle outline of the given diameter, `thickness` pixels wide.
pub fn draw_ring(fb: &mut FrameBuffer, c: Point, diameter: f32, thickness: f32, color: u32) {
    let outer = diameter / 2.0 + thickness / 2.0;
    let inner = (diameter / 2.0 - thickness / 2.0).max(0.0);
    let (o2, i2) = (outer * outer, inner * inner);
    for y in (c.y - outer).floor() as i32..=(c.y + outer).ceil() as i32 {
        for x in (c.x - outer).floor() as i32..=(c.x + outer).ceil() as i32 {
            let dx = x as f32 + 0.5 - c.x;
            let dy = y as f32 + 0.5 - c.y;
            let d2 = dx * dx + dy * dy;
            if d2 <= o2 && d2 >= i2 {
                put_pixel(fb, x, y, color);
            }
        }
    }
}

/* ---------- 5x7 bitmap font (digits, A-Z, a little punctuation) ---------- */

/// 5x7 glyph rows; the low 5 bits are the pixels (bit 4 = leftmost).
/// Lowercase letters render as uppercase.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '/' => g!(0b00001,0b00010,0b00010,0b00100,0b01000,0b01000,0b10000),

        _ => None,
    }
}

/// One 5x7 character at (x,y) with a 1-pixel black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    // Shadow pass first (offset by 1,1), then the glyph itself.
    for (ox, c) in [(1, BLACK), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    put_pixel(fb, x + rx + ox, y + ry as i32 + ox, c);
                }
            }
        }
    }
}

/// Width in pixels of `text` in the 5x7 font.
pub fn text_width(text: &str) -> i32 {
    text.chars().count() as i32 * 6
}

/// Draw a text string using 5x7 glyphs (6-pixel advance).
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, ch, color);
        x += 6;
    }
}

/// Text centered on `c`.
pub fn draw_text_centered(fb: &mut FrameBuffer, c: Point, text: &str, color: u32) {
    let x = c.x.round() as i32 - text_width(text) / 2;
    let y = c.y.round() as i32 - 3;
    draw_text_5x7(fb, x, y, text, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashed_rect_alternates_along_top_edge() {
        let mut fb = FrameBuffer::new(40, 40);
        let rect = Rect { x: 0.0, y: 0.0, w: 30.0, h: 20.0 };
        draw_dashed_rect(&mut fb, rect, 5, 5, 2, RED);
        for x in 0..5 {
            assert_eq!(fb.get(x, 0), RED);
            assert_eq!(fb.get(x, 1), RED); // second pixel of thickness
        }
        for x in 5..10 {
            assert_eq!(fb.get(x, 0), BLACK);
        }
        assert_eq!(fb.get(10, 0), RED);
        // inside stays untouched
        assert_eq!(fb.get(15, 10), BLACK);
    }

    #[test]
    fn line_hits_both_ends() {
        let mut fb = FrameBuffer::new(10, 10);
        draw_line(&mut fb, Point::new(1.0, 1.0), Point::new(8.0, 5.0), 1, GREEN);
        assert_eq!(fb.get(1, 1), GREEN);
        assert_eq!(fb.get(8, 5), GREEN);
    }

    #[test]
    fn circle_and_ring_shapes() {
        let mut fb = FrameBuffer::new(30, 30);
        fill_circle(&mut fb, Point::new(15.0, 15.0), 10.0, YELLOW);
        assert_eq!(fb.get(15, 15), YELLOW);
        assert_eq!(fb.get(0, 0), BLACK);

        let mut fb = FrameBuffer::new(30, 30);
        draw_ring(&mut fb, Point::new(15.0, 15.0), 20.0, 2.0, WHITE);
        assert_eq!(fb.get(15, 15), BLACK);
        assert_eq!(fb.get(24, 15), WHITE);
    }

    #[test]
    fn font_covers_hud_text() {
        for ch in "CLOSE FAR FIST SELECTING DEVELOPING SNAPS: 20 | FADE ON/OFF FPS 29.9 - nohand".chars() {
            assert!(glyph5x7(ch).is_some(), "missing glyph {ch:?}");
        }
        assert_eq!(text_width("FAR"), 18);
    }
}
