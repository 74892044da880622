// Alpha compositing in linear light.
// Visual: faded snapshots and the development flash mix with the live feed
// without the dark fringes of naive sRGB blending.

use crate::types::{FrameBuffer, Rect};

/// sRGB <-> linear lookup tables, built once at startup.
pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1)
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255), 4096-step quantization
    linear_to_srgb: [u8; 4096],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = i as f32 / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    fn to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    fn to_srgb(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// `src` over `dst` with coverage `alpha` (0 = keep dst, 1 = src).
    #[inline]
    pub fn mix(&self, dst: u32, src: u32, alpha: f32) -> u32 {
        if alpha <= 0.0 {
            return dst;
        }
        if alpha >= 1.0 {
            return src;
        }
        let inv = 1.0 - alpha;
        let mut out = 0u32;
        for shift in [16u32, 8, 0] {
            let d = self.to_linear((dst >> shift) as u8);
            let s = self.to_linear((src >> shift) as u8);
            out |= (self.to_srgb(alpha * s + inv * d) as u32) << shift;
        }
        out
    }
}

/// Draw `image` with its top-left at (x, y), clipped to `screen`.
pub fn blit(screen: &mut FrameBuffer, image: &FrameBuffer, x: i32, y: i32, opacity: f32, lut: &GammaLut) {
    if opacity <= 0.0 {
        return;
    }
    let x_start = x.max(0);
    let y_start = y.max(0);
    let x_end = (x + image.width as i32).min(screen.width as i32);
    let y_end = (y + image.height as i32).min(screen.height as i32);
    if x_end <= x_start || y_end <= y_start {
        return;
    }

    for sy in y_start..y_end {
        let iy = (sy - y) as usize;
        let dst_row = sy as usize * screen.width;
        let src_row = iy * image.width;
        for sx in x_start..x_end {
            let ix = (sx - x) as usize;
            let d = &mut screen.pixels[dst_row + sx as usize];
            *d = lut.mix(*d, image.pixels[src_row + ix], opacity);
        }
    }
}

/// Fill `rect` with `color` at `opacity`, clipped to `screen`.
pub fn fill_rect(screen: &mut FrameBuffer, rect: Rect, color: u32, opacity: f32, lut: &GammaLut) {
    if opacity <= 0.0 {
        return;
    }
    let x0 = rect.x.round().max(0.0) as usize;
    let y0 = rect.y.round().max(0.0) as usize;
    let x1 = ((rect.x + rect.w).round().max(0.0) as usize).min(screen.width);
    let y1 = ((rect.y + rect.h).round().max(0.0) as usize).min(screen.height);
    for y in y0..y1 {
        let row = y * screen.width;
        for p in &mut screen.pixels[row + x0.min(x1)..row + x1] {
            *p = lut.mix(*p, color, opacity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mix_endpoints_are_exact() {
        let lut = GammaLut::new();
        assert_eq!(lut.mix(0x00_10_20_30, 0x00_FF_FF_FF, 0.0), 0x00_10_20_30);
        assert_eq!(lut.mix(0x00_10_20_30, 0x00_FF_FF_FF, 1.0), 0x00_FF_FF_FF);
    }

    #[test]
    fn half_mix_is_linear_light() {
        let lut = GammaLut::new();
        // Black/white at 50% in linear light is ~188 in sRGB, not 128.
        let m = lut.mix(0, 0x00_FF_FF_FF, 0.5);
        let r = (m >> 16) & 0xFF;
        assert!((186..=189).contains(&r), "r = {r}");
        assert_eq!(m & 0xFF, r);
    }

    #[test]
    fn blit_clips_to_screen() {
        let lut = GammaLut::new();
        let mut screen = FrameBuffer::new(4, 4);
        let image = FrameBuffer { width: 2, height: 2, pixels: vec![1, 2, 3, 4] };
        blit(&mut screen, &image, 3, -1, 1.0, &lut);
        assert_eq!(screen.get(3, 0), 3);
        assert_eq!(screen.pixels.iter().filter(|&&p| p != 0).count(), 1);
    }

    #[test]
    fn fill_rect_covers_only_rect() {
        let lut = GammaLut::new();
        let mut screen = FrameBuffer::new(4, 4);
        fill_rect(&mut screen, Rect { x: 1.0, y: 1.0, w: 2.0, h: 5.0 }, 0xFF_FF_FF, 1.0, &lut);
        assert_eq!(screen.get(0, 0), 0);
        assert_eq!(screen.get(1, 1), 0xFF_FF_FF);
        assert_eq!(screen.get(2, 3), 0xFF_FF_FF);
        assert_eq!(screen.get(3, 3), 0);
    }
}
