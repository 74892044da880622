// Opens a webcam and converts frames into a buffer suitable for the window.
// Visual expectation: `next_frame()` gives a 0x00RRGGBB frame, mirrored when
// asked, so moving your hand right moves it right on screen.

use crate::config::CameraConfig;
use crate::error::Error;
use crate::types::FrameBuffer;

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

// A small wrapper around nokhwa::Camera so the main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    width: u32,
    height: u32,
    mirror: bool,
}

impl CameraCapture {
    /// Open camera `config.index` near the requested resolution and start streaming.
    pub fn open(config: &CameraConfig) -> Result<Self, Error> {
        let idx = CameraIndex::Index(config.index);

        let fmt = CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::YUYV, // uncompressed; cheap to convert to RGB
            30,                // target FPS
        );

        // Ask for RGB frames, as close to our request as the device allows.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::CameraInit(format!("Create camera {}: {e}", config.index)))?;

        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        // The stream might pick a slightly different resolution.
        let actual = cam.resolution();
        log::info!(
            "Camera {} streaming at {}x{} (asked {}x{})",
            config.index,
            actual.width(),
            actual.height(),
            config.width,
            config.height
        );

        Ok(Self {
            cam,
            width: actual.width(),
            height: actual.height(),
            mirror: config.mirror,
        })
    }

    /// Grab one frame and convert it to 0x00RRGGBB pixels.
    /// Blocks until the camera delivers a new frame.
    pub fn next_frame(&mut self) -> Result<FrameBuffer, Error> {
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

        // Decode to ImageBuffer<Rgb<u8>, Vec<u8>> (handles the raw formats for us).
        let rgb_img = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let (w, h) = rgb_img.dimensions();
        let mut out = FrameBuffer::new(w as usize, h as usize);
        for (x, y, pixel) in rgb_img.enumerate_pixels() {
            let x = if self.mirror { w - 1 - x } else { x };
            let (r, g, b) = (pixel[0] as u32, pixel[1] as u32, pixel[2] as u32);
            out.pixels[y as usize * w as usize + x as usize] = (r << 16) | (g << 8) | b;
        }

        Ok(out)
    }

    /// The resolution the camera is actually delivering.
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
