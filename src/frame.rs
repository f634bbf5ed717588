//! Sampling pixel data out of a live video source.

use image::{DynamicImage, RgbaImage};

/// A live video feed, or anything that can stand in for one.
pub trait VideoSource: Send {
    /// Natural frame size. `(0, 0)` while the stream has no frame yet.
    fn dimensions(&self) -> (u32, u32);

    /// Draws the current frame into `rgba`, which is exactly
    /// `width * height * 4` bytes for the size last reported by
    /// [`dimensions`](Self::dimensions).
    fn draw_rgba(&mut self, rgba: &mut [u8]);

    /// Stops the underlying stream. Called once when a scan session ends.
    fn release(&mut self) {}
}

/// One sampled frame: RGBA bytes, row-major, `width * height * 4` long.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LuminanceFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl LuminanceFrame {
    /// Wraps an RGBA buffer. Returns `None` if the length does not match.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if rgba.len() != width as usize * height as usize * 4 {
            return None;
        }
        Some(Self { width, height, rgba })
    }

    /// Builds an opaque frame from 8-bit gray samples.
    pub fn from_luma(width: u32, height: u32, luma: &[u8]) -> Option<Self> {
        if luma.len() != width as usize * height as usize {
            return None;
        }
        let rgba = luma.iter().flat_map(|&v| [v, v, v, 255]).collect();
        Some(Self { width, height, rgba })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    /// Luminance at (`x`, `y`), ITU-R BT.601 weights in integer math.
    #[inline]
    pub fn luma(&self, x: u32, y: u32) -> u8 {
        let base = (y as usize * self.width as usize + x as usize) * 4;
        luminance(self.rgba[base], self.rgba[base + 1], self.rgba[base + 2])
    }

    /// The whole frame as a row-major luminance buffer.
    pub fn to_luma(&self) -> Vec<u8> {
        self.rgba
            .chunks_exact(4)
            .map(|px| luminance(px[0], px[1], px[2]))
            .collect()
    }
}

#[inline]
fn luminance(r: u8, g: u8, b: u8) -> u8 {
    // 0.299R + 0.587G + 0.114B as (77R + 150G + 29B) >> 8
    ((77 * u32::from(r) + 150 * u32::from(g) + 29 * u32::from(b)) >> 8) as u8
}

/// Copies the current frame of a [`VideoSource`] into a fresh
/// [`LuminanceFrame`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameSampler;

impl FrameSampler {
    pub fn new() -> Self {
        Self
    }

    /// Samples one frame. Returns `None` while the source has no frame.
    ///
    /// Every call draws into its own scratch buffer, which becomes the
    /// returned frame; nothing is retained between calls.
    pub fn sample(&self, video: &mut dyn VideoSource) -> Option<LuminanceFrame> {
        let (width, height) = video.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        let mut scratch = vec![0u8; width as usize * height as usize * 4];
        video.draw_rgba(&mut scratch);
        Some(LuminanceFrame {
            width,
            height,
            rgba: scratch,
        })
    }
}

/// A single still image posing as a video source.
#[derive(Clone, Debug)]
pub struct StillSource {
    frame: RgbaImage,
    released: bool,
}

impl StillSource {
    pub fn new(image: DynamicImage) -> Self {
        Self {
            frame: image.to_rgba8(),
            released: false,
        }
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        Ok(Self::new(image::open(path)?))
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl VideoSource for StillSource {
    fn dimensions(&self) -> (u32, u32) {
        if self.released {
            return (0, 0);
        }
        self.frame.dimensions()
    }

    fn draw_rgba(&mut self, rgba: &mut [u8]) {
        rgba.copy_from_slice(self.frame.as_raw());
    }

    fn release(&mut self) {
        self.released = true;
    }
}
