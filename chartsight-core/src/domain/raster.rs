//! Raster image — the opaque pixel buffer handed to the pipeline.
//!
//! Pixels are RGBA8, row-major, top-left origin. The core never mutates an
//! image; `set_pixel` exists for producers (renderers, capture adapters).

use serde::{Deserialize, Serialize};

/// Bytes per pixel (RGBA8).
pub const BYTES_PER_PIXEL: usize = 4;

/// A single opaque color sample. Alpha is ignored by every classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Rec. 601 luma in `[0, 255]`.
    pub fn luma(&self) -> f64 {
        0.299 * self.r as f64 + 0.587 * self.g as f64 + 0.114 * self.b as f64
    }

    pub fn max_channel(&self) -> u8 {
        self.r.max(self.g).max(self.b)
    }

    pub fn min_channel(&self) -> u8 {
        self.r.min(self.g).min(self.b)
    }

    /// Distance between the strongest and the second-strongest channel.
    pub fn dominance(&self) -> u8 {
        let mut channels = [self.r, self.g, self.b];
        channels.sort_unstable();
        channels[2] - channels[1]
    }
}

/// RGBA8 pixel buffer with explicit dimensions.
///
/// The buffer length is not trusted: a buffer shorter than
/// `width * height * 4` is accepted and the missing pixels read as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// An image filled with a single opaque color.
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        let count = width as usize * height as usize;
        let mut pixels = Vec::with_capacity(count * BYTES_PER_PIXEL);
        for _ in 0..count {
            pixels.extend_from_slice(&[color.r, color.g, color.b, 255]);
        }
        Self::new(width, height, pixels)
    }

    /// True when there is nothing to scan (zero area or empty buffer).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        (offset + 2 < self.pixels.len()).then_some(offset)
    }

    /// Color at `(x, y)`, or `None` outside the image or past a short buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        let offset = self.offset(x, y)?;
        Some(Rgb::new(
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
        ))
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if let Some(offset) = self.offset(x, y) {
            self.pixels[offset] = color.r;
            self.pixels[offset + 1] = color.g;
            self.pixels[offset + 2] = color.b;
            if offset + 3 < self.pixels.len() {
                self.pixels[offset + 3] = 255;
            }
        }
    }

    /// Fill the inclusive rectangle `[x0, x1] × [y0, y1]`, clipped to the image.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb) {
        for y in y0..=y1.min(self.height.saturating_sub(1)) {
            for x in x0..=x1.min(self.width.saturating_sub(1)) {
                self.set_pixel(x, y, color);
            }
        }
    }

    /// BLAKE3 content fingerprint over dimensions and pixel bytes.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.width.to_le_bytes());
        hasher.update(&self.height.to_le_bytes());
        hasher.update(&self.pixels);
        hasher.finalize().to_hex().to_string()
    }
}
