//! Decoded tile imagery as tightly packed RGBA8.

use image::{Rgba, RgbaImage};
use terra_geo::TileKey;

use crate::TileError;

/// Edge length of a standard slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

const DEBUG_BACKGROUND: Rgba<u8> = Rgba([0x48, 0x48, 0x48, 0xff]);
const DEBUG_BORDER: Rgba<u8> = Rgba([0xff, 0x00, 0x00, 0xff]);
const DEBUG_BORDER_WIDTH: u32 = 4;

/// An RGBA8 tile image ready for texture upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl TileImage {
    /// Wrap an RGBA8 buffer, checking its length against the dimensions.
    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, TileError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected || expected == 0 {
            return Err(TileError::ImageSize {
                len: rgba.len(),
                expected,
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    /// Decode PNG or JPEG bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, TileError> {
        let img = image::load_from_memory(bytes)
            .map_err(TileError::Decode)?
            .to_rgba8();
        let (width, height) = img.dimensions();
        Self::from_rgba(width, height, img.into_raw())
    }

    /// Debug imagery: a dark gray square with a red border and a small
    /// per-tile marker whose shade varies with the tile address.
    pub fn debug_pattern(key: TileKey, size: u32) -> Self {
        let size = size.max(1);
        let border = DEBUG_BORDER_WIDTH.min(size / 2);
        let marker = Rgba([
            (key.x % 256) as u8,
            (key.y % 256) as u8,
            key.z.wrapping_mul(8),
            0xff,
        ]);
        let (lo, hi) = (size * 3 / 8, size * 5 / 8);
        let img = RgbaImage::from_fn(size, size, |x, y| {
            if x < border || y < border || x >= size - border || y >= size - border {
                DEBUG_BORDER
            } else if (lo..hi).contains(&x) && (lo..hi).contains(&y) {
                marker
            } else {
                DEBUG_BACKGROUND
            }
        });
        Self {
            width: size,
            height: size,
            rgba: img.into_raw(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major RGBA8 pixels, top row first.
    pub fn pixels(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.rgba[i..i + 4];
        Some([px[0], px[1], px[2], px[3]])
    }
}
