//! Errors produced while fetching or decoding a tile.

use terra_geo::TileKey;

#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// Level or coordinates out of range.
    #[error("invalid tile key {0}")]
    InvalidKey(TileKey),

    /// Reading the tile from disk failed.
    #[error("failed to read tile: {0}")]
    Io(#[source] std::io::Error),

    /// The tile bytes are not a decodable image.
    #[error("failed to decode tile image: {0}")]
    Decode(#[source] image::ImageError),

    /// Pixel buffer does not match the declared dimensions.
    #[error("tile image is {len} bytes, expected {expected} for {width}x{height} RGBA")]
    ImageSize {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    /// The loader has no outstanding request for this tile.
    #[error("no request pending for tile {0}")]
    Missing(TileKey),

    /// The loader refused or failed the request.
    #[error("tile request rejected: {0}")]
    Rejected(String),
}
