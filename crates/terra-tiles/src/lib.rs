//! Map tiles: source descriptions, per-tile load state, imagery and the
//! surface mesh each tile is draped on.
//!
//! Fetching is abstracted behind [`TileLoader`], a non-blocking
//! request/poll interface. [`MockTileLoader`] synthesizes debug imagery
//! and [`DirectoryTileLoader`] reads encoded images from disk.

pub mod error;
pub mod imagery;
pub mod loader;
pub mod mesh;
pub mod source;
pub mod tile;

pub use error::TileError;
pub use imagery::{TILE_SIZE, TileImage};
pub use loader::{DirectoryTileLoader, LoadTicket, MockTileLoader, TileLoader};
pub use mesh::{DEFAULT_MESH_SEGMENTS, TileMesh, TileVertex};
pub use source::{MOCK_TILE_URL, TileSourceInfo, TileUrl};
pub use terra_geo::TileKey;
pub use tile::{Tile, TileData, TileStatus};
