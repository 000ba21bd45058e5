//! Frustum-adaptive quadtree tile scheduling.
//!
//! Each frame, every active [`TileProvider`] walks its [`TileTree`] from the
//! root, culls tiles outside the view, picks a level of detail from the
//! camera altitude and the projected tile size, and reports the tiles that
//! should be drawn. A parent tile stands in for children that are still
//! loading, so the globe never shows holes while imagery streams in.
//! [`GlobeTiles`] drives all providers and hands the result to a
//! [`TileRenderer`].

mod driver;
mod level;
mod provider;
mod traversal;
mod tree;

pub use driver::{DrawParams, FrameStats, GlobeTiles, ProviderId, TileRenderer};
pub use level::{REFERENCE_TILE_SIZE, tile_level_for_altitude, zoom_for_altitude};
pub use provider::TileProvider;
pub use traversal::{
    FrameContext, LodParams, TraversalMode, TraversalOutcome, TraversalStats, provide,
    tile_screen_resolution,
};
pub use tree::{BufferHandle, GpuHandles, NodeId, TextureHandle, TileNode, TileTree};
