//! A renderer without a GPU. Handles are plain counters and draws are
//! recorded so runs can be inspected and summarised.

use glam::DVec3;
use terra_lod::{
    BufferHandle, DrawParams, FrameStats, GpuHandles, TextureHandle, TileRenderer,
};
use terra_tiles::{TileImage, TileKey, TileMesh};

/// One `draw_tile` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRecord {
    pub key: TileKey,
    pub opacity: f32,
    pub night: bool,
}

#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_handle: u64,
    live_buffers: usize,
    live_textures: usize,
    vertex_bytes: usize,
    total_draws: u64,
    frame: Vec<DrawRecord>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the draws of the previous frame.
    pub fn begin_frame(&mut self) {
        self.frame.clear();
    }

    /// Draws since the last [`begin_frame`](Self::begin_frame).
    pub fn frame_draws(&self) -> &[DrawRecord] {
        &self.frame
    }

    pub fn total_draws(&self) -> u64 {
        self.total_draws
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers
    }

    pub fn live_textures(&self) -> usize {
        self.live_textures
    }

    /// Vertex bytes uploaded over the renderer's lifetime.
    pub fn vertex_bytes(&self) -> usize {
        self.vertex_bytes
    }

    fn next(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl TileRenderer for HeadlessRenderer {
    fn create_vertex_buffer(&mut self, mesh: &TileMesh) -> BufferHandle {
        self.live_buffers += 1;
        self.vertex_bytes += mesh.as_bytes().len();
        BufferHandle(self.next())
    }

    fn create_texture(&mut self, _image: &TileImage) -> TextureHandle {
        self.live_textures += 1;
        TextureHandle(self.next())
    }

    fn draw_tile(&mut self, key: TileKey, _center: DVec3, _handles: GpuHandles, params: &DrawParams) {
        self.total_draws += 1;
        self.frame.push(DrawRecord {
            key,
            opacity: params.opacity,
            night: params.night,
        });
    }

    fn release(&mut self, handles: GpuHandles) {
        if handles.vertex_buffer.is_some() {
            self.live_buffers = self.live_buffers.saturating_sub(1);
        }
        if handles.texture.is_some() {
            self.live_textures = self.live_textures.saturating_sub(1);
        }
    }
}

/// Totals over a run of frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub frames: u64,
    pub skipped: u64,
    pub tiles_drawn: u64,
    pub peak_tiles: usize,
    /// Frames that drew at least one tile.
    pub frames_with_tiles: u64,
    pub fallbacks: u64,
    pub failed: u64,
    /// Loads still pending after the last frame.
    pub pending: usize,
}

impl RunSummary {
    pub fn record(&mut self, stats: &FrameStats) {
        self.frames += 1;
        if stats.skipped {
            self.skipped += 1;
        }
        self.tiles_drawn += stats.tiles_drawn as u64;
        self.peak_tiles = self.peak_tiles.max(stats.tiles_drawn);
        if stats.tiles_drawn > 0 {
            self.frames_with_tiles += 1;
        }
        self.fallbacks += stats.traversal.fallbacks as u64;
        self.failed += stats.traversal.failed as u64;
        self.pending = stats.traversal.pending;
    }

    /// Mean tiles per drawn frame.
    pub fn mean_tiles(&self) -> f64 {
        if self.frames_with_tiles == 0 {
            0.0
        } else {
            self.tiles_drawn as f64 / self.frames_with_tiles as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_lod::TraversalStats;

    #[test]
    fn test_handles_are_unique_and_released() {
        let mut renderer = HeadlessRenderer::new();
        let key = TileKey::new(1, 0, 0).unwrap();
        let mesh = TileMesh::build(key, 2);
        let image = TileImage::debug_pattern(key, 2);
        let buffer = renderer.create_vertex_buffer(&mesh);
        let texture = renderer.create_texture(&image);
        assert_ne!(buffer.0, texture.0);
        assert_eq!(renderer.live_buffers(), 1);
        assert_eq!(renderer.live_textures(), 1);
        assert_eq!(renderer.vertex_bytes(), mesh.as_bytes().len());

        renderer.release(GpuHandles {
            vertex_buffer: Some(buffer),
            texture: Some(texture),
        });
        assert_eq!(renderer.live_buffers(), 0);
        assert_eq!(renderer.live_textures(), 0);
    }

    #[test]
    fn test_begin_frame_clears_draws() {
        let mut renderer = HeadlessRenderer::new();
        let key = TileKey::new(0, 0, 0).unwrap();
        let params = DrawParams {
            opacity: 0.5,
            night: true,
        };
        renderer.draw_tile(key, DVec3::ZERO, GpuHandles::default(), &params);
        assert_eq!(
            renderer.frame_draws(),
            &[DrawRecord {
                key,
                opacity: 0.5,
                night: true
            }]
        );
        renderer.begin_frame();
        assert!(renderer.frame_draws().is_empty());
        assert_eq!(renderer.total_draws(), 1);
    }

    #[test]
    fn test_summary_accumulates() {
        let mut summary = RunSummary::default();
        summary.record(&FrameStats {
            skipped: true,
            ..FrameStats::default()
        });
        summary.record(&FrameStats {
            tiles_drawn: 12,
            traversal: TraversalStats {
                fallbacks: 2,
                pending: 4,
                ..TraversalStats::default()
            },
            ..FrameStats::default()
        });
        summary.record(&FrameStats {
            tiles_drawn: 20,
            ..FrameStats::default()
        });
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.tiles_drawn, 32);
        assert_eq!(summary.peak_tiles, 20);
        assert_eq!(summary.fallbacks, 2);
        assert_eq!(summary.pending, 0);
        assert!((summary.mean_tiles() - 16.0).abs() < 1e-12);
    }
}
