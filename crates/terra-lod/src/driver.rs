//! Per-frame driver over all registered tile providers.

use glam::DVec3;
use terra_geo::TileKey;
use terra_scene::{Camera, Scene};
use terra_tiles::{TileImage, TileLoader, TileMesh, TileSourceInfo};
use tracing::{debug, warn};

use crate::provider::TileProvider;
use crate::traversal::{FrameContext, TraversalStats};
use crate::tree::{BufferHandle, GpuHandles, TextureHandle};

/// Stable handle of a provider registered with [`GlobeTiles`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

/// Per-provider draw state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawParams {
    pub opacity: f32,
    pub night: bool,
}

/// GPU side of tile drawing.
pub trait TileRenderer {
    fn create_vertex_buffer(&mut self, mesh: &TileMesh) -> BufferHandle;

    fn create_texture(&mut self, image: &TileImage) -> TextureHandle;

    /// Draw one tile. `center` is the ECEF origin the mesh vertices are
    /// relative to.
    fn draw_tile(&mut self, key: TileKey, center: DVec3, handles: GpuHandles, params: &DrawParams);

    fn release(&mut self, handles: GpuHandles);
}

/// What one [`GlobeTiles::render_frame`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// The scene had no usable frustum; nothing was drawn.
    pub skipped: bool,
    pub providers_drawn: usize,
    pub tiles_drawn: usize,
    pub buffers_created: usize,
    pub textures_created: usize,
    pub released: usize,
    pub traversal: TraversalStats,
}

/// The ordered set of providers drawn onto the globe.
///
/// A default provider is installed at construction. Adding any non-night
/// provider parks it; [`add_default_provider`](Self::add_default_provider)
/// brings it back.
#[derive(Debug)]
pub struct GlobeTiles {
    providers: Vec<(ProviderId, TileProvider)>,
    parked_default: Option<TileProvider>,
    default_id: ProviderId,
    next_id: u64,
    night: bool,
    pending_release: Vec<GpuHandles>,
}

impl GlobeTiles {
    pub fn new(default_source: TileSourceInfo, camera: &Camera) -> Self {
        Self::with_default_provider(TileProvider::new(default_source, camera))
    }

    /// Install an already configured provider as the default one.
    pub fn with_default_provider(provider: TileProvider) -> Self {
        let default_id = ProviderId(0);
        Self {
            providers: vec![(default_id, provider)],
            parked_default: None,
            default_id,
            next_id: 1,
            night: false,
            pending_release: Vec::new(),
        }
    }

    /// Register a provider on top of the existing ones.
    pub fn add_provider(&mut self, provider: TileProvider) -> ProviderId {
        if !provider.is_night() {
            self.park_default();
        }
        let id = ProviderId(self.next_id);
        self.next_id += 1;
        self.providers.push((id, provider));
        id
    }

    /// Build and register a provider for `source`.
    pub fn add_source(&mut self, source: TileSourceInfo, camera: &Camera) -> ProviderId {
        self.add_provider(TileProvider::new(source, camera))
    }

    /// Unregister a provider. Its GPU resources are released on the next
    /// frame. Removing the default provider parks it instead and returns
    /// `None`.
    pub fn remove_provider(&mut self, id: ProviderId) -> Option<TileProvider> {
        if id == self.default_id {
            self.park_default();
            return None;
        }
        let pos = self.providers.iter().position(|(pid, _)| *pid == id)?;
        let (_, mut provider) = self.providers.remove(pos);
        self.pending_release.extend(provider.release_gpu_resources());
        Some(provider)
    }

    /// Put the default provider back on top if it was parked.
    pub fn add_default_provider(&mut self) -> bool {
        match self.parked_default.take() {
            Some(provider) => {
                self.providers.push((self.default_id, provider));
                true
            }
            None => false,
        }
    }

    /// Remove every provider, parking the default one.
    pub fn clear(&mut self) {
        self.park_default();
        for (_, mut provider) in self.providers.drain(..) {
            self.pending_release.extend(provider.release_gpu_resources());
        }
    }

    fn park_default(&mut self) {
        let Some(pos) = self.providers.iter().position(|(id, _)| *id == self.default_id) else {
            return;
        };
        let (_, mut provider) = self.providers.remove(pos);
        self.pending_release.extend(provider.release_gpu_resources());
        self.parked_default = Some(provider);
    }

    pub fn default_id(&self) -> ProviderId {
        self.default_id
    }

    pub fn is_default_active(&self) -> bool {
        self.parked_default.is_none()
    }

    pub fn provider(&self, id: ProviderId) -> Option<&TileProvider> {
        self.providers
            .iter()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
    }

    pub fn provider_mut(&mut self, id: ProviderId) -> Option<&mut TileProvider> {
        self.providers
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
    }

    /// Active providers in draw order.
    pub fn provider_ids(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.providers.iter().map(|(id, _)| *id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn is_night(&self) -> bool {
        self.night
    }

    pub fn set_night(&mut self, night: bool) {
        self.night = night;
    }

    /// Point an active provider at another source.
    pub fn change_tile_source(&mut self, id: ProviderId, source: TileSourceInfo) -> bool {
        let Some(provider) = self
            .providers
            .iter_mut()
            .find(|(pid, _)| *pid == id)
            .map(|(_, p)| p)
        else {
            return false;
        };
        let released = provider.change_tile_source(source);
        self.pending_release.extend(released);
        true
    }

    /// Schedule and draw one frame.
    ///
    /// The scene must have been refreshed since its last change; otherwise
    /// the frame is skipped.
    pub fn render_frame(
        &mut self,
        scene: &Scene,
        loader: &mut dyn TileLoader,
        renderer: &mut dyn TileRenderer,
    ) -> FrameStats {
        let mut stats = FrameStats::default();
        for handles in self.pending_release.drain(..) {
            renderer.release(handles);
            stats.released += 1;
        }

        let ctx = match FrameContext::from_scene(scene) {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("skipping tile frame: {e}");
                stats.skipped = true;
                return stats;
            }
        };

        let night = self.night;
        for (id, provider) in &mut self.providers {
            if provider.is_stopped() || (provider.is_night() && !night) {
                continue;
            }
            provider.update(scene.camera());
            for handles in provider.take_stale_gpu() {
                renderer.release(handles);
                stats.released += 1;
            }

            let mut renderable = Vec::new();
            let outcome = provider.provide(&ctx, loader, |node_id, _| renderable.push(node_id));
            stats.traversal.merge(&outcome.stats);

            let params = DrawParams {
                opacity: provider.opacity(),
                night: provider.is_night(),
            };
            let tree = provider.tree_mut();
            for node_id in renderable {
                let node = tree.node_mut(node_id);
                let Some(data) = node.tile.as_ref().and_then(|t| t.data()) else {
                    continue;
                };
                if node.gpu.vertex_buffer.is_none() {
                    node.gpu.vertex_buffer = Some(renderer.create_vertex_buffer(&data.mesh));
                    stats.buffers_created += 1;
                }
                if node.gpu.texture.is_none() {
                    node.gpu.texture = Some(renderer.create_texture(&data.image));
                    stats.textures_created += 1;
                }
                renderer.draw_tile(node.key, data.mesh.center(), node.gpu, &params);
                stats.tiles_drawn += 1;
            }
            stats.providers_drawn += 1;
            debug!(
                provider = ?id,
                level = provider.level(),
                rendered = outcome.stats.rendered,
                fallbacks = outcome.stats.fallbacks,
                pending = outcome.stats.pending,
                "provider traversed"
            );
        }
        stats
    }
}
