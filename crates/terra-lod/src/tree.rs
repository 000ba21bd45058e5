//! Quadtree of tiles for one imagery source, stored as an arena.
//!
//! Nodes are addressed by [`NodeId`] and never removed; a tree only grows
//! until it is dropped as a whole (for example on a tile source change).

use rustc_hash::FxHashMap;
use terra_geo::TileKey;
use terra_tiles::{Tile, TileUrl};
use tracing::warn;

/// Index of a node inside its [`TileTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Renderer-side vertex buffer handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Renderer-side texture handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// GPU resources attached to a node. Created lazily by the driver the
/// first time the node is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GpuHandles {
    pub vertex_buffer: Option<BufferHandle>,
    pub texture: Option<TextureHandle>,
}

impl GpuHandles {
    pub fn is_empty(&self) -> bool {
        self.vertex_buffer.is_none() && self.texture.is_none()
    }
}

/// One quadrant of the tree.
#[derive(Debug)]
pub struct TileNode {
    pub(crate) key: TileKey,
    pub(crate) tile: Option<Tile>,
    pub(crate) children: Option<[NodeId; 4]>,
    pub(crate) gpu: GpuHandles,
}

impl TileNode {
    fn new(key: TileKey) -> Self {
        Self {
            key,
            tile: None,
            children: None,
            gpu: GpuHandles::default(),
        }
    }

    pub fn key(&self) -> TileKey {
        self.key
    }

    /// The tile payload, if one has been created or inserted.
    pub fn tile(&self) -> Option<&Tile> {
        self.tile.as_ref()
    }

    /// Children in the order `(2x,2y) (2x+1,2y) (2x,2y+1) (2x+1,2y+1)`.
    pub fn children(&self) -> Option<[NodeId; 4]> {
        self.children
    }

    pub fn gpu(&self) -> GpuHandles {
        self.gpu
    }

    pub fn is_ready(&self) -> bool {
        self.tile.as_ref().is_some_and(Tile::is_ready)
    }
}

/// Arena-backed tile quadtree rooted at `0/0/0`.
#[derive(Debug)]
pub struct TileTree {
    url: TileUrl,
    mesh_segments: Option<u32>,
    nodes: Vec<TileNode>,
    index: FxHashMap<TileKey, NodeId>,
    stale_gpu: Vec<GpuHandles>,
}

impl TileTree {
    pub fn new(url: TileUrl) -> Self {
        let mut index = FxHashMap::default();
        index.insert(TileKey::ROOT, NodeId(0));
        Self {
            url,
            mesh_segments: None,
            nodes: vec![TileNode::new(TileKey::ROOT)],
            index,
            stale_gpu: Vec::new(),
        }
    }

    /// Mesh resolution for tiles the tree creates itself.
    pub fn with_mesh_segments(mut self, segments: u32) -> Self {
        self.mesh_segments = Some(segments);
        self
    }

    pub fn url(&self) -> &TileUrl {
        &self.url
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, the root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by a different tree.
    pub fn node(&self, id: NodeId) -> &TileNode {
        &self.nodes[id.index()]
    }

    /// # Panics
    ///
    /// Panics if `id` was issued by a different tree.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TileNode {
        &mut self.nodes[id.index()]
    }

    /// The node at exactly `key`, if the tree has grown that far.
    pub fn get_tile_node(&self, key: TileKey) -> Option<NodeId> {
        self.index.get(&key).copied()
    }

    /// Insert a tile at its address, subdividing from the root down as
    /// needed. A tile already stored there is replaced and its GPU
    /// resources are queued for release.
    pub fn add_tile(&mut self, tile: Tile) -> Option<NodeId> {
        let key = tile.key();
        if !key.is_valid() {
            warn!(%key, "tile address outside the quadtree, not inserted");
            return None;
        }
        let mut id = self.root();
        for z in 1..=key.z {
            let step = key.ancestor_at(z)?;
            let children = self.ensure_children(id)?;
            id = children[step.child_index()];
        }
        let node = self.node_mut(id);
        let old = std::mem::take(&mut node.gpu);
        node.tile = Some(tile);
        if !old.is_empty() {
            self.stale_gpu.push(old);
        }
        Some(id)
    }

    /// Create the four children of `id` if they do not exist yet. `None` at
    /// the deepest level.
    pub fn ensure_children(&mut self, id: NodeId) -> Option<[NodeId; 4]> {
        let node = self.node(id);
        if let Some(children) = node.children {
            return Some(children);
        }
        let keys = node.key.children()?;
        let children = keys.map(|key| {
            let child = NodeId(self.nodes.len() as u32);
            self.nodes.push(TileNode::new(key));
            self.index.insert(key, child);
            child
        });
        self.node_mut(id).children = Some(children);
        Some(children)
    }

    /// The node's tile, created from the tree's URL on first access.
    pub fn ensure_tile(&mut self, id: NodeId) -> &mut Tile {
        let url = &self.url;
        let mesh_segments = self.mesh_segments;
        let node = &mut self.nodes[id.index()];
        let key = node.key;
        node.tile.get_or_insert_with(|| {
            let tile = Tile::new(url, key);
            match mesh_segments {
                Some(segments) => tile.with_mesh_segments(segments),
                None => tile,
            }
        })
    }

    /// Visit every node, parents before children.
    pub fn for_each_node(&self, mut f: impl FnMut(NodeId, &TileNode)) {
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = self.node(id);
            f(id, node);
            if let Some(children) = node.children {
                stack.extend(children.iter().rev());
            }
        }
    }

    /// Visit every existing node at level `z`.
    pub fn for_each_node_at_level(&self, z: u8, mut f: impl FnMut(NodeId, &TileNode)) {
        self.for_each_node(|id, node| {
            if node.key.z == z {
                f(id, node);
            }
        });
    }

    /// Detach every GPU handle in the tree, including ones queued by
    /// [`add_tile`](Self::add_tile). The caller releases them.
    pub fn release_gpu_resources(&mut self) -> Vec<GpuHandles> {
        let mut released = std::mem::take(&mut self.stale_gpu);
        for node in &mut self.nodes {
            let gpu = std::mem::take(&mut node.gpu);
            if !gpu.is_empty() {
                released.push(gpu);
            }
        }
        released
    }

    /// Handles detached from replaced tiles since the last call.
    pub fn take_stale_gpu(&mut self) -> Vec<GpuHandles> {
        std::mem::take(&mut self.stale_gpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> TileUrl {
        TileUrl::from("mock://{x}/{y}/{z}")
    }

    fn key(z: u8, x: u32, y: u32) -> TileKey {
        TileKey::new(z, x, y).unwrap()
    }

    /// Inserting one level-1 tile splits the root and stores the tile on
    /// exactly one of the four new nodes.
    #[test]
    fn test_add_tile_subdivides_root() {
        let mut tree = TileTree::new(url());
        let id = tree.add_tile(Tile::new(&url(), key(1, 0, 0))).unwrap();

        assert_eq!(tree.node(tree.root()).children().map(|c| c.len()), Some(4));
        assert_eq!(tree.get_tile_node(key(1, 0, 0)), Some(id));
        let stored = tree.node(id).tile().unwrap();
        assert_eq!(stored.key(), key(1, 0, 0));
        assert_eq!(stored.url(), "mock://0/0/1");

        let mut visited = 0;
        let mut with_tile = 0;
        tree.for_each_node_at_level(1, |_, node| {
            visited += 1;
            if node.tile().is_some() {
                with_tile += 1;
            }
        });
        assert_eq!(visited, 4);
        assert_eq!(with_tile, 1);
    }

    #[test]
    fn test_add_deep_tile_creates_path() {
        let mut tree = TileTree::new(url());
        let deep = key(15, 27194, 13301);
        let id = tree.add_tile(Tile::new(&url(), deep)).unwrap();
        assert_eq!(tree.node(id).key(), deep);
        assert_eq!(tree.node_count(), 1 + 15 * 4);
        for z in 0..15 {
            let ancestor = deep.ancestor_at(z).unwrap();
            assert!(tree.get_tile_node(ancestor).is_some(), "missing {ancestor}");
        }
        assert!(tree.get_tile_node(key(15, 0, 0)).is_none());
        assert!(tree.get_tile_node(key(16, 0, 0)).is_none());
    }

    #[test]
    fn test_add_invalid_tile_is_rejected() {
        let mut tree = TileTree::new(url());
        let bad = TileKey { z: 2, x: 4, y: 0 };
        assert!(tree.add_tile(Tile::new(&url(), bad)).is_none());
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn test_for_each_is_preorder() {
        let mut tree = TileTree::new(url());
        tree.add_tile(Tile::new(&url(), key(2, 3, 3))).unwrap();
        let mut order = Vec::new();
        tree.for_each_node(|_, node| order.push(node.key()));
        assert_eq!(order.len(), 9);
        assert_eq!(order[0], TileKey::ROOT);
        assert_eq!(order[1], key(1, 0, 0));
        for (i, k) in order.iter().enumerate() {
            if let Some(parent) = k.parent() {
                let parent_pos = order.iter().position(|p| *p == parent).unwrap();
                assert!(parent_pos < i, "{parent} visited after {k}");
            }
        }
    }

    #[test]
    fn test_ensure_children_is_stable() {
        let mut tree = TileTree::new(url());
        let root = tree.root();
        let first = tree.ensure_children(root).unwrap();
        let second = tree.ensure_children(root).unwrap();
        assert_eq!(first, second);
        let keys = first.map(|id| tree.node(id).key());
        assert_eq!(keys, TileKey::ROOT.children().unwrap());
    }

    #[test]
    fn test_ensure_tile_is_lazy() {
        let mut tree = TileTree::new(url()).with_mesh_segments(2);
        let root = tree.root();
        assert!(tree.node(root).tile().is_none());
        assert_eq!(tree.ensure_tile(root).url(), "mock://0/0/0");
        assert!(tree.node(root).tile().is_some());
    }

    #[test]
    fn test_replacing_tile_queues_gpu_release() {
        let mut tree = TileTree::new(url());
        let k = key(1, 1, 1);
        let id = tree.add_tile(Tile::new(&url(), k)).unwrap();
        tree.node_mut(id).gpu = GpuHandles {
            vertex_buffer: Some(BufferHandle(7)),
            texture: Some(TextureHandle(8)),
        };
        tree.add_tile(Tile::new(&url(), k)).unwrap();
        assert!(tree.node(id).gpu().is_empty());
        let stale = tree.take_stale_gpu();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].texture, Some(TextureHandle(8)));
        assert!(tree.take_stale_gpu().is_empty());
    }

    #[test]
    fn test_release_gpu_resources() {
        let mut tree = TileTree::new(url());
        let children = tree.ensure_children(tree.root()).unwrap();
        tree.node_mut(children[0]).gpu.vertex_buffer = Some(BufferHandle(1));
        tree.node_mut(children[3]).gpu.texture = Some(TextureHandle(2));
        let released = tree.release_gpu_resources();
        assert_eq!(released.len(), 2);
        assert!(tree.release_gpu_resources().is_empty());
    }
}
