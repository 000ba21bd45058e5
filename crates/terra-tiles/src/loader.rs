//! Non-blocking tile fetching.
//!
//! A loader accepts requests and is polled once per frame for each pending
//! tile. Nothing here blocks the frame. One loader serves every provider, so
//! each request is answered through its own [`LoadTicket`].

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use terra_geo::TileKey;
use tracing::{debug, trace};

use crate::TileError;
use crate::TileImage;
use crate::imagery::TILE_SIZE;

/// Handle of one outstanding request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket {
    id: u64,
    key: TileKey,
}

impl LoadTicket {
    pub fn key(&self) -> TileKey {
        self.key
    }
}

/// Source of tile imagery.
pub trait TileLoader {
    /// Start fetching `key` from `url`. Two requests for the same tile,
    /// even from the same URL, get distinct tickets.
    fn request(&mut self, key: TileKey, url: &str) -> Result<LoadTicket, TileError>;

    /// `None` while the request is still in flight, otherwise the result.
    /// A completed ticket is forgotten after it has been returned once.
    fn poll(&mut self, ticket: LoadTicket) -> Option<Result<TileImage, TileError>>;
}

#[derive(Debug, Default)]
struct TicketCounter(u64);

impl TicketCounter {
    fn issue(&mut self, key: TileKey) -> LoadTicket {
        self.0 += 1;
        LoadTicket { id: self.0, key }
    }
}

/// Synthesizes [`TileImage::debug_pattern`] imagery after a configurable
/// number of polls. Individual tiles or whole levels can be made to fail
/// or to stay pending forever.
#[derive(Debug)]
pub struct MockTileLoader {
    latency: u32,
    image_size: u32,
    tickets: TicketCounter,
    pending: FxHashMap<LoadTicket, u32>,
    failing: FxHashSet<TileKey>,
    stalled: FxHashSet<TileKey>,
    fail_levels_above: Option<u8>,
}

impl MockTileLoader {
    /// A loader answering each request on the `latency`-th poll after it
    /// (zero answers on the first poll).
    pub fn new(latency: u32) -> Self {
        Self {
            latency,
            image_size: TILE_SIZE,
            tickets: TicketCounter::default(),
            pending: FxHashMap::default(),
            failing: FxHashSet::default(),
            stalled: FxHashSet::default(),
            fail_levels_above: None,
        }
    }

    /// Edge length of the generated images.
    pub fn with_image_size(mut self, size: u32) -> Self {
        self.image_size = size.max(1);
        self
    }

    /// Fail every tile deeper than `level`.
    pub fn with_fail_levels_above(mut self, level: Option<u8>) -> Self {
        self.fail_levels_above = level;
        self
    }

    /// Make one tile fail when it completes.
    pub fn fail_tile(&mut self, key: TileKey) {
        self.failing.insert(key);
    }

    /// Keep one tile pending until [`release`](Self::release) is called.
    pub fn stall_tile(&mut self, key: TileKey) {
        self.stalled.insert(key);
    }

    pub fn release(&mut self, key: TileKey) {
        self.stalled.remove(&key);
    }

    /// Total number of accepted requests.
    pub fn request_count(&self) -> u64 {
        self.tickets.0
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, ticket: LoadTicket) -> bool {
        self.pending.contains_key(&ticket)
    }

    fn should_fail(&self, key: TileKey) -> bool {
        self.failing.contains(&key) || self.fail_levels_above.is_some_and(|level| key.z > level)
    }
}

impl Default for MockTileLoader {
    fn default() -> Self {
        Self::new(0)
    }
}

impl TileLoader for MockTileLoader {
    fn request(&mut self, key: TileKey, url: &str) -> Result<LoadTicket, TileError> {
        if !key.is_valid() {
            return Err(TileError::InvalidKey(key));
        }
        let ticket = self.tickets.issue(key);
        trace!(%key, url, "mock tile requested");
        self.pending.insert(ticket, self.latency);
        Ok(ticket)
    }

    fn poll(&mut self, ticket: LoadTicket) -> Option<Result<TileImage, TileError>> {
        let key = ticket.key;
        if self.stalled.contains(&key) {
            return None;
        }
        let Some(remaining) = self.pending.get_mut(&ticket) else {
            return Some(Err(TileError::Missing(key)));
        };
        if *remaining > 0 {
            *remaining -= 1;
            return None;
        }
        self.pending.remove(&ticket);
        if self.should_fail(key) {
            return Some(Err(TileError::Rejected(format!("mock failure for {key}"))));
        }
        Some(Ok(TileImage::debug_pattern(key, self.image_size)))
    }
}

/// Reads tiles from the local filesystem. Resolved URLs are interpreted as
/// paths relative to a root directory. `file://` URLs are accepted, other
/// schemes are rejected.
#[derive(Debug)]
pub struct DirectoryTileLoader {
    root: PathBuf,
    tickets: TicketCounter,
    pending: FxHashMap<LoadTicket, PathBuf>,
}

impl DirectoryTileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tickets: TicketCounter::default(),
            pending: FxHashMap::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, url: &str) -> Result<PathBuf, TileError> {
        let relative = match url.split_once("://") {
            None => url,
            Some(("file", path)) => path,
            Some((scheme, _)) => {
                return Err(TileError::Rejected(format!(
                    "unsupported scheme {scheme}:// for directory loader"
                )));
            }
        };
        Ok(self.root.join(relative.trim_start_matches('/')))
    }
}

impl TileLoader for DirectoryTileLoader {
    fn request(&mut self, key: TileKey, url: &str) -> Result<LoadTicket, TileError> {
        if !key.is_valid() {
            return Err(TileError::InvalidKey(key));
        }
        let path = self.resolve_path(url)?;
        debug!(%key, path = %path.display(), "tile requested from disk");
        let ticket = self.tickets.issue(key);
        self.pending.insert(ticket, path);
        Ok(ticket)
    }

    fn poll(&mut self, ticket: LoadTicket) -> Option<Result<TileImage, TileError>> {
        let Some(path) = self.pending.remove(&ticket) else {
            return Some(Err(TileError::Missing(ticket.key)));
        };
        Some(
            std::fs::read(&path)
                .map_err(TileError::Io)
                .and_then(|bytes| TileImage::decode(&bytes)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn key(z: u8, x: u32, y: u32) -> TileKey {
        TileKey::new(z, x, y).unwrap()
    }

    #[test]
    fn test_mock_latency() {
        let mut loader = MockTileLoader::new(2).with_image_size(4);
        let ticket = loader.request(key(1, 0, 1), "mock://1/0/1").unwrap();
        assert!(loader.poll(ticket).is_none());
        assert!(loader.poll(ticket).is_none());
        let image = loader.poll(ticket).unwrap().unwrap();
        assert_eq!(image.width(), 4);
        assert!(!loader.is_pending(ticket));
        assert!(matches!(loader.poll(ticket), Some(Err(TileError::Missing(_)))));
    }

    /// Two providers asking for the same tile each get their own answer,
    /// whichever of them polls first.
    #[test]
    fn test_same_tile_requested_twice_is_answered_twice() {
        let mut loader = MockTileLoader::new(1).with_image_size(2);
        let k = key(3, 5, 2);
        let day = loader.request(k, "mock://3/5/2").unwrap();
        let night = loader.request(k, "mock://3/5/2").unwrap();
        assert_ne!(day, night);
        assert_eq!(loader.request_count(), 2);
        assert_eq!(loader.pending_count(), 2);

        assert!(loader.poll(night).is_none());
        assert!(loader.poll(night).unwrap().is_ok());
        assert!(loader.is_pending(day));
        assert!(loader.poll(day).is_none());
        assert!(loader.poll(day).unwrap().is_ok());
        assert_eq!(loader.pending_count(), 0);
    }

    #[test]
    fn test_mock_failures() {
        let mut loader = MockTileLoader::new(0)
            .with_image_size(2)
            .with_fail_levels_above(Some(3));
        let marked = key(2, 1, 1);
        loader.fail_tile(marked);
        let shallow = loader.request(key(3, 0, 0), "").unwrap();
        let deep = loader.request(key(4, 0, 0), "").unwrap();
        let marked = loader.request(marked, "").unwrap();
        assert!(loader.poll(shallow).unwrap().is_ok());
        assert!(matches!(loader.poll(deep), Some(Err(TileError::Rejected(_)))));
        assert!(loader.poll(marked).unwrap().is_err());
    }

    #[test]
    fn test_mock_stall_and_release() {
        let mut loader = MockTileLoader::new(0).with_image_size(2);
        let k = key(1, 1, 1);
        loader.stall_tile(k);
        let ticket = loader.request(k, "").unwrap();
        assert!(loader.poll(ticket).is_none());
        assert!(loader.poll(ticket).is_none());
        loader.release(k);
        assert!(loader.poll(ticket).unwrap().is_ok());
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let mut loader = MockTileLoader::new(0);
        let bad = TileKey { z: 1, x: 2, y: 0 };
        assert!(matches!(
            loader.request(bad, ""),
            Err(TileError::InvalidKey(_))
        ));
        assert_eq!(loader.request_count(), 0);
    }

    #[test]
    fn test_directory_loader_reads_png() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("2/1")).unwrap();
        RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255]))
            .save(dir.path().join("2/1/3.png"))
            .unwrap();

        let mut loader = DirectoryTileLoader::new(dir.path());
        let ticket = loader.request(key(2, 1, 3), "2/1/3.png").unwrap();
        let image = loader.poll(ticket).unwrap().unwrap();
        assert_eq!(image.pixel(7, 7), Some([1, 2, 3, 255]));
    }

    #[test]
    fn test_directory_loader_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut loader = DirectoryTileLoader::new(dir.path());
        let ticket = loader.request(key(1, 0, 0), "file:///1/0/0.png").unwrap();
        assert!(matches!(loader.poll(ticket), Some(Err(TileError::Io(_)))));
        assert!(matches!(loader.poll(ticket), Some(Err(TileError::Missing(_)))));
    }

    #[test]
    fn test_directory_loader_rejects_remote_urls() {
        let mut loader = DirectoryTileLoader::new("/tmp");
        let err = loader.request(key(1, 0, 0), "https://tile.openstreetmap.org/1/0/0.png");
        assert!(matches!(err, Err(TileError::Rejected(_))));
    }
}
