//! Tile source descriptions and URL templating.

use std::fmt;
use std::sync::Arc;

use terra_geo::TileKey;

/// URL template served by [`MockTileLoader`](crate::MockTileLoader).
pub const MOCK_TILE_URL: &str = "mock://{x}/{y}/{z}";

/// Where a tile's imagery lives: a template with `{x}`, `{y}` and `{z}`
/// placeholders, or a function of the tile coordinates.
#[derive(Clone)]
pub enum TileUrl {
    Template(String),
    Function(Arc<dyn Fn(u32, u32, u8) -> String + Send + Sync>),
}

impl TileUrl {
    /// Build a function URL.
    pub fn from_fn(f: impl Fn(u32, u32, u8) -> String + Send + Sync + 'static) -> Self {
        Self::Function(Arc::new(f))
    }

    /// The concrete URL of one tile.
    pub fn resolve(&self, key: TileKey) -> String {
        match self {
            TileUrl::Template(template) => template
                .replace("{x}", &key.x.to_string())
                .replace("{y}", &key.y.to_string())
                .replace("{z}", &key.z.to_string()),
            TileUrl::Function(f) => f(key.x, key.y, key.z),
        }
    }
}

impl fmt::Debug for TileUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileUrl::Template(template) => f.debug_tuple("Template").field(template).finish(),
            TileUrl::Function(_) => f.write_str("Function(..)"),
        }
    }
}

impl From<&str> for TileUrl {
    fn from(template: &str) -> Self {
        TileUrl::Template(template.to_owned())
    }
}

impl From<String> for TileUrl {
    fn from(template: String) -> Self {
        TileUrl::Template(template)
    }
}

/// A named imagery source and the zoom range it serves.
#[derive(Clone, Debug)]
pub struct TileSourceInfo {
    pub name: String,
    pub url: TileUrl,
    pub min_level: u8,
    pub max_level: u8,
    /// Drawn only while the globe is in night mode.
    pub night: bool,
}

/// `(id, display name, template, min level, max level)` of the built-in
/// sources.
const BUILTIN_SOURCES: &[(&str, &str, &str, u8, u8)] = &[
    ("debug", "Debug Tile", MOCK_TILE_URL, 0, 20),
    (
        "osm",
        "OSM",
        "http://tile.openstreetmap.org/{z}/{x}/{y}.png",
        1,
        20,
    ),
    (
        "esri-imagery",
        "ESRI Imagery",
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        1,
        20,
    ),
    (
        "esri-topo",
        "ESRI TOPO",
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Topo_Map/MapServer/tile/{z}/{y}/{x}",
        1,
        20,
    ),
    (
        "google-imagery",
        "Google Imagery",
        "https://mt1.google.com/vt/lyrs=s&x={x}&y={y}&z={z}",
        1,
        20,
    ),
    (
        "carto-light",
        "CARTODB LIGHT ALL",
        "https://a.basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
        1,
        20,
    ),
    (
        "carto-dark",
        "CARTODB DARK ALL",
        "https://a.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
        1,
        20,
    ),
];

impl TileSourceInfo {
    /// Create a source. A reversed level range is swapped and levels are
    /// capped at [`TileKey::MAX_LEVEL`].
    pub fn new(name: impl Into<String>, url: impl Into<TileUrl>, min_level: u8, max_level: u8) -> Self {
        let (lo, hi) = if min_level <= max_level {
            (min_level, max_level)
        } else {
            (max_level, min_level)
        };
        Self {
            name: name.into(),
            url: url.into(),
            min_level: lo.min(TileKey::MAX_LEVEL),
            max_level: hi.min(TileKey::MAX_LEVEL),
            night: false,
        }
    }

    /// Mark the source as night-only imagery.
    pub fn with_night(mut self, night: bool) -> Self {
        self.night = night;
        self
    }

    /// Look up a built-in source by id (`debug`, `osm`, `esri-imagery`,
    /// `esri-topo`, `google-imagery`, `carto-light`, `carto-dark`).
    pub fn builtin(id: &str) -> Option<Self> {
        BUILTIN_SOURCES
            .iter()
            .find(|(builtin_id, ..)| builtin_id.eq_ignore_ascii_case(id))
            .map(|&(_, name, url, min, max)| Self::new(name, url, min, max))
    }

    /// Ids accepted by [`builtin`](Self::builtin).
    pub fn builtin_ids() -> impl Iterator<Item = &'static str> {
        BUILTIN_SOURCES.iter().map(|(id, ..)| *id)
    }

    /// The mock debug source.
    pub fn debug() -> Self {
        Self::new("Debug Tile", MOCK_TILE_URL, 0, 20)
    }
}
