//! Slippy-map tile addressing (XYZ scheme) on the Web-Mercator square.
//!
//! Level `z` divides the square into a `2^z x 2^z` grid. `x` grows eastward
//! from longitude -180 and `y` grows southward from the northern clip
//! latitude.

use glam::{DVec2, DVec3};
use std::f64::consts::SQRT_2;

use crate::{
    EARTH_RADIUS, Geodetic, MERCATOR_HALF_EXTENT, geodetic_to_ecef, lonlat_to_mercator,
    mercator_y_to_lat,
};

/// Address of one tile in the global quadtree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level. Level 0 is the single root tile.
    pub z: u8,
    /// Column, `0..2^z`.
    pub x: u32,
    /// Row, `0..2^z`, counted from the north.
    pub y: u32,
}

/// Geographic bounding box of a tile, in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LonLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl TileKey {
    /// Deepest supported zoom level.
    pub const MAX_LEVEL: u8 = 30;

    /// The root tile covering the whole square.
    pub const ROOT: TileKey = TileKey { z: 0, x: 0, y: 0 };

    /// Construct a key, returning `None` when the level or the coordinates
    /// are out of range.
    #[must_use]
    pub fn new(z: u8, x: u32, y: u32) -> Option<Self> {
        let key = Self { z, x, y };
        key.is_valid().then_some(key)
    }

    /// Number of tiles along one axis at level `z`.
    #[must_use]
    pub fn grid_size(z: u8) -> u64 {
        1u64 << z.min(Self::MAX_LEVEL)
    }

    /// Whether the level and both coordinates are in range.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.z <= Self::MAX_LEVEL
            && u64::from(self.x) < Self::grid_size(self.z)
            && u64::from(self.y) < Self::grid_size(self.z)
    }

    /// The tile at the next coarser level. `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<TileKey> {
        if self.z == 0 {
            return None;
        }
        Some(TileKey {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The four tiles at the next finer level, in the order
    /// `(2x,2y), (2x+1,2y), (2x,2y+1), (2x+1,2y+1)`.
    ///
    /// Returns `None` at [`Self::MAX_LEVEL`].
    #[must_use]
    pub fn children(&self) -> Option<[TileKey; 4]> {
        if self.z >= Self::MAX_LEVEL {
            return None;
        }
        let z = self.z + 1;
        let cx = self.x * 2;
        let cy = self.y * 2;
        Some([
            TileKey { z, x: cx, y: cy },
            TileKey { z, x: cx + 1, y: cy },
            TileKey { z, x: cx, y: cy + 1 },
            TileKey {
                z,
                x: cx + 1,
                y: cy + 1,
            },
        ])
    }

    /// Position of this tile among its parent's [`children`](Self::children).
    #[must_use]
    pub fn child_index(&self) -> usize {
        (((self.y & 1) << 1) | (self.x & 1)) as usize
    }

    /// The ancestor (or self) at level `z`. `None` if `z` is deeper than
    /// this tile.
    #[must_use]
    pub fn ancestor_at(&self, z: u8) -> Option<TileKey> {
        if z > self.z {
            return None;
        }
        let shift = self.z - z;
        Some(TileKey {
            z,
            x: self.x >> shift,
            y: self.y >> shift,
        })
    }

    /// Whether `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &TileKey) -> bool {
        self.z < other.z && other.ancestor_at(self.z) == Some(*self)
    }

    /// The level-`z` tile containing the given longitude/latitude. Latitudes
    /// beyond the Mercator clip land in the first or last row.
    #[must_use]
    pub fn containing(lon_deg: f64, lat_deg: f64, z: u8) -> TileKey {
        let z = z.min(Self::MAX_LEVEL);
        let p = lonlat_to_mercator(lon_deg, lat_deg);
        let n = Self::grid_size(z) as f64;
        let span = 2.0 * MERCATOR_HALF_EXTENT / n;
        let max = Self::grid_size(z) - 1;
        let x = (((p.x + MERCATOR_HALF_EXTENT) / span).floor().max(0.0) as u64).min(max);
        let y = (((MERCATOR_HALF_EXTENT - p.y) / span).floor().max(0.0) as u64).min(max);
        TileKey {
            z,
            x: x as u32,
            y: y as u32,
        }
    }

    /// Web-Mercator extent `[xmin, ymin, xmax, ymax]` in meters.
    #[must_use]
    pub fn extent(&self) -> [f64; 4] {
        let span = 2.0 * MERCATOR_HALF_EXTENT / Self::grid_size(self.z) as f64;
        let xmin = -MERCATOR_HALF_EXTENT + f64::from(self.x) * span;
        let ymax = MERCATOR_HALF_EXTENT - f64::from(self.y) * span;
        [xmin, ymax - span, xmin + span, ymax]
    }

    /// Geographic bounds of the tile.
    #[must_use]
    pub fn lonlat_bounds(&self) -> LonLatBounds {
        let [xmin, ymin, xmax, ymax] = self.extent();
        LonLatBounds {
            west: (xmin / EARTH_RADIUS).to_degrees(),
            south: mercator_y_to_lat(ymin),
            east: (xmax / EARTH_RADIUS).to_degrees(),
            north: mercator_y_to_lat(ymax),
        }
    }

    /// Surface position at fractional tile coordinates `(u, v)`, where `u`
    /// runs west to east and `v` runs north to south, both in `[0, 1]`.
    /// Interpolation is linear in Mercator space, matching the imagery.
    #[must_use]
    pub fn surface_point(&self, u: f64, v: f64) -> DVec3 {
        let [xmin, ymin, xmax, ymax] = self.extent();
        let m = DVec2::new(xmin + (xmax - xmin) * u, ymax - (ymax - ymin) * v);
        let lon = (m.x / EARTH_RADIUS).to_degrees();
        geodetic_to_ecef(Geodetic::new(lon, mercator_y_to_lat(m.y), 0.0))
    }

    /// The four surface corners in cyclic order: north-west, north-east,
    /// south-east, south-west.
    #[must_use]
    pub fn corners_ecef(&self) -> [DVec3; 4] {
        [
            self.surface_point(0.0, 0.0),
            self.surface_point(1.0, 0.0),
            self.surface_point(1.0, 1.0),
            self.surface_point(0.0, 1.0),
        ]
    }

    /// An `n x n` grid of surface samples covering the tile, row-major from
    /// the north-west corner. `n` is at least 2.
    #[must_use]
    pub fn sample_grid_ecef(&self, n: usize) -> Vec<DVec3> {
        let n = n.max(2);
        let step = 1.0 / (n - 1) as f64;
        (0..n)
            .flat_map(|row| (0..n).map(move |col| (col as f64 * step, row as f64 * step)))
            .map(|(u, v)| self.surface_point(u, v))
            .collect()
    }

    /// Surface position of the tile center.
    #[must_use]
    pub fn center_ecef(&self) -> DVec3 {
        self.surface_point(0.5, 0.5)
    }

    /// Largest angular size of the tile along either axis, in radians.
    #[must_use]
    pub fn angular_span(&self) -> f64 {
        let b = self.lonlat_bounds();
        (b.east - b.west).max(b.north - b.south).to_radians()
    }

    /// Maximum height of the curved surface above the flat patch spanned by
    /// an `n x n` sample grid of this tile.
    #[must_use]
    pub fn sample_sagitta(&self, n: usize) -> f64 {
        let cells = n.max(2) - 1;
        let cell_diagonal = self.angular_span() / cells as f64 * SQRT_2;
        EARTH_RADIUS * (1.0 - (cell_diagonal * 0.5).min(std::f64::consts::PI).cos())
    }
}

impl std::fmt::Display for TileKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const NANJING: (f64, f64) = (118.767335, 32.050471);

    #[test]
    fn test_new_rejects_out_of_range() {
        assert!(TileKey::new(0, 0, 0).is_some());
        assert!(TileKey::new(2, 3, 3).is_some());
        assert!(TileKey::new(2, 4, 0).is_none());
        assert!(TileKey::new(2, 0, 4).is_none());
        assert!(TileKey::new(31, 0, 0).is_none());
    }

    #[test]
    fn test_children_order_and_parent() {
        let key = TileKey::new(3, 2, 5).unwrap();
        let children = key.children().unwrap();
        assert_eq!(children[0], TileKey { z: 4, x: 4, y: 10 });
        assert_eq!(children[1], TileKey { z: 4, x: 5, y: 10 });
        assert_eq!(children[2], TileKey { z: 4, x: 4, y: 11 });
        assert_eq!(children[3], TileKey { z: 4, x: 5, y: 11 });
        for (i, child) in children.iter().enumerate() {
            assert_eq!(child.parent(), Some(key));
            assert_eq!(child.child_index(), i);
        }
    }

    #[test]
    fn test_root_has_no_parent_and_max_level_has_no_children() {
        assert!(TileKey::ROOT.parent().is_none());
        let deep = TileKey::new(TileKey::MAX_LEVEL, 0, 0).unwrap();
        assert!(deep.children().is_none());
    }

    #[test]
    fn test_ancestors() {
        let key = TileKey::new(15, 27194, 13301).unwrap();
        assert_eq!(key.ancestor_at(0), Some(TileKey::ROOT));
        assert_eq!(key.ancestor_at(15), Some(key));
        assert_eq!(key.ancestor_at(16), None);
        let a6 = key.ancestor_at(6).unwrap();
        assert!(a6.is_ancestor_of(&key));
        assert!(!key.is_ancestor_of(&a6));
        assert!(!key.is_ancestor_of(&key));
    }

    #[test]
    fn test_containing_known_point() {
        let key = TileKey::containing(NANJING.0, NANJING.1, 15);
        assert_eq!(key, TileKey { z: 15, x: 27194, y: 13301 });
    }

    #[test]
    fn test_extent_contains_point() {
        let key = TileKey::containing(NANJING.0, NANJING.1, 15);
        let [xmin, ymin, xmax, ymax] = key.extent();
        let p = lonlat_to_mercator(NANJING.0, NANJING.1);
        assert!(xmin <= p.x && p.x <= xmax, "{xmin} <= {} <= {xmax}", p.x);
        assert!(ymin <= p.y && p.y <= ymax, "{ymin} <= {} <= {ymax}", p.y);
        assert!((xmin - 13_220_548.41).abs() < 0.1);
        assert!((ymax - 3_770_485.73).abs() < 0.1);
    }

    #[test]
    fn test_root_extent_is_mercator_square() {
        let [xmin, ymin, xmax, ymax] = TileKey::ROOT.extent();
        assert_eq!(xmin, -MERCATOR_HALF_EXTENT);
        assert_eq!(ymin, -MERCATOR_HALF_EXTENT);
        assert_eq!(xmax, MERCATOR_HALF_EXTENT);
        assert_eq!(ymax, MERCATOR_HALF_EXTENT);
    }

    #[test]
    fn test_containing_clamps_poles() {
        let north = TileKey::containing(0.0, 89.9, 4);
        let south = TileKey::containing(0.0, -89.9, 4);
        assert_eq!(north.y, 0);
        assert_eq!(south.y, 15);
        let east = TileKey::containing(180.0, 0.0, 4);
        assert_eq!(east.x, 15);
    }

    #[test]
    fn test_corners_are_cyclic_on_surface() {
        let key = TileKey::new(4, 12, 6).unwrap();
        let b = key.lonlat_bounds();
        let corners = key.corners_ecef();
        let nw = Geodetic::from_ecef(corners[0]);
        let se = Geodetic::from_ecef(corners[2]);
        assert!((nw.lon_deg - b.west).abs() < 1e-9);
        assert!((nw.lat_deg - b.north).abs() < 1e-9);
        assert!((se.lon_deg - b.east).abs() < 1e-9);
        assert!((se.lat_deg - b.south).abs() < 1e-9);
        for c in corners {
            assert!(Geodetic::from_ecef(c).alt_m.abs() < 1e-3);
        }
    }

    #[test]
    fn test_sample_grid() {
        let key = TileKey::new(2, 1, 1).unwrap();
        let samples = key.sample_grid_ecef(3);
        assert_eq!(samples.len(), 9);
        assert!((samples[4] - key.center_ecef()).length() < 1e-6);
        assert!((samples[0] - key.corners_ecef()[0]).length() < 1e-6);
        assert!((samples[8] - key.corners_ecef()[2]).length() < 1e-6);
    }

    #[test]
    fn test_sagitta_shrinks_with_level() {
        let coarse = TileKey::new(3, 1, 1).unwrap().sample_sagitta(3);
        let fine = TileKey::new(10, 1, 1).unwrap().sample_sagitta(3);
        assert!(coarse > fine);
        assert!(fine >= 0.0);
    }

    #[test]
    fn test_keys_hash_uniquely() {
        let keys: HashSet<TileKey> = TileKey::ROOT
            .children()
            .unwrap()
            .iter()
            .flat_map(|c| c.children().unwrap())
            .collect();
        assert_eq!(keys.len(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(TileKey::new(3, 4, 5).unwrap().to_string(), "3/4/5");
    }
}
