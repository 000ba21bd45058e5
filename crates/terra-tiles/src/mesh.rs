//! Surface mesh a tile's imagery is draped on.
//!
//! Vertex positions are `f32` offsets from the tile center, which is kept in
//! `f64`. Renderers translate by the center in double precision (or rebase
//! it against the eye) so centimeter detail survives at ECEF magnitudes.

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use terra_geo::{Geodetic, TileKey, surface_normal};

/// Grid resolution per tile edge used when none is configured.
pub const DEFAULT_MESH_SEGMENTS: u32 = 16;

/// Interleaved vertex: center-relative position, geodetic normal and
/// texture coordinate (`v = 0` at the tile's north edge).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct TileVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Non-indexed triangle list covering one tile.
#[derive(Clone, Debug)]
pub struct TileMesh {
    center: DVec3,
    vertices: Vec<TileVertex>,
}

impl TileMesh {
    /// Tessellate the tile into `segments x segments` quads, two triangles
    /// each. Rows are evenly spaced in Mercator so texels map linearly.
    pub fn build(key: TileKey, segments: u32) -> Self {
        let segments = segments.max(1);
        let center = key.center_ecef();
        let n = segments as usize + 1;
        let step = 1.0 / f64::from(segments);

        let mut grid = Vec::with_capacity(n * n);
        for row in 0..n {
            let v = row as f64 * step;
            for col in 0..n {
                let u = col as f64 * step;
                let p = key.surface_point(u, v);
                let geo = Geodetic::from_ecef(p);
                grid.push(TileVertex {
                    position: (p - center).as_vec3().to_array(),
                    normal: surface_normal(geo.lon_deg, geo.lat_deg)
                        .as_vec3()
                        .to_array(),
                    uv: [u as f32, v as f32],
                });
            }
        }

        let mut vertices = Vec::with_capacity(segments as usize * segments as usize * 6);
        for row in 0..segments as usize {
            for col in 0..segments as usize {
                let nw = grid[row * n + col];
                let ne = grid[row * n + col + 1];
                let sw = grid[(row + 1) * n + col];
                let se = grid[(row + 1) * n + col + 1];
                // Counter-clockwise seen from outside the globe.
                vertices.extend_from_slice(&[nw, sw, se, nw, se, ne]);
            }
        }

        Self { center, vertices }
    }

    /// Tile center in ECEF meters.
    pub fn center(&self) -> DVec3 {
        self.center
    }

    pub fn vertices(&self) -> &[TileVertex] {
        &self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// The vertex buffer as raw bytes for upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_stride() {
        assert_eq!(std::mem::size_of::<TileVertex>(), 32);
    }

    #[test]
    fn test_triangle_count_and_bytes() {
        let mesh = TileMesh::build(TileKey::new(3, 2, 2).unwrap(), 4);
        assert_eq!(mesh.triangle_count(), 4 * 4 * 2);
        assert_eq!(mesh.as_bytes().len(), mesh.vertices().len() * 32);
    }

    #[test]
    fn test_vertices_lie_on_surface() {
        let key = TileKey::new(5, 20, 11).unwrap();
        let mesh = TileMesh::build(key, 2);
        for v in mesh.vertices() {
            let p = mesh.center() + glam::Vec3::from_array(v.position).as_dvec3();
            let alt = Geodetic::from_ecef(p).alt_m;
            assert!(alt.abs() < 1.0, "altitude {alt}");
            let n = glam::Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        }
    }

    /// Triangles face away from the earth center.
    #[test]
    fn test_winding_faces_outward() {
        let mesh = TileMesh::build(TileKey::new(4, 3, 5).unwrap(), 3);
        for tri in mesh.vertices().chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|v| glam::Vec3::from_array(v.position));
            let face_normal = (b - a).cross(c - a);
            let outward = glam::Vec3::from_array(tri[0].normal);
            assert!(face_normal.dot(outward) > 0.0);
        }
    }

    #[test]
    fn test_zero_segments_is_clamped() {
        let mesh = TileMesh::build(TileKey::ROOT, 0);
        assert_eq!(mesh.triangle_count(), 2);
    }
}
