use std::f64::consts::PI;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use glam::DVec3;
use terra_geo::Geodetic;
use terra_lod::{FrameContext, LodParams, TileTree, provide, tile_screen_resolution};
use terra_scene::{Scene, SceneOptions, Viewport};
use terra_tiles::{MOCK_TILE_URL, MockTileLoader, TileKey, TileUrl};

fn scene_at(altitude: f64) -> Scene {
    Scene::new(SceneOptions {
        from: Geodetic::new(118.778869, 32.043823, altitude).to_ecef(),
        to: DVec3::ZERO,
        up: DVec3::Z,
        fovy: PI / 3.0,
        near: 10.0,
        far: 1.0e8,
        viewport: Viewport::new(1920.0, 1080.0).unwrap(),
    })
    .unwrap()
}

fn bench_warm_traversal(c: &mut Criterion) {
    for (name, altitude, level) in [
        ("traversal_orbit", 1.0e7, 3),
        ("traversal_regional", 1.0e6, 6),
        ("traversal_city", 2.0e4, 11),
    ] {
        let scene = scene_at(altitude);
        let ctx = FrameContext::from_scene(&scene).unwrap();
        let params = LodParams::default();
        let mut tree = TileTree::new(TileUrl::from(MOCK_TILE_URL)).with_mesh_segments(1);
        let mut loader = MockTileLoader::new(0).with_image_size(1);
        provide(&mut tree, level, &ctx, &params, &mut loader, |_, _| {});

        c.bench_function(name, |b| {
            b.iter(|| {
                let mut drawn = 0usize;
                let outcome = provide(
                    &mut tree,
                    black_box(level),
                    &ctx,
                    &params,
                    &mut loader,
                    |_, _| drawn += 1,
                );
                black_box((outcome, drawn))
            })
        });
    }
}

fn bench_screen_resolution(c: &mut Criterion) {
    let scene = scene_at(1.0e6);
    let m = scene.world_to_screen();
    let corners = TileKey::containing(118.778869, 32.043823, 8).corners_ecef();
    c.bench_function("tile_screen_resolution", |b| {
        b.iter(|| black_box(tile_screen_resolution(black_box(&corners), &m, 256.0)))
    });
}

criterion_group!(benches, bench_warm_traversal, bench_screen_resolution);
criterion_main!(benches);
