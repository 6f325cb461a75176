use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tilecast::bench::{
    split_into_tiles, upscale2x, EdgeFunctionRasterizer, Rasterizer, TileDispatcher,
};
use tilecast::geometry::reference_triangle;
use tilecast::math::Vec3;
use tilecast::texture::Texture;
use tilecast::{FrameBuffer, Scene, Triangle, DEPTH_CLEAR};

const BUFFER_WIDTH: u32 = 800;
const BUFFER_HEIGHT: u32 = 600;
const PIXELS: usize = (BUFFER_WIDTH * BUFFER_HEIGHT) as usize;

fn grid_scene() -> Scene {
    let mut scene = Scene::new(Texture::reference_checker());
    for row in 0..20 {
        for col in 0..20 {
            let x = col as f32 * 40.0;
            let y = row as f32 * 30.0;
            let depth = 0.1 + (row * 20 + col) as f32 / 400.0;
            scene
                .push(Triangle::new(
                    Vec3::new(x, y, depth),
                    Vec3::new(x + 17.5, y + 25.0, depth),
                    Vec3::new(x + 35.0, y, depth),
                ))
                .ok();
        }
    }
    scene
}

fn benchmark_single_tile(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_tile");
    let rasterizer = EdgeFunctionRasterizer::new();
    let texture = Texture::reference_checker();
    let triangle = reference_triangle();

    for tile_size in [16u32, 32, 64] {
        group.bench_with_input(
            BenchmarkId::new("edge_function", tile_size),
            &tile_size,
            |b, &tile_size| {
                let mut color = vec![0u32; PIXELS];
                let mut depth = vec![DEPTH_CLEAR; PIXELS];
                b.iter(|| {
                    depth.fill(DEPTH_CLEAR);
                    let mut targets = split_into_tiles(
                        &mut color,
                        &mut depth,
                        BUFFER_WIDTH,
                        BUFFER_HEIGHT,
                        tile_size,
                    );
                    // A tile in the middle of the reference triangle.
                    let middle = targets.len() / 2;
                    rasterizer.rasterize_tile(black_box(&triangle), &texture, &mut targets[middle])
                });
            },
        );
    }

    group.finish();
}

fn benchmark_full_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_frame");
    let rasterizer = EdgeFunctionRasterizer::new();

    for (name, scene) in [("reference", Scene::reference()), ("grid_400", grid_scene())] {
        for threads in [1usize, 8] {
            let dispatcher = TileDispatcher::new(threads, 32).unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{name}_threads"), threads),
                &scene,
                |b, scene| {
                    let mut color = vec![0u32; PIXELS];
                    let mut depth = vec![DEPTH_CLEAR; PIXELS];
                    b.iter(|| {
                        color.fill(0);
                        depth.fill(DEPTH_CLEAR);
                        dispatcher.rasterize(
                            &rasterizer,
                            black_box(scene),
                            &mut color,
                            &mut depth,
                            BUFFER_WIDTH,
                            BUFFER_HEIGHT,
                        )
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmark_upscale(c: &mut Criterion) {
    let src = FrameBuffer::new(BUFFER_WIDTH, BUFFER_HEIGHT, 0xFF00_FF00);
    let mut dst = FrameBuffer::new(BUFFER_WIDTH * 2, BUFFER_HEIGHT * 2, 0);
    c.bench_function("upscale2x_800x600", |b| {
        b.iter(|| upscale2x(black_box(&src), &mut dst));
    });
}

criterion_group!(benches, benchmark_single_tile, benchmark_full_frame, benchmark_upscale);
criterion_main!(benches);
