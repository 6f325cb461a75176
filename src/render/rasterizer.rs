//! Edge function rasterization of one triangle into one tile.
//!
//! # Edge Function
//!
//! For an edge from point A to point B, the edge function at point P is:
//!
//! ```text
//! E(P) = (P.x - A.x) * (B.y - A.y) - (P.y - A.y) * (B.x - A.x)
//! ```
//!
//! This is the 2D cross product (P - A) × (B - A). The three edges are
//! evaluated in the fixed order `(v1, v2)`, `(v2, v0)`, `(v0, v1)` and a pixel
//! is covered when all three values are `>= 0`, so pixels exactly on an edge
//! count as inside. Only counter-clockwise triangles (positive signed area)
//! pass that test, so [`EdgeFunctionRasterizer`] reverses clockwise input
//! before testing; see [`crate::geometry`] for the winding convention.
//!
//! # Sampling and depth
//!
//! Pixels are sampled at their integer coordinates `(x, y)`, not at pixel
//! centers. Every covered pixel gets the same depth: the mean of the three
//! vertex depths. Color comes from the texture at `(x mod w, y mod h)`.
//!
//! # References
//!
//! - Juan Pineda, "A Parallel Algorithm for Polygon Rasterization" (1988)

use std::ops::{Add, AddAssign};

use super::tile::TileTarget;
use crate::geometry::Triangle;
use crate::math::Vec3;
use crate::texture::Texture;

/// Computes the edge function value for point `p` relative to edge `a -> b`.
///
/// # Returns
///
/// - Positive: `p` is on the interior side of a counter-clockwise edge
/// - Negative: `p` is on the exterior side
/// - Zero: `p` lies exactly on the line through `a` and `b`
#[inline]
pub fn edge_function(a: Vec3, b: Vec3, p: Vec3) -> f32 {
    (p - a).perp_dot(b - a)
}

/// Pixel counts from rasterizing into one tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TileStats {
    /// Pixels inside the triangle.
    pub covered: usize,
    /// Covered pixels that also passed the depth test.
    pub written: usize,
}

impl Add for TileStats {
    type Output = TileStats;

    fn add(self, rhs: TileStats) -> TileStats {
        TileStats {
            covered: self.covered + rhs.covered,
            written: self.written + rhs.written,
        }
    }
}

impl AddAssign for TileStats {
    fn add_assign(&mut self, rhs: TileStats) {
        *self = *self + rhs;
    }
}

/// Trait for per-tile triangle rasterization.
///
/// Implementors must only touch pixels inside `target.tile()` and must never
/// fail; the dispatcher runs one call per tile on the worker pool.
pub trait Rasterizer: Sync {
    fn rasterize_tile(
        &self,
        triangle: &Triangle,
        texture: &Texture,
        target: &mut TileTarget<'_>,
    ) -> TileStats;
}

/// Triangle rasterizer using the edge function algorithm.
///
/// Clockwise triangles are reversed first, then every pixel of the tile is
/// tested against the three edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct EdgeFunctionRasterizer;

impl EdgeFunctionRasterizer {
    pub fn new() -> Self {
        EdgeFunctionRasterizer
    }

    /// Whether pixel `(x, y)` is covered by `triangle`.
    #[inline]
    pub fn covers(triangle: &Triangle, x: u32, y: u32) -> bool {
        let [v0, v1, v2] = triangle.vertices;
        let p = Vec3::new(x as f32, y as f32, 0.0);

        let w0 = edge_function(v1, v2, p);
        let w1 = edge_function(v2, v0, p);
        let w2 = edge_function(v0, v1, p);

        w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
    }
}

impl Rasterizer for EdgeFunctionRasterizer {
    fn rasterize_tile(
        &self,
        triangle: &Triangle,
        texture: &Texture,
        target: &mut TileTarget<'_>,
    ) -> TileStats {
        let tile = target.tile();
        let mut stats = TileStats::default();

        // ─────────────────────────────────────────────────────────────────
        // Step 1: Bring the triangle into canonical winding
        // ─────────────────────────────────────────────────────────────────
        // Clockwise input would fail every edge test; reversing it keeps the
        // covered region and the depth.
        let triangle = triangle.canonical();
        let depth = triangle.flat_depth();

        // ─────────────────────────────────────────────────────────────────
        // Step 2: Coverage, depth test, texture fetch over the whole tile
        // ─────────────────────────────────────────────────────────────────
        // No bounding-box shortcut: with far off-screen vertices, f32
        // rounding can put covered pixels outside any box derived from the
        // vertices.
        for y in tile.start_y..tile.end_y {
            for x in tile.start_x..tile.end_x {
                if !Self::covers(&triangle, x, y) {
                    continue;
                }
                stats.covered += 1;
                if target.depth_test_and_write(x, y, depth, || texture.sample_wrapped(x, y)) {
                    stats.written += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::reference_triangle;
    use crate::render::framebuffer::DEPTH_CLEAR;
    use crate::render::tile::split_into_tiles;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Coverage written out from the edge formula, independent of `covers`.
    fn inside(triangle: &Triangle, x: u32, y: u32) -> bool {
        let [v0, v1, v2] = triangle.vertices;
        let (px, py) = (x as f32, y as f32);
        let edge = |a: Vec3, b: Vec3| (px - a.x) * (b.y - a.y) - (py - a.y) * (b.x - a.x);
        edge(v1, v2) >= 0.0 && edge(v2, v0) >= 0.0 && edge(v0, v1) >= 0.0
    }

    fn rasterize_whole_frame(
        triangle: &Triangle,
        texture: &Texture,
        color: &mut [u32],
        depth: &mut [f32],
        width: u32,
        height: u32,
        tile_size: u32,
    ) -> TileStats {
        let rasterizer = EdgeFunctionRasterizer::new();
        split_into_tiles(color, depth, width, height, tile_size)
            .iter_mut()
            .map(|target| rasterizer.rasterize_tile(triangle, texture, target))
            .fold(TileStats::default(), |acc, s| acc + s)
    }

    #[test]
    fn test_edge_function_signs() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 0.0, 0.0);
        assert!(edge_function(a, b, Vec3::new(5.0, -1.0, 0.0)) > 0.0);
        assert!(edge_function(a, b, Vec3::new(5.0, 1.0, 0.0)) < 0.0);
        assert_relative_eq!(edge_function(a, b, Vec3::new(5.0, 0.0, 0.0)), 0.0);
    }

    #[test]
    fn test_covers_reference_triangle() {
        let tri = reference_triangle();
        assert!(EdgeFunctionRasterizer::covers(&tri, 400, 300));
        // Vertices and edges count as inside.
        assert!(EdgeFunctionRasterizer::covers(&tri, 400, 100));
        assert!(EdgeFunctionRasterizer::covers(&tri, 300, 500));
        assert!(!EdgeFunctionRasterizer::covers(&tri, 400, 99));
        assert!(!EdgeFunctionRasterizer::covers(&tri, 300, 501));
        assert!(!EdgeFunctionRasterizer::covers(&tri, 10, 10));
    }

    #[test]
    fn test_clockwise_triangle_covers_nothing() {
        let [v0, v1, v2] = reference_triangle().vertices;
        let cw = Triangle::new(v0, v2, v1);
        assert!(!EdgeFunctionRasterizer::covers(&cw, 400, 300));
    }

    #[test]
    fn test_tiled_result_matches_brute_force() {
        let (w, h) = (800u32, 600u32);
        let tri = reference_triangle();
        let tex = Texture::reference_checker();
        let mut color = vec![0u32; (w * h) as usize];
        let mut depth = vec![DEPTH_CLEAR; (w * h) as usize];

        let stats = rasterize_whole_frame(&tri, &tex, &mut color, &mut depth, w, h, 32);

        let mut expected_covered = 0;
        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                if inside(&tri, x, y) {
                    expected_covered += 1;
                    assert_eq!(color[idx], tex.sample_wrapped(x % 64, y % 64));
                    assert_relative_eq!(depth[idx], 0.5);
                } else {
                    assert_eq!(color[idx], 0);
                    assert_eq!(depth[idx], DEPTH_CLEAR);
                }
            }
        }
        assert!(expected_covered > 0);
        assert_eq!(stats.covered, expected_covered);
        assert_eq!(stats.written, expected_covered);
    }

    #[test]
    fn test_tile_size_does_not_change_output() {
        let (w, h) = (160u32, 120u32);
        let tri = Triangle::new(
            Vec3::new(80.0, 5.5, 0.3),
            Vec3::new(3.2, 117.0, 0.3),
            Vec3::new(150.7, 90.0, 0.3),
        );
        let tex = Texture::reference_checker();

        let render = |tile_size| {
            let mut color = vec![0u32; (w * h) as usize];
            let mut depth = vec![DEPTH_CLEAR; (w * h) as usize];
            rasterize_whole_frame(&tri, &tex, &mut color, &mut depth, w, h, tile_size);
            (color, depth)
        };
        let reference = render(1);
        for tile_size in [7, 16, 32, 200] {
            assert_eq!(render(tile_size), reference, "tile size {tile_size}");
        }
    }

    #[test]
    fn test_depth_test_keeps_nearest_triangle() {
        let (w, h) = (64u32, 64u32);
        let near = Triangle::new(
            Vec3::new(32.0, 0.0, 0.2),
            Vec3::new(0.0, 63.0, 0.2),
            Vec3::new(63.0, 63.0, 0.2),
        );
        let far = Triangle::new(
            Vec3::new(32.0, 0.0, 0.9),
            Vec3::new(0.0, 63.0, 0.9),
            Vec3::new(63.0, 63.0, 0.9),
        );
        let red = Texture::from_pixels(1, 1, vec![0xFFFF_0000]).unwrap();
        let blue = Texture::from_pixels(1, 1, vec![0xFF00_00FF]).unwrap();

        let mut color = vec![0u32; (w * h) as usize];
        let mut depth = vec![DEPTH_CLEAR; (w * h) as usize];
        rasterize_whole_frame(&near, &red, &mut color, &mut depth, w, h, 16);
        let stats = rasterize_whole_frame(&far, &blue, &mut color, &mut depth, w, h, 16);

        assert!(stats.covered > 0);
        assert_eq!(stats.written, 0);
        let center = (40 * w + 32) as usize;
        assert_eq!(color[center], 0xFFFF_0000);
        assert_relative_eq!(depth[center], 0.2);
    }

    #[test]
    fn test_triangle_outside_tile_is_skipped() {
        let tri = Triangle::new(
            Vec3::new(100.0, 100.0, 0.5),
            Vec3::new(90.0, 120.0, 0.5),
            Vec3::new(110.0, 120.0, 0.5),
        );
        let tex = Texture::reference_checker();
        let mut color = vec![0u32; 32 * 32];
        let mut depth = vec![DEPTH_CLEAR; 32 * 32];
        let stats = rasterize_whole_frame(&tri, &tex, &mut color, &mut depth, 32, 32, 32);
        assert_eq!(stats, TileStats::default());
    }

    #[test]
    fn test_covers_agrees_with_edge_formula() {
        let tri = reference_triangle();
        for y in (0..600).step_by(7) {
            for x in (0..800).step_by(5) {
                assert_eq!(EdgeFunctionRasterizer::covers(&tri, x, y), inside(&tri, x, y));
            }
        }
    }

    #[test]
    fn test_clockwise_triangle_is_rasterized_reversed() {
        let (w, h) = (800u32, 600u32);
        let tex = Texture::reference_checker();
        let [v0, v1, v2] = reference_triangle().vertices;

        let render = |tri: Triangle| {
            let mut color = vec![0u32; (w * h) as usize];
            let mut depth = vec![DEPTH_CLEAR; (w * h) as usize];
            let stats = rasterize_whole_frame(&tri, &tex, &mut color, &mut depth, w, h, 32);
            (stats, color)
        };
        let (ccw_stats, ccw_color) = render(reference_triangle());
        let (cw_stats, cw_color) = render(Triangle::new(v0, v2, v1));
        assert!(cw_stats.covered > 0);
        assert_eq!(cw_stats, ccw_stats);
        assert!(cw_color == ccw_color);
    }

    #[test]
    fn test_thin_triangles_with_far_vertices_match_full_scan() {
        let (w, h) = (64u32, 64u32);
        let tex = Texture::reference_checker();
        let mut rng = StdRng::seed_from_u64(0x7117_ca57);

        // Known case where a padded bounding box misses a covered pixel.
        let mut cases = vec![Triangle::new(
            Vec3::new(31.59, 46.84, 0.5),
            Vec3::new(2831.86, -4271.91, 0.5),
            Vec3::new(2832.55, -4273.07, 0.5),
        )];
        for _ in 0..2_000 {
            let apex = Vec3::new(rng.gen_range(0.0..64.0), rng.gen_range(0.0..64.0), 0.5);
            let far = Vec3::new(
                apex.x + rng.gen_range(-1.0e4..1.0e4),
                apex.y + rng.gen_range(-1.0e4..1.0e4),
                0.5,
            );
            let near_far = Vec3::new(
                far.x + rng.gen_range(-2.0..2.0),
                far.y + rng.gen_range(-2.0..2.0),
                0.5,
            );
            cases.push(Triangle::new(apex, far, near_far));
        }

        for tri in cases {
            let tri = tri.canonical();
            let expected = (0..h)
                .flat_map(|y| (0..w).map(move |x| (x, y)))
                .filter(|&(x, y)| inside(&tri, x, y))
                .count();
            for tile_size in [16, 64] {
                let mut color = vec![0u32; (w * h) as usize];
                let mut depth = vec![DEPTH_CLEAR; (w * h) as usize];
                let stats =
                    rasterize_whole_frame(&tri, &tex, &mut color, &mut depth, w, h, tile_size);
                assert_eq!(stats.covered, expected, "{:?} tile size {tile_size}", tri.vertices);
            }
        }
    }
}
