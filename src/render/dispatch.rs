//! Parallel fan-out of tile rasterization.
//!
//! One task per tile runs on a persistent rayon pool owned by the
//! dispatcher. [`TileDispatcher::rasterize`] only returns after every tile
//! task has finished, so the caller can rotate buffers straight away.

use log::trace;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

use super::rasterizer::{Rasterizer, TileStats};
use super::tile::split_into_tiles;
use crate::geometry::GeometrySource;

/// Worker pool plus the tile size frames are cut into.
pub struct TileDispatcher {
    pool: ThreadPool,
    tile_size: u32,
}

impl TileDispatcher {
    /// Build a pool of `threads` workers. Zero lets rayon pick one per core.
    pub fn new(threads: usize, tile_size: u32) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tilecast-worker-{i}"))
            .build()?;
        Ok(Self { pool, tile_size })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Run `op` on the worker pool and wait for it.
    pub fn install<R, OP>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Rasterize every triangle of `scene` into the frame, one task per tile.
    ///
    /// Each task owns a disjoint view of `color` and `depth`, so no locking
    /// happens between tiles. Triangles are applied in scene order within a
    /// tile. Blocks until all tiles are done.
    pub fn rasterize<R, G>(
        &self,
        rasterizer: &R,
        scene: &G,
        color: &mut [u32],
        depth: &mut [f32],
        width: u32,
        height: u32,
    ) -> TileStats
    where
        R: Rasterizer,
        G: GeometrySource + ?Sized,
    {
        let targets = split_into_tiles(color, depth, width, height, self.tile_size);
        let tiles = targets.len();
        let texture = scene.texture();
        let triangles = scene.triangles();

        let stats = self.pool.install(|| {
            targets
                .into_par_iter()
                .map(|mut target| {
                    let mut stats = TileStats::default();
                    for triangle in triangles {
                        stats += rasterizer.rasterize_tile(triangle, texture, &mut target);
                    }
                    stats
                })
                .reduce(TileStats::default, |a, b| a + b)
        });
        trace!("rasterized {tiles} tiles: {stats:?}");
        stats
    }
}
