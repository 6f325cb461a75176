//! Tile partitioning of the frame.
//!
//! A frame of `width × height` pixels is cut into a grid of `tile_size`
//! squares, row by row, with the last column and row clipped to the frame.
//! [`split_into_tiles`] produces the same grid as [`partition`] but also hands
//! each tile exclusive mutable access to its pixels in the color and depth
//! buffers. The views are carved out of the buffers with `chunks_mut`, so the
//! disjointness that makes parallel rasterization sound is checked by the
//! borrow checker rather than promised by a comment.

/// A rectangular pixel region `[start_x, end_x) × [start_y, end_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    pub start_x: u32,
    pub start_y: u32,
    pub end_x: u32,
    pub end_y: u32,
}

impl Tile {
    pub fn width(&self) -> u32 {
        self.end_x - self.start_x
    }

    pub fn height(&self) -> u32 {
        self.end_y - self.start_y
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.start_x && x < self.end_x && y >= self.start_y && y < self.end_y
    }

    /// Row-major buffer indices covered by this tile in a frame `frame_width` wide.
    pub fn pixel_indices(&self, frame_width: u32) -> impl Iterator<Item = usize> + '_ {
        let frame_width = frame_width as usize;
        (self.start_y..self.end_y).flat_map(move |y| {
            (self.start_x..self.end_x).map(move |x| y as usize * frame_width + x as usize)
        })
    }
}

/// Cut a `width × height` frame into `tile_size` squares.
///
/// Tiles are ordered row by row (top to bottom, left to right within a row).
/// Edge tiles are clipped to the frame; a zero-sized frame gives no tiles.
/// A `tile_size` of zero is treated as one.
pub fn partition(width: u32, height: u32, tile_size: u32) -> Vec<Tile> {
    let t = tile_size.max(1);
    let mut tiles = Vec::with_capacity(tile_count(width, height, t));
    for start_y in (0..height).step_by(t as usize) {
        for start_x in (0..width).step_by(t as usize) {
            tiles.push(Tile {
                start_x,
                start_y,
                end_x: start_x.saturating_add(t).min(width),
                end_y: start_y.saturating_add(t).min(height),
            });
        }
    }
    tiles
}

/// Number of tiles [`partition`] returns for these dimensions.
pub fn tile_count(width: u32, height: u32, tile_size: u32) -> usize {
    let t = tile_size.max(1);
    width.div_ceil(t) as usize * height.div_ceil(t) as usize
}

/// Exclusive access to one tile's pixels in the color and depth buffers.
///
/// Holds one row slice per tile row; coordinates passed in are frame
/// coordinates and must lie inside [`TileTarget::tile`].
pub struct TileTarget<'a> {
    tile: Tile,
    color_rows: Vec<&'a mut [u32]>,
    depth_rows: Vec<&'a mut [f32]>,
}

impl<'a> TileTarget<'a> {
    pub fn tile(&self) -> Tile {
        self.tile
    }

    /// Depth-test pixel `(x, y)` and write on success.
    ///
    /// If `depth` is strictly smaller than the stored depth, stores it along
    /// with the color produced by `shade` and returns `true`. Otherwise both
    /// buffers are left untouched and `shade` is not called.
    #[inline]
    pub fn depth_test_and_write(
        &mut self,
        x: u32,
        y: u32,
        depth: f32,
        shade: impl FnOnce() -> u32,
    ) -> bool {
        debug_assert!(self.tile.contains(x, y), "({x}, {y}) outside {:?}", self.tile);
        let lx = (x - self.tile.start_x) as usize;
        let ly = (y - self.tile.start_y) as usize;
        let stored = &mut self.depth_rows[ly][lx];
        if depth < *stored {
            *stored = depth;
            self.color_rows[ly][lx] = shade();
            true
        } else {
            false
        }
    }

    /// Current `(color, depth)` at frame pixel `(x, y)`.
    pub fn get(&self, x: u32, y: u32) -> (u32, f32) {
        let lx = (x - self.tile.start_x) as usize;
        let ly = (y - self.tile.start_y) as usize;
        (self.color_rows[ly][lx], self.depth_rows[ly][lx])
    }
}

/// Split row-major color and depth buffers into per-tile views.
///
/// The result lines up one-to-one with `partition(width, height, tile_size)`.
///
/// # Panics
/// Panics if either buffer is not exactly `width * height` long.
pub fn split_into_tiles<'a>(
    color: &'a mut [u32],
    depth: &'a mut [f32],
    width: u32,
    height: u32,
    tile_size: u32,
) -> Vec<TileTarget<'a>> {
    let w = width as usize;
    let h = height as usize;
    assert_eq!(color.len(), w * h, "color buffer size doesn't match dimensions");
    assert_eq!(depth.len(), w * h, "depth buffer size doesn't match dimensions");

    let t = tile_size.max(1) as usize;
    let mut targets = Vec::with_capacity(tile_count(width, height, tile_size));
    if w == 0 || h == 0 {
        return targets;
    }

    let bands = color.chunks_mut(w * t).zip(depth.chunks_mut(w * t));
    for (band, (color_band, depth_band)) in bands.enumerate() {
        let start_y = band * t;
        let first = targets.len();
        for start_x in (0..w).step_by(t) {
            targets.push(TileTarget {
                tile: Tile {
                    start_x: start_x as u32,
                    start_y: start_y as u32,
                    end_x: (start_x + t).min(w) as u32,
                    end_y: (start_y + t).min(h) as u32,
                },
                color_rows: Vec::with_capacity(t),
                depth_rows: Vec::with_capacity(t),
            });
        }

        for (color_row, depth_row) in color_band.chunks_mut(w).zip(depth_band.chunks_mut(w)) {
            let segments = color_row.chunks_mut(t).zip(depth_row.chunks_mut(t));
            for (column, (color_seg, depth_seg)) in segments.enumerate() {
                let target = &mut targets[first + column];
                target.color_rows.push(color_seg);
                target.depth_rows.push(depth_seg);
            }
        }
    }
    targets
}
