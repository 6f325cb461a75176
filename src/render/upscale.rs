//! 2× nearest-neighbour upscale, the pipeline's second stage.

use rayon::prelude::*;

use super::framebuffer::FrameBuffer;

/// Allocate a buffer twice the size of `src` in both dimensions.
pub fn upscale_target(width: u32, height: u32, clear_color: u32) -> FrameBuffer {
    FrameBuffer::new(width * 2, height * 2, clear_color)
}

/// Copy each source pixel into a 2×2 block of `dst`.
///
/// Rows are processed in parallel on the current rayon pool.
///
/// # Panics
/// Panics if `dst` is not exactly twice `src` in both dimensions.
pub fn upscale2x(src: &FrameBuffer, dst: &mut FrameBuffer) {
    assert_eq!(dst.width(), src.width() * 2, "upscale target width mismatch");
    assert_eq!(dst.height(), src.height() * 2, "upscale target height mismatch");

    let src_width = src.width() as usize;
    if src_width == 0 {
        return;
    }
    let dst_width = src_width * 2;
    let src_pixels = src.pixels();

    dst.pixels_mut()
        .par_chunks_mut(dst_width)
        .enumerate()
        .for_each(|(dy, row)| {
            let src_row = &src_pixels[(dy / 2) * src_width..(dy / 2 + 1) * src_width];
            for (pair, &px) in row.chunks_exact_mut(2).zip(src_row) {
                pair[0] = px;
                pair[1] = px;
            }
        });
}
