//! Color and depth storage for one frame resolution.
//!
//! Both buffers are row-major, `width * height` long, and allocated once; the
//! pipeline never resizes them. Depth is stored as a plain distance where
//! smaller means nearer, cleared to [`DEPTH_CLEAR`] at the start of every
//! frame.

/// Depth sentinel for "nothing drawn here yet".
pub const DEPTH_CLEAR: f32 = f32::INFINITY;

/// View a pixel slice as its raw native-endian bytes.
#[inline]
pub fn pixels_as_bytes(pixels: &[u32]) -> &[u8] {
    // SAFETY: u8 has alignment 1 and every bit pattern is valid, so any
    // initialized u32 slice can be reinterpreted as four times as many bytes.
    unsafe { std::slice::from_raw_parts(pixels.as_ptr() as *const u8, pixels.len() * 4) }
}

/// Mutable counterpart of [`pixels_as_bytes`].
#[inline]
pub fn pixels_as_bytes_mut(pixels: &mut [u32]) -> &mut [u8] {
    // SAFETY: as above; every byte pattern written through the view forms a
    // valid u32, and the exclusive borrow is carried over to the result.
    unsafe { std::slice::from_raw_parts_mut(pixels.as_mut_ptr() as *mut u8, pixels.len() * 4) }
}

/// An owned ARGB color buffer. One of these backs each triple-buffer slot.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameBuffer {
    color: Vec<u32>,
    width: u32,
    height: u32,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32, clear_color: u32) -> Self {
        Self {
            color: vec![clear_color; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear(&mut self, color: u32) {
        self.color.fill(color);
    }

    pub fn pixels(&self) -> &[u32] {
        &self.color
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.color
    }

    /// Color at `(x, y)`, or `None` if out of bounds.
    #[inline]
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x < self.width && y < self.height {
            Some(self.color[(y * self.width + x) as usize])
        } else {
            None
        }
    }

    /// Raw bytes in native byte order, `width * height * 4` long.
    pub fn as_bytes(&self) -> &[u8] {
        pixels_as_bytes(&self.color)
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        pixels_as_bytes_mut(&mut self.color)
    }
}

/// Per-pixel depth, parallel to a [`FrameBuffer`].
///
/// Invariant within a frame: each entry holds the smallest depth written to
/// that pixel so far, or [`DEPTH_CLEAR`].
#[derive(Clone, Debug, PartialEq)]
pub struct DepthBuffer {
    depth: Vec<f32>,
    width: u32,
    height: u32,
}

impl DepthBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            depth: vec![DEPTH_CLEAR; width as usize * height as usize],
            width,
            height,
        }
    }

    #[inline]
    /// Reset every entry to [`DEPTH_CLEAR`] to prepare for a new frame.
    pub fn clear(&mut self) {
        self.depth.fill(DEPTH_CLEAR);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn values(&self) -> &[f32] {
        &self.depth
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.depth
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x < self.width && y < self.height {
            Some(self.depth[(y * self.width + x) as usize])
        } else {
            None
        }
    }
}

/// An owned copy of a finished frame, handed to sinks.
///
/// Sinks get their own pixels so they can hold on to a frame for as long as
/// they like; rotation keeps reusing the slot it was copied from.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Number of the rotation that promoted this frame to Display, starting at 1.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u32>,
}

impl Frame {
    pub fn from_buffer(index: u64, buffer: &FrameBuffer) -> Self {
        Self {
            index,
            width: buffer.width(),
            height: buffer.height(),
            pixels: buffer.pixels().to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        pixels_as_bytes(&self.pixels)
    }

    /// Size in bytes of one frame of this resolution on disk or on the wire.
    pub fn byte_len(width: u32, height: u32) -> usize {
        width as usize * height as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffers_are_cleared() {
        let fb = FrameBuffer::new(4, 3, 0xFF11_2233);
        assert_eq!(fb.pixels().len(), 12);
        assert!(fb.pixels().iter().all(|&c| c == 0xFF11_2233));

        let depth = DepthBuffer::new(4, 3);
        assert_eq!(depth.values().len(), 12);
        assert!(depth.values().iter().all(|&d| d == DEPTH_CLEAR));
    }

    #[test]
    fn test_depth_clear_resets_sentinel() {
        let mut depth = DepthBuffer::new(2, 2);
        depth.values_mut()[3] = 0.25;
        assert_eq!(depth.get(1, 1), Some(0.25));
        depth.clear();
        assert_eq!(depth.get(1, 1), Some(DEPTH_CLEAR));
        assert_eq!(depth.get(2, 0), None);
    }

    #[test]
    fn test_get_pixel_bounds() {
        let mut fb = FrameBuffer::new(3, 2, 0);
        fb.pixels_mut()[5] = 7;
        assert_eq!(fb.get_pixel(2, 1), Some(7));
        assert_eq!(fb.get_pixel(3, 0), None);
        assert_eq!(fb.get_pixel(0, 2), None);
    }

    #[test]
    fn test_bytes_are_native_endian() {
        let mut fb = FrameBuffer::new(2, 1, 0);
        fb.pixels_mut().copy_from_slice(&[0x0102_0304, 0xA0B0_C0D0]);
        let mut expected = Vec::new();
        expected.extend_from_slice(&0x0102_0304u32.to_ne_bytes());
        expected.extend_from_slice(&0xA0B0_C0D0u32.to_ne_bytes());
        assert_eq!(fb.as_bytes(), expected.as_slice());

        fb.as_bytes_mut()[..4].copy_from_slice(&0xDEAD_BEEFu32.to_ne_bytes());
        assert_eq!(fb.get_pixel(0, 0), Some(0xDEAD_BEEF));
    }

    #[test]
    fn test_frame_copy_is_independent() {
        let mut fb = FrameBuffer::new(2, 2, 1);
        let frame = Frame::from_buffer(3, &fb);
        fb.clear(9);
        assert_eq!(frame.index, 3);
        assert_eq!(frame.pixels, vec![1; 4]);
        assert_eq!(frame.as_bytes().len(), Frame::byte_len(2, 2));
    }
}
