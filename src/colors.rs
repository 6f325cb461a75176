//! Colors in ARGB8888 format.

/// Cleared frame color (fully transparent black).
pub const CLEAR: u32 = 0x0000_0000;
pub const BLACK: u32 = 0xFF00_0000;
pub const WHITE: u32 = 0xFFFF_FFFF;

/// Pack 8-bit channels into an ARGB8888 word.
#[inline]
pub const fn argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}
