//! Textures sampled by the tile rasterizer.
//!
//! Sampling is addressed in texels rather than UVs: the rasterizer looks up
//! `(x mod width, y mod height)` for screen pixel `(x, y)`, so the texture
//! tiles across the whole frame without filtering.

use std::path::Path;

use thiserror::Error;

use crate::colors;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to load texture image: {0}")]
    Image(#[from] image::ImageError),
    #[error("texture must be non-empty, got {width}x{height}")]
    Empty { width: u32, height: u32 },
    #[error("texture data has {actual} texels, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// Represents a 2D texture in ARGB format.
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    data: Vec<u32>,
    width: u32,
    height: u32,
}

impl Texture {
    /// Wrap raw ARGB texels laid out row-major.
    pub fn from_pixels(width: u32, height: u32, data: Vec<u32>) -> Result<Self, TextureError> {
        if width == 0 || height == 0 {
            return Err(TextureError::Empty { width, height });
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(TextureError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Square checkerboard of `size`×`size` texels alternating every `block` texels.
    ///
    /// The top-left block uses `even`; `size` and `block` are clamped to at least 1.
    pub fn checker(size: u32, block: u32, even: u32, odd: u32) -> Self {
        let size = size.max(1);
        let block = block.max(1);
        let data = (0..size)
            .flat_map(|y| {
                (0..size).map(move |x| {
                    if (x / block + y / block) % 2 == 1 {
                        odd
                    } else {
                        even
                    }
                })
            })
            .collect();
        Self {
            data,
            width: size,
            height: size,
        }
    }

    /// The 64×64 black/white checker with 8×8 blocks used by the reference scene.
    pub fn reference_checker() -> Self {
        Self::checker(64, 8, colors::BLACK, colors::WHITE)
    }

    // Load a texture from an image file (PNG, JPG, etc.)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TextureError> {
        let img = image::open(path)?.to_rgba8();
        let (width, height) = img.dimensions();

        // Convert RGBA bytes to ARGB u32
        let data: Vec<u32> = img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                colors::argb(a, r, g, b)
            })
            .collect();

        Self::from_pixels(width, height, data)
    }

    /// Sample the texel at `(x mod width, y mod height)`.
    #[inline]
    pub fn sample_wrapped(&self, x: u32, y: u32) -> u32 {
        let tx = x % self.width;
        let ty = y % self.height;
        self.data[(ty * self.width + tx) as usize]
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}
