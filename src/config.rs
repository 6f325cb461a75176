//! Runtime configuration shared by every mode.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::colors;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;
pub const DEFAULT_TILE_SIZE: u32 = 32;
pub const DEFAULT_THREADS: usize = 8;
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_CACHE_DIR: &str = "cache";

/// File name the native loop writes the latest Display frame to.
pub const CACHE_FRAME_NAME: &str = "last_frame.bin";

/// Frames slower than this are logged as warnings.
pub const FRAME_BUDGET: Duration = Duration::from_millis(16);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("tile size must be at least 1")]
    ZeroTileSize,
    #[error("worker thread count must be at least 1")]
    ZeroThreads,
    #[error("resolution {width}x{height} is too large")]
    TooLarge { width: u32, height: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Edge length of the square tiles a frame is cut into.
    pub tile_size: u32,
    /// Rasterization workers in the pool.
    pub threads: usize,
    /// ARGB color the Write buffer is cleared to each frame.
    pub clear_color: u32,
    /// Run the 2× upscale stage alongside rasterization.
    pub upscale: bool,
    pub cache_dir: PathBuf,
    pub port: u16,
    /// Stop after this many frames; `None` runs until stopped.
    pub frame_limit: Option<u64>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            tile_size: DEFAULT_TILE_SIZE,
            threads: DEFAULT_THREADS,
            clear_color: colors::CLEAR,
            upscale: true,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            port: DEFAULT_PORT,
            frame_limit: None,
        }
    }
}

impl RenderConfig {
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        // The upscale target is 2x in each dimension, 4 bytes per pixel.
        let too_large = ConfigError::TooLarge {
            width: self.width,
            height: self.height,
        };
        let (w2, h2) = match (self.width.checked_mul(2), self.height.checked_mul(2)) {
            (Some(w2), Some(h2)) => (w2, h2),
            _ => return Err(too_large),
        };
        (w2 as usize)
            .checked_mul(h2 as usize)
            .and_then(|px| px.checked_mul(4))
            .filter(|&bytes| bytes <= isize::MAX as usize)
            .map(|_| ())
            .ok_or(too_large)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Bytes in one raw frame on disk or on the wire.
    pub fn frame_bytes(&self) -> usize {
        self.pixel_count() * 4
    }
}
