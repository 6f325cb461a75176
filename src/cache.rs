//! Raw frame persistence on disk.
//!
//! A cached frame is exactly `width * height * 4` bytes of pixels in native
//! byte order: no header, no compression, no version. Writing overwrites.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use thiserror::Error;

use crate::render::framebuffer::{pixels_as_bytes, pixels_as_bytes_mut};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cached frame {path} is {actual} bytes, expected {expected}")]
    SizeMismatch {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Write `pixels` to `name`, creating the cache directory if needed.
    pub fn write(&self, name: &str, pixels: &[u32]) -> Result<(), CacheError> {
        let path = self.path(name);
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        fs::write(&path, pixels_as_bytes(pixels)).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        debug!("cached {} bytes to {}", pixels.len() * 4, path.display());
        Ok(())
    }

    /// Fill `pixels` from `name`.
    ///
    /// Returns `Ok(false)` and leaves `pixels` untouched when the file does
    /// not exist. A file of the wrong length is an error and also leaves
    /// `pixels` untouched.
    pub fn load(&self, name: &str, pixels: &mut [u32]) -> Result<bool, CacheError> {
        let path = self.path(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let dst = pixels_as_bytes_mut(pixels);
        if bytes.len() != dst.len() {
            return Err(CacheError::SizeMismatch {
                path,
                expected: dst.len(),
                actual: bytes.len(),
            });
        }
        dst.copy_from_slice(&bytes);
        debug!("loaded cached frame from {}", path.display());
        Ok(true)
    }
}
