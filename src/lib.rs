//! A tile-parallel software triangle rasterizer.
//!
//! Frames are cut into square tiles that are rasterized concurrently on a
//! worker pool against a per-pixel depth buffer, then published through a
//! triple-buffer rotation to sinks: a console line, a disk cache, a TCP
//! frame stream or (with the `window` feature) an SDL2 window.
//!
//! # Quick Start
//!
//! ```no_run
//! use tilecast::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RenderConfig {
//!     frame_limit: Some(10),
//!     ..RenderConfig::default()
//! };
//! let mut pipeline = Pipeline::new(config, Scene::reference())?;
//! let mut sink = ConsoleSink::new("rendered");
//! pipeline.run(&mut sink, &StopHandle::new())?;
//! # Ok(())
//! # }
//! ```

// Public API - exposed to library consumers
pub mod cache;
pub mod colors;
pub mod config;
pub mod geometry;
pub mod math;
pub mod net;
pub mod pipeline;
pub mod sink;
pub mod texture;
#[cfg(feature = "window")]
pub mod window;

// Internal modules - used within the crate only
pub(crate) mod render;

// Re-export commonly needed types at crate root for convenience
pub use config::RenderConfig;
pub use geometry::{GeometrySource, Scene, Triangle, Winding};
pub use pipeline::{FrameStats, Pipeline, PipelineError, StopHandle};
pub use render::{DepthBuffer, Frame, FrameBuffer, SlotRole, Tile, TripleBuffer, DEPTH_CLEAR};

/// Prelude module for convenient imports.
///
/// # Example
/// ```ignore
/// use tilecast::prelude::*;
/// ```
pub mod prelude {
    // Configuration
    pub use crate::config::{RenderConfig, CACHE_FRAME_NAME};

    // Geometry
    pub use crate::geometry::{GeometrySource, Scene, Triangle, Winding};
    pub use crate::math::Vec3;
    pub use crate::texture::Texture;

    // Pipeline
    pub use crate::pipeline::{FrameStats, Pipeline, StopHandle};
    pub use crate::render::{Frame, FrameBuffer};

    // Sinks & transport
    pub use crate::cache::DiskCache;
    pub use crate::net::{FrameServer, FrameStream};
    pub use crate::sink::{CacheSink, ConsoleSink, FrameSink, MultiSink, StreamSink};
}

/// Module exposing internals for benchmarking and integration tests. Not part
/// of the stable API.
pub mod bench {
    pub use crate::render::{
        edge_function, partition, split_into_tiles, upscale2x, EdgeFunctionRasterizer,
        Rasterizer, TileDispatcher, TileStats, TileTarget,
    };
}
