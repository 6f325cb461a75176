//! Frame building internals: buffers, tiling, rasterization, dispatch and
//! triple-buffer rotation.

pub mod dispatch;
pub mod framebuffer;
pub mod rasterizer;
pub mod rotation;
pub mod tile;
pub mod upscale;

pub use dispatch::TileDispatcher;
pub use framebuffer::{DepthBuffer, Frame, FrameBuffer, DEPTH_CLEAR};
pub use rasterizer::{edge_function, EdgeFunctionRasterizer, Rasterizer, TileStats};
pub use rotation::{SlotRole, TripleBuffer};
pub use tile::{partition, split_into_tiles, Tile, TileTarget};
pub use upscale::upscale2x;
