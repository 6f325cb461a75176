//! The frame pipeline.
//!
//! The [`Pipeline`] struct owns everything a frame touches: the three color
//! slots, the depth buffer, the worker pool, the scene and the upscale
//! target. Each call to [`Pipeline::render_frame`]:
//!
//! 1. clears the Write slot and the depth buffer,
//! 2. rasterizes every tile into the Write slot on the pool while the
//!    upscale stage reads the current Display slot,
//! 3. waits for both, then rotates the slots so the new frame is on Display.

use std::future::Future;
use std::io;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rayon::ThreadPoolBuildError;
use thiserror::Error;

use crate::cache::{CacheError, DiskCache};
use crate::config::{ConfigError, RenderConfig, FRAME_BUDGET};
use crate::geometry::{GeometrySource, Scene};
use crate::render::dispatch::TileDispatcher;
use crate::render::framebuffer::{DepthBuffer, Frame, FrameBuffer};
use crate::render::rasterizer::EdgeFunctionRasterizer;
use crate::render::rotation::TripleBuffer;
use crate::render::tile::{self, Tile};
use crate::render::upscale::{upscale2x, upscale_target};
use crate::sink::{FrameSink, SinkError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] ThreadPoolBuildError),
}

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Rotation number that put this frame on Display, starting at 1.
    pub index: u64,
    pub tiles: usize,
    /// Pixels inside at least one triangle (counted once per triangle).
    pub covered: usize,
    /// Covered pixels that passed the depth test.
    pub written: usize,
    pub elapsed: Duration,
}

/// Shared flag checked between frames to end a render loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Raise this handle on the first Ctrl+C; a second one exits the process.
    pub fn stop_on_ctrl_c(&self) -> io::Result<JoinHandle<()>> {
        self.stop_when(tokio::signal::ctrl_c)
    }

    /// Watch `signal` on a background thread.
    ///
    /// The first time a future from `signal` resolves the handle is raised,
    /// so loops finish their current frame and return. A later resolution
    /// exits the process with status 130, for loops blocked on I/O. An error
    /// from `signal` ends the watch without stopping anything.
    pub(crate) fn stop_when<F, Fut>(&self, mut signal: F) -> io::Result<JoinHandle<()>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let stop = self.clone();
        thread::Builder::new()
            .name("tilecast-signal".into())
            .spawn(move || {
                runtime.block_on(async move {
                    if let Err(e) = signal().await {
                        warn!("not listening for interrupts: {e}");
                        return;
                    }
                    info!("interrupt received, stopping after the current frame");
                    stop.stop();

                    if signal().await.is_ok() {
                        warn!("second interrupt, exiting");
                        process::exit(130);
                    }
                })
            })
    }
}

pub struct Pipeline<G: GeometrySource = Scene> {
    config: RenderConfig,
    scene: G,
    rasterizer: EdgeFunctionRasterizer,
    dispatcher: TileDispatcher,
    buffers: TripleBuffer,
    depth: DepthBuffer,
    upscaled: Option<FrameBuffer>,
    /// Rotation number of the frame currently held in `upscaled`.
    upscaled_index: u64,
}

impl<G: GeometrySource> Pipeline<G> {
    /// Allocate all buffers and start the worker pool.
    pub fn new(config: RenderConfig, scene: G) -> Result<Self, PipelineError> {
        config.validate()?;
        let dispatcher = TileDispatcher::new(config.threads, config.tile_size)?;
        let (width, height) = (config.width, config.height);
        info!(
            "pipeline {}x{}: {} tiles of {}px on {} workers, upscale {}",
            width,
            height,
            tile::tile_count(width, height, config.tile_size),
            config.tile_size,
            dispatcher.threads(),
            if config.upscale { "on" } else { "off" },
        );

        Ok(Self {
            buffers: TripleBuffer::new(width, height, config.clear_color),
            depth: DepthBuffer::new(width, height),
            upscaled: config
                .upscale
                .then(|| upscale_target(width, height, config.clear_color)),
            upscaled_index: 0,
            rasterizer: EdgeFunctionRasterizer::new(),
            dispatcher,
            scene,
            config,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    /// Geometry changes take effect from the next frame.
    pub fn scene_mut(&mut self) -> &mut G {
        &mut self.scene
    }

    /// The tile grid every frame is cut into.
    pub fn tiles(&self) -> Vec<Tile> {
        tile::partition(self.config.width, self.config.height, self.config.tile_size)
    }

    /// Frames completed so far.
    pub fn frames_rendered(&self) -> u64 {
        self.buffers.rotations()
    }

    pub fn buffers(&self) -> &TripleBuffer {
        &self.buffers
    }

    /// Depth of the most recently rendered frame.
    pub fn depth(&self) -> &DepthBuffer {
        &self.depth
    }

    /// The most recently completed frame.
    ///
    /// The borrow pins the pipeline; no frame can be rendered while it lives.
    pub fn display(&self) -> &FrameBuffer {
        self.buffers.display()
    }

    /// An owned copy of the Display slot, safe to keep across rotations.
    pub fn display_frame(&self) -> Frame {
        Frame::from_buffer(self.buffers.rotations(), self.buffers.display())
    }

    /// The 2× copy produced by the upscale stage, if enabled.
    ///
    /// The stage reads the Display slot while the next frame is being
    /// rasterized, so after frame `n` this holds frame `n - 1`.
    pub fn upscaled(&self) -> Option<&FrameBuffer> {
        self.upscaled.as_ref()
    }

    pub fn upscaled_frame(&self) -> Option<Frame> {
        self.upscaled
            .as_ref()
            .map(|buffer| Frame::from_buffer(self.upscaled_index, buffer))
    }

    /// Load a cached frame into the Display slot.
    ///
    /// Returns `Ok(false)` when nothing was cached under `name`.
    pub fn restore_display(&mut self, cache: &DiskCache, name: &str) -> Result<bool, CacheError> {
        let restored = cache.load(name, self.buffers.display_mut().pixels_mut())?;
        if restored {
            info!("restored display frame from {}", cache.path(name).display());
        }
        Ok(restored)
    }

    /// Render one frame into the Write slot and rotate it onto Display.
    pub fn render_frame(&mut self) -> FrameStats {
        let start = Instant::now();
        let Self {
            config,
            scene,
            rasterizer,
            dispatcher,
            buffers,
            depth,
            upscaled,
            upscaled_index,
        } = self;
        let (width, height) = (config.width, config.height);
        let on_display = buffers.rotations();

        depth.clear();
        let (write, display) = buffers.write_and_display();
        write.clear(config.clear_color);

        let mut rasterize = || {
            dispatcher.rasterize(
                &*rasterizer,
                &*scene,
                write.pixels_mut(),
                depth.values_mut(),
                width,
                height,
            )
        };
        let stats = match upscaled.as_mut() {
            Some(target) => {
                let (stats, ()) =
                    dispatcher.install(|| rayon::join(rasterize, || upscale2x(display, target)));
                *upscaled_index = on_display;
                stats
            }
            None => rasterize(),
        };

        buffers.end_frame();

        let frame = FrameStats {
            index: buffers.rotations(),
            tiles: tile::tile_count(width, height, config.tile_size),
            covered: stats.covered,
            written: stats.written,
            elapsed: start.elapsed(),
        };
        debug!(
            "frame {}: {} tiles, {} covered, {} written in {:.2?}",
            frame.index, frame.tiles, frame.covered, frame.written, frame.elapsed
        );
        if frame.elapsed > FRAME_BUDGET {
            warn!(
                "frame {} took {:.2?} (> {:?})",
                frame.index, frame.elapsed, FRAME_BUDGET
            );
        }
        frame
    }

    /// Render frames and hand each to `sink` until stopped.
    ///
    /// The loop checks `stop` and the configured frame limit between frames;
    /// a frame that has started always completes. Returns the number of
    /// frames rendered, or the first sink error.
    pub fn run(&mut self, sink: &mut dyn FrameSink, stop: &StopHandle) -> Result<u64, SinkError> {
        let mut rendered = 0u64;
        while !stop.is_stopped() && self.config.frame_limit.map_or(true, |n| rendered < n) {
            self.render_frame();
            rendered += 1;

            sink.consume(&self.display_frame())?;
            if let Some(frame) = self.upscaled_frame() {
                sink.consume_upscaled(&frame)?;
            }
        }
        info!("render loop finished after {rendered} frames");
        Ok(rendered)
    }
}
