use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};
use tilecast::cache::DiskCache;
use tilecast::config::{self, RenderConfig, CACHE_FRAME_NAME};
use tilecast::net::{FrameServer, FrameStream};
use tilecast::sink::{CacheSink, ConsoleSink, MultiSink, StreamSink};
use tilecast::{Pipeline, Scene, StopHandle};

#[derive(Parser)]
#[command(name = "tilecast", version, about = "Tile-parallel software rasterizer")]
struct Cli {
    #[command(flatten)]
    render: RenderArgs,

    /// Mode to run; defaults to the native render loop
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Args)]
struct RenderArgs {
    #[arg(long, global = true, default_value_t = config::DEFAULT_WIDTH)]
    width: u32,

    #[arg(long, global = true, default_value_t = config::DEFAULT_HEIGHT)]
    height: u32,

    /// Edge length of a rasterization tile in pixels
    #[arg(long, global = true, default_value_t = config::DEFAULT_TILE_SIZE)]
    tile_size: u32,

    /// Rasterization worker threads
    #[arg(long, global = true, default_value_t = config::DEFAULT_THREADS)]
    threads: usize,

    /// Stop after this many frames (runs until interrupted otherwise)
    #[arg(long, global = true)]
    frames: Option<u64>,

    /// TCP port for the frame stream
    #[arg(long, global = true, default_value_t = config::DEFAULT_PORT)]
    port: u16,
}

#[derive(Subcommand)]
enum Mode {
    /// Render locally, caching each displayed frame to disk
    Native(NativeArgs),
    /// Render and stream raw frames to one client
    Server,
    /// Receive and display frames from a server
    Client {
        /// Address of the server
        ip: IpAddr,

        /// Show received frames in a window
        #[cfg(feature = "window")]
        #[arg(long)]
        window: bool,
    },
}

#[derive(Args, Default)]
struct NativeArgs {
    /// Skip the 2x upscale stage
    #[arg(long)]
    no_upscale: bool,

    /// Directory for the frame cache
    #[arg(long, default_value = config::DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Do not write frames to the cache
    #[arg(long)]
    no_cache: bool,

    /// Show the last cached frame before the first render
    #[arg(long)]
    resume: bool,

    /// Present frames in a window
    #[cfg(feature = "window")]
    #[arg(long)]
    window: bool,
}

impl RenderArgs {
    fn to_config(&self) -> RenderConfig {
        RenderConfig {
            width: self.width,
            height: self.height,
            tile_size: self.tile_size,
            threads: self.threads,
            port: self.port,
            frame_limit: self.frames,
            ..RenderConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = cli.render.to_config();

    let mode = cli.mode.unwrap_or(Mode::Native(NativeArgs {
        cache_dir: PathBuf::from(config::DEFAULT_CACHE_DIR),
        ..NativeArgs::default()
    }));
    match mode {
        Mode::Native(args) => run_native(config, args),
        Mode::Server => run_server(config),
        #[cfg(feature = "window")]
        Mode::Client { ip, window } => run_client(config, ip, window),
        #[cfg(not(feature = "window"))]
        Mode::Client { ip } => run_client(config, ip, false),
    }
}

/// A stop handle raised by Ctrl+C, so loops end after the current frame.
fn interruptible() -> StopHandle {
    let stop = StopHandle::new();
    if let Err(e) = stop.stop_on_ctrl_c() {
        warn!("Ctrl+C will not stop the loop cleanly: {e}");
    }
    stop
}

fn run_native(mut config: RenderConfig, args: NativeArgs) -> Result<()> {
    config.upscale = !args.no_upscale;
    config.cache_dir = args.cache_dir;
    let cache = DiskCache::new(&config.cache_dir);
    let stop = interruptible();

    let mut pipeline = Pipeline::new(config.clone(), Scene::reference())?;
    if args.resume {
        match pipeline.restore_display(&cache, CACHE_FRAME_NAME) {
            Ok(true) => {}
            Ok(false) => info!("no cached frame to resume from"),
            Err(e) => warn!("ignoring cached frame: {e}"),
        }
    }

    let mut sinks = MultiSink::new().with(ConsoleSink::new("rendered (native, triple-buffered)"));
    if !args.no_cache {
        sinks.push(CacheSink::new(cache, CACHE_FRAME_NAME));
    }
    #[cfg(feature = "window")]
    if args.window {
        sinks.push(tilecast::window::WindowSink::new(
            "tilecast",
            config.width,
            config.height,
            config.upscale,
            stop.clone(),
        )?);
    }

    pipeline.run(&mut sinks, &stop)?;
    println!();
    Ok(())
}

fn run_server(config: RenderConfig) -> Result<()> {
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.port);
    let stop = interruptible();
    let server = FrameServer::bind(addr)?;
    info!("waiting for client on {addr}");
    let stream = server.accept()?;

    // Frames go over the wire at native resolution.
    let config = RenderConfig {
        upscale: false,
        ..config
    };
    let mut pipeline = Pipeline::new(config, Scene::reference())?;
    let mut sinks = MultiSink::new()
        .with(StreamSink::new(stream))
        .with(ConsoleSink::new("sent to client"));

    pipeline.run(&mut sinks, &stop)?;
    println!();
    Ok(())
}

fn run_client(config: RenderConfig, ip: IpAddr, window: bool) -> Result<()> {
    let addr = SocketAddr::new(ip, config.port);
    let mut stream = FrameStream::connect(addr)?;
    let stop = interruptible();

    let mut sinks = MultiSink::new().with(ConsoleSink::new("received from server"));
    #[cfg(feature = "window")]
    if window {
        sinks.push(tilecast::window::WindowSink::new(
            "tilecast client",
            config.width,
            config.height,
            false,
            stop.clone(),
        )?);
    }
    #[cfg(not(feature = "window"))]
    let _ = window;

    let received = stream
        .pump(config.width, config.height, &mut sinks, &stop, config.frame_limit)
        .with_context(|| format!("frame stream from {addr} ended"))?;
    println!();
    info!("received {received} frames");
    Ok(())
}
