//! Raw frame streaming over TCP.
//!
//! The server accepts a single client and pushes every frame as
//! `width * height * 4` native-endian bytes, back to back, with no length
//! prefix or heartbeat. The client reads exactly that many bytes per frame.
//! Both ends must agree on the resolution; a lost byte desynchronizes the
//! stream for good.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use log::{debug, info};
use thiserror::Error;

use crate::pipeline::StopHandle;
use crate::render::framebuffer::{pixels_as_bytes, pixels_as_bytes_mut, Frame, FrameBuffer};
use crate::sink::{FrameSink, SinkError};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to accept a client: {0}")]
    Accept(#[source] io::Error),
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("failed to send frame: {0}")]
    Send(#[source] io::Error),
    #[error("failed to receive frame: {0}")]
    Recv(#[source] io::Error),
    #[error("peer closed the stream")]
    Closed,
}

/// Listening side of the frame stream.
pub struct FrameServer {
    listener: TcpListener,
}

impl FrameServer {
    pub fn bind(addr: SocketAddr) -> Result<Self, NetError> {
        let listener = TcpListener::bind(addr).map_err(|source| NetError::Bind { addr, source })?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Block until one client connects.
    pub fn accept(&self) -> Result<FrameStream, NetError> {
        let (stream, peer) = self.listener.accept().map_err(NetError::Accept)?;
        info!("client connected from {peer}");
        FrameStream::from_tcp(stream, peer).map_err(NetError::Accept)
    }
}

/// One connected end of the frame stream.
pub struct FrameStream {
    stream: TcpStream,
    peer: SocketAddr,
}

impl FrameStream {
    pub fn connect(addr: SocketAddr) -> Result<Self, NetError> {
        let stream =
            TcpStream::connect(addr).map_err(|source| NetError::Connect { addr, source })?;
        info!("connected to server {addr}");
        Self::from_tcp(stream, addr).map_err(|source| NetError::Connect { addr, source })
    }

    fn from_tcp(stream: TcpStream, peer: SocketAddr) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        Ok(Self { stream, peer })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Write all pixels of one frame.
    pub fn send_frame(&mut self, pixels: &[u32]) -> Result<(), NetError> {
        self.stream
            .write_all(pixels_as_bytes(pixels))
            .map_err(|e| match e.kind() {
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset => NetError::Closed,
                _ => NetError::Send(e),
            })
    }

    /// Read exactly `pixels.len() * 4` bytes into `pixels`.
    pub fn recv_frame(&mut self, pixels: &mut [u32]) -> Result<(), NetError> {
        self.stream
            .read_exact(pixels_as_bytes_mut(pixels))
            .map_err(|e| match e.kind() {
                io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset => NetError::Closed,
                _ => NetError::Recv(e),
            })
    }

    /// Receive frames into a `width × height` buffer and hand each to `sink`.
    ///
    /// Stops when `stop` is raised, after `frame_limit` frames, or on the
    /// first receive error. Returns the number of frames delivered.
    pub fn pump(
        &mut self,
        width: u32,
        height: u32,
        sink: &mut dyn FrameSink,
        stop: &StopHandle,
        frame_limit: Option<u64>,
    ) -> Result<u64, SinkError> {
        let mut buffer = FrameBuffer::new(width, height, 0);
        let mut received = 0u64;
        while !stop.is_stopped() && frame_limit.map_or(true, |limit| received < limit) {
            self.recv_frame(buffer.pixels_mut())?;
            received += 1;
            debug!("received frame {received} from {}", self.peer);
            sink.consume(&Frame::from_buffer(received, &buffer))?;
        }
        Ok(received)
    }
}
