//! Consumers of finished frames.
//!
//! Every sink receives an owned [`Frame`] copy, so nothing a sink does can
//! race with the pipeline reusing the slot the frame came from.

use std::io::{self, Write};

use log::warn;
use thiserror::Error;

use crate::cache::{CacheError, DiskCache};
use crate::net::{FrameStream, NetError};
use crate::render::framebuffer::Frame;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Net(#[from] NetError),
    #[error("console output failed: {0}")]
    Io(#[from] io::Error),
    #[error("display failed: {0}")]
    Display(String),
}

/// Anything that takes completed frames.
pub trait FrameSink {
    /// Called once per rotation with a copy of the new Display frame.
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Called after [`FrameSink::consume`] with the upscale stage's output,
    /// when that stage is enabled. Ignored by default.
    fn consume_upscaled(&mut self, _frame: &Frame) -> Result<(), SinkError> {
        Ok(())
    }
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        (**self).consume(frame)
    }

    fn consume_upscaled(&mut self, frame: &Frame) -> Result<(), SinkError> {
        (**self).consume_upscaled(frame)
    }
}

/// Rewrites a single status line on stdout for every frame.
pub struct ConsoleSink {
    label: String,
}

impl ConsoleSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl FrameSink for ConsoleSink {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let mut out = io::stdout().lock();
        write!(
            out,
            "\rFrame {} {} ({}x{})",
            frame.index, self.label, frame.width, frame.height
        )?;
        out.flush()?;
        Ok(())
    }
}

/// Persists each frame to the disk cache.
///
/// Write failures are logged and swallowed; a full disk should not stop
/// the render loop.
pub struct CacheSink {
    cache: DiskCache,
    name: String,
    failures: u64,
}

impl CacheSink {
    pub fn new(cache: DiskCache, name: impl Into<String>) -> Self {
        Self {
            cache,
            name: name.into(),
            failures: 0,
        }
    }

    /// Writes that failed so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }
}

impl FrameSink for CacheSink {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        if let Err(e) = self.cache.write(&self.name, &frame.pixels) {
            self.failures += 1;
            warn!("frame {}: {e}", frame.index);
        }
        Ok(())
    }
}

/// Sends each frame to a connected client.
pub struct StreamSink {
    stream: FrameStream,
}

impl StreamSink {
    pub fn new(stream: FrameStream) -> Self {
        Self { stream }
    }
}

impl FrameSink for StreamSink {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.stream.send_frame(&frame.pixels)?;
        Ok(())
    }
}

/// Fans each frame out to several sinks in insertion order.
///
/// Stops at the first sink that fails.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn FrameSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sink: impl FrameSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    pub fn with(mut self, sink: impl FrameSink + 'static) -> Self {
        self.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl FrameSink for MultiSink {
    fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.sinks.iter_mut().try_for_each(|sink| sink.consume(frame))
    }

    fn consume_upscaled(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.sinks
            .iter_mut()
            .try_for_each(|sink| sink.consume_upscaled(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct Recorder {
        seen: Rc<RefCell<Vec<(u64, bool)>>>,
    }

    impl FrameSink for Recorder {
        fn consume(&mut self, frame: &Frame) -> Result<(), SinkError> {
            self.seen.borrow_mut().push((frame.index, false));
            Ok(())
        }

        fn consume_upscaled(&mut self, frame: &Frame) -> Result<(), SinkError> {
            self.seen.borrow_mut().push((frame.index, true));
            Ok(())
        }
    }

    struct Failing;

    impl FrameSink for Failing {
        fn consume(&mut self, _frame: &Frame) -> Result<(), SinkError> {
            Err(SinkError::Display("gone".into()))
        }
    }

    fn frame(index: u64) -> Frame {
        Frame {
            index,
            width: 1,
            height: 1,
            pixels: vec![index as u32],
        }
    }

    #[test]
    fn test_multi_sink_forwards_both_kinds() {
        let a = Recorder::default();
        let b = Recorder::default();
        let mut multi = MultiSink::new().with(a.clone()).with(b.clone());
        assert_eq!(multi.len(), 2);

        multi.consume(&frame(1)).unwrap();
        multi.consume_upscaled(&frame(1)).unwrap();
        assert_eq!(*a.seen.borrow(), vec![(1, false), (1, true)]);
        assert_eq!(*b.seen.borrow(), vec![(1, false), (1, true)]);
    }

    #[test]
    fn test_multi_sink_stops_at_first_failure() {
        let after = Recorder::default();
        let mut multi = MultiSink::new().with(Failing).with(after.clone());
        assert!(matches!(multi.consume(&frame(1)), Err(SinkError::Display(_))));
        assert!(after.seen.borrow().is_empty());
    }

    #[test]
    fn test_cache_sink_swallows_write_failures() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the cache directory should be.
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"x").unwrap();

        let mut sink = CacheSink::new(DiskCache::new(&blocker), "frame.bin");
        assert!(sink.consume(&frame(1)).is_ok());
        assert_eq!(sink.failures(), 1);
    }

    #[test]
    fn test_cache_sink_writes_latest_frame() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path());
        let mut sink = CacheSink::new(cache.clone(), "last.bin");
        sink.consume(&frame(1)).unwrap();
        sink.consume(&frame(2)).unwrap();

        let mut pixels = [0u32; 1];
        assert!(cache.load("last.bin", &mut pixels).unwrap());
        assert_eq!(pixels, [2]);
        assert_eq!(sink.failures(), 0);
    }
}
