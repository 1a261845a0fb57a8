//! Terminal consumers of line sequences.
//!
//! A [`LineSink`] receives each line of a sequence via `accept` and the
//! end-of-sequence signal via `finish`; there is no sentinel line value.
//! `finish` must be idempotent.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

pub trait LineSink: Send {
    fn accept(&mut self, line: String) -> Result<()>;

    /// End-of-sequence. Idempotent; repeated calls are harmless.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl LineSink for Box<dyn LineSink> {
    fn accept(&mut self, line: String) -> Result<()> {
        (**self).accept(line)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Discards everything.
pub struct NullSink;

impl LineSink for NullSink {
    fn accept(&mut self, _line: String) -> Result<()> {
        Ok(())
    }
}

/// Wrap a closure as a sink.
pub fn sink_fn<F>(f: F) -> FnSink<F>
where
    F: FnMut(String) -> Result<()> + Send,
{
    FnSink { f }
}

pub struct FnSink<F> {
    f: F,
}

impl<F> LineSink for FnSink<F>
where
    F: FnMut(String) -> Result<()> + Send,
{
    fn accept(&mut self, line: String) -> Result<()> {
        (self.f)(line)
    }
}

/// Collects lines into a shared vector, for inspection after the pipeline
/// ran on other threads.
pub struct CollectSink {
    out: Arc<Mutex<Vec<String>>>,
}

impl CollectSink {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let out = Arc::new(Mutex::new(Vec::new()));
        (Self { out: out.clone() }, out)
    }
}

impl LineSink for CollectSink {
    fn accept(&mut self, line: String) -> Result<()> {
        self.out.lock().push(line);
        Ok(())
    }
}

/// Logs every line at debug level under a fixed prefix.
pub struct LoggingSink {
    prefix: String,
}

impl LoggingSink {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl LineSink for LoggingSink {
    fn accept(&mut self, line: String) -> Result<()> {
        tracing::debug!("{}: {}", self.prefix, line);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        tracing::debug!("{}: <end of stream>", self.prefix);
        Ok(())
    }
}
