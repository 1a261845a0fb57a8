//! Per-process pipeline configuration.

use crate::lineio::Encoding;
use crate::sink::{LineSink, NullSink};
use crate::stream::LineStream;

/// A transformation applied to a process output stream before its sink.
pub type Transform = Box<dyn FnOnce(LineStream) -> LineStream + Send>;

/// Configuration record binding a process's three stream endpoints to user
/// sequences, transforms, and sinks. Build one with struct-update syntax:
///
/// ```ignore
/// let config = Config {
///     stdin: LineStream::from_lines(["x", "y"]),
///     ..Config::default()
/// };
/// ```
///
/// Defaults: empty stdin (the child sees EOF immediately after any
/// configured lines), lossy UTF-8, stdout passed through unchanged to a
/// no-op sink, stderr dropped entirely.
pub struct Config {
    /// Lines fed to the child's stdin. End-of-input is always signalled
    /// after the last line, so the child sees EOF.
    pub stdin: LineStream,
    /// Decoding and encoding for all three streams.
    pub encoding: Encoding,
    /// Applied to the child's stdout sequence before `stdout_sink`.
    pub stdout_transform: Transform,
    /// Terminal sink for stdout lines. This is the pipeline's critical
    /// route: its completion defines the selector's completion.
    pub stdout_sink: Box<dyn LineSink>,
    /// Applied to the child's stderr sequence before `stderr_sink`.
    pub stderr_transform: Transform,
    /// Terminal sink for stderr lines; a non-critical route.
    pub stderr_sink: Box<dyn LineSink>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stdin: LineStream::empty(),
            encoding: Encoding::default(),
            stdout_transform: Box::new(|stream| stream),
            stdout_sink: Box::new(NullSink),
            stderr_transform: Box::new(|stream| stream.filter(|_| false)),
            stderr_sink: Box::new(NullSink),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
