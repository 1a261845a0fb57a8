//! Run an external shell command and treat its standard streams as lazy,
//! possibly-infinite sequences of text lines.
//!
//! The crate has two halves. The process half launches one child under a
//! [`Shell`] and exposes stdin/stdout/stderr as line endpoints driven by a
//! [`Selector`]. The combinator half is three reusable primitives over line
//! sequences, [`partition`], [`tee`], and [`merge`], built from the same
//! bounded-queue-and-pump-thread machinery the process half uses.
//!
//! # Architecture
//!
//! Every stage boundary is a [`BoundedQueue`]: a fixed-capacity blocking
//! FIFO that is the only synchronization point between one producer pump
//! thread and one consumer. Backpressure is nothing but queue capacity plus
//! the OS pipe buffer; a consumer that stops pulling eventually parks the
//! whole upstream chain, child process included.
//!
//! Pipeline completion is the [`Selector`]'s critical-route rule: the
//! selector (and with it "the command") is done when the routes marked
//! critical have drained, which for a process means stdout. Feeding stdin
//! and draining stderr never hold a pipeline open.
//!
//! # Examples
//!
//! Run a command and collect its output lines:
//!
//! ```no_run
//! use pipestream::{CollectSink, Config, ProcessHandle, Shell};
//!
//! # fn main() -> pipestream::Result<()> {
//! let (sink, lines) = CollectSink::new();
//! let mut handle = ProcessHandle::spawn(
//!     Shell::local(),
//!     "echo hello",
//!     Config {
//!         stdout_sink: Box::new(sink),
//!         ..Config::default()
//!     },
//! )?;
//! handle.selector()?.run()?;
//! assert_eq!(*lines.lock(), vec!["hello"]);
//! # handle.wait()?;
//! # Ok(())
//! # }
//! ```
//!
//! Partition a sequence six ways, process the partitions on their own
//! threads, and merge the results back into one sequence:
//!
//! ```
//! use pipestream::{merge, partition, LineStream};
//!
//! let input = LineStream::from_lines((0..1000).map(|i| i.to_string()));
//! let partitions = partition(input, 6, 100, |line| line.len() as i64);
//! let merged = merge(partitions, 100);
//! assert_eq!(merged.count(), 1000);
//! ```

pub mod error;
pub mod lineio;
pub mod merge;
pub mod partition;
pub mod process;
pub mod queue;
pub mod selector;
pub mod sink;
pub mod stream;
pub mod sync;
pub mod tee;

pub use error::{Error, Result};
pub use lineio::{line_writer, lines, Encoding, WriterHandle, WriterSink};
pub use merge::merge;
pub use partition::partition;
pub use process::{Config, ExitStatus, ProcessHandle, Shell};
pub use queue::{BoundedQueue, PutError};
pub use selector::{Route, Selector};
pub use sink::{sink_fn, CollectSink, FnSink, LineSink, LoggingSink, NullSink};
pub use stream::{LineSource, LineStream, StreamHandle};
pub use sync::Monitor;
pub use tee::tee;
