//! Lazy, single-consumption, closable line sequences.
//!
//! A [`LineStream`] is the element flowing between every pipeline stage: an
//! iterator of `Result<String>` backed by a [`LineSource`] that knows how to
//! release its backing I/O or detach from its backing pump. The sequence
//! owner closes via [`LineStream::close`]; any other thread closes via the
//! clonable [`StreamHandle`], which takes effect within a bounded number of
//! queue operations for queue-backed sources and at the next line boundary
//! for reader-backed ones.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::queue::BoundedQueue;

/// Backing producer of a [`LineStream`].
///
/// `next_line` returns `Ok(None)` exactly once at end-of-sequence; `close`
/// releases backing resources and is idempotent.
pub trait LineSource: Send {
    fn next_line(&mut self) -> Result<Option<String>>;
    fn close(&mut self);
    fn handle(&self) -> StreamHandle;
}

/// Thread-safe remote closer for a [`LineStream`].
#[derive(Clone)]
pub struct StreamHandle {
    close_fn: Arc<dyn Fn() + Send + Sync>,
}

impl StreamHandle {
    pub fn new(close_fn: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            close_fn: Arc::new(close_fn),
        }
    }

    /// Ask the stream to end. The owning consumer observes end-of-sequence
    /// on its next pull; a blocked queue take is woken.
    pub fn close(&self) {
        (self.close_fn)();
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish()
    }
}

/// A lazy sequence of text lines. Iterate to consume; errors end the
/// sequence.
pub struct LineStream {
    source: Box<dyn LineSource>,
    done: bool,
}

impl LineStream {
    pub fn new(source: impl LineSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            done: false,
        }
    }

    /// A sequence over an in-memory list of lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(VecSource {
            iter: lines
                .into_iter()
                .map(Into::into)
                .collect::<Vec<_>>()
                .into_iter(),
            canceled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The empty sequence.
    pub fn empty() -> Self {
        Self::from_lines(std::iter::empty::<String>())
    }

    /// The consumer side of a bounded queue; end-of-queue is
    /// end-of-sequence, closing detaches the reader from the feeding pump.
    pub fn from_queue(queue: Arc<BoundedQueue>) -> Self {
        Self::new(QueueSource { queue })
    }

    /// Release the backing source. Further pulls report end-of-sequence.
    pub fn close(&mut self) {
        self.done = true;
        self.source.close();
    }

    /// Remote closer usable from any thread.
    pub fn handle(&self) -> StreamHandle {
        self.source.handle()
    }

    /// Transform every line.
    pub fn map(self, f: impl FnMut(String) -> String + Send + 'static) -> Self {
        Self::new(MapSource {
            inner: self,
            f: Box::new(f),
        })
    }

    /// Keep only lines matching `pred`.
    pub fn filter(self, pred: impl FnMut(&str) -> bool + Send + 'static) -> Self {
        Self::new(FilterSource {
            inner: self,
            pred: Box::new(pred),
        })
    }
}

impl Iterator for LineStream {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                self.source.close();
                None
            }
            Err(e) => {
                self.done = true;
                self.source.close();
                Some(Err(e))
            }
        }
    }
}

impl Drop for LineStream {
    fn drop(&mut self) {
        // An abandoned stream must not wedge its backing pump.
        self.source.close();
    }
}

impl std::fmt::Debug for LineStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineStream").field("done", &self.done).finish()
    }
}

struct VecSource {
    iter: std::vec::IntoIter<String>,
    canceled: Arc<AtomicBool>,
}

impl LineSource for VecSource {
    fn next_line(&mut self) -> Result<Option<String>> {
        if self.canceled.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(self.iter.next())
    }

    fn close(&mut self) {
        self.canceled.store(true, Ordering::Release);
    }

    fn handle(&self) -> StreamHandle {
        let canceled = self.canceled.clone();
        StreamHandle::new(move || canceled.store(true, Ordering::Release))
    }
}

struct QueueSource {
    queue: Arc<BoundedQueue>,
}

impl LineSource for QueueSource {
    fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.queue.take())
    }

    fn close(&mut self) {
        self.queue.detach_reader();
    }

    fn handle(&self) -> StreamHandle {
        let queue = self.queue.clone();
        StreamHandle::new(move || queue.detach_reader())
    }
}

struct MapSource {
    inner: LineStream,
    f: Box<dyn FnMut(String) -> String + Send>,
}

impl LineSource for MapSource {
    fn next_line(&mut self) -> Result<Option<String>> {
        match self.inner.next() {
            Some(Ok(line)) => Ok(Some((self.f)(line))),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn handle(&self) -> StreamHandle {
        self.inner.handle()
    }
}

struct FilterSource {
    inner: LineStream,
    pred: Box<dyn FnMut(&str) -> bool + Send>,
}

impl LineSource for FilterSource {
    fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            match self.inner.next() {
                Some(Ok(line)) => {
                    if (self.pred)(&line) {
                        return Ok(Some(line));
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn handle(&self) -> StreamHandle {
        self.inner.handle()
    }
}
