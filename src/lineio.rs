//! Byte stream ↔ line sequence adapters.
//!
//! [`lines`] wraps a byte source into a lazy [`LineStream`], one text line
//! per pull, buffered. [`line_writer`] wraps a byte sink into a
//! [`WriterSink`] that writes one newline-terminated line per `accept` and
//! closes the sink on `finish`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::sink::LineSink;
use crate::stream::{LineSource, LineStream, StreamHandle};

/// How stream bytes become text. Everything in and out is UTF-8; the two
/// modes differ only in how invalid input bytes are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Invalid bytes become U+FFFD replacement characters.
    #[default]
    Utf8Lossy,
    /// Invalid bytes are an I/O failure.
    Utf8,
}

impl Encoding {
    fn decode(self, bytes: Vec<u8>) -> Result<String> {
        match self {
            Encoding::Utf8Lossy => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Encoding::Utf8 => String::from_utf8(bytes).map_err(|e| {
                Error::Io(io::Error::new(io::ErrorKind::InvalidData, e))
            }),
        }
    }

    fn encode(self, line: &str) -> &[u8] {
        line.as_bytes()
    }
}

/// Lazy line sequence over a byte source. The source is dropped (closed) at
/// end-of-sequence or when the stream is closed; a remote
/// [`StreamHandle::close`] takes effect at the next line boundary.
pub fn lines(reader: impl Read + Send + 'static, encoding: Encoding) -> LineStream {
    LineStream::new(ReaderSource {
        reader: Some(BufReader::new(Box::new(reader) as Box<dyn Read + Send>)),
        encoding,
        canceled: Arc::new(AtomicBool::new(false)),
    })
}

struct ReaderSource {
    reader: Option<BufReader<Box<dyn Read + Send>>>,
    encoding: Encoding,
    canceled: Arc<AtomicBool>,
}

impl LineSource for ReaderSource {
    fn next_line(&mut self) -> Result<Option<String>> {
        if self.canceled.load(Ordering::Acquire) {
            self.reader = None;
            return Ok(None);
        }
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        let n = reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            self.reader = None;
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        self.encoding.decode(buf).map(Some)
    }

    fn close(&mut self) {
        self.canceled.store(true, Ordering::Release);
        self.reader = None;
    }

    fn handle(&self) -> StreamHandle {
        let canceled = self.canceled.clone();
        StreamHandle::new(move || canceled.store(true, Ordering::Release))
    }
}

/// Line consumer over a byte sink. Each accepted line is written with one
/// `\n` appended and flushed; `finish` closes the sink and is idempotent.
pub struct WriterSink {
    inner: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
    encoding: Encoding,
}

/// Remote closer for a [`WriterSink`], usable from any thread.
#[derive(Clone)]
pub struct WriterHandle {
    inner: Arc<Mutex<Option<Box<dyn Write + Send>>>>,
}

impl std::fmt::Debug for WriterSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSink").finish()
    }
}

impl std::fmt::Debug for WriterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterHandle").finish()
    }
}

impl WriterHandle {
    /// Flush and close the sink. Harmless when already finished.
    pub fn finish(&self) {
        if let Some(mut writer) = self.inner.lock().take() {
            if let Err(e) = writer.flush() {
                tracing::debug!("flush on finish failed: {e}");
            }
        }
    }
}

pub fn line_writer(writer: impl Write + Send + 'static, encoding: Encoding) -> WriterSink {
    WriterSink {
        inner: Arc::new(Mutex::new(Some(Box::new(writer) as Box<dyn Write + Send>))),
        encoding,
    }
}

impl WriterSink {
    pub fn handle(&self) -> WriterHandle {
        WriterHandle {
            inner: self.inner.clone(),
        }
    }
}

impl LineSink for WriterSink {
    fn accept(&mut self, line: String) -> Result<()> {
        let mut slot = self.inner.lock();
        let writer = slot
            .as_mut()
            .ok_or_else(|| Error::Pipeline("write after sink was finished".to_string()))?;
        writer.write_all(self.encoding.encode(&line))?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.inner.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }
}
