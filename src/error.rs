use std::io;

/// Errors surfaced by process handles, streams, and pipeline combinators.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to launch `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("stream I/O failure: {0}")]
    Io(#[from] io::Error),

    #[error("pipeline stage failed: {0}")]
    Pipeline(String),

    #[error("process has not exited yet")]
    NotExited,

    #[error("process id is unavailable on this platform")]
    PidUnavailable,
}

impl Error {
    /// True when the underlying cause is a broken pipe, i.e. the peer on the
    /// other side of a stream went away.
    pub fn is_broken_pipe(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::BrokenPipe)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
