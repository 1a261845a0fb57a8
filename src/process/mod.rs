//! Running an external command with streamed standard streams.
//!
//! A [`ProcessHandle`] launches one child process under a [`Shell`] and
//! exposes its three standard streams as line endpoints: two lazy
//! [`LineStream`]s (stdout, stderr) and one [`WriterSink`] (stdin). A
//! [`Config`] binds those endpoints to user sequences, transforms, and
//! sinks; [`ProcessHandle::selector`] wires them into a [`Selector`] whose
//! completion rule is the pipeline's completion rule: the stdout route is
//! critical, stdin and stderr are not.

pub mod config;
pub mod shell;

use std::process::{Child, Command, Stdio};
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::lineio::{line_writer, lines, WriterHandle, WriterSink};
use crate::selector::{Route, Selector};
use crate::stream::{LineStream, StreamHandle};

pub use config::Config;
pub use shell::Shell;

/// Exit state of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    /// Non-zero exit code.
    Error(i32),
    /// Terminated by a signal (unix only).
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        matches!(self, ExitStatus::Success)
    }

    /// The OS exit code, unchanged. `None` for signal termination.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Success => Some(0),
            ExitStatus::Error(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }
}

fn map_exit_status(status: std::process::ExitStatus) -> ExitStatus {
    if status.success() {
        return ExitStatus::Success;
    }
    if let Some(code) = status.code() {
        return ExitStatus::Error(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitStatus::Signal(signal);
        }
    }
    ExitStatus::Error(1)
}

/// A launched child process with line-oriented stream endpoints.
///
/// Endpoints are single-consumption: taking `stdout()` (or `stderr()`, or
/// `stdin()`) moves the endpoint out of the handle, and `selector()` builds
/// from whichever endpoints are still present. First consumer wins.
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    shell: Shell,
    command: String,
    started: Instant,
    stdin: Option<WriterSink>,
    stdout: Option<LineStream>,
    stderr: Option<LineStream>,
    config: Option<Config>,
    stdin_handle: WriterHandle,
    stdout_handle: StreamHandle,
    stderr_handle: StreamHandle,
}

impl ProcessHandle {
    /// Launch `command` under `shell` with all three standard streams
    /// piped. argv is `[shell.program, shell.options..., command]`; the
    /// command text is never re-split. Environment and working directory
    /// are inherited.
    pub fn spawn(shell: Shell, command: impl Into<String>, config: Config) -> Result<Self> {
        let command = command.into();
        let started = Instant::now();

        debug!(shell = %shell, command = %command, "launching process");
        let mut child = Command::new(shell.program())
            .args(shell.options())
            .arg(&command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Launch {
                command: format!("{shell} {command}"),
                source: e,
            })?;

        let stdin_pipe = child
            .stdin
            .take()
            .ok_or_else(|| Error::Pipeline("child stdin was not captured".to_string()))?;
        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| Error::Pipeline("child stdout was not captured".to_string()))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| Error::Pipeline("child stderr was not captured".to_string()))?;

        let stdin = line_writer(stdin_pipe, config.encoding);
        let stdout = lines(stdout_pipe, config.encoding);
        let stderr = lines(stderr_pipe, config.encoding);

        let stdin_handle = stdin.handle();
        let stdout_handle = stdout.handle();
        let stderr_handle = stderr.handle();

        Ok(Self {
            child,
            shell,
            command,
            started,
            stdin: Some(stdin),
            stdout: Some(stdout),
            stderr: Some(stderr),
            config: Some(config),
            stdin_handle,
            stdout_handle,
            stderr_handle,
        })
    }

    /// The child's stdout as a raw (pre-transform) line sequence.
    pub fn stdout(&mut self) -> Option<LineStream> {
        self.stdout.take()
    }

    /// The child's stderr as a raw (pre-transform) line sequence.
    pub fn stderr(&mut self) -> Option<LineStream> {
        self.stderr.take()
    }

    /// The line consumer feeding the child's stdin.
    pub fn stdin(&mut self) -> Option<WriterSink> {
        self.stdin.take()
    }

    /// Build the selector wired per the handle's [`Config`]: the configured
    /// stdin sequence feeds the child (non-critical), transformed stdout
    /// feeds `stdout_sink` (critical), transformed stderr feeds
    /// `stderr_sink` (non-critical). Config transforms are applied here and
    /// only here.
    ///
    /// Can be built once, and only while all three endpoints are still in
    /// the handle.
    pub fn selector(&mut self) -> Result<Selector> {
        let config = self
            .config
            .take()
            .ok_or_else(|| Error::Pipeline("selector already built".to_string()))?;
        let taken = |what: &str| Error::Pipeline(format!("{what} endpoint already taken"));
        let stdin_sink = self.stdin.take().ok_or_else(|| taken("stdin"))?;
        let stdout = self.stdout.take().ok_or_else(|| taken("stdout"))?;
        let stderr = self.stderr.take().ok_or_else(|| taken("stderr"))?;

        Ok(Selector::with_routes(vec![
            Route::new(config.stdin, stdin_sink, false).with_label("stdin"),
            Route::new((config.stdout_transform)(stdout), config.stdout_sink, true)
                .with_label("stdout"),
            Route::new((config.stderr_transform)(stderr), config.stderr_sink, false)
                .with_label("stderr"),
        ]))
    }

    /// Block until the child exits; the OS exit status is returned
    /// unchanged.
    pub fn wait(&mut self) -> Result<ExitStatus> {
        let status = map_exit_status(self.child.wait()?);
        debug!(
            process = %self,
            elapsed = ?self.started.elapsed(),
            ?status,
            "process exited"
        );
        Ok(status)
    }

    /// The exit status if the child has already exited, otherwise
    /// [`Error::NotExited`].
    pub fn exit_status(&mut self) -> Result<ExitStatus> {
        match self.child.try_wait()? {
            Some(status) => Ok(map_exit_status(status)),
            None => Err(Error::NotExited),
        }
    }

    /// Signal the child, then close the stream endpoints in fixed order:
    /// stdin first, then stdout, then stderr. Every step runs even if an
    /// earlier one failed; secondary errors are logged, not returned.
    pub fn destroy(&mut self) {
        debug!(process = %self, "destroy: begin");
        if let Err(e) = self.child.kill() {
            warn!(process = %self, "kill failed: {e}");
        }
        self.stdin_handle.finish();
        self.stdin = None;
        self.stdout_handle.close();
        self.stdout = None;
        self.stderr_handle.close();
        self.stderr = None;
        debug!(process = %self, "destroy: end");
    }

    /// Best-effort OS process id. Platforms without a meaningful id report
    /// [`Error::PidUnavailable`]; every platform the standard library's
    /// process accessor supports returns `Ok`.
    pub fn pid(&self) -> Result<u32> {
        Ok(self.child.id())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn shell(&self) -> &Shell {
        &self.shell
    }
}

impl std::fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.shell, self.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn exit_status_maps_codes_and_signals() {
        use std::os::unix::process::ExitStatusExt;

        let ok = std::process::ExitStatus::from_raw(0);
        assert_eq!(map_exit_status(ok), ExitStatus::Success);
        assert_eq!(map_exit_status(ok).code(), Some(0));

        // Wait status 0x0100 is "exited with code 1".
        let failed = std::process::ExitStatus::from_raw(0x0100);
        assert_eq!(map_exit_status(failed), ExitStatus::Error(1));

        // Wait status 9 is "killed by SIGKILL".
        let killed = std::process::ExitStatus::from_raw(9);
        assert_eq!(map_exit_status(killed), ExitStatus::Signal(9));
        assert_eq!(map_exit_status(killed).code(), None);
    }

    #[cfg(unix)]
    #[test]
    fn spawn_failure_is_a_launch_error() {
        let err = ProcessHandle::spawn(
            Shell::new("/nonexistent/interpreter", ["-c"]),
            "true",
            Config::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Launch { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_before_exit_is_not_exited() {
        let mut handle =
            ProcessHandle::spawn(Shell::local(), "sleep 5", Config::default()).unwrap();
        assert!(matches!(handle.exit_status(), Err(Error::NotExited)));
        handle.destroy();
        let _ = handle.wait();
    }

    #[cfg(unix)]
    #[test]
    fn pid_is_available() {
        let mut handle = ProcessHandle::spawn(Shell::local(), "true", Config::default()).unwrap();
        assert!(handle.pid().unwrap() > 0);
        let _ = handle.wait();
    }
}
