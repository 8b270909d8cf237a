//! Subprocess ownership.

use crate::{exchange, LineClient, Peer, ProtocolError, DEFAULT_MODE_FLAG};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a peer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The peer exited on its own after `end`, with this exit code if it had one.
    Graceful(Option<i32>),
    /// The peer did not exit within the grace period and was killed.
    Killed,
}

/// A live connection to a launched peer.
pub trait EngineLink: Peer {
    /// Whether the peer is still running.
    fn is_alive(&mut self) -> bool;

    /// Sends `end`, waits up to `grace`, and kills the peer if it is still running.
    fn shutdown(&mut self, grace: Duration) -> Result<ShutdownOutcome, ProtocolError>;
}

/// Starts peers.
pub trait Launcher {
    type Link: EngineLink;

    /// Launches the executable at `path`.
    ///
    /// Fails with [`ProtocolError::LaunchFailure`] when it cannot be started.
    fn launch(&self, path: &Path) -> Result<Self::Link, ProtocolError>;
}

/// A running rules or bot executable with its pipes.
///
/// The process is killed on drop if it is still running.
pub struct EngineProcess {
    path: PathBuf,
    process: Child,
    client: LineClient<BufReader<ChildStdout>, ChildStdin>,
}

impl EngineProcess {
    /// Spawns `path` with `mode_flag` as its single argument.
    ///
    /// No handshake is performed; the first command is whatever the caller
    /// sends next.
    pub fn spawn(path: &Path, mode_flag: &str) -> Result<Self, ProtocolError> {
        let launch_failure = |source| ProtocolError::LaunchFailure {
            path: path.to_path_buf(),
            source,
        };

        let mut process = Command::new(path)
            .arg(mode_flag)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(launch_failure)?;

        let (stdin, stdout) = match (process.stdin.take(), process.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(launch_failure(std::io::Error::other("pipes not connected")));
            }
        };

        debug!(path = %path.display(), pid = process.id(), "launched");

        Ok(Self {
            path: path.to_path_buf(),
            process,
            client: LineClient::new(BufReader::new(stdout), stdin),
        })
    }

    fn wait_until(&mut self, deadline: Instant) -> Result<Option<Option<i32>>, ProtocolError> {
        loop {
            if let Some(status) = self.process.try_wait()? {
                return Ok(Some(status.code()));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl Peer for EngineProcess {
    fn send(&mut self, line: &str) -> Result<(), ProtocolError> {
        self.client.send(line).map_err(|e| match e {
            ProtocolError::Io(io) if io.kind() == std::io::ErrorKind::BrokenPipe => {
                ProtocolError::PeerClosed
            }
            other => other,
        })
    }

    fn receive(&mut self) -> Result<String, ProtocolError> {
        self.client.receive()
    }
}

impl EngineLink for EngineProcess {
    fn is_alive(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    fn shutdown(&mut self, grace: Duration) -> Result<ShutdownOutcome, ProtocolError> {
        if let Err(e) = exchange::end(self) {
            debug!(path = %self.path.display(), error = %e, "end not delivered");
        }
        if let Some(code) = self.wait_until(Instant::now() + grace)? {
            return Ok(ShutdownOutcome::Graceful(code));
        }
        warn!(
            path = %self.path.display(),
            grace_ms = grace.as_millis() as u64,
            "peer did not exit in time, killing"
        );
        self.process.kill()?;
        self.process.wait()?;
        Ok(ShutdownOutcome::Killed)
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        if self.is_alive() {
            let _ = self.process.kill();
            let _ = self.process.wait();
        }
    }
}

/// Launches real executables with a fixed mode flag.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    mode_flag: String,
}

impl ProcessLauncher {
    pub fn new(mode_flag: impl Into<String>) -> Self {
        Self {
            mode_flag: mode_flag.into(),
        }
    }

    pub fn mode_flag(&self) -> &str {
        &self.mode_flag
    }
}

impl Default for ProcessLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_MODE_FLAG)
    }
}

impl Launcher for ProcessLauncher {
    type Link = EngineProcess;

    fn launch(&self, path: &Path) -> Result<EngineProcess, ProtocolError> {
        EngineProcess::spawn(path, &self.mode_flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_nonexistent_executable_is_launch_failure() {
        let result = EngineProcess::spawn(Path::new("/nonexistent/path/to/rules"), "engine");
        match result {
            Err(ProtocolError::LaunchFailure { path, .. }) => {
                assert_eq!(path, PathBuf::from("/nonexistent/path/to/rules"));
            }
            Err(other) => panic!("Expected LaunchFailure, got {}", other),
            Ok(_) => panic!("Expected LaunchFailure"),
        }
    }

    #[test]
    fn default_launcher_uses_engine_flag() {
        assert_eq!(ProcessLauncher::default().mode_flag(), "engine");
        assert_eq!(ProcessLauncher::new("bot").mode_flag(), "bot");
    }

    #[test]
    fn launcher_reports_launch_failure() {
        let launcher = ProcessLauncher::default();
        let err = launcher
            .launch(Path::new("/nonexistent/bot"))
            .err()
            .unwrap();
        assert!(err.is_launch_failure());
    }

    #[cfg(unix)]
    #[test]
    fn peer_ignoring_end_is_killed_after_grace() {
        // `cat -` echoes stdin and never exits on `end`.
        let mut link = EngineProcess::spawn(Path::new("cat"), "-").unwrap();
        link.send("ok").unwrap();
        link.expect_ok().unwrap();
        assert!(link.is_alive());
        let outcome = link.shutdown(Duration::from_millis(50)).unwrap();
        assert_eq!(outcome, ShutdownOutcome::Killed);
        assert!(!link.is_alive());
    }
}
