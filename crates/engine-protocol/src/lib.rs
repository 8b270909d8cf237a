//! Line protocol spoken by rules and bot executables.
//!
//! Every exchange is plain text over the peer's stdin/stdout. Commands are
//! bare words on their own line; payloads follow on the next line, and
//! multi-line answers are terminated by the sentinel line `ok`.
//!
//! # Commands
//!
//! - `setfen` + notation line, answered by `ok`
//! - `setmovehistory` + space-joined move tokens (possibly empty), answered by `ok`
//! - `getmoves` - one legal move per line, then `ok`
//! - `getfen` - the canonical notation, then `ok`
//! - `getstate` - a terminal-state label then `ok`, or just `ok` when the game goes on
//! - `getmove` + thinking budget in milliseconds - move, optional depth, optional eval, `ok`
//! - `end` - the peer exits
//!
//! # Layers
//!
//! - [`Peer`] and [`LineClient`] move single lines
//! - [`Request`] encodes and decodes commands
//! - [`exchange`] reads each kind of answer
//! - [`EngineProcess`] and [`ProcessLauncher`] own the subprocess

mod client;
pub mod exchange;
mod process;
mod reply;
mod request;

pub use client::{LineClient, Peer};
pub use process::{EngineLink, EngineProcess, Launcher, ProcessLauncher, ShutdownOutcome};
pub use reply::{BotReply, Evaluation, SearchDepth, TerminalState};
pub use request::Request;

use std::path::PathBuf;
use thiserror::Error;

/// The acknowledgement / terminator line.
pub const OK: &str = "ok";

/// Mode flag passed as the only argument to every launched executable.
pub const DEFAULT_MODE_FLAG: &str = "engine";

#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The peer's output ended while a line was expected.
    #[error("peer closed its output")]
    PeerClosed,
    /// The peer sent something other than what the exchange requires.
    #[error("protocol violation: expected {expected}, got {got:?}")]
    Violation { expected: String, got: String },
    /// The executable could not be started.
    #[error("failed to launch {path}: {source}")]
    LaunchFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    pub(crate) fn violation(expected: impl Into<String>, got: impl Into<String>) -> Self {
        ProtocolError::Violation {
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// True when the executable never started.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ProtocolError::LaunchFailure { .. })
    }
}
