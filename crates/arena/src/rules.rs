//! Rules queries.
//!
//! Every query launches a fresh rules process, replays the opening and the
//! move history into it, reads back legal moves, the resulting position and
//! the terminal state, and tells it to exit. Nothing is cached between
//! queries.

use chess_core::{MoveToken, NotationError, Position};
use engine_protocol::{exchange, EngineLink, Launcher, ProtocolError, ShutdownOutcome, TerminalState};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from a rules query.
#[derive(Debug, Error)]
pub enum RulesError {
    /// The conversation with the rules process failed.
    #[error("rules query failed: {0}")]
    Protocol(#[from] ProtocolError),

    /// The rules process answered with notation that does not decode.
    ///
    /// This means front end and rules backend disagree about the board, so
    /// callers should not try to carry on.
    #[error("rules backend returned {0}")]
    Notation(#[from] NotationError),
}

impl RulesError {
    /// True for errors that leave the board out of sync with the backend.
    pub fn is_desync(&self) -> bool {
        matches!(self, RulesError::Notation(_))
    }

    /// True when the rules executable could not be started at all.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, RulesError::Protocol(e) if e.is_launch_failure())
    }
}

/// Everything one rules query reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesReport {
    pub position: Position,
    pub legal_moves: Vec<MoveToken>,
    pub state: Option<TerminalState>,
}

/// Something that answers rules queries.
pub trait RulesBackend {
    /// Derives the position after `history` has been played from `opening`.
    fn query(&self, opening: &str, history: &[MoveToken]) -> Result<RulesReport, RulesError>;
}

impl<T: RulesBackend + ?Sized> RulesBackend for &T {
    fn query(&self, opening: &str, history: &[MoveToken]) -> Result<RulesReport, RulesError> {
        (**self).query(opening, history)
    }
}

const DEFAULT_GRACE: Duration = Duration::from_millis(1000);

/// Runs rules queries against an executable, one process per query.
pub struct RulesSession<L: Launcher> {
    launcher: L,
    path: PathBuf,
    grace: Duration,
}

impl<L: Launcher> RulesSession<L> {
    pub fn new(launcher: L, path: impl Into<PathBuf>) -> Self {
        Self {
            launcher,
            path: path.into(),
            grace: DEFAULT_GRACE,
        }
    }

    /// How long a rules process may take to exit after `end` before it is killed.
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<L: Launcher> RulesBackend for RulesSession<L> {
    fn query(&self, opening: &str, history: &[MoveToken]) -> Result<RulesReport, RulesError> {
        // On any error the link is dropped here, which reaps the process.
        let mut link = self.launcher.launch(&self.path)?;

        exchange::set_position(&mut link, opening, history)?;
        let legal_moves = exchange::get_moves(&mut link)?;
        let notation = exchange::get_fen(&mut link)?;
        let state = exchange::get_state(&mut link)?;

        match link.shutdown(self.grace) {
            Ok(ShutdownOutcome::Graceful(Some(0) | None)) => {}
            Ok(ShutdownOutcome::Graceful(Some(code))) => {
                warn!(path = %self.path.display(), code, "rules process exited with non-zero status")
            }
            Ok(ShutdownOutcome::Killed) => {
                warn!(path = %self.path.display(), "rules process ignored end and was killed")
            }
            Err(e) => warn!(path = %self.path.display(), error = %e, "rules process did not exit cleanly"),
        }

        let position = Position::decode(&notation)?;
        debug!(
            plies = history.len(),
            legal = legal_moves.len(),
            state = ?state,
            "rules query"
        );

        Ok(RulesReport {
            position,
            legal_moves,
            state,
        })
    }
}
