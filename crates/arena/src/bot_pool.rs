//! Long-lived bot processes, keyed by executable path.
//!
//! A bot is launched the first time it is asked for a move and then reused
//! for every later request until the pool is released. Two slots pointing
//! at the same executable share one process.

use chess_core::MoveToken;
use engine_protocol::{
    exchange, BotReply, EngineLink, Evaluation, Launcher, ProtocolError, SearchDepth,
    ShutdownOutcome,
};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from the bot pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The bot executable could not be started.
    #[error("bot {} could not be launched: {source}", path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: ProtocolError,
    },

    /// The bot failed while answering.
    #[error("bot {} failed: {source}", path.display())]
    Exchange {
        path: PathBuf,
        #[source]
        source: ProtocolError,
    },
}

impl PoolError {
    pub fn path(&self) -> &Path {
        match self {
            PoolError::Launch { path, .. } | PoolError::Exchange { path, .. } => path,
        }
    }

    pub fn is_launch_failure(&self) -> bool {
        matches!(self, PoolError::Launch { .. })
    }
}

/// Lifecycle of a pooled bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Launched; has not answered yet.
    Starting,
    /// Answered at least one request.
    Ready,
    Faulted,
    Terminating,
}

/// One running bot and what it last reported.
pub struct BotHandle<K> {
    link: K,
    state: HandleState,
    last_depth: Option<SearchDepth>,
    last_eval: Option<Evaluation>,
}

impl<K: EngineLink> BotHandle<K> {
    fn new(link: K) -> Self {
        Self {
            link,
            state: HandleState::Starting,
            last_depth: None,
            last_eval: None,
        }
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Depth of the last search; `None` until the bot has reported one.
    pub fn last_depth(&self) -> Option<SearchDepth> {
        self.last_depth
    }

    /// Evaluation of the last search; `None` until the bot has reported one.
    pub fn last_eval(&self) -> Option<Evaluation> {
        self.last_eval
    }

    fn ask(
        &mut self,
        opening: &str,
        history: &[MoveToken],
        budget_ms: u64,
    ) -> Result<BotReply, ProtocolError> {
        exchange::set_position(&mut self.link, opening, history)?;
        let reply = exchange::get_move(&mut self.link, budget_ms)?;
        if reply.depth.is_some() {
            self.last_depth = reply.depth;
        }
        if reply.eval.is_some() {
            self.last_eval = reply.eval;
        }
        Ok(reply)
    }
}

/// Registry of running bots.
pub struct BotPool<L: Launcher> {
    launcher: L,
    grace: Duration,
    handles: HashMap<PathBuf, BotHandle<L::Link>>,
}

impl<L: Launcher> BotPool<L> {
    /// `grace` bounds how long each bot may take to exit on release.
    pub fn new(launcher: L, grace: Duration) -> Self {
        Self {
            launcher,
            grace,
            handles: HashMap::new(),
        }
    }

    /// Returns the running bot for `path`, launching it if needed.
    ///
    /// A handle that faulted or whose process has exited is replaced.
    pub fn acquire(&mut self, path: &Path) -> Result<&mut BotHandle<L::Link>, PoolError> {
        let reusable = match self.handles.get_mut(path) {
            Some(handle) => {
                matches!(handle.state, HandleState::Starting | HandleState::Ready)
                    && handle.link.is_alive()
            }
            None => false,
        };
        if !reusable {
            if let Some(stale) = self.handles.remove(path) {
                debug!(path = %path.display(), state = ?stale.state, "replacing bot");
                Self::terminate(path, stale, self.grace);
            }
        }
        match self.handles.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let link = self.launcher.launch(path).map_err(|source| PoolError::Launch {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), "bot started");
                Ok(entry.insert(BotHandle::new(link)))
            }
        }
    }

    /// Replays the position into the bot for `path` and asks for a move.
    ///
    /// On failure the handle is marked [`HandleState::Faulted`] and the error
    /// returned; nothing is retried here.
    pub fn ask_move(
        &mut self,
        path: &Path,
        opening: &str,
        history: &[MoveToken],
        budget_ms: u64,
    ) -> Result<BotReply, PoolError> {
        let handle = self.acquire(path)?;
        match handle.ask(opening, history, budget_ms) {
            Ok(reply) => {
                handle.state = HandleState::Ready;
                Ok(reply)
            }
            Err(source) => {
                handle.state = HandleState::Faulted;
                Err(PoolError::Exchange {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    /// Shuts every bot down and empties the registry.
    ///
    /// Each bot gets `end` and the grace period; stragglers are killed.
    /// Returns how many bots were released.
    pub fn release_all(&mut self) -> usize {
        let released = self.handles.len();
        for (path, handle) in self.handles.drain() {
            Self::terminate(&path, handle, self.grace);
        }
        if released > 0 {
            debug!(released, "bot pool cleared");
        }
        released
    }

    fn terminate(path: &Path, mut handle: BotHandle<L::Link>, grace: Duration) {
        handle.state = HandleState::Terminating;
        match handle.link.shutdown(grace) {
            Ok(ShutdownOutcome::Graceful(_)) => {}
            Ok(ShutdownOutcome::Killed) => {
                warn!(path = %path.display(), "bot killed after grace period")
            }
            Err(e) => warn!(path = %path.display(), error = %e, "bot shutdown failed"),
        }
    }

    pub fn get(&self, path: &Path) -> Option<&BotHandle<L::Link>> {
        self.handles.get(path)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

impl<L: Launcher> Drop for BotPool<L> {
    fn drop(&mut self) {
        self.release_all();
    }
}
