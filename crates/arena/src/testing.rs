//! Scripted in-memory peers.

use crate::rules::{RulesBackend, RulesError, RulesReport};
use chess_core::{MoveToken, Position};
use engine_protocol::{
    EngineLink, Launcher, Peer, ProtocolError, Request, ShutdownOutcome, TerminalState,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

/// Answers one decoded request. `None` makes the peer crash.
pub type Responder = Box<dyn FnMut(&Request) -> Option<Vec<String>>>;

pub type RequestLog = Rc<RefCell<Vec<(PathBuf, Request)>>>;

/// A peer that decodes what it is sent and answers from a [`Responder`].
pub struct ScriptedLink {
    path: PathBuf,
    pending: Option<String>,
    outbox: VecDeque<String>,
    responder: Responder,
    alive: bool,
    ignores_end: bool,
    log: RequestLog,
}

impl ScriptedLink {
    pub fn new(responder: Responder) -> Self {
        Self {
            path: PathBuf::new(),
            pending: None,
            outbox: VecDeque::new(),
            responder,
            alive: true,
            ignores_end: false,
            log: Rc::default(),
        }
    }

    /// Keeps running after `end` until it is killed.
    pub fn ignoring_end(mut self) -> Self {
        self.ignores_end = true;
        self
    }
}

impl Peer for ScriptedLink {
    fn send(&mut self, line: &str) -> Result<(), ProtocolError> {
        if !self.alive {
            return Err(ProtocolError::PeerClosed);
        }
        let request = match self.pending.take() {
            Some(command) => Request::parse(&command, Some(line))?,
            None if Request::takes_payload(line)? => {
                self.pending = Some(line.to_string());
                return Ok(());
            }
            None => Request::parse(line, None)?,
        };
        self.log
            .borrow_mut()
            .push((self.path.clone(), request.clone()));
        if request == Request::End {
            self.alive = self.ignores_end;
            return Ok(());
        }
        match (self.responder)(&request) {
            Some(lines) => self.outbox.extend(lines),
            None => {
                self.alive = false;
                self.outbox.clear();
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> Result<String, ProtocolError> {
        self.outbox.pop_front().ok_or(ProtocolError::PeerClosed)
    }
}

impl EngineLink for ScriptedLink {
    fn is_alive(&mut self) -> bool {
        self.alive
    }

    fn shutdown(&mut self, _grace: Duration) -> Result<ShutdownOutcome, ProtocolError> {
        if !self.alive {
            return Ok(ShutdownOutcome::Graceful(None));
        }
        self.send("end")?;
        if self.alive {
            self.alive = false;
            Ok(ShutdownOutcome::Killed)
        } else {
            Ok(ShutdownOutcome::Graceful(Some(0)))
        }
    }
}

type Factory = Box<dyn Fn(&Path) -> Result<ScriptedLink, ProtocolError>>;

/// Hands out [`ScriptedLink`]s and records every launch and request.
pub struct ScriptedLauncher {
    factory: Factory,
    launches: Rc<Cell<usize>>,
    log: RequestLog,
}

impl ScriptedLauncher {
    pub fn new(
        factory: impl Fn(&Path) -> Result<ScriptedLink, ProtocolError> + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            launches: Rc::default(),
            log: Rc::default(),
        }
    }

    pub fn launches(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.launches)
    }

    pub fn requests(&self) -> RequestLog {
        Rc::clone(&self.log)
    }
}

impl Launcher for ScriptedLauncher {
    type Link = ScriptedLink;

    fn launch(&self, path: &Path) -> Result<ScriptedLink, ProtocolError> {
        let mut link = (self.factory)(path)?;
        self.launches.set(self.launches.get() + 1);
        link.path = path.to_path_buf();
        link.log = Rc::clone(&self.log);
        Ok(link)
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A rules peer with fixed answers.
pub fn rules_responder(
    legal: &[&str],
    notation: &str,
    state: Option<TerminalState>,
) -> Responder {
    let mut moves = lines(legal);
    moves.push("ok".to_string());
    let notation = notation.to_string();
    Box::new(move |request| {
        Some(match request {
            Request::GetMoves => moves.clone(),
            Request::GetFen => vec![notation.clone(), "ok".to_string()],
            Request::GetState => match state {
                Some(s) => vec![s.label().to_string(), "ok".to_string()],
                None => vec!["ok".to_string()],
            },
            _ => vec!["ok".to_string()],
        })
    })
}

/// A bot peer whose `getmove` answer is chosen from the history it was given.
pub fn bot_responder(
    mut answer: impl FnMut(&[MoveToken]) -> Option<Vec<String>> + 'static,
) -> Responder {
    let mut history = Vec::new();
    Box::new(move |request| match request {
        Request::SetMoveHistory(h) => {
            history = h.clone();
            Some(vec!["ok".to_string()])
        }
        Request::GetMove { .. } => answer(&history),
        _ => Some(vec!["ok".to_string()]),
    })
}

/// A bot that always answers `mv` with depth and eval.
pub fn steady_bot(mv: &'static str) -> Responder {
    bot_responder(move |_| Some(lines(&[mv, "4", "15", "ok"])))
}

/// An in-process rules backend.
///
/// Every position offers the same legal moves and flips the side to move
/// per ply. Optionally the game ends once the history reaches a length.
pub struct FakeRules {
    legal: Vec<MoveToken>,
    end: Option<(usize, TerminalState)>,
    failures: Cell<usize>,
    unlaunchable: Cell<bool>,
    queries: Cell<usize>,
}

impl FakeRules {
    pub fn new(legal: &[&str]) -> Self {
        Self {
            legal: legal.iter().map(|t| t.parse().unwrap()).collect(),
            end: None,
            failures: Cell::new(0),
            unlaunchable: Cell::new(false),
            queries: Cell::new(0),
        }
    }

    pub fn ending_after(mut self, plies: usize, state: TerminalState) -> Self {
        self.end = Some((plies, state));
        self
    }

    /// Makes the next `n` queries fail as if the process crashed.
    pub fn fail_next(&self, n: usize) {
        self.failures.set(n);
    }

    /// Makes every later query fail as if the executable were missing.
    pub fn fail_launch(&self) {
        self.unlaunchable.set(true);
    }

    pub fn queries(&self) -> usize {
        self.queries.get()
    }
}

impl RulesBackend for FakeRules {
    fn query(&self, opening: &str, history: &[MoveToken]) -> Result<RulesReport, RulesError> {
        self.queries.set(self.queries.get() + 1);
        if self.unlaunchable.get() {
            return Err(ProtocolError::LaunchFailure {
                path: PathBuf::from("rules"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
            }
            .into());
        }
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Err(ProtocolError::PeerClosed.into());
        }
        let mut position = Position::decode(opening)?;
        if history.len() % 2 == 1 {
            position.side_to_move = position.side_to_move.opposite();
        }
        let state = match self.end {
            Some((plies, state)) if history.len() >= plies => Some(state),
            _ => None,
        };
        let legal_moves = if state.is_some() {
            Vec::new()
        } else {
            self.legal.clone()
        };
        Ok(RulesReport {
            position,
            legal_moves,
            state,
        })
    }
}
