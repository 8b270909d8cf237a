//! Games between two slots, each a human or a bot.
//!
//! The [`Controller`] is driven one [`Controller::step`] at a time from a
//! single loop. Each step does at most one blocking exchange: a rules query,
//! or one bot request with its retries. A stop flag is checked at the top of
//! every step and between retries, so an in-flight bot request always runs
//! to completion.
//!
//! Outside a tournament the same controller serves free play: a human
//! proposes moves, a bot can be asked for the side to move, and positions
//! can be loaded, reset, stepped through and taken back.

use crate::board::Board;
use crate::bot_pool::BotPool;
use crate::game_log::GameLog;
use crate::openings::Openings;
use crate::resolver::MoveResolver;
use crate::rules::{RulesBackend, RulesError};
use chess_core::{Color, MoveToken, NotationError, Position, PromotionPiece, Square};
use engine_protocol::{Evaluation, Launcher, SearchDepth, TerminalState};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Rules failures in a row after which a tournament is given up.
pub const RULES_FAILURE_LIMIT: u32 = 5;

/// Errors surfaced to the front end.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A rules query failed. Returned from [`Controller::step`] only when
    /// the backend's notation could not be decoded.
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error("not allowed while a tournament is running")]
    TournamentRunning,

    #[error("no bot plays {0}")]
    NoBotForSide(Color),

    #[error("it is not a human's turn")]
    NotHumanTurn,

    #[error("a tournament needs at least one game")]
    NoGames,

    #[error("invalid position: {0}")]
    InvalidNotation(#[from] NotationError),
}

/// One of the two seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    const fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::A => f.write_str("Bot A"),
            SlotId::B => f.write_str("Bot B"),
        }
    }
}

/// Who sits in a slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Slot {
    #[default]
    Human,
    Bot(PathBuf),
}

impl Slot {
    pub fn bot_path(&self) -> Option<&Path> {
        match self {
            Slot::Human => None,
            Slot::Bot(path) => Some(path),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Human => f.write_str("Human"),
            Slot::Bot(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Where the controller is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No tournament; free play.
    Idle,
    /// Waiting for the side to move to produce a move.
    AwaitingMove,
    /// A move is being appended and checked with the rules backend.
    ApplyingMove,
    /// The current game has ended and has not been booked yet.
    GameOver(TerminalState),
    /// The tournament finished or was stopped.
    Stopped,
}

/// How a game ended, from the seats' point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    Win { slot: SlotId, color: Color },
    Draw(TerminalState),
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Win { slot, color } => write!(f, "{} wins as {}", slot, color),
            GameResult::Draw(reason) => write!(f, "Draw ({})", reason),
        }
    }
}

/// Score of the tournament in progress, from slot A's point of view.
///
/// `wins + draws + losses == games_played` after every booked game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRecord {
    pub opening_index: usize,
    pub a_plays_white: bool,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub games_played: u32,
    pub games_requested: u32,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self::new(0)
    }
}

impl GameRecord {
    pub fn new(games_requested: u32) -> Self {
        Self {
            opening_index: 0,
            a_plays_white: true,
            wins: 0,
            draws: 0,
            losses: 0,
            games_played: 0,
            games_requested,
        }
    }

    /// The slot playing `color` in the current game.
    pub fn slot_for(&self, color: Color) -> SlotId {
        if (color == Color::White) == self.a_plays_white {
            SlotId::A
        } else {
            SlotId::B
        }
    }

    pub fn color_of(&self, slot: SlotId) -> Color {
        match (slot, self.a_plays_white) {
            (SlotId::A, true) | (SlotId::B, false) => Color::White,
            _ => Color::Black,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.games_played >= self.games_requested
    }

    /// Books a finished game. The side to move in a checkmate has lost.
    fn book(&mut self, reason: TerminalState, side_to_move: Color) -> GameResult {
        self.games_played += 1;
        if !reason.is_decisive() {
            self.draws += 1;
            return GameResult::Draw(reason);
        }
        let winner = side_to_move.opposite();
        let slot = self.slot_for(winner);
        match slot {
            SlotId::A => self.wins += 1,
            SlotId::B => self.losses += 1,
        }
        GameResult::Win {
            slot,
            color: winner,
        }
    }
}

/// Outcome of a user pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// No legal move has that origin and destination.
    Rejected,
    /// The move was played; the game may have ended with it.
    Played {
        mv: MoveToken,
        state: Option<TerminalState>,
    },
    /// The rules backend failed; the move was taken back.
    Stalled,
}

/// Something the front end should show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A game ended. `result` is set for tournament games.
    GameOver {
        reason: TerminalState,
        result: Option<GameResult>,
    },
    /// A bot could not be started; its slot is empty again.
    NoBotSelected { slot: SlotId, path: PathBuf },
    /// The requested number of games has been played.
    TournamentFinished(GameRecord),
    /// The rules backend could not be started or kept failing; the
    /// tournament was stopped.
    RulesUnavailable { failures: u32, reason: String },
}

/// Owns the board, the bots and the tournament state.
pub struct Controller<R: RulesBackend, L: Launcher> {
    rules: R,
    pool: BotPool<L>,
    openings: Openings,
    board: Board,
    slots: [Slot; 2],
    record: GameRecord,
    phase: Phase,
    think_ms: u64,
    bot_failures: u64,
    rules_failures: u32,
    log: Option<GameLog>,
    stop: Arc<AtomicBool>,
    notices: VecDeque<Notice>,
}

impl<R: RulesBackend, L: Launcher> Controller<R, L> {
    /// Sets up free play at the first opening and queries the rules once.
    ///
    /// A failing rules query is logged and leaves the board stale; only
    /// undecodable notation is an error.
    pub fn new(
        rules: R,
        pool: BotPool<L>,
        openings: Openings,
        think_ms: u64,
    ) -> Result<Self, ControllerError> {
        let board = Board::new(openings.current())?;
        let mut controller = Self {
            rules,
            pool,
            openings,
            board,
            slots: [Slot::Human, Slot::Human],
            record: GameRecord::default(),
            phase: Phase::Idle,
            think_ms,
            bot_failures: 0,
            rules_failures: 0,
            log: None,
            stop: Arc::new(AtomicBool::new(false)),
            notices: VecDeque::new(),
        };
        controller.refresh()?;
        Ok(controller)
    }

    /// Writes tournament events to `log`.
    pub fn with_log(mut self, log: GameLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Shares `flag` as the stop signal, e.g. with a Ctrl-C handler.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = flag;
        self
    }

    /// Flag that stops a running tournament at the next check.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn record(&self) -> &GameRecord {
        &self.record
    }

    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.index()]
    }

    pub fn openings(&self) -> &Openings {
        &self.openings
    }

    /// Failed bot requests since the tournament started.
    pub fn bot_failures(&self) -> u64 {
        self.bot_failures
    }

    /// Rules queries that have failed in a row.
    pub fn rules_failures(&self) -> u32 {
        self.rules_failures
    }

    /// Last depth and evaluation reported by the bot in `id`.
    pub fn diagnostics(&self, id: SlotId) -> (Option<SearchDepth>, Option<Evaluation>) {
        self.slot(id)
            .bot_path()
            .and_then(|path| self.pool.get(path))
            .map_or((None, None), |h| (h.last_depth(), h.last_eval()))
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.phase,
            Phase::AwaitingMove | Phase::ApplyingMove | Phase::GameOver(_)
        )
    }

    /// The slot whose turn it is.
    pub fn slot_to_move(&self) -> SlotId {
        self.record.slot_for(self.board.position().side_to_move)
    }

    /// True when the side to move is a human and the board can take a move.
    pub fn awaiting_human(&self) -> bool {
        self.phase != Phase::Stopped
            && self.board.state().is_none()
            && !self.board.is_stale()
            && self.slot(self.slot_to_move()) == &Slot::Human
    }

    /// True in free play when the side to move is a bot and the game goes on.
    pub fn bot_to_move(&self) -> bool {
        self.phase == Phase::Idle
            && self.board.state().is_none()
            && self.slot(self.slot_to_move()).bot_path().is_some()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn set_slot(&mut self, id: SlotId, slot: Slot) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        info!(slot = %id, assigned = %slot, "slot assigned");
        self.slots[id.index()] = slot;
        Ok(())
    }

    /// Starts a tournament of `games` games.
    ///
    /// Counters are reset, the rotation starts over with slot A playing
    /// white, the bots are released, and the first position is queried.
    pub fn start(&mut self, games: u32) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        if games == 0 {
            return Err(ControllerError::NoGames);
        }
        self.stop.store(false, Ordering::SeqCst);
        self.record = GameRecord::new(games);
        self.bot_failures = 0;
        self.rules_failures = 0;
        self.openings.rewind();
        self.pool.release_all();

        info!(
            bot_a = %self.slots[0],
            bot_b = %self.slots[1],
            games,
            "tournament started"
        );
        let (a, b) = (self.slots[0].to_string(), self.slots[1].to_string());
        self.write_log(|log| log.tournament_header(&a, &b, games));

        self.phase = Phase::AwaitingMove;
        self.begin_game()
    }

    /// Ends the tournament. The score stays readable until the next start.
    pub fn stop(&mut self) {
        if self.is_running() {
            info!(
                played = self.record.games_played,
                requested = self.record.games_requested,
                "tournament stopped"
            );
        }
        self.phase = Phase::Stopped;
        self.pool.release_all();
    }

    /// Leaves the stopped state for free play.
    pub fn reset_to_idle(&mut self) {
        if self.phase == Phase::Stopped {
            self.phase = Phase::Idle;
        }
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> Result<Phase, ControllerError> {
        if self.is_running() && self.stop.load(Ordering::SeqCst) {
            self.stop();
            return Ok(self.phase);
        }
        match self.phase {
            Phase::AwaitingMove => self.await_move()?,
            Phase::GameOver(reason) => self.finish_game(reason)?,
            Phase::Idle | Phase::ApplyingMove | Phase::Stopped => {}
        }
        Ok(self.phase)
    }

    /// Steps until the tournament stops or a human has to move.
    pub fn run(&mut self) -> Result<Phase, ControllerError> {
        loop {
            let phase = self.step()?;
            if !self.is_running() || (phase == Phase::AwaitingMove && self.awaiting_human()) {
                return Ok(phase);
            }
        }
    }

    fn await_move(&mut self) -> Result<(), ControllerError> {
        if self.board.is_stale() {
            return self.refresh();
        }
        if let Some(reason) = self.board.state() {
            self.phase = Phase::GameOver(reason);
            return Ok(());
        }
        let slot = self.slot_to_move();
        let Some(path) = self.slot(slot).bot_path().map(Path::to_path_buf) else {
            return Ok(());
        };
        if let Some(mv) = self.ask_bot(slot, &path) {
            self.play(mv)?;
        }
        Ok(())
    }

    /// Asks the bot in `slot` for a move until it gives a listed one.
    ///
    /// Every failure is logged, counted, and followed by releasing the whole
    /// pool. Returns `None` when a stop was requested between attempts or
    /// the bot could not be launched at all.
    fn ask_bot(&mut self, slot: SlotId, path: &Path) -> Option<MoveToken> {
        let mut attempts = 0u32;
        loop {
            if attempts > 0 && self.stop.load(Ordering::SeqCst) {
                info!(bot = %path.display(), attempts, "stop requested, giving up on bot");
                return None;
            }
            let result = self.pool.ask_move(
                path,
                self.board.opening(),
                self.board.history(),
                self.think_ms,
            );
            let failure = match result {
                Ok(reply) if MoveResolver::is_listed(&reply.mv, self.board.legal_moves()) => {
                    let notation = self.board.notation();
                    let history = self.board.history().to_vec();
                    self.write_log(|log| log.bot_move(path, &notation, &history, &reply));
                    return Some(reply.mv);
                }
                Ok(reply) => format!("bot answered unlisted move {}", reply.mv),
                Err(e) if e.is_launch_failure() => {
                    self.clear_slot(slot, path, &e.to_string());
                    return None;
                }
                Err(e) => e.to_string(),
            };

            attempts += 1;
            self.bot_failures += 1;
            warn!(
                bot = %path.display(),
                attempts,
                failures = self.bot_failures,
                error = %failure,
                "bot failed, restarting bots"
            );
            let notation = self.board.notation();
            let history = self.board.history().to_vec();
            let failures = self.bot_failures;
            self.write_log(|log| log.bot_error(path, &notation, &history, &failure, failures));
            self.pool.release_all();
        }
    }

    fn clear_slot(&mut self, slot: SlotId, path: &Path, reason: &str) {
        error!(slot = %slot, bot = %path.display(), error = %reason, "bot could not be launched");
        let note = format!("{} ({}) could not be launched: {}", slot, path.display(), reason);
        self.write_log(|log| log.note(&note));
        self.slots[slot.index()] = Slot::Human;
        self.notices.push_back(Notice::NoBotSelected {
            slot,
            path: path.to_path_buf(),
        });
        if self.is_running() {
            self.stop();
        }
    }

    /// Appends `mv` and books the rules answer.
    ///
    /// Returns false when the rules query failed and the move was taken back.
    fn play(&mut self, mv: MoveToken) -> Result<bool, ControllerError> {
        let running = self.is_running();
        if running {
            self.phase = Phase::ApplyingMove;
        }
        let applied = self.board.apply(mv, &self.rules);
        if running {
            self.phase = Phase::AwaitingMove;
        }
        match applied {
            Ok(state) => {
                self.rules_answered();
                self.after_move(state);
                Ok(true)
            }
            Err(e) => self.rules_failed(e).map(|()| false),
        }
    }

    fn after_move(&mut self, state: Option<TerminalState>) {
        let Some(reason) = state else {
            return;
        };
        if self.is_running() {
            self.phase = Phase::GameOver(reason);
        } else {
            info!(reason = %reason, "game over");
            self.notices.push_back(Notice::GameOver {
                reason,
                result: None,
            });
        }
    }

    /// Re-queries the rules backend for the current history.
    fn refresh(&mut self) -> Result<(), ControllerError> {
        match self.board.refresh(&self.rules) {
            Ok(()) => {
                self.rules_answered();
                Ok(())
            }
            Err(e) => self.rules_failed(e),
        }
    }

    fn rules_answered(&mut self) {
        if self.rules_failures > 0 {
            info!(failures = self.rules_failures, "rules backend answering again");
            self.rules_failures = 0;
        }
    }

    /// Undecodable notation is fatal. Anything else leaves the board stale
    /// for the next step to retry, until the backend cannot be launched or
    /// has failed [`RULES_FAILURE_LIMIT`] times in a row; then a running
    /// tournament is stopped.
    fn rules_failed(&mut self, e: RulesError) -> Result<(), ControllerError> {
        if e.is_desync() {
            error!(error = %e, "rules backend out of sync");
            return Err(e.into());
        }
        self.rules_failures += 1;
        let failures = self.rules_failures;
        let give_up = e.is_launch_failure() || failures >= RULES_FAILURE_LIMIT;
        // Only the first failure of a streak and the last one are written.
        if failures == 1 || give_up {
            let note = format!("rules backend failed ({} in a row): {}", failures, e);
            self.write_log(|log| log.note(&note));
        }
        if give_up && self.is_running() {
            error!(failures, error = %e, "rules backend unavailable, stopping tournament");
            self.notices.push_back(Notice::RulesUnavailable {
                failures,
                reason: e.to_string(),
            });
            self.stop();
        }
        Ok(())
    }

    fn finish_game(&mut self, reason: TerminalState) -> Result<(), ControllerError> {
        let side_to_move = self.board.position().side_to_move;
        let result = self.record.book(reason, side_to_move);
        let number = self.record.games_played;
        info!(
            game = number,
            result = %result,
            wins = self.record.wins,
            draws = self.record.draws,
            losses = self.record.losses,
            "game finished"
        );
        let ending = self.board.notation();
        self.write_log(|log| log.result(number, &result, &ending));
        self.notices.push_back(Notice::GameOver {
            reason,
            result: Some(result),
        });

        if self.record.is_complete() {
            let record = self.record;
            self.write_log(|log| log.summary(&record));
            self.notices.push_back(Notice::TournamentFinished(record));
            info!(
                played = record.games_played,
                wins = record.wins,
                draws = record.draws,
                losses = record.losses,
                "tournament finished"
            );
            self.phase = Phase::Stopped;
            self.pool.release_all();
            return Ok(());
        }

        self.openings.advance();
        self.record.opening_index = self.openings.index();
        self.record.a_plays_white = !self.record.a_plays_white;
        self.pool.release_all();
        self.phase = Phase::AwaitingMove;
        self.begin_game()
    }

    /// Loads the current opening and writes the game header.
    fn begin_game(&mut self) -> Result<(), ControllerError> {
        let number = self.record.games_played + 1;
        let opening = self.openings.current().to_string();
        let white = self.record.slot_for(Color::White).to_string();
        let black = self.record.slot_for(Color::Black).to_string();
        self.write_log(|log| log.game_header(number, &opening, &white, &black));
        match self.board.load(&opening, &self.rules) {
            Ok(()) => {
                self.rules_answered();
                Ok(())
            }
            Err(e) => self.rules_failed(e),
        }
    }

    fn write_log(&self, write: impl FnOnce(&GameLog) -> std::io::Result<()>) {
        if let Some(log) = &self.log {
            if let Err(e) = write(log) {
                warn!(path = %log.path().display(), error = %e, "could not write game log");
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), ControllerError> {
        if self.is_running() {
            Err(ControllerError::TournamentRunning)
        } else {
            Ok(())
        }
    }

    /// A human's from/to pick.
    ///
    /// In a tournament only accepted when a human slot is to move.
    pub fn propose_move(&mut self, from: Square, to: Square) -> Result<MoveOutcome, ControllerError> {
        if self.is_running() && !(self.phase == Phase::AwaitingMove && self.awaiting_human()) {
            return Err(ControllerError::NotHumanTurn);
        }
        let Some(mv) = self.board.resolve(from, to) else {
            return Ok(MoveOutcome::Rejected);
        };
        if !self.play(mv.clone())? {
            return Ok(MoveOutcome::Stalled);
        }
        Ok(MoveOutcome::Played {
            mv,
            state: self.board.state(),
        })
    }

    /// Asks the bot for the side to move and plays its answer.
    pub fn force_bot_move(&mut self) -> Result<Option<MoveToken>, ControllerError> {
        self.ensure_idle()?;
        let side = self.board.position().side_to_move;
        let slot = self.record.slot_for(side);
        let Some(path) = self.slot(slot).bot_path().map(Path::to_path_buf) else {
            return Err(ControllerError::NoBotForSide(side));
        };
        if self.board.is_stale() {
            self.refresh()?;
        }
        if self.board.state().is_some() {
            return Ok(None);
        }
        let Some(mv) = self.ask_bot(slot, &path) else {
            return Ok(None);
        };
        Ok(self.play(mv.clone())?.then_some(mv))
    }

    pub fn set_promotion(&mut self, piece: PromotionPiece) {
        self.board.set_preferred_promotion(piece);
    }

    /// Takes back the last move. Bots are released since they cannot rewind.
    pub fn undo(&mut self) -> Result<Option<MoveToken>, ControllerError> {
        self.ensure_idle()?;
        self.pool.release_all();
        Ok(self.board.undo(&self.rules)?)
    }

    /// Back to the current opening with no moves played.
    pub fn reset(&mut self) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        self.reset_to_idle();
        self.pool.release_all();
        let opening = self.openings.current().to_string();
        Ok(self.board.load(&opening, &self.rules)?)
    }

    pub fn next_opening(&mut self) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        self.openings.advance();
        self.reset()
    }

    pub fn previous_opening(&mut self) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        self.openings.retreat();
        self.reset()
    }

    /// Starts free play from arbitrary notation.
    pub fn load_notation(&mut self, notation: &str) -> Result<(), ControllerError> {
        self.ensure_idle()?;
        Position::decode(notation)?;
        self.reset_to_idle();
        self.pool.release_all();
        Ok(self.board.load(notation, &self.rules)?)
    }

    pub fn notation(&self) -> String {
        self.board.notation()
    }
}
