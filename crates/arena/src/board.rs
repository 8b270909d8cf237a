//! The board as the front end sees it.
//!
//! [`Board`] owns the opening notation and the move history, which together
//! are the only source of truth, plus the last snapshot the rules backend
//! derived from them. Every change goes through a rules query; the position
//! is replaced wholesale from the answer and never edited move by move.

use crate::resolver::MoveResolver;
use crate::rules::{RulesBackend, RulesError};
use chess_core::{MoveToken, NotationError, Position, PromotionPiece, Square};
use engine_protocol::TerminalState;
use tracing::{debug, warn};

/// Opening, history and the latest rules snapshot.
#[derive(Debug, Clone)]
pub struct Board {
    opening: String,
    history: Vec<MoveToken>,
    position: Position,
    legal_moves: Vec<MoveToken>,
    state: Option<TerminalState>,
    resolver: MoveResolver,
    stale: bool,
}

impl Board {
    /// A board at `opening` with no moves played.
    ///
    /// The position is decoded locally so it can be shown at once; legal
    /// moves stay empty until the first [`Board::refresh`].
    pub fn new(opening: &str) -> Result<Self, NotationError> {
        Ok(Self {
            position: Position::decode(opening)?,
            opening: opening.to_string(),
            history: Vec::new(),
            legal_moves: Vec::new(),
            state: None,
            resolver: MoveResolver::new(),
            stale: true,
        })
    }

    pub fn opening(&self) -> &str {
        &self.opening
    }

    pub fn history(&self) -> &[MoveToken] {
        &self.history
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn legal_moves(&self) -> &[MoveToken] {
        &self.legal_moves
    }

    pub fn state(&self) -> Option<TerminalState> {
        self.state
    }

    /// True when the last rules query failed and the snapshot has not been
    /// rebuilt since.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn preferred_promotion(&self) -> PromotionPiece {
        self.resolver.preferred_promotion()
    }

    pub fn set_preferred_promotion(&mut self, piece: PromotionPiece) {
        self.resolver.set_preferred_promotion(piece);
    }

    /// Current position in notation form.
    pub fn notation(&self) -> String {
        self.position.encode()
    }

    /// Re-derives the snapshot from opening and history.
    ///
    /// On failure the legal-move list is cleared and the position left as
    /// it was, so nothing can be played until a later refresh succeeds.
    pub fn refresh<R: RulesBackend + ?Sized>(&mut self, rules: &R) -> Result<(), RulesError> {
        match rules.query(&self.opening, &self.history) {
            Ok(report) => {
                self.position = report.position;
                self.legal_moves = report.legal_moves;
                self.state = report.state;
                self.stale = false;
                Ok(())
            }
            Err(e) => {
                warn!(plies = self.history.len(), error = %e, "rules query failed");
                self.legal_moves.clear();
                self.stale = true;
                Err(e)
            }
        }
    }

    /// Appends `mv` and re-derives the snapshot.
    ///
    /// If the rules query fails the move is taken back off the history, so
    /// history and position keep describing the same board.
    pub fn apply<R: RulesBackend + ?Sized>(
        &mut self,
        mv: MoveToken,
        rules: &R,
    ) -> Result<Option<TerminalState>, RulesError> {
        debug!(mv = %mv, ply = self.history.len() + 1, "applying move");
        self.history.push(mv);
        if let Err(e) = self.refresh(rules) {
            self.history.pop();
            return Err(e);
        }
        self.resolver.reset();
        Ok(self.state)
    }

    /// Resolves a from/to pick against the current legal moves.
    pub fn resolve(&self, from: Square, to: Square) -> Option<MoveToken> {
        self.resolver.resolve(from, to, &self.legal_moves)
    }

    /// Takes back the last move. Returns `None` if there was nothing to undo.
    pub fn undo<R: RulesBackend + ?Sized>(
        &mut self,
        rules: &R,
    ) -> Result<Option<MoveToken>, RulesError> {
        let Some(mv) = self.history.pop() else {
            return Ok(None);
        };
        if let Err(e) = self.refresh(rules) {
            self.history.push(mv);
            return Err(e);
        }
        Ok(Some(mv))
    }

    /// Starts over from `opening` with an empty history.
    ///
    /// The notation is validated before anything changes; the rules query
    /// that follows may still fail, leaving the board stale.
    pub fn load<R: RulesBackend + ?Sized>(
        &mut self,
        opening: &str,
        rules: &R,
    ) -> Result<(), RulesError> {
        let position = Position::decode(opening)?;
        self.opening = opening.to_string();
        self.history.clear();
        self.position = position;
        self.state = None;
        self.resolver.reset();
        self.refresh(rules)
    }
}
