//! Turning a from/to pick into a legal move token.

use chess_core::{MoveToken, PromotionPiece, Square};

/// Matches user picks against the legal-move list.
///
/// The resolver never judges legality itself; a pick is accepted only if
/// the rules backend listed a move with the same origin and destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveResolver {
    preferred: PromotionPiece,
}

impl MoveResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preferred_promotion(&self) -> PromotionPiece {
        self.preferred
    }

    pub fn set_preferred_promotion(&mut self, piece: PromotionPiece) {
        self.preferred = piece;
    }

    /// Back to queen; done after every completed move.
    pub fn reset(&mut self) {
        self.preferred = PromotionPiece::Queen;
    }

    /// Resolves `from`→`to` against `legal`.
    ///
    /// No match rejects the pick. A single match is returned verbatim.
    /// Several matches can only differ by promotion piece; the listed token
    /// promoting to the preferred piece is returned as written, whatever the
    /// case of its letter.
    pub fn resolve(&self, from: Square, to: Square, legal: &[MoveToken]) -> Option<MoveToken> {
        let prefix = format!("{}{}", from, to);
        let mut matches = legal.iter().filter(|mv| mv.prefix() == prefix);
        let first = matches.next()?;
        if matches.next().is_none() {
            return Some(first.clone());
        }
        legal
            .iter()
            .filter(|mv| mv.prefix() == prefix)
            .find(|mv| mv.promotion() == Some(self.preferred))
            .cloned()
    }

    /// Exact membership, used for bot answers.
    pub fn is_listed(mv: &MoveToken, legal: &[MoveToken]) -> bool {
        legal.contains(mv)
    }
}
