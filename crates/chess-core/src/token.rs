//! Move tokens: `e2e4`, `e7e8q`.

use crate::Square;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when a move token is not well formed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("move token must be 4 or 5 characters, got {0:?}")]
    InvalidLength(String),

    #[error("invalid square in move token {0:?}")]
    InvalidSquare(String),

    #[error("invalid promotion letter in move token {0:?}")]
    InvalidPromotion(String),
}

/// The piece a pawn turns into on promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PromotionPiece {
    #[default]
    Queen,
    Rook,
    Bishop,
    Knight,
}

impl PromotionPiece {
    pub const fn to_char(self) -> char {
        match self {
            PromotionPiece::Queen => 'q',
            PromotionPiece::Rook => 'r',
            PromotionPiece::Bishop => 'b',
            PromotionPiece::Knight => 'n',
        }
    }

    /// Accepts either case.
    pub const fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_lowercase() {
            'q' => Some(PromotionPiece::Queen),
            'r' => Some(PromotionPiece::Rook),
            'b' => Some(PromotionPiece::Bishop),
            'n' => Some(PromotionPiece::Knight),
            _ => None,
        }
    }
}

impl fmt::Display for PromotionPiece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A move in compact coordinate form.
///
/// The text is kept exactly as it was produced (by the rules backend, a bot,
/// or the resolver), so a token read off the wire is echoed back verbatim.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MoveToken(String);

impl MoveToken {
    /// Validates and wraps a token.
    pub fn parse(s: &str) -> Result<Self, TokenError> {
        if !s.is_ascii() || !(4..=5).contains(&s.len()) {
            return Err(TokenError::InvalidLength(s.to_string()));
        }
        if Square::from_algebraic(&s[0..2]).is_none() || Square::from_algebraic(&s[2..4]).is_none()
        {
            return Err(TokenError::InvalidSquare(s.to_string()));
        }
        if let Some(c) = s[4..].chars().next() {
            if PromotionPiece::from_char(c).is_none() {
                return Err(TokenError::InvalidPromotion(s.to_string()));
            }
        }
        Ok(MoveToken(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The origin+destination part, without any promotion letter.
    pub fn prefix(&self) -> &str {
        &self.0[..4]
    }

    pub fn promotion(&self) -> Option<PromotionPiece> {
        self.0[4..].chars().next().and_then(PromotionPiece::from_char)
    }

    /// Joins tokens with single spaces, the `setmovehistory` payload form.
    pub fn join(tokens: &[MoveToken]) -> String {
        tokens
            .iter()
            .map(MoveToken::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromStr for MoveToken {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoveToken::parse(s)
    }
}

impl fmt::Debug for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MoveToken({})", self.0)
    }
}

impl fmt::Display for MoveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
