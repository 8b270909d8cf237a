//! Values carried in peer answers.

use chess_core::MoveToken;
use std::fmt;

/// Why a game ended, as reported by `getstate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalState {
    Checkmate,
    Stalemate,
    ThreefoldRepetition,
    FiftyMoveDraw,
    InsufficientMaterial,
}

impl TerminalState {
    /// Parses a `getstate` label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "checkmate" => Some(TerminalState::Checkmate),
            "stalemate" => Some(TerminalState::Stalemate),
            "threefold_repetition" => Some(TerminalState::ThreefoldRepetition),
            "fifty_move_draw" => Some(TerminalState::FiftyMoveDraw),
            "insufficient_material" => Some(TerminalState::InsufficientMaterial),
            _ => None,
        }
    }

    /// The wire label.
    pub const fn label(self) -> &'static str {
        match self {
            TerminalState::Checkmate => "checkmate",
            TerminalState::Stalemate => "stalemate",
            TerminalState::ThreefoldRepetition => "threefold_repetition",
            TerminalState::FiftyMoveDraw => "fifty_move_draw",
            TerminalState::InsufficientMaterial => "insufficient_material",
        }
    }

    /// Only checkmate has a winner; everything else is a draw.
    pub const fn is_decisive(self) -> bool {
        matches!(self, TerminalState::Checkmate)
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TerminalState::Checkmate => "Checkmate",
            TerminalState::Stalemate => "Stalemate",
            TerminalState::ThreefoldRepetition => "Threefold repetition",
            TerminalState::FiftyMoveDraw => "Fifty-move rule",
            TerminalState::InsufficientMaterial => "Insufficient material",
        };
        f.write_str(text)
    }
}

/// How deep a bot searched for its last move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDepth {
    /// Answered from an opening book (reported depth 0).
    Book,
    Plies(u32),
}

impl SearchDepth {
    pub const fn from_raw(depth: u32) -> Self {
        if depth == 0 {
            SearchDepth::Book
        } else {
            SearchDepth::Plies(depth)
        }
    }
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchDepth::Book => f.write_str("Book"),
            SearchDepth::Plies(d) => write!(f, "{}", d),
        }
    }
}

/// A bot's evaluation of the position, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    /// The side to move mates in this many.
    MateIn(i32),
    /// The side to move is mated in this many.
    MatedIn(i32),
}

impl Evaluation {
    /// Raw scores within this distance of [`Evaluation::MATE_SCORE`] encode mate.
    pub const MATE_WINDOW: i32 = 1000;
    pub const MATE_SCORE: i32 = 1_000_000;

    pub const fn from_raw(raw: i32) -> Self {
        if raw > Self::MATE_SCORE - Self::MATE_WINDOW {
            Evaluation::MateIn(Self::MATE_SCORE - raw)
        } else if raw < -Self::MATE_SCORE + Self::MATE_WINDOW {
            Evaluation::MatedIn(raw + Self::MATE_SCORE)
        } else {
            Evaluation::Centipawns(raw)
        }
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Evaluation::Centipawns(cp) => write!(f, "{}", cp),
            Evaluation::MateIn(n) => write!(f, "Mate in {}", n),
            Evaluation::MatedIn(n) => write!(f, "Mated in {}", n),
        }
    }
}

/// A bot's answer to `getmove`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub mv: MoveToken,
    pub depth: Option<SearchDepth>,
    pub eval: Option<Evaluation>,
}
