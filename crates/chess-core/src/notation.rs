//! Position notation: the six-field board/side/castling/en-passant/clock text
//! that every rules and bot process speaks.

use crate::{Color, ColoredPiece, File, Rank, Square};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Malformed position notation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("malformed notation: expected 6 fields, got {0}")]
    InvalidFieldCount(usize),

    #[error("malformed notation: invalid piece placement: {0}")]
    InvalidPiecePlacement(String),

    #[error("malformed notation: invalid side to move {0:?}")]
    InvalidSideToMove(String),

    #[error("malformed notation: invalid castling rights {0:?}")]
    InvalidCastlingRights(String),

    #[error("malformed notation: invalid en passant square {0:?}")]
    InvalidEnPassantSquare(String),

    #[error("malformed notation: invalid halfmove clock {0:?}")]
    InvalidHalfmoveClock(String),

    #[error("malformed notation: invalid fullmove number {0:?}")]
    InvalidFullmoveNumber(String),
}

/// Which castling moves are still available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CastlingRights {
    pub white_kingside: bool,
    pub white_queenside: bool,
    pub black_kingside: bool,
    pub black_queenside: bool,
}

impl CastlingRights {
    pub const ALL: CastlingRights = CastlingRights {
        white_kingside: true,
        white_queenside: true,
        black_kingside: true,
        black_queenside: true,
    };

    fn parse(field: &str) -> Result<Self, NotationError> {
        let mut rights = CastlingRights::default();
        if field == "-" {
            return Ok(rights);
        }
        for c in field.chars() {
            match c {
                'K' => rights.white_kingside = true,
                'Q' => rights.white_queenside = true,
                'k' => rights.black_kingside = true,
                'q' => rights.black_queenside = true,
                _ => return Err(NotationError::InvalidCastlingRights(field.to_string())),
            }
        }
        Ok(rights)
    }

    fn to_field(self) -> String {
        let mut s = String::new();
        if self.white_kingside {
            s.push('K');
        }
        if self.white_queenside {
            s.push('Q');
        }
        if self.black_kingside {
            s.push('k');
        }
        if self.black_queenside {
            s.push('q');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

/// An authoritative board snapshot.
///
/// Positions are never edited move by move: after every move the rules
/// backend hands back a fresh notation string and the whole value is
/// replaced by decoding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Cell contents indexed by [`Square::index`].
    pub squares: [Option<ColoredPiece>; 64],
    pub side_to_move: Color,
    pub castling: CastlingRights,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmove_number: u32,
}

impl Position {
    /// The standard starting position.
    pub const STARTPOS: &'static str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    pub fn startpos() -> Self {
        match Self::decode(Self::STARTPOS) {
            Ok(p) => p,
            Err(_) => unreachable!("STARTPOS is well formed"),
        }
    }

    /// Returns the piece on `square`, if any.
    pub fn piece_at(&self, square: Square) -> Option<ColoredPiece> {
        self.squares[square.index() as usize]
    }

    /// Decodes position notation.
    pub fn decode(notation: &str) -> Result<Self, NotationError> {
        let fields: Vec<&str> = notation.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(NotationError::InvalidFieldCount(fields.len()));
        }

        let squares = Self::decode_placement(fields[0])?;

        let side_to_move = Color::from_notation(fields[1])
            .ok_or_else(|| NotationError::InvalidSideToMove(fields[1].to_string()))?;

        let castling = CastlingRights::parse(fields[2])?;

        let en_passant = match fields[3] {
            "-" => None,
            ep => {
                let sq = Square::from_algebraic(ep)
                    .ok_or_else(|| NotationError::InvalidEnPassantSquare(ep.to_string()))?;
                if !matches!(sq.rank(), Rank::R3 | Rank::R6) {
                    return Err(NotationError::InvalidEnPassantSquare(ep.to_string()));
                }
                Some(sq)
            }
        };

        let halfmove_clock = fields[4]
            .parse::<u32>()
            .map_err(|_| NotationError::InvalidHalfmoveClock(fields[4].to_string()))?;

        let fullmove_number = fields[5]
            .parse::<u32>()
            .map_err(|_| NotationError::InvalidFullmoveNumber(fields[5].to_string()))?;

        Ok(Position {
            squares,
            side_to_move,
            castling,
            en_passant,
            halfmove_clock,
            fullmove_number,
        })
    }

    fn decode_placement(placement: &str) -> Result<[Option<ColoredPiece>; 64], NotationError> {
        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(NotationError::InvalidPiecePlacement(format!(
                "expected 8 ranks, got {}",
                ranks.len()
            )));
        }

        let mut squares = [None; 64];
        for (text, rank) in ranks.iter().zip(Rank::TOP_DOWN) {
            let mut file = 0u8;
            for c in text.chars() {
                if let Some(run) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    file += run as u8;
                } else if let Some(piece) = ColoredPiece::from_notation(c) {
                    if let Some(f) = File::from_index(file) {
                        squares[Square::new(f, rank).index() as usize] = Some(piece);
                    }
                    file += 1;
                } else {
                    return Err(NotationError::InvalidPiecePlacement(format!(
                        "invalid character '{}' in rank {}",
                        c,
                        rank.to_char()
                    )));
                }
                if file > 8 {
                    break;
                }
            }
            if file != 8 {
                return Err(NotationError::InvalidPiecePlacement(format!(
                    "rank {} covers {} files, expected 8",
                    rank.to_char(),
                    file
                )));
            }
        }
        Ok(squares)
    }

    /// Encodes the position as notation.
    pub fn encode(&self) -> String {
        let mut placement = String::new();
        for (i, rank) in Rank::TOP_DOWN.iter().enumerate() {
            if i > 0 {
                placement.push('/');
            }
            let mut empty = 0;
            for f in 0..8 {
                let Some(file) = File::from_index(f) else {
                    continue;
                };
                match self.piece_at(Square::new(file, *rank)) {
                    Some(piece) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(piece.to_notation());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
        }

        let en_passant = self
            .en_passant
            .map(|sq| sq.to_algebraic())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            self.side_to_move.to_notation(),
            self.castling.to_field(),
            en_passant,
            self.halfmove_clock,
            self.fullmove_number
        )
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::startpos()
    }
}

impl FromStr for Position {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::decode(s)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Piece;

    #[test]
    fn decode_startpos() {
        let pos = Position::startpos();
        assert_eq!(pos.side_to_move, Color::White);
        assert_eq!(pos.castling, CastlingRights::ALL);
        assert_eq!(pos.en_passant, None);
        assert_eq!(pos.halfmove_clock, 0);
        assert_eq!(pos.fullmove_number, 1);
        assert_eq!(pos.squares.iter().filter(|c| c.is_some()).count(), 32);
    }

    #[test]
    fn ranks_map_to_the_right_squares() {
        let pos = Position::startpos();
        let e1 = Square::from_algebraic("e1").unwrap();
        let d8 = Square::from_algebraic("d8").unwrap();
        let a2 = Square::from_algebraic("a2").unwrap();
        assert_eq!(
            pos.piece_at(e1),
            Some(ColoredPiece::new(Piece::King, Color::White))
        );
        assert_eq!(
            pos.piece_at(d8),
            Some(ColoredPiece::new(Piece::Queen, Color::Black))
        );
        assert_eq!(
            pos.piece_at(a2),
            Some(ColoredPiece::new(Piece::Pawn, Color::White))
        );
        assert_eq!(pos.piece_at(Square::from_algebraic("e4").unwrap()), None);
    }

    #[test]
    fn roundtrip_after_double_step() {
        let original = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
        let pos = Position::decode(original).unwrap();
        assert_eq!(pos.side_to_move, Color::Black);
        assert_eq!(pos.en_passant, Square::from_algebraic("e3"));
        assert_eq!(pos.encode(), original);
    }

    #[test]
    fn encode_without_castling_rights() {
        let original = "4k3/8/8/8/8/8/8/4K3 w - - 12 40";
        let pos: Position = original.parse().unwrap();
        assert_eq!(pos.castling, CastlingRights::default());
        assert_eq!(pos.to_string(), original);
    }

    #[test]
    fn partial_castling_rights() {
        let pos = Position::decode("r3k2r/8/8/8/8/8/8/R3K2R w Kq - 0 1").unwrap();
        assert!(pos.castling.white_kingside);
        assert!(!pos.castling.white_queenside);
        assert!(!pos.castling.black_kingside);
        assert!(pos.castling.black_queenside);
    }

    #[test]
    fn wrong_field_count() {
        assert_eq!(
            Position::decode("8/8/8/8/8/8/8/8 w - - 0"),
            Err(NotationError::InvalidFieldCount(5))
        );
        assert!(matches!(
            Position::decode(""),
            Err(NotationError::InvalidFieldCount(0))
        ));
    }

    #[test]
    fn rank_must_cover_eight_files() {
        assert!(matches!(
            Position::decode("rnbqkbnrr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(NotationError::InvalidPiecePlacement(_))
        ));
        assert!(matches!(
            Position::decode("rnbqkbn/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(NotationError::InvalidPiecePlacement(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8 w - - 0 1"),
            Err(NotationError::InvalidPiecePlacement(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/9 w - - 0 1"),
            Err(NotationError::InvalidPiecePlacement(_))
        ));
    }

    #[test]
    fn invalid_piece_letter() {
        assert!(matches!(
            Position::decode("rnbqkbnr/pppppppp/8/8/8/8/PPPPXPPP/RNBQKBNR w KQkq - 0 1"),
            Err(NotationError::InvalidPiecePlacement(_))
        ));
    }

    #[test]
    fn invalid_scalar_fields() {
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/8 x - - 0 1"),
            Err(NotationError::InvalidSideToMove(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/8 w XYZ - 0 1"),
            Err(NotationError::InvalidCastlingRights(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/8 w - e4 0 1"),
            Err(NotationError::InvalidEnPassantSquare(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/8 w - - abc 1"),
            Err(NotationError::InvalidHalfmoveClock(_))
        ));
        assert!(matches!(
            Position::decode("8/8/8/8/8/8/8/8 w - - 0 -3"),
            Err(NotationError::InvalidFullmoveNumber(_))
        ));
    }

    #[test]
    fn error_display_mentions_malformed() {
        let err = NotationError::InvalidFieldCount(3);
        assert!(err.to_string().starts_with("malformed notation"));
        assert!(err.to_string().contains('3'));
    }
}
