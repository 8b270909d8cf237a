//! Piece codes as they appear on the wire.

use crate::Color;

/// The six piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Piece {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl Piece {
    const fn letter(self) -> char {
        match self {
            Piece::Pawn => 'p',
            Piece::Knight => 'n',
            Piece::Bishop => 'b',
            Piece::Rook => 'r',
            Piece::Queen => 'q',
            Piece::King => 'k',
        }
    }
}

/// The contents of an occupied cell: a piece kind plus its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColoredPiece {
    pub piece: Piece,
    pub color: Color,
}

impl ColoredPiece {
    pub const fn new(piece: Piece, color: Color) -> Self {
        Self { piece, color }
    }

    /// Returns the notation letter (uppercase for white).
    pub const fn to_notation(self) -> char {
        let c = self.piece.letter();
        match self.color {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    /// Parses a notation letter.
    pub const fn from_notation(c: char) -> Option<Self> {
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        let piece = match c.to_ascii_lowercase() {
            'p' => Piece::Pawn,
            'n' => Piece::Knight,
            'b' => Piece::Bishop,
            'r' => Piece::Rook,
            'q' => Piece::Queen,
            'k' => Piece::King,
            _ => return None,
        };
        Some(Self { piece, color })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notation_letters() {
        assert_eq!(
            ColoredPiece::new(Piece::Pawn, Color::White).to_notation(),
            'P'
        );
        assert_eq!(
            ColoredPiece::new(Piece::Knight, Color::Black).to_notation(),
            'n'
        );
    }

    #[test]
    fn parse_letters() {
        assert_eq!(
            ColoredPiece::from_notation('K'),
            Some(ColoredPiece::new(Piece::King, Color::White))
        );
        assert_eq!(
            ColoredPiece::from_notation('q'),
            Some(ColoredPiece::new(Piece::Queen, Color::Black))
        );
        assert_eq!(ColoredPiece::from_notation('x'), None);
        assert_eq!(ColoredPiece::from_notation('1'), None);
    }
}
