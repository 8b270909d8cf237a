use chess_core::{CastlingRights, Color, ColoredPiece, File, Piece, Position, Rank, Square};
use proptest::prelude::*;

fn cell() -> impl Strategy<Value = Option<ColoredPiece>> {
    let piece = prop_oneof![
        Just(Piece::Pawn),
        Just(Piece::Knight),
        Just(Piece::Bishop),
        Just(Piece::Rook),
        Just(Piece::Queen),
        Just(Piece::King),
    ];
    let color = prop_oneof![Just(Color::White), Just(Color::Black)];
    prop::option::weighted(0.4, (piece, color).prop_map(|(p, c)| ColoredPiece::new(p, c)))
}

fn en_passant() -> impl Strategy<Value = Option<Square>> {
    prop::option::of((0u8..8, prop::bool::ANY).prop_map(|(f, sixth)| {
        let file = File::from_index(f).unwrap();
        Square::new(file, if sixth { Rank::R6 } else { Rank::R3 })
    }))
}

fn position() -> impl Strategy<Value = Position> {
    (
        prop::collection::vec(cell(), 64),
        prop::bool::ANY,
        prop::array::uniform4(prop::bool::ANY),
        en_passant(),
        0u32..200,
        1u32..500,
    )
        .prop_map(|(cells, white, castle, en_passant, halfmove, fullmove)| {
            let squares: [Option<ColoredPiece>; 64] = cells.try_into().unwrap();
            Position {
                squares,
                side_to_move: if white { Color::White } else { Color::Black },
                castling: CastlingRights {
                    white_kingside: castle[0],
                    white_queenside: castle[1],
                    black_kingside: castle[2],
                    black_queenside: castle[3],
                },
                en_passant,
                halfmove_clock: halfmove,
                fullmove_number: fullmove,
            }
        })
}

proptest! {
    #[test]
    fn decode_inverts_encode(pos in position()) {
        let text = pos.encode();
        let decoded = Position::decode(&text).unwrap();
        prop_assert_eq!(decoded, pos);
    }

    #[test]
    fn encode_inverts_decode_on_encoded_text(pos in position()) {
        let text = pos.encode();
        prop_assert_eq!(Position::decode(&text).unwrap().encode(), text);
    }
}
