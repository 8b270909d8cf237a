//! One function per protocol exchange.
//!
//! Each function sends its request and reads exactly the lines the answer
//! is made of, failing on the first line that does not fit.

use crate::{
    BotReply, Evaluation, Peer, ProtocolError, Request, SearchDepth, TerminalState, OK,
};
use chess_core::MoveToken;
use tracing::warn;

/// `setfen` followed by `setmovehistory`, each acknowledged with `ok`.
pub fn set_position<P: Peer + ?Sized>(
    peer: &mut P,
    opening: &str,
    history: &[MoveToken],
) -> Result<(), ProtocolError> {
    peer.request(&Request::SetFen(opening.to_string()))?;
    peer.expect_ok()?;
    peer.request(&Request::SetMoveHistory(history.to_vec()))?;
    peer.expect_ok()
}

/// `getmoves`: one token per line until `ok`.
pub fn get_moves<P: Peer + ?Sized>(peer: &mut P) -> Result<Vec<MoveToken>, ProtocolError> {
    peer.request(&Request::GetMoves)?;
    let mut moves = Vec::new();
    loop {
        let line = peer.receive()?;
        if line == OK {
            return Ok(moves);
        }
        let mv = MoveToken::parse(&line)
            .map_err(|_| ProtocolError::violation("a move token or ok", line.as_str()))?;
        moves.push(mv);
    }
}

/// `getfen`: the notation line, then `ok`.
///
/// The notation is returned undecoded; decoding failures are a separate,
/// harder error than a protocol slip.
pub fn get_fen<P: Peer + ?Sized>(peer: &mut P) -> Result<String, ProtocolError> {
    peer.request(&Request::GetFen)?;
    let notation = peer.receive()?;
    if notation == OK {
        return Err(ProtocolError::violation("position notation", notation));
    }
    peer.expect_ok()?;
    Ok(notation)
}

/// `getstate`: a terminal label then `ok`, or `ok` alone while the game goes on.
///
/// Any label that names no terminal state, `none` included, also means the
/// game goes on.
pub fn get_state<P: Peer + ?Sized>(peer: &mut P) -> Result<Option<TerminalState>, ProtocolError> {
    peer.request(&Request::GetState)?;
    let label = peer.receive()?;
    if label == OK {
        return Ok(None);
    }
    let state = TerminalState::parse(&label);
    if state.is_none() && label != "none" {
        warn!(label = label.as_str(), "unknown game state label, treating game as ongoing");
    }
    peer.expect_ok()?;
    Ok(state)
}

/// `getmove` with a thinking budget.
///
/// After the move comes either `ok`, or a depth line followed by either
/// `ok` or an evaluation line and a closing `ok`.
pub fn get_move<P: Peer + ?Sized>(peer: &mut P, budget_ms: u64) -> Result<BotReply, ProtocolError> {
    peer.request(&Request::GetMove { budget_ms })?;

    let line = peer.receive()?;
    let mv = MoveToken::parse(&line)
        .map_err(|_| ProtocolError::violation("a move token", line.as_str()))?;

    let line = peer.receive()?;
    if line == OK {
        return Ok(BotReply {
            mv,
            depth: None,
            eval: None,
        });
    }
    let depth = line
        .parse::<u32>()
        .map(SearchDepth::from_raw)
        .map_err(|_| ProtocolError::violation("a search depth or ok", line.as_str()))?;

    let line = peer.receive()?;
    if line == OK {
        return Ok(BotReply {
            mv,
            depth: Some(depth),
            eval: None,
        });
    }
    let eval = line
        .parse::<i32>()
        .map(Evaluation::from_raw)
        .map_err(|_| ProtocolError::violation("an evaluation or ok", line.as_str()))?;

    peer.expect_ok()?;
    Ok(BotReply {
        mv,
        depth: Some(depth),
        eval: Some(eval),
    })
}

/// `end`. No answer is expected; the peer exits.
pub fn end<P: Peer + ?Sized>(peer: &mut P) -> Result<(), ProtocolError> {
    peer.request(&Request::End)
}
