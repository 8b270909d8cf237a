//! Commands sent to rules and bot peers.

use crate::ProtocolError;
use chess_core::MoveToken;

/// Every command the front end sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Set the opening position.
    SetFen(String),
    /// Set the moves played from the opening position.
    SetMoveHistory(Vec<MoveToken>),
    /// List legal moves.
    GetMoves,
    /// Report the position after the history.
    GetFen,
    /// Report whether the game is over.
    GetState,
    /// Ask a bot to pick a move within `budget_ms` milliseconds.
    GetMove { budget_ms: u64 },
    /// Shut down.
    End,
}

impl Request {
    /// The bare command word.
    pub const fn command(&self) -> &'static str {
        match self {
            Request::SetFen(_) => "setfen",
            Request::SetMoveHistory(_) => "setmovehistory",
            Request::GetMoves => "getmoves",
            Request::GetFen => "getfen",
            Request::GetState => "getstate",
            Request::GetMove { .. } => "getmove",
            Request::End => "end",
        }
    }

    /// The line that follows the command word, if the command carries one.
    pub fn payload(&self) -> Option<String> {
        match self {
            Request::SetFen(notation) => Some(notation.clone()),
            Request::SetMoveHistory(history) => Some(MoveToken::join(history)),
            Request::GetMove { budget_ms } => Some(budget_ms.to_string()),
            Request::GetMoves | Request::GetFen | Request::GetState | Request::End => None,
        }
    }

    /// The exact lines written to the peer.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.command().to_string()];
        lines.extend(self.payload());
        lines
    }

    /// Whether `command` is followed by a payload line.
    ///
    /// Fails for words that are not part of the protocol.
    pub fn takes_payload(command: &str) -> Result<bool, ProtocolError> {
        match command {
            "setfen" | "setmovehistory" | "getmove" => Ok(true),
            "getmoves" | "getfen" | "getstate" | "end" => Ok(false),
            other => Err(ProtocolError::violation("a command word", other)),
        }
    }

    /// Decodes a command word and its payload line.
    pub fn parse(command: &str, payload: Option<&str>) -> Result<Self, ProtocolError> {
        let needs_payload = Self::takes_payload(command)?;
        let payload = match (needs_payload, payload) {
            (true, Some(p)) => p.trim(),
            (true, None) => {
                return Err(ProtocolError::violation(
                    format!("a payload line after {}", command),
                    "",
                ))
            }
            (false, _) => "",
        };

        Ok(match command {
            "setfen" => Request::SetFen(payload.to_string()),
            "setmovehistory" => {
                let history = payload
                    .split_whitespace()
                    .map(|t| {
                        MoveToken::parse(t).map_err(|_| ProtocolError::violation("a move token", t))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Request::SetMoveHistory(history)
            }
            "getmove" => {
                let budget_ms = payload
                    .parse()
                    .map_err(|_| ProtocolError::violation("a budget in milliseconds", payload))?;
                Request::GetMove { budget_ms }
            }
            "getmoves" => Request::GetMoves,
            "getfen" => Request::GetFen,
            "getstate" => Request::GetState,
            _ => Request::End,
        })
    }
}
