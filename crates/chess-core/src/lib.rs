//! Core types shared by the front end and the protocol layer.
//!
//! This crate provides:
//! - [`Color`], [`Piece`] and [`ColoredPiece`] for cell contents
//! - [`Square`], [`File`] and [`Rank`] for board coordinates
//! - [`Position`], decoded from and encoded to six-field position notation
//! - [`MoveToken`] and [`PromotionPiece`] for compact moves
//!
//! No chess rules live here. Legality is always decided by the external
//! rules backend.

mod color;
mod notation;
mod piece;
mod square;
mod token;

pub use color::Color;
pub use notation::{CastlingRights, NotationError, Position};
pub use piece::{ColoredPiece, Piece};
pub use square::{File, Rank, Square};
pub use token::{MoveToken, PromotionPiece, TokenError};
