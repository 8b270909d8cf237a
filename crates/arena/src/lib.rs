//! Arena - front end and tournament controller for engine-driven chess.
//!
//! No chess rules are computed here. Legal moves, positions and game ends
//! come from an external rules executable; moves for bot seats come from
//! external bot executables. Both speak the line protocol in
//! [`engine_protocol`].
//!
//! # Modules
//!
//! - [`rules`] - one rules process per query
//! - [`bot_pool`] - long-lived bot processes keyed by path
//! - [`resolver`] - from/to picks to legal move tokens
//! - [`board`] - opening, history and the latest rules snapshot
//! - [`tournament`] - the controller: tournaments and free play
//! - [`game_log`] - append-only human-readable log
//! - [`openings`] - opening rotation file
//! - [`config`] - `arena.toml`

pub mod board;
pub mod bot_pool;
pub mod config;
pub mod game_log;
pub mod openings;
pub mod resolver;
pub mod rules;
pub mod tournament;

#[cfg(test)]
mod testing;
