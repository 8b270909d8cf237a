//! Opening rotation.
//!
//! A plain text file with one position notation per line. Tournaments play
//! the lines in order, one per game, wrapping around at the end.

use chess_core::{NotationError, Position};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur when loading an opening rotation.
#[derive(Debug, Error)]
pub enum OpeningsError {
    /// Failed to read the rotation file.
    #[error("failed to read openings file: {0}")]
    IoError(#[from] std::io::Error),

    /// A line does not decode as position notation.
    #[error("openings line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: NotationError,
    },

    /// The file contained no positions.
    #[error("openings file contains no positions")]
    Empty,
}

/// An ordered, non-empty list of opening positions with a cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Openings {
    lines: Vec<String>,
    index: usize,
}

impl Openings {
    /// A rotation holding only the standard starting position.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            lines: vec![Position::STARTPOS.to_string()],
            index: 0,
        }
    }

    /// Parses rotation text.
    ///
    /// Blank lines and lines starting with `#` are skipped. Every other
    /// line must decode as position notation.
    pub fn parse(text: &str) -> Result<Self, OpeningsError> {
        let mut lines = Vec::new();
        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            Position::decode(line).map_err(|source| OpeningsError::InvalidLine {
                line: number + 1,
                source,
            })?;
            lines.push(line.to_string());
        }
        if lines.is_empty() {
            return Err(OpeningsError::Empty);
        }
        Ok(Self { lines, index: 0 })
    }

    /// Loads a rotation file.
    pub fn load(path: &Path) -> Result<Self, OpeningsError> {
        let openings = Self::parse(&std::fs::read_to_string(path)?)?;
        info!(path = %path.display(), count = openings.len(), "loaded openings");
        Ok(openings)
    }

    /// Loads `path`, or falls back to [`Openings::standard`] if it does not exist.
    pub fn load_or_standard(path: &Path) -> Result<Self, OpeningsError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "openings file not found, using the standard start");
            Ok(Self::standard())
        }
    }

    /// The notation at the cursor.
    #[must_use]
    pub fn current(&self) -> &str {
        &self.lines[self.index]
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Always false; a rotation holds at least one position.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Moves the cursor forward, wrapping to the first line.
    pub fn advance(&mut self) -> &str {
        self.index = (self.index + 1) % self.lines.len();
        self.current()
    }

    /// Moves the cursor back, wrapping to the last line.
    pub fn retreat(&mut self) -> &str {
        self.index = (self.index + self.lines.len() - 1) % self.lines.len();
        self.current()
    }

    pub fn rewind(&mut self) {
        self.index = 0;
    }
}

impl Default for Openings {
    fn default() -> Self {
        Self::standard()
    }
}
