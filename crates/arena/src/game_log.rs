//! Append-only, human-readable tournament log.
//!
//! One file per program run, named after the time it was created. Every
//! write opens the file in append mode, writes one block, and closes it
//! again, so a crash never loses more than the block being written.

use crate::tournament::GameRecord;
use chess_core::MoveToken;
use chrono::Local;
use engine_protocol::BotReply;
use std::fmt::{Display, Write as _};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const WIDE_RULE: &str = "==============================================";
const NARROW_RULE: &str = "=======================";

/// Handle to one log file.
#[derive(Debug, Clone)]
pub struct GameLog {
    path: PathBuf,
}

impl GameLog {
    /// Creates `dir` if needed and a fresh `chess_log_YYYYMMDD_HHMMSS.txt` in it.
    pub fn create(dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let name = format!("chess_log_{}.txt", Local::now().format("%Y%m%d_%H%M%S"));
        let log = Self::at(dir.join(name));
        OpenOptions::new().create(true).append(true).open(&log.path)?;
        Ok(log)
    }

    /// Appends to an existing or new file at `path`.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, block: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        file.flush()
    }

    pub fn tournament_header(&self, bot_a: &str, bot_b: &str, games: u32) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "{}", WIDE_RULE);
        let _ = writeln!(block, "\tStarting games at {}", timestamp());
        let _ = writeln!(block, "\tBot A: {}", bot_a);
        let _ = writeln!(block, "\tBot B: {}", bot_b);
        let _ = writeln!(block, "\tNumber of games: {}", games);
        let _ = writeln!(block, "{}\n", WIDE_RULE);
        self.append(&block)
    }

    pub fn game_header(&self, number: u32, opening: &str, white: &str, black: &str) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "{}", NARROW_RULE);
        let _ = writeln!(block, "  Game {}", number);
        let _ = writeln!(block, "  Starting FEN: {}", opening);
        let _ = writeln!(block, "  White: {}", white);
        let _ = writeln!(block, "  Black: {}", black);
        let _ = writeln!(block, "{}\n", NARROW_RULE);
        self.append(&block)
    }

    /// A bot's answer together with the position it was asked about.
    pub fn bot_move(
        &self,
        bot: &Path,
        notation: &str,
        history: &[MoveToken],
        reply: &BotReply,
    ) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "Asking bot for move at {}", timestamp());
        let _ = writeln!(block, "FEN: {}", notation);
        let _ = writeln!(block, "Move history: {}", MoveToken::join(history));
        let _ = writeln!(block, "Bot {} suggested move: {}", bot.display(), reply.mv);
        let _ = writeln!(block, "Depth searched: {}", or_dash(reply.depth));
        let _ = writeln!(block, "Evaluation score: {}\n", or_dash(reply.eval));
        self.append(&block)
    }

    pub fn bot_error(
        &self,
        bot: &Path,
        notation: &str,
        history: &[MoveToken],
        error: &dyn Display,
        failures: u64,
    ) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "Error asking bot {} for move at {}", bot.display(), timestamp());
        let _ = writeln!(block, "Error: {}", error);
        let _ = writeln!(block, "Failures so far: {}", failures);
        let _ = writeln!(block, "FEN: {}", notation);
        let _ = writeln!(block, "Move history: {}\n", MoveToken::join(history));
        self.append(&block)
    }

    /// A rules failure or another event worth keeping next to the games.
    pub fn note(&self, text: &str) -> io::Result<()> {
        self.append(&format!("[{}] {}\n\n", timestamp(), text))
    }

    pub fn result(&self, number: u32, result: &dyn Display, ending: &str) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "{}", NARROW_RULE);
        let _ = writeln!(block, "  Result Game {}", number);
        let _ = writeln!(block, "  Result: {}", result);
        let _ = writeln!(block, "  Ending FEN: {}", ending);
        let _ = writeln!(block, "{}\n", NARROW_RULE);
        self.append(&block)
    }

    pub fn summary(&self, record: &GameRecord) -> io::Result<()> {
        let mut block = String::new();
        let _ = writeln!(block, "{}", WIDE_RULE);
        let _ = writeln!(block, "\tFinished all games at {}", timestamp());
        let _ = writeln!(block, "\tTotal games played: {}", record.games_played);
        let _ = writeln!(
            block,
            "\tWins: {}, Draws: {}, Losses: {}",
            record.wins, record.draws, record.losses
        );
        let _ = writeln!(block, "{}", WIDE_RULE);
        self.append(&block)
    }
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn or_dash<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
