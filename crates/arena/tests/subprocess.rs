//! Drives the arena against real child processes.
//!
//! The rules and bot executables are small shell scripts written into a
//! temporary directory. Everything runs from a single test so no other
//! thread forks while a script is still open for writing.

#![cfg(unix)]

use arena::bot_pool::BotPool;
use arena::game_log::GameLog;
use arena::openings::Openings;
use arena::rules::{RulesBackend, RulesSession};
use arena::tournament::{Controller, Notice, Phase, Slot, SlotId};
use chess_core::{Color, MoveToken, Position};
use engine_protocol::{Evaluation, ProcessLauncher, SearchDepth, TerminalState};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2";

/// Two-ply game: 1. e4 e5 and the side to move is mated.
fn rules_script() -> String {
    format!(
        r#"#!/bin/sh
[ "$1" = "engine" ] || exit 2
hist=""
while IFS= read -r cmd; do
  case "$cmd" in
    setfen) read -r fen; echo ok ;;
    setmovehistory) read -r hist; echo ok ;;
    getmoves)
      case "$hist" in
        "") echo e2e4; echo d2d4 ;;
        "e2e4") echo e7e5 ;;
      esac
      echo ok ;;
    getfen)
      case "$hist" in
        "") echo "$fen" ;;
        "e2e4") echo "{AFTER_E4}" ;;
        *) echo "{AFTER_E5}" ;;
      esac
      echo ok ;;
    getstate)
      [ "$hist" = "e2e4 e7e5" ] && echo checkmate
      echo ok ;;
    end) exit 0 ;;
  esac
done
"#
    )
}

const BOT_SCRIPT: &str = r#"#!/bin/sh
[ "$1" = "engine" ] || exit 2
hist=""
while IFS= read -r cmd; do
  case "$cmd" in
    setfen) read -r fen; echo ok ;;
    setmovehistory) read -r hist; echo ok ;;
    getmove)
      read -r budget
      if [ -z "$hist" ]; then echo e2e4; else echo e7e5; fi
      echo 3
      echo 20
      echo ok ;;
    end) exit 0 ;;
  esac
done
"#;

/// Answers like any rules backend but never exits on `end`.
const STUBBORN_RULES_SCRIPT: &str = r#"#!/bin/sh
while IFS= read -r cmd; do
  case "$cmd" in
    setfen) read -r fen; echo ok ;;
    setmovehistory) read -r hist; echo ok ;;
    getmoves) echo e2e4; echo ok ;;
    getfen) echo "$fen"; echo ok ;;
    getstate) echo ok ;;
    end) while :; do sleep 1; done ;;
  esac
done
"#;

fn install(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn arena_against_child_processes() {
    let dir = tempfile::tempdir().unwrap();
    let rules_path = install(dir.path(), "rules", &rules_script());
    let bot_a = install(dir.path(), "bot_a", BOT_SCRIPT);
    let bot_b = install(dir.path(), "bot_b", BOT_SCRIPT);
    let stubborn_rules = install(dir.path(), "stubborn_rules", STUBBORN_RULES_SCRIPT);
    let launcher = ProcessLauncher::default();
    let grace = Duration::from_secs(2);

    // One rules query.
    let rules = RulesSession::new(launcher.clone(), &rules_path);
    let report = rules.query(Position::STARTPOS, &[]).unwrap();
    assert_eq!(MoveToken::join(&report.legal_moves), "e2e4 d2d4");
    assert_eq!(report.position, Position::startpos());
    assert_eq!(report.state, None);

    let history: Vec<MoveToken> = vec!["e2e4".parse().unwrap(), "e7e5".parse().unwrap()];
    let report = rules.query(Position::STARTPOS, &history).unwrap();
    assert!(report.legal_moves.is_empty());
    assert_eq!(report.position.encode(), AFTER_E5);
    assert_eq!(report.state, Some(TerminalState::Checkmate));

    // A rules process that ignores `end` is killed after the grace period.
    let stubborn = RulesSession::new(launcher.clone(), &stubborn_rules)
        .with_grace(Duration::from_millis(200));
    let report = stubborn.query(Position::STARTPOS, &[]).unwrap();
    assert_eq!(MoveToken::join(&report.legal_moves), "e2e4");

    // A missing rules executable is a launch failure.
    let missing = RulesSession::new(launcher.clone(), dir.path().join("nothing"));
    let err = missing.query(Position::STARTPOS, &[]).unwrap_err();
    assert!(!err.is_desync());

    // A pooled bot answers and keeps running between questions.
    let mut pool = BotPool::new(launcher.clone(), grace);
    let reply = pool.ask_move(&bot_a, Position::STARTPOS, &[], 50).unwrap();
    assert_eq!(reply.mv.as_str(), "e2e4");
    assert_eq!(reply.depth, Some(SearchDepth::Plies(3)));
    assert_eq!(reply.eval, Some(Evaluation::Centipawns(20)));
    let reply = pool
        .ask_move(&bot_a, Position::STARTPOS, &history[..1], 50)
        .unwrap();
    assert_eq!(reply.mv.as_str(), "e7e5");
    assert_eq!(pool.len(), 1);
    assert_eq!(pool.release_all(), 1);
    assert!(pool.is_empty());

    // A two-game tournament with the game log on disk.
    let log = GameLog::create(&dir.path().join("logs")).unwrap();
    let log_path = log.path().to_path_buf();
    let mut controller = Controller::new(
        RulesSession::new(launcher.clone(), &rules_path),
        BotPool::new(launcher, grace),
        Openings::standard(),
        50,
    )
    .unwrap()
    .with_log(log);
    controller.set_slot(SlotId::A, Slot::Bot(bot_a)).unwrap();
    controller.set_slot(SlotId::B, Slot::Bot(bot_b)).unwrap();
    controller.start(2).unwrap();

    assert_eq!(controller.run().unwrap(), Phase::Stopped);
    let record = *controller.record();
    assert_eq!(record.games_played, 2);
    assert_eq!(record.wins, 1);
    assert_eq!(record.losses, 1);
    assert_eq!(record.draws, 0);
    assert_eq!(controller.bot_failures(), 0);
    assert_eq!(controller.board().position().side_to_move, Color::White);

    let notices = controller.take_notices();
    assert!(matches!(notices.last(), Some(Notice::TournamentFinished(_))));
    let games_over = notices
        .iter()
        .filter(|n| matches!(n, Notice::GameOver { .. }))
        .count();
    assert_eq!(games_over, 2);

    let text = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(text.matches("suggested move: e2e4").count(), 2);
    assert!(text.contains("Depth searched: 3"));
    assert!(text.contains("\tTotal games played: 2"));
    assert!(text.contains("\tWins: 1, Draws: 0, Losses: 1"));
}
