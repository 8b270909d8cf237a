use anyhow::Context;
use arena::bot_pool::BotPool;
use arena::config::ArenaConfig;
use arena::game_log::GameLog;
use arena::openings::Openings;
use arena::rules::{RulesBackend, RulesSession};
use arena::tournament::{Controller, ControllerError, GameRecord, MoveOutcome, Notice, Phase, Slot, SlotId};
use chess_core::{File, MoveToken, Position, PromotionPiece, Rank, Square};
use clap::{Parser, Subcommand, ValueEnum};
use engine_protocol::{Launcher, ProcessLauncher};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "arena")]
#[command(about = "Chess front end driven by external rules and bot executables")]
struct Cli {
    /// Configuration file (defaults to arena.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Rules executable (overrides the config file)
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Argument passed to every launched executable
    #[arg(long)]
    mode_flag: Option<String>,

    /// Thinking budget per bot move in milliseconds
    #[arg(long)]
    think_ms: Option<u64>,

    /// Opening rotation file
    #[arg(long)]
    openings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an unattended tournament between two bots
    Tournament {
        /// Bot A: a name from the config file or a path
        bot_a: String,
        /// Bot B: a name from the config file or a path
        bot_b: String,
        /// Number of games to play
        #[arg(short, long)]
        games: Option<u32>,
        /// Directory for the game log
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },
    /// Play at the terminal, optionally against a bot
    Play {
        /// Opponent: a name from the config file or a path
        #[arg(long)]
        bot: Option<String>,
        /// The side you play
        #[arg(long, value_enum, default_value = "white")]
        side: Side,
    },
    /// Run one rules query and print the result
    Query {
        /// Starting position (defaults to the standard start)
        #[arg(long)]
        fen: Option<String>,
        /// Moves played from the starting position
        moves: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    White,
    Black,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ArenaConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ArenaConfig::load().context("loading arena.toml")?,
    };
    if let Some(rules) = cli.rules {
        config.rules_path = rules;
    }
    if let Some(flag) = cli.mode_flag {
        config.mode_flag = flag;
    }
    if let Some(think_ms) = cli.think_ms {
        config.think_ms = think_ms;
    }
    if let Some(openings) = cli.openings {
        config.openings_path = openings;
    }

    match cli.command {
        Commands::Tournament {
            bot_a,
            bot_b,
            games,
            log_dir,
        } => {
            if let Some(games) = games {
                config.games = games;
            }
            if let Some(dir) = log_dir {
                config.log_dir = dir;
            }
            let bot_a = config.resolve_bot(&bot_a);
            let bot_b = config.resolve_bot(&bot_b);

            let stop = Arc::new(AtomicBool::new(false));
            let stop_clone = stop.clone();
            tokio::spawn(async move {
                match signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Shutdown signal received, stopping after the current move");
                        stop_clone.store(true, Ordering::SeqCst);
                    }
                    Err(e) => tracing::error!("Failed to listen for ctrl+c: {}", e),
                }
            });

            let record = tokio::task::spawn_blocking(move || {
                run_tournament(&config, bot_a, bot_b, stop)
            })
            .await??;

            println!(
                "\nSession Results: {} games, W:{} D:{} L:{}",
                record.games_played, record.wins, record.draws, record.losses
            );
        }
        Commands::Play { bot, side } => {
            let bot = bot.map(|b| config.resolve_bot(&b));
            tokio::task::spawn_blocking(move || play(&config, bot, side)).await??;
        }
        Commands::Query { fen, moves } => {
            let history = moves
                .iter()
                .map(|m| m.parse::<MoveToken>())
                .collect::<Result<Vec<_>, _>>()?;
            let opening = fen.unwrap_or_else(|| Position::STARTPOS.to_string());
            let rules = RulesSession::new(
                ProcessLauncher::new(config.mode_flag.clone()),
                config.rules_path.clone(),
            )
            .with_grace(config.shutdown_grace());
            let report = tokio::task::spawn_blocking(move || rules.query(&opening, &history))
                .await??;

            println!("{}", render(&report.position));
            println!("FEN: {}", report.position);
            println!("Legal moves: {}", MoveToken::join(&report.legal_moves));
            match report.state {
                Some(state) => println!("Game over: {}", state),
                None => println!("Game in progress"),
            }
        }
    }

    Ok(())
}

type LiveController = Controller<RulesSession<ProcessLauncher>, ProcessLauncher>;

fn controller(config: &ArenaConfig) -> anyhow::Result<LiveController> {
    let launcher = ProcessLauncher::new(config.mode_flag.clone());
    let rules = RulesSession::new(launcher.clone(), config.rules_path.clone())
        .with_grace(config.shutdown_grace());
    let pool = BotPool::new(launcher, config.shutdown_grace());
    let openings = Openings::load_or_standard(&config.openings_path)?;
    let log = GameLog::create(&config.log_dir)
        .with_context(|| format!("creating log in {}", config.log_dir.display()))?;
    tracing::info!("Game log: {}", log.path().display());
    Ok(Controller::new(rules, pool, openings, config.think_ms)?.with_log(log))
}

fn run_tournament(
    config: &ArenaConfig,
    bot_a: PathBuf,
    bot_b: PathBuf,
    stop: Arc<AtomicBool>,
) -> anyhow::Result<GameRecord> {
    let mut controller = controller(config)?.with_stop_flag(stop);
    controller.set_slot(SlotId::A, Slot::Bot(bot_a))?;
    controller.set_slot(SlotId::B, Slot::Bot(bot_b))?;

    println!(
        "Running {} games: {} vs {}",
        config.games,
        controller.slot(SlotId::A),
        controller.slot(SlotId::B)
    );
    controller.start(config.games)?;

    loop {
        let phase = controller.step()?;
        for notice in controller.take_notices() {
            let record = controller.record();
            match notice {
                Notice::GameOver {
                    result: Some(result),
                    reason,
                } => println!(
                    "Game {}: {} ({}) - W:{} D:{} L:{}",
                    record.games_played,
                    result,
                    reason,
                    record.wins,
                    record.draws,
                    record.losses
                ),
                Notice::NoBotSelected { slot, path } => {
                    eprintln!("No bot selected for {}: {} could not be launched", slot, path.display())
                }
                Notice::RulesUnavailable { failures, reason } => eprintln!(
                    "Rules backend unavailable after {} failure(s), tournament stopped: {}",
                    failures, reason
                ),
                Notice::GameOver { result: None, .. } | Notice::TournamentFinished(_) => {}
            }
        }
        if phase == Phase::Stopped {
            break;
        }
    }

    if controller.bot_failures() > 0 {
        println!("Bot failures recovered: {}", controller.bot_failures());
    }
    Ok(*controller.record())
}

const HELP: &str = "\
Commands:
  e2e4, e7e8r    move from/to, optional promotion letter
  promote <q|r|b|n>
  bot            let the bot play the side to move
  undo           take back the last move
  reset          back to the current opening
  next, prev     step through the openings
  load <fen>     start from a position
  fen            print the current position
  moves          list legal moves
  quit";

fn play(config: &ArenaConfig, bot: Option<PathBuf>, side: Side) -> anyhow::Result<()> {
    let mut controller = controller(config)?;
    let bot_slot = match side {
        Side::White => SlotId::B,
        Side::Black => SlotId::A,
    };
    if let Some(path) = bot {
        controller.set_slot(bot_slot, Slot::Bot(path))?;
    }

    println!("{}", HELP);
    show(&controller);
    bot_reply(&mut controller)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    print!("> ");
    stdout.flush()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();
        let (word, rest) = input.split_once(' ').unwrap_or((input, ""));
        let result = match word {
            "" => Ok(()),
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                Ok(())
            }
            "fen" => {
                println!("{}", controller.notation());
                Ok(())
            }
            "moves" => {
                println!("{}", MoveToken::join(controller.board().legal_moves()));
                Ok(())
            }
            "promote" => match rest.trim().chars().next().and_then(PromotionPiece::from_char) {
                Some(piece) => {
                    controller.set_promotion(piece);
                    println!("Promotion piece: {}", piece);
                    Ok(())
                }
                None => {
                    println!("Use one of q, r, b, n");
                    Ok(())
                }
            },
            "bot" => controller.force_bot_move().map(|mv| {
                if let Some(mv) = mv {
                    println!("Bot plays {}", mv);
                }
                show(&controller);
            }),
            "undo" => controller.undo().map(|_| show(&controller)),
            "reset" => controller.reset().map(|()| show(&controller)),
            "next" => controller.next_opening().map(|()| show(&controller)),
            "prev" => controller.previous_opening().map(|()| show(&controller)),
            "load" => controller.load_notation(rest.trim()).map(|()| show(&controller)),
            _ => human_move(&mut controller, input),
        };
        if let Err(e) = result {
            println!("{}", e);
        }
        announce(&mut controller);
        print!("> ");
        stdout.flush()?;
    }
    Ok(())
}

fn human_move(
    controller: &mut LiveController,
    input: &str,
) -> Result<(), ControllerError> {
    let Some((from, to, promotion)) = parse_pick(input) else {
        println!("Unknown command {:?}; type help", input);
        return Ok(());
    };
    if let Some(piece) = promotion {
        controller.set_promotion(piece);
    }
    match controller.propose_move(from, to)? {
        MoveOutcome::Rejected => println!("Illegal move"),
        MoveOutcome::Stalled => println!("Rules backend failed; move taken back"),
        MoveOutcome::Played { .. } => {
            show(controller);
            announce(controller);
            bot_reply(controller)?;
        }
    }
    Ok(())
}

fn bot_reply(controller: &mut LiveController) -> Result<(), ControllerError> {
    if !controller.bot_to_move() {
        return Ok(());
    }
    let slot = controller.slot_to_move();
    if let Some(mv) = controller.force_bot_move()? {
        let (depth, eval) = controller.diagnostics(slot);
        let depth = depth.map_or_else(|| "-".to_string(), |d| d.to_string());
        let eval = eval.map_or_else(|| "-".to_string(), |e| e.to_string());
        println!("Bot plays {} (depth {}, eval {})", mv, depth, eval);
        show(controller);
    }
    Ok(())
}

fn announce<R: RulesBackend, L: Launcher>(controller: &mut Controller<R, L>) {
    for notice in controller.take_notices() {
        match notice {
            Notice::GameOver { reason, .. } => println!("{}! Game over.", reason),
            Notice::NoBotSelected { slot, path } => println!(
                "No bot selected: {} ({}) could not be launched",
                slot,
                path.display()
            ),
            Notice::RulesUnavailable { reason, .. } => {
                println!("Rules backend unavailable: {}", reason)
            }
            Notice::TournamentFinished(_) => {}
        }
    }
}

fn show<R: RulesBackend, L: Launcher>(controller: &Controller<R, L>) {
    let board = controller.board();
    println!("{}", render(board.position()));
    if board.is_stale() {
        println!("(rules backend unavailable; showing the last known position)");
    }
}

/// `e2e4` or `e7e8q`.
fn parse_pick(input: &str) -> Option<(Square, Square, Option<PromotionPiece>)> {
    if !input.is_ascii() || !(4..=5).contains(&input.len()) {
        return None;
    }
    let from = Square::from_algebraic(&input[0..2])?;
    let to = Square::from_algebraic(&input[2..4])?;
    let promotion = match input[4..].chars().next() {
        Some(c) => Some(PromotionPiece::from_char(c)?),
        None => None,
    };
    Some((from, to, promotion))
}

fn render(position: &Position) -> String {
    let mut out = String::new();
    for rank in Rank::TOP_DOWN {
        out.push(rank.to_char());
        out.push(' ');
        for file in (0..8).filter_map(File::from_index) {
            let cell = position
                .piece_at(Square::new(file, rank))
                .map_or('.', |p| p.to_notation());
            out.push(cell);
        }
        out.push('\n');
    }
    out.push_str("  abcdefgh");
    out
}
