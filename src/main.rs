//! Quizgrid CLI - Command-line interface for scripting and inspecting arenas.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use quizgrid::ArenaConfig;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Quizgrid - A turn-based grid game with quiz battles
#[derive(Parser, Debug)]
#[command(name = "quizgrid")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Arena configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute a JSON scenario script against a fresh arena
    Run {
        /// Scenario script (.json)
        #[arg(required = true)]
        script: PathBuf,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Render this game's board after the script finishes
        #[arg(short, long)]
        board: Option<u64>,

        /// Check store invariants after the script finishes
        #[arg(long)]
        check: bool,
    },

    /// Race many concurrent turn-advance callers against one game
    Contend {
        /// Concurrent callers per round (default: 64)
        #[arg(short = 'n', long, default_value = "64")]
        callers: usize,

        /// Turn windows to run (default: 5)
        #[arg(short, long, default_value = "5")]
        rounds: u32,

        /// Participants in the game (default: 4)
        #[arg(short, long, default_value = "4")]
        participants: u32,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Print the level progression table for a unit
    Levels {
        /// Base attack
        #[arg(long, default_value = "10")]
        attack: u32,

        /// Base defense
        #[arg(long, default_value = "10")]
        defense: u32,

        /// Base healing
        #[arg(long, default_value = "10")]
        healing: u32,

        /// Level-1 price
        #[arg(long, default_value = "10")]
        base_cost: u32,

        /// Last level to print (default: 10)
        #[arg(short, long, default_value = "10")]
        to_level: u32,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Print the battle outcome table for given stats
    Damage {
        /// Attacker's attack
        #[arg(short, long)]
        attack: u32,

        /// Defender's defense
        #[arg(short, long)]
        defense: u32,

        /// Defender's starting health (default: 100)
        #[arg(long, default_value = "100")]
        health: u32,

        /// Attacker's starting stamina (default: 100)
        #[arg(long, default_value = "100")]
        stamina: u32,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Logs go to stderr so JSON output on stdout stays clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ArenaConfig, cli::CliError> {
    match path {
        Some(path) => Ok(ArenaConfig::load(path)?),
        None => Ok(ArenaConfig::default()),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = load_config(args.config.as_ref()).and_then(|config| match args.command {
        Commands::Run {
            script,
            format,
            board,
            check,
        } => cli::run::execute(&script, config, format, board, check),

        Commands::Contend {
            callers,
            rounds,
            participants,
            threads,
            format,
        } => cli::contend::execute(config, callers, rounds, participants, threads, format),

        Commands::Levels {
            attack,
            defense,
            healing,
            base_cost,
            to_level,
            format,
        } => cli::levels::execute(
            &config,
            quizgrid::Stats::new(attack, defense, healing),
            base_cost,
            to_level,
            format,
        ),

        Commands::Damage {
            attack,
            defense,
            health,
            stamina,
            format,
        } => cli::damage::execute(&config, attack, defense, health, stamina, format),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
