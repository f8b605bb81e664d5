use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::CliClock;

#[derive(Parser)]
#[command(name = "mazoezi", version, about = "Mazoezi discipline tracker CLI")]
struct Cli {
    /// Pretend the local time is this instant (e.g. 2026-05-04T21:30:00)
    #[arg(long, global = true, value_name = "DATETIME")]
    at: Option<chrono::NaiveDateTime>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Challenge catalog and lifecycle
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Log and judge daily records
    Day {
        #[command(subcommand)]
        action: commands::day::DayAction,
    },
    /// Cycle resets, archive and freeze tokens
    Cycle {
        #[command(subcommand)]
        action: commands::cycle::CycleAction,
    },
    /// Scores, momentum and progress
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Backup export and import
    Data {
        #[command(subcommand)]
        action: commands::data::DataAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let clock = CliClock::new(cli.at);
    let result = match cli.command {
        Commands::Challenge { action } => commands::challenge::run(action, clock),
        Commands::Day { action } => commands::day::run(action, clock),
        Commands::Cycle { action } => commands::cycle::run(action, clock),
        Commands::Stats { action } => commands::stats::run(action, clock),
        Commands::Data { action } => commands::data::run(action, clock),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "mazoezi", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
