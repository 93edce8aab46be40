extern crate env_logger;
extern crate log;

use clap::{Parser, Subcommand};

use tripeaks::{
    bench::{self, BenchArgs},
    play::{self, PlayArgs},
};

#[derive(Parser)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the AI play a single dealt game to the end.
    Play(PlayArgs),

    /// Sweep the reward functions over many games and write a CSV report.
    Bench(BenchArgs),
}

fn main() {
    // Initialize env_logger with a default log level of INFO.
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Cli::parse();
    match args.command {
        Commands::Play(args) => play::run_play(args),
        Commands::Bench(args) => bench::run_bench(args),
    }
}
