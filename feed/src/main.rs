//! Tick sample dump
//!
//! Prints the first ticks a seeded generator produces, one pipe-delimited
//! line each, without waiting between them. Two runs with the same seed print
//! the same symbols and prices.

use clap::Parser;
use feed::{GeneratorConfig, TickGenerator};
use std::path::PathBuf;

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 1;

/// Deterministic tick sample dump
#[derive(Parser, Debug)]
#[command(name = "feed")]
#[command(about = "Print a reproducible sample of generated ticks", long_about = None)]
struct Args {
    /// RNG seed
    #[arg(short, long, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Number of ticks to print
    #[arg(short, long, default_value_t = 5)]
    count: usize,

    /// Path to symbols file (one symbol per line)
    #[arg(short, long)]
    tickers_file: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let mut config = GeneratorConfig {
        seed: Some(args.seed),
        ..GeneratorConfig::default()
    };
    if let Some(path) = args.tickers_file {
        config.symbols = match GeneratorConfig::load_symbols(&path) {
            Ok(symbols) => symbols,
            Err(e) => {
                eprintln!("Failed to load symbols from {:?}: {}", path, e);
                std::process::exit(1);
            }
        };
    }

    let mut generator = match TickGenerator::new(config) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("Failed to initialize generator: {}", e);
            std::process::exit(1);
        }
    };

    for _ in 0..args.count {
        let step = generator.next_step();
        let delay = generator.next_delay();
        println!(
            "{} delta={:+.4} next_in={}ms",
            step.tick.to_line(),
            step.delta,
            delay.as_millis()
        );
    }
}
