mod errors;
mod worker;

use clap::{Parser, ValueEnum};
use errors::TrackerError;
use feed::{
    DEFAULT_CAPACITY, GeneratorConfig, HistoryStore, SqliteStore, TickSource, TickStore,
};
use log::info;
use worker::{Exit, Worker};

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Where retained ticks live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StoreKind {
    /// Per-symbol ring buffers in memory
    Memory,
    /// SQLite database (see --db-path)
    Sqlite,
}

#[derive(Parser, Debug)]
#[command(name = "quote-tracker")]
#[command(about = "Keeps and prints the most recent quotes of a simulated ticker stream", long_about = None)]
struct Args {
    /// Ticks retained per symbol
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: NonZeroUsize,

    /// RNG seed for a reproducible stream
    #[arg(short, long)]
    seed: Option<u64>,

    /// Symbols to simulate (comma-separated)
    #[arg(long, value_delimiter = ',', conflicts_with = "tickers_file")]
    symbols: Vec<String>,

    /// Path to symbols file (one symbol per line)
    #[arg(short, long)]
    tickers_file: Option<PathBuf>,

    /// Tick store backend
    #[arg(long, value_enum, default_value_t = StoreKind::Memory)]
    store: StoreKind,

    /// SQLite database path, `:memory:` keeps it in RAM
    #[arg(long, default_value = feed::sqlite::IN_MEMORY)]
    db_path: PathBuf,

    /// Minimum delay between ticks, in milliseconds
    #[arg(long, default_value_t = 500)]
    min_delay_ms: u64,

    /// Maximum delay between ticks, in milliseconds
    #[arg(long, default_value_t = 1500)]
    max_delay_ms: u64,

    /// Stop after this many ticks
    #[arg(short, long)]
    limit: Option<u64>,
}

impl Args {
    fn generator_config(&self) -> Result<GeneratorConfig, TrackerError> {
        let mut config = GeneratorConfig {
            seed: self.seed,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..GeneratorConfig::default()
        };
        if let Some(path) = &self.tickers_file {
            info!("Loading symbols from: {:?}", path);
            config.symbols = GeneratorConfig::load_symbols(path)?;
        } else if !self.symbols.is_empty() {
            config.symbols = self.symbols.clone();
        }
        Ok(config)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Tracker error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), TrackerError> {
    let config = args.generator_config()?;
    let symbols = config.symbols.clone();
    let source = TickSource::new(config)?;

    info!(
        "Tracking {} symbols, keeping {} quotes each ({:?} store)",
        symbols.len(),
        args.capacity,
        args.store
    );

    match args.store {
        StoreKind::Memory => track(
            HistoryStore::new(args.capacity),
            source,
            &symbols,
            args.limit,
        ),
        StoreKind::Sqlite => {
            info!("Opening tick database: {:?}", args.db_path);
            let store = SqliteStore::open(&args.db_path, args.capacity)?;
            track(store, source, &symbols, args.limit)
        }
    }
}

/// Runs the source into `store` until Ctrl-C, the tick limit, a store failure
/// or the producer thread dying.
fn track<S>(
    store: S,
    source: TickSource,
    symbols: &[String],
    limit: Option<u64>,
) -> Result<(), TrackerError>
where
    S: TickStore + Send + 'static,
    TrackerError: From<S::Error>,
{
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let worker = Worker::new(store, running.clone(), limit);
    let handle = worker.start(source);

    let exit = worker.wait(&handle);

    println!("Shutting down...");
    handle.stop();

    if let Some(e) = worker.take_failure() {
        return Err(e.into());
    }
    if exit == Exit::SourceEnded {
        return Err(TrackerError::SourceEnded);
    }

    for symbol in symbols {
        let retained = worker.store.get(symbol)?;
        info!("{}: {} quotes retained", symbol, retained.len());
    }
    println!("Shutdown complete, {} ticks handled", worker.handled());
    Ok(())
}
