use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Tick;
use crate::errors::FeedError;
use crate::types::check_symbol;

/// Symbols generated when no universe is configured.
pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "AAA", "BBBB", "CCC", "DDDD", "EEE", "FFFF", "GGG", "HHHH",
];

/// Largest absolute price move applied per tick
const MAX_STEP: f64 = 1.0;

/// Price floor, keeps prices strictly positive
pub const MIN_PRICE: f64 = 1.0;

/// Range for the first price of a symbol
const MIN_START_PRICE: f64 = 10.0;
const MAX_START_PRICE: f64 = 100.0;

/// Default pacing between two ticks
const MIN_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_millis(1500);

/// Settings for the tick generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Symbols picked from uniformly at random.
    pub symbols: Vec<String>,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Lower bound (inclusive) of the delay between ticks.
    pub min_delay: Duration,
    /// Upper bound (exclusive) of the delay between ticks.
    pub max_delay: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            seed: None,
            min_delay: MIN_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

impl GeneratorConfig {
    /// Loads symbols from file (one per line, whitespace trimmed, blank lines skipped).
    pub fn load_symbols(path: impl AsRef<Path>) -> Result<Vec<String>, FeedError> {
        let file = std::fs::File::open(path)?;
        let symbols = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, std::io::Error>>()?
            .into_iter()
            .map(|x| x.trim().to_owned())
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>();
        if symbols.is_empty() {
            return Err(FeedError::EmptyUniverse);
        }
        Ok(symbols)
    }

    fn validate(&self) -> Result<(), FeedError> {
        if self.symbols.is_empty() {
            return Err(FeedError::EmptyUniverse);
        }
        for symbol in &self.symbols {
            check_symbol(symbol)?;
        }
        if self.min_delay >= self.max_delay {
            return Err(FeedError::InvalidDelayRange {
                min_ms: self.min_delay.as_millis() as u64,
                max_ms: self.max_delay.as_millis() as u64,
            });
        }
        Ok(())
    }
}

/// One generated tick together with the price move applied to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub tick: Tick,
    /// New price minus the previous price; for a symbol's first tick the
    /// previous price is its random starting price.
    pub delta: f64,
}

/// Moves `previous` by a random step in `[-MAX_STEP, MAX_STEP]`, never below `MIN_PRICE`.
fn walk_price(rng: &mut impl Rng, previous: f64) -> f64 {
    let step = rng.random_range(-MAX_STEP..=MAX_STEP);
    (previous + step).max(MIN_PRICE)
}

/// Random-walk price generator, stepped one tick at a time.
///
/// Symbol choice, price moves and pacing delays are all drawn from the same
/// RNG, so two generators built with the same seed produce the same sequence
/// as long as they are stepped the same way.
pub struct TickGenerator {
    symbols: Vec<String>,
    last_prices: HashMap<String, f64>,
    rng: StdRng,
    min_delay: Duration,
    max_delay: Duration,
}

impl TickGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self, FeedError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            symbols: config.symbols,
            last_prices: HashMap::new(),
            rng,
            min_delay: config.min_delay,
            max_delay: config.max_delay,
        })
    }

    /// Picks a symbol, moves its price and stamps the result with the current time.
    pub fn next_step(&mut self) -> Step {
        let idx = self.rng.random_range(0..self.symbols.len());
        let symbol = &self.symbols[idx];

        let previous = match self.last_prices.get(symbol) {
            Some(price) => *price,
            None => self.rng.random_range(MIN_START_PRICE..MAX_START_PRICE),
        };
        let price = walk_price(&mut self.rng, previous);
        self.last_prices.insert(symbol.clone(), price);

        Step {
            tick: Tick {
                symbol: symbol.clone(),
                timestamp: Utc::now(),
                price: Some(price),
            },
            delta: price - previous,
        }
    }

    pub fn next_tick(&mut self) -> Tick {
        self.next_step().tick
    }

    /// Draws the pause before the next tick.
    pub fn next_delay(&mut self) -> Duration {
        let secs = self
            .rng
            .random_range(self.min_delay.as_secs_f64()..self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Last price emitted for `symbol`, if any.
    pub fn last_price(&self, symbol: &str) -> Option<f64> {
        self.last_prices.get(symbol).copied()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }
}

/// Paced producer that runs a [`TickGenerator`] on its own thread.
pub struct TickSource {
    generator: TickGenerator,
}

impl TickSource {
    pub fn new(config: GeneratorConfig) -> Result<Self, FeedError> {
        Ok(Self {
            generator: TickGenerator::new(config)?,
        })
    }

    /// Starts the producer loop, calling `on_tick` once per tick in emission order.
    ///
    /// Ticks are delivered one at a time from the producer thread. The loop
    /// runs until [`TickSourceHandle::stop`] is called or the handle is dropped.
    pub fn start<F>(self, on_tick: F) -> TickSourceHandle
    where
        F: FnMut(Tick) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel();
        let emitted = Arc::new(AtomicU64::new(0));
        let emitted_clone = Arc::clone(&emitted);
        let generator = self.generator;

        info!(
            "Tick source starting for {} symbols",
            generator.symbols().len()
        );
        let thread = thread::spawn(move || {
            Self::run(generator, on_tick, stop_rx, emitted_clone);
        });

        TickSourceHandle {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
            emitted,
        }
    }

    fn run<F>(
        mut generator: TickGenerator,
        mut on_tick: F,
        stop_rx: mpsc::Receiver<()>,
        emitted: Arc<AtomicU64>,
    ) where
        F: FnMut(Tick),
    {
        loop {
            let tick = generator.next_tick();
            emitted.fetch_add(1, Ordering::SeqCst);
            on_tick(tick);

            let delay = generator.next_delay();
            match stop_rx.recv_timeout(delay) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("Tick source received shutdown signal");
                    break;
                }
            }
        }
    }
}

/// Handle to a running [`TickSource`]; stops the loop when dropped.
pub struct TickSourceHandle {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    emitted: Arc<AtomicU64>,
}

impl TickSourceHandle {
    /// Signals the producer and waits for the current callback to return.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Number of ticks handed to the callback so far, counting one still in flight.
    pub fn ticks_emitted(&self) -> u64 {
        self.emitted.load(Ordering::SeqCst)
    }

    /// True once the producer thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn shutdown(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            // the loop may already be gone
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Tick source thread panicked");
            }
            info!(
                "Tick source stopped after {} ticks",
                self.emitted.load(Ordering::Relaxed)
            );
        }
    }
}

impl Drop for TickSourceHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
