use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use feed::{SharedStore, Tick, TickSource, TickSourceHandle, TickStore};
use log::{debug, error, info};

/// How often the running flag and the producer thread are checked
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Why [`Worker::wait`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// `running` was cleared (Ctrl-C, tick limit or store failure).
    Stopped,
    /// The producer thread ended while the worker was still running.
    SourceEnded,
}

/// Formats the retained ticks of one symbol for the console.
///
/// First line is `<symbol> - <count> quotes)`, then one line per tick, oldest first.
pub fn render(symbol: &str, ticks: &[Tick]) -> String {
    let mut out = format!("{} - {} quotes)", symbol, ticks.len());
    for tick in ticks {
        out.push('\n');
        out.push_str(&tick.to_string());
    }
    out
}

/// Consumes ticks from a [`TickSource`]: stores each one, reads the symbol's
/// history back and prints it.
pub struct Worker<S: TickStore> {
    pub store: SharedStore<S>,
    pub running: Arc<AtomicBool>,

    handled: Arc<AtomicU64>,
    limit: Option<u64>,
    failure: Arc<Mutex<Option<S::Error>>>,
}

impl<S> Worker<S>
where
    S: TickStore + Send + 'static,
{
    pub fn new(store: S, running: Arc<AtomicBool>, limit: Option<u64>) -> Self {
        Self {
            store: SharedStore::new(store),
            running,
            handled: Arc::new(AtomicU64::new(0)),
            limit,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Stores `tick` and returns the console block for its symbol.
    pub fn handle_tick(store: &SharedStore<S>, tick: Tick) -> Result<String, S::Error> {
        let symbol = tick.symbol.clone();
        let ticks = store.add_and_get(tick)?;
        Ok(render(&symbol, &ticks))
    }

    /// Starts `source` with a display handler bound to this worker's store.
    ///
    /// A store failure or reaching the tick limit clears `running`; the
    /// caller is expected to stop the returned handle once it sees that.
    pub fn start(&self, source: TickSource) -> TickSourceHandle {
        info!("Worker starting...");
        let store = self.store.clone();
        let running = Arc::clone(&self.running);
        let handled = Arc::clone(&self.handled);
        let failure = Arc::clone(&self.failure);
        let limit = self.limit;

        source.start(move |tick| {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            match Self::handle_tick(&store, tick) {
                Ok(block) => {
                    println!();
                    println!("{}", block);
                }
                Err(e) => {
                    error!("Failed to store tick: {}", e);
                    *failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                    running.store(false, Ordering::SeqCst);
                    return;
                }
            }
            let count = handled.fetch_add(1, Ordering::SeqCst) + 1;
            if limit.is_some_and(|limit| count >= limit) {
                debug!("Tick limit of {} reached", count);
                running.store(false, Ordering::SeqCst);
            }
        })
    }

    /// Blocks until `running` is cleared or the producer thread exits.
    pub fn wait(&self, handle: &TickSourceHandle) -> Exit {
        while self.running.load(Ordering::SeqCst) {
            if handle.is_finished() {
                error!("Tick source ended unexpectedly");
                return Exit::SourceEnded;
            }
            thread::sleep(POLL_INTERVAL);
        }
        Exit::Stopped
    }

    /// Ticks stored and printed so far.
    pub fn handled(&self) -> u64 {
        self.handled.load(Ordering::SeqCst)
    }

    /// Takes the store error that stopped the worker, if any.
    pub fn take_failure(&self) -> Option<S::Error> {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
