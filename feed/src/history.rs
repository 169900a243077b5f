use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use crate::Tick;

/// Number of ticks retained per symbol by default.
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(15) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Storage contract shared by every tick store.
///
/// `add` appends the tick as the newest entry for its symbol and trims the
/// oldest entries so that at most [`capacity`](TickStore::capacity) remain.
/// `get` returns an owned, oldest-first snapshot; unknown symbols yield an
/// empty vector.
pub trait TickStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn add(&mut self, tick: Tick) -> Result<(), Self::Error>;

    fn get(&self, symbol: &str) -> Result<Vec<Tick>, Self::Error>;

    fn capacity(&self) -> usize;
}

/// In-memory store keeping the most recent ticks of every symbol.
///
/// Each symbol owns a ring buffer trimmed after every insert, so a buffer
/// never holds more than `capacity` entries.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: NonZeroUsize,
    ticks: HashMap<String, VecDeque<Tick>>,
}

impl HistoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            ticks: HashMap::new(),
        }
    }

    /// Appends `tick` for its symbol, evicting the oldest entry on overflow.
    pub fn add(&mut self, tick: Tick) {
        let capacity = self.capacity.get();
        let queue = self
            .ticks
            .entry(tick.symbol.clone())
            .or_insert_with(|| VecDeque::with_capacity(capacity));
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(tick);
    }

    /// Copy of the retained ticks for `symbol`, oldest first.
    pub fn get(&self, symbol: &str) -> Vec<Tick> {
        self.ticks
            .get(symbol)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Symbols seen so far, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.ticks.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Number of ticks currently retained for `symbol`.
    pub fn len(&self, symbol: &str) -> usize {
        self.ticks.get(symbol).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl TickStore for HistoryStore {
    type Error = Infallible;

    fn add(&mut self, tick: Tick) -> Result<(), Self::Error> {
        HistoryStore::add(self, tick);
        Ok(())
    }

    fn get(&self, symbol: &str) -> Result<Vec<Tick>, Self::Error> {
        Ok(HistoryStore::get(self, symbol))
    }

    fn capacity(&self) -> usize {
        HistoryStore::capacity(self)
    }
}

/// Store guarded by a single mutex, for producers running on several threads.
///
/// The append-then-trim sequence of `add` runs entirely under the lock.
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: TickStore> SharedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn add(&self, tick: Tick) -> Result<(), S::Error> {
        // a poisoned store still holds bounded buffers
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .add(tick)
    }

    pub fn get(&self, symbol: &str) -> Result<Vec<Tick>, S::Error> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
    }

    /// Inserts `tick` and returns the resulting snapshot for its symbol in one
    /// critical section.
    pub fn add_and_get(&self, tick: Tick) -> Result<Vec<Tick>, S::Error> {
        let mut store = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let symbol = tick.symbol.clone();
        store.add(tick)?;
        store.get(&symbol)
    }

    pub fn capacity(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .capacity()
    }

    /// Runs `f` with exclusive access to the wrapped store.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::thread;

    fn at(n: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(n, 0).unwrap()
    }

    fn tick(symbol: &str, n: i64) -> Tick {
        Tick::new(symbol, at(n), Some(n as f64)).unwrap()
    }

    fn store(capacity: usize) -> HistoryStore {
        HistoryStore::new(NonZeroUsize::new(capacity).unwrap())
    }

    // -- add / get tests --

    #[test]
    fn get_unknown_symbol_is_empty() {
        let s = store(15);
        assert!(s.get("DDDD").is_empty());
        assert_eq!(s.len("DDDD"), 0);
    }

    #[test]
    fn keeps_last_fifteen_of_twenty() {
        let mut s = store(15);
        for n in 1..=20 {
            s.add(tick("AAAA", n));
        }
        let got = s.get("AAAA");
        let expected: Vec<Tick> = (6..=20).map(|n| tick("AAAA", n)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn symbols_are_kept_apart() {
        let mut s = store(15);
        for n in 1..=3 {
            s.add(tick("BBBB", n));
        }
        for n in 1..=2 {
            s.add(tick("CCCC", n));
        }
        assert_eq!(s.get("BBBB").len(), 3);
        assert_eq!(s.get("CCCC").len(), 2);
        assert!(s.get("DDDD").is_empty());
        assert_eq!(s.symbols(), vec!["BBBB".to_string(), "CCCC".to_string()]);
    }

    #[test]
    fn duplicate_ticks_are_preserved() {
        let mut s = store(3);
        s.add(tick("AAA", 1));
        s.add(tick("AAA", 1));
        assert_eq!(s.get("AAA"), vec![tick("AAA", 1), tick("AAA", 1)]);
    }

    #[test]
    fn each_overflow_evicts_exactly_one() {
        let mut s = store(2);
        s.add(tick("AAA", 1));
        s.add(tick("AAA", 2));
        s.add(tick("AAA", 3));
        assert_eq!(s.get("AAA"), vec![tick("AAA", 2), tick("AAA", 3)]);
        s.add(tick("AAA", 4));
        assert_eq!(s.get("AAA"), vec![tick("AAA", 3), tick("AAA", 4)]);
    }

    #[test]
    fn capacity_of_one_keeps_latest() {
        let mut s = store(1);
        for n in 1..=5 {
            s.add(tick("EEE", n));
        }
        assert_eq!(s.get("EEE"), vec![tick("EEE", 5)]);
    }

    #[test]
    fn snapshot_is_not_mutated_by_later_adds() {
        let mut s = store(2);
        s.add(tick("FFFF", 1));
        let snapshot = s.get("FFFF");
        s.add(tick("FFFF", 2));
        s.add(tick("FFFF", 3));
        assert_eq!(snapshot, vec![tick("FFFF", 1)]);
    }

    #[test]
    fn default_capacity_is_fifteen() {
        assert_eq!(HistoryStore::default().capacity(), 15);
    }

    // -- TickStore trait tests --

    #[test]
    fn trait_calls_match_inherent_calls() {
        fn fill<S: TickStore>(s: &mut S) -> Result<Vec<Tick>, S::Error> {
            for n in 1..=4 {
                s.add(tick("GGG", n))?;
            }
            s.get("GGG")
        }
        let mut s = store(3);
        let got = fill(&mut s).unwrap();
        assert_eq!(got, vec![tick("GGG", 2), tick("GGG", 3), tick("GGG", 4)]);
    }

    // -- SharedStore tests --

    #[test]
    fn shared_store_bounds_parallel_producers() {
        let shared = SharedStore::new(store(15));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for n in 0..100 {
                        shared.add(tick("HHHH", n)).unwrap();
                        assert!(shared.get("HHHH").unwrap().len() <= 15);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.get("HHHH").unwrap().len(), 15);
        assert_eq!(shared.with(|s| s.symbols()), vec!["HHHH".to_string()]);
    }

    #[test]
    fn add_and_get_returns_fresh_snapshot() {
        let shared = SharedStore::new(store(2));
        shared.add(tick("AAA", 1)).unwrap();
        let got = shared.add_and_get(tick("AAA", 2)).unwrap();
        assert_eq!(got, vec![tick("AAA", 1), tick("AAA", 2)]);
        assert_eq!(shared.capacity(), 2);
    }
}
