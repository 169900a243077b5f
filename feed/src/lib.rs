//! Synthetic market-data feed.
//!
//! A seeded random-walk [`TickSource`] produces ticks for a fixed set of
//! symbols, and [`HistoryStore`] keeps the most recent ticks of each symbol.

pub mod errors;
pub mod generator;
pub mod history;
pub mod sqlite;
pub mod types;

pub use errors::{FeedError, ParseTickErr, StoreError};
pub use generator::{GeneratorConfig, Step, TickGenerator, TickSource, TickSourceHandle};
pub use history::{DEFAULT_CAPACITY, HistoryStore, SharedStore, TickStore};
pub use sqlite::SqliteStore;
pub use types::Tick;
