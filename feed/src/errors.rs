use std::io;
use thiserror::Error;

/// Errors that can occur while building ticks or configuring the generator.
#[derive(Debug, Error)]
pub enum FeedError {
    /// An I/O error occurred while reading the symbols file.
    ///
    /// Wraps the underlying [`std::io::Error`].
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A tick was built with an empty symbol.
    #[error("Symbol must not be empty")]
    EmptySymbol,

    /// A symbol contains the `|` field separator.
    #[error("Symbol contains '|': {0}")]
    InvalidSymbol(String),

    /// The generator was configured without any symbols.
    #[error("Symbol universe is empty")]
    EmptyUniverse,

    /// Minimum pacing delay is not strictly below the maximum.
    #[error("Invalid delay range: {min_ms}ms..{max_ms}ms")]
    InvalidDelayRange { min_ms: u64, max_ms: u64 },
}

/// Errors raised by persistent tick stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite backend failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An insert touched a number of rows other than one.
    #[error("Expected 1 row to be inserted, got {0}")]
    UnexpectedRowCount(usize),

    /// A stored row could not be turned back into a tick.
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
}

/// Errors that can occur when parsing a tick line.
#[derive(Debug, Error)]
pub enum ParseTickErr {
    /// The line has fewer than the required fields
    #[error("Not enough fields")]
    NotEnoughFields,

    /// The symbol field is empty
    #[error("Empty symbol")]
    EmptySymbol,

    /// The timestamp is not a valid millisecond count
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// The price is not a valid number
    #[error("Invalid price: {0}")]
    InvalidPrice(#[from] std::num::ParseFloatError),
}
