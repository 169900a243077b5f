//! SQLite-backed tick store.
//!
//! Keeps the same bounded, oldest-first contract as the in-memory
//! [`HistoryStore`](crate::HistoryStore): every insert trims the symbol back
//! to `capacity` rows inside one transaction, and opening a database trims
//! every symbol to the capacity it is opened with.

use std::num::NonZeroUsize;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::debug;
use rusqlite::{Connection, params};

use crate::Tick;
use crate::errors::StoreError;
use crate::history::TickStore;

/// Path that selects a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ticks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            symbol TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            price REAL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_ticks_symbol ON ticks(symbol, id)",
        [],
    )?;
    Ok(())
}

/// Drops rows beyond the newest `capacity` of every symbol; returns how many went.
fn trim_all(conn: &Connection, capacity: NonZeroUsize) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM ticks WHERE id IN (
            SELECT id FROM (
                SELECT id, ROW_NUMBER() OVER (PARTITION BY symbol ORDER BY id DESC) AS rn
                FROM ticks
            ) WHERE rn > ?1
        )",
        params![capacity.get() as i64],
    )
}

pub struct SqliteStore {
    conn: Connection,
    capacity: NonZeroUsize,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`; `:memory:` stays in RAM.
    pub fn open(path: impl AsRef<Path>, capacity: NonZeroUsize) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = if path == Path::new(IN_MEMORY) {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };
        init_schema(&conn)?;
        let trimmed = trim_all(&conn, capacity)?;
        debug!(
            "Opened tick database at {}, trimmed {} rows",
            path.display(),
            trimmed
        );
        Ok(Self { conn, capacity })
    }

    pub fn open_in_memory(capacity: NonZeroUsize) -> Result<Self, StoreError> {
        Self::open(IN_MEMORY, capacity)
    }

    /// Total rows across all symbols.
    pub fn row_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ticks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl TickStore for SqliteStore {
    type Error = StoreError;

    fn add(&mut self, tick: Tick) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT INTO ticks (symbol, timestamp, price) VALUES (?1, ?2, ?3)",
            params![tick.symbol, tick.timestamp, tick.price],
        )?;
        if inserted != 1 {
            return Err(StoreError::UnexpectedRowCount(inserted));
        }
        tx.execute(
            "DELETE FROM ticks WHERE symbol = ?1 AND id NOT IN (
                SELECT id FROM ticks WHERE symbol = ?1 ORDER BY id DESC LIMIT ?2
            )",
            params![tick.symbol, self.capacity.get() as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get(&self, symbol: &str) -> Result<Vec<Tick>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT symbol, timestamp, price FROM ticks WHERE symbol = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![symbol], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, DateTime<Utc>>(1)?,
                row.get::<_, Option<f64>>(2)?,
            ))
        })?;

        let mut ticks = Vec::new();
        for row in rows {
            let (symbol, timestamp, price) = row?;
            let tick = Tick::new(symbol, timestamp, price)
                .map_err(|e| StoreError::CorruptRow(e.to_string()))?;
            ticks.push(tick);
        }
        Ok(ticks)
    }

    fn capacity(&self) -> usize {
        self.capacity.get()
    }
}
