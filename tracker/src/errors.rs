use std::convert::Infallible;

use feed::{FeedError, StoreError};
use thiserror::Error;

/// Errors that can stop the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Generator setup failed.
    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    /// The tick store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The producer thread exited on its own.
    #[error("Tick source ended unexpectedly")]
    SourceEnded,

    /// Installing the Ctrl-C handler failed.
    #[error("Signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl From<Infallible> for TrackerError {
    fn from(e: Infallible) -> Self {
        match e {}
    }
}
