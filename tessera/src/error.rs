//! Error types used by the crate.

use thiserror::Error;

use crate::cache::TileState;
use crate::tile_coord::TileKey;

/// Tessera error type.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TesseraError {
    /// A record for the key is already present in the cache. The existing record is left
    /// untouched.
    #[error("tile {0} is already in the cache")]
    Conflict(TileKey),
    /// A load finished while no loads were outstanding.
    #[error("load counter would go below zero")]
    CounterUnderflow,
    /// Tile state machine does not allow the transition.
    #[error("tile cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        /// Current state.
        from: TileState,
        /// Requested state.
        to: TileState,
    },
    /// Layer options are inconsistent.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// URL template could not be rendered.
    #[error("failed to render url template: {0}")]
    Template(String),
}

/// Reason a single tile failed to load.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TileLoadError {
    /// The load was cancelled because the tile was evicted.
    #[error("tile load was aborted")]
    Aborted,
    /// Transport level failure.
    #[error("failed to fetch tile: {0}")]
    Fetch(String),
    /// Server answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),
    /// The source has no data for the tile.
    #[error("tile not found")]
    NotFound,
}

impl From<strfmt::FmtError> for TesseraError {
    fn from(value: strfmt::FmtError) -> Self {
        Self::Template(value.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TileLoadError {
    fn from(value: reqwest::Error) -> Self {
        match value.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Fetch(value.to_string()),
        }
    }
}
