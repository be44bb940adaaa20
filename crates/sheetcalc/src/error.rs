//! Error types for the engine API

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the engine's A1-notation API
///
/// Formula problems are never reported here: they become error values stored
/// in the cell that was written.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// An address or range could not be parsed
    #[error(transparent)]
    Address(#[from] sheetcalc_core::Error),
}
