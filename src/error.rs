use std::path::PathBuf;

use thiserror::Error;

use crate::grid::CellId;

/// Everything that can go wrong while loading or filling a grid. Dead ends during the search are
/// not errors; they're handled by backtracking.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to open '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The grid file, word list or alphabet is malformed.
    #[error("{0}")]
    Format(String),

    #[error("Attempt to set symbol in locked cell {0}")]
    LockedCell(CellId),

    /// A broken assumption about the shape of the constraint graph or walker state.
    #[error("Internal error: {0}")]
    Invariant(String),

    #[error("No empty cells")]
    NoEmptyCells,
}

impl Error {
    pub(crate) fn format(message: impl Into<String>) -> Error {
        Error::Format(message.into())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Error {
        Error::Invariant(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
