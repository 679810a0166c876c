//! Crossword grid filling: load a grid and a word list, then search for letters that make every
//! word block a dictionary word.

pub mod backtracker;
pub mod compiler;
pub mod config;
pub mod dict;
pub mod error;
pub mod grid;
pub mod symbol;
pub mod walker;
pub mod word_list;

pub use compiler::{compile, CompileReport, Compiler, Outcome, Statistics};
pub use config::{BacktrackerKind, IndexKind, OutputFormat, SearchConfig, WalkerKind};
pub use dict::{build_index, DictIndex};
pub use error::{Error, Result};
pub use grid::Grid;
pub use symbol::Alphabet;
pub use word_list::WordList;

/// The maximum number of letters in an alphabet, so that a set of letters fits in a `u32`.
pub const MAX_ALPHABET_SIZE: usize = 32;

/// The maximum length for a single word. Longer dictionary entries are skipped.
pub const MAX_WORD_LENGTH: usize = 32;

/// The expected maximum number of word blocks a cell belongs to. Template grids never exceed it;
/// general grids may.
pub const MAX_WORDS_PER_CELL: usize = 2;
