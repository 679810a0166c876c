use clap::ValueEnum;

/// Order in which the walker visits open cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WalkerKind {
    /// Increasing cell number.
    Prefix,
    /// Next to cells that are already filled, whenever possible.
    Flood,
}

/// How the search picks the cell to resume from after a dead end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BacktrackerKind {
    /// Step back to the previous cell.
    Naive,
    /// Jump back to the latest cell sharing a word with a conflict.
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    /// Candidate sets per (length, position, letter).
    #[value(alias = "letter")]
    Indexed,
    /// Sorted word lists searched by prefix.
    #[value(alias = "btree")]
    Sorted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Simple,
    Ascii,
}

/// Settings for one compilation, fixed before the search starts.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub walker: WalkerKind,
    pub backtracker: BacktrackerKind,

    /// Log the grid at most every half second while searching.
    pub show_steps: bool,

    /// Log the grid after every assignment.
    pub show_all_steps: bool,

    /// Give up after this many letter assignments.
    pub max_states: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            walker: WalkerKind::Flood,
            backtracker: BacktrackerKind::Smart,
            show_steps: false,
            show_all_steps: false,
            max_states: None,
        }
    }
}
