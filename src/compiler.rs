use instant::{Duration, Instant};
use log::{debug, info};

use crate::backtracker::{new_backtracker, Backtracker};
use crate::config::{OutputFormat, SearchConfig};
use crate::dict::DictIndex;
use crate::error::Result;
use crate::grid::Grid;
use crate::symbol::{Alphabet, CellState};
use crate::walker::Walker;

/// Minimum time between two grids logged with `show_steps`.
pub const SHOW_STEPS_INTERVAL: Duration = Duration::from_millis(500);

/// How a compilation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every open cell holds a letter and every word is in the dictionary.
    Solved,
    /// The search exhausted every candidate at the first cell.
    Unsatisfiable,
    /// The search hit `max_states` before finishing.
    Aborted,
}

#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Letters written to cells.
    pub states: u64,
    pub backtracks: u64,
    /// Backtracks that skipped over at least one cell.
    pub backjumps: u64,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct CompileReport {
    pub outcome: Outcome,

    /// Estimated number of complete fills ruled out by the search.
    pub rejected: f64,

    /// Number of possible fills: alphabet size to the power of the number of open cells.
    pub space: f64,

    pub statistics: Statistics,
}

impl CompileReport {
    pub fn is_solved(&self) -> bool {
        self.outcome == Outcome::Solved
    }

    /// Share of the search space that was ruled out, between 0 and 1.
    pub fn searched_fraction(&self) -> f64 {
        if self.outcome == Outcome::Unsatisfiable {
            return 1.0;
        }

        let fraction = self.rejected / self.space;
        if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        }
    }
}

/// Result of searching below one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Descent {
    Solved,
    Exhausted,
}

/// Depth-first fill of a grid. Each level of recursion owns one cell: it tries that cell's
/// admissible letters in order and recurses into the next cell the walker picks. When a level
/// runs out of letters it hands control to the backtracker, which may unwind several levels at
/// once; a level that finds the walker no longer on its cell returns without trying more letters.
pub struct Compiler<'a> {
    grid: &'a mut Grid,
    dict: &'a dyn DictIndex,
    alphabet: &'a Alphabet,
    config: &'a SearchConfig,
    walker: Walker,
    backtracker: Box<dyn Backtracker>,

    open_cells: usize,
    alphabet_size: f64,
    rejected: f64,
    aborted: bool,
    statistics: Statistics,
    last_shown: Instant,
}

impl<'a> Compiler<'a> {
    pub fn new(
        grid: &'a mut Grid,
        dict: &'a dyn DictIndex,
        alphabet: &'a Alphabet,
        config: &'a SearchConfig,
    ) -> Compiler<'a> {
        let walker = Walker::new(config.walker, grid);
        Compiler {
            grid,
            dict,
            alphabet,
            config,
            walker,
            backtracker: new_backtracker(config.backtracker),
            open_cells: 0,
            alphabet_size: alphabet.len() as f64,
            rejected: 0.0,
            aborted: false,
            statistics: Statistics::default(),
            last_shown: Instant::now(),
        }
    }

    /// Run the search to completion. On anything but success the open cells are left empty.
    pub fn compile(mut self) -> Result<CompileReport> {
        let start = Instant::now();

        self.walker.forward(self.grid)?;
        self.open_cells = self.grid.num_open();
        let space = self.weight(0);

        let outcome = match self.compile_rest(0.0)? {
            Descent::Solved => Outcome::Solved,
            Descent::Exhausted if self.aborted => Outcome::Aborted,
            Descent::Exhausted => {
                self.rejected = space;
                Outcome::Unsatisfiable
            }
        };
        if outcome != Outcome::Solved {
            self.grid.reset_open_cells();
        }

        self.statistics.duration = start.elapsed();
        info!(
            "Search finished: {:?} after {} states, {} backtracks ({} backjumps) in {:?}",
            outcome,
            self.statistics.states,
            self.statistics.backtracks,
            self.statistics.backjumps,
            self.statistics.duration
        );

        Ok(CompileReport {
            outcome,
            rejected: self.rejected,
            space,
            statistics: self.statistics,
        })
    }

    /// Number of fills of the cells from `depth` onwards.
    fn weight(&self, depth: usize) -> f64 {
        let remaining = self.open_cells.saturating_sub(depth);
        self.alphabet_size.powi(i32::try_from(remaining).unwrap_or(i32::MAX))
    }

    fn compile_rest(&mut self, mut rejected: f64) -> Result<Descent> {
        let cell = self.walker.current();
        debug!("attempting to find solution for cell {}", cell);

        let mut possible = self.grid.find_possible(cell, self.dict)?;
        rejected += (self.alphabet_size - possible.len() as f64) * self.weight(self.walker.step_no());
        debug!("cell {} admits {}", cell, self.alphabet.format_set(possible));

        let preferred = self
            .grid
            .cell(cell)
            .preferred()
            .filter(|&symbol| possible.contains(symbol));
        if let Some(symbol) = preferred {
            possible.remove(symbol);
        }

        for symbol in preferred.into_iter().chain(possible) {
            if self.config.max_states.map_or(false, |max| self.statistics.states >= max) {
                info!("Giving up after {} states", self.statistics.states);
                self.aborted = true;
                self.rejected = rejected;
                return Ok(Descent::Exhausted);
            }

            self.grid.set_symbol(cell, CellState::Letter(symbol))?;
            self.statistics.states += 1;
            self.show_step();

            if !self.walker.more_steps() {
                self.rejected = rejected;
                return Ok(Descent::Solved);
            }

            self.walker.forward(self.grid)?;
            if self.compile_rest(rejected)? == Descent::Solved {
                return Ok(Descent::Solved);
            }
            // A backjump past this cell is finished by the level that owns the target cell.
            if self.aborted || self.walker.current() != cell {
                return Ok(Descent::Exhausted);
            }

            rejected += self.weight(self.walker.step_no());
            self.grid.set_symbol(cell, CellState::Empty)?;
        }

        if self.walker.step_no() > 1 {
            let steps = self.backtracker.backtrack(&mut self.walker, self.grid)?;
            self.statistics.backtracks += 1;
            if steps > 1 {
                self.statistics.backjumps += 1;
            }
            debug!("return to {} from {}", self.walker.current(), cell);
        }
        Ok(Descent::Exhausted)
    }

    fn show_step(&mut self) {
        if self.config.show_all_steps {
            info!("\n{}", self.grid.render(self.alphabet, OutputFormat::Simple));
        } else if self.config.show_steps && self.last_shown.elapsed() >= SHOW_STEPS_INTERVAL {
            info!("\n{}", self.grid.render(self.alphabet, OutputFormat::Simple));
            self.last_shown = Instant::now();
        }
    }
}

/// Fill `grid` in place.
pub fn compile(
    grid: &mut Grid,
    dict: &dyn DictIndex,
    alphabet: &Alphabet,
    config: &SearchConfig,
) -> Result<CompileReport> {
    Compiler::new(grid, dict, alphabet, config).compile()
}

#[cfg(test)]
mod tests {
    use super::{compile, CompileReport, Outcome};
    use crate::config::{BacktrackerKind, IndexKind, OutputFormat, SearchConfig, WalkerKind};
    use crate::dict::build_index;
    use crate::error::Error;
    use crate::grid::Grid;
    use crate::symbol::{Alphabet, CellState, Symbol};
    use crate::word_list::WordList;
    use pretty_assertions::assert_eq;
    use proptest::collection::vec;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn config(walker: WalkerKind, backtracker: BacktrackerKind) -> SearchConfig {
        SearchConfig {
            walker,
            backtracker,
            ..SearchConfig::default()
        }
    }

    fn fill(grid: &mut Grid, words: &str, config: &SearchConfig) -> CompileReport {
        let alphabet = Alphabet::default();
        let word_list = WordList::parse(words, &alphabet);
        let index = build_index(IndexKind::Indexed, &word_list);
        compile(grid, index.as_ref(), &alphabet, config).expect("search runs")
    }

    fn template(contents: &str) -> Grid {
        Grid::parse_template(contents, &Alphabet::default()).expect("valid template")
    }

    fn assert_all_words_valid(grid: &Grid, words: &str) {
        let alphabet = Alphabet::default();
        let dictionary: HashSet<&str> = words.lines().collect();
        for block in grid.blocks() {
            let word = grid.word(block, &alphabet);
            assert!(dictionary.contains(word.as_str()), "{word} is not in the dictionary");
        }
    }

    #[test]
    fn test_fills_single_word() {
        let mut grid = template("2 1\n++\n");
        let report = fill(&mut grid, "ab\nba\n", &SearchConfig::default());

        assert_eq!(report.outcome, Outcome::Solved);
        assert_eq!(grid.render(&Alphabet::default(), OutputFormat::Simple), "ab\n");
        assert_eq!(report.statistics.states, 2);
    }

    #[test]
    fn test_keeps_locked_letters() {
        let mut grid = template("3 1\nc+t\n");
        let report = fill(&mut grid, "cat\n", &SearchConfig::default());

        assert!(report.is_solved());
        assert_eq!(grid.render(&Alphabet::default(), OutputFormat::Simple), "cat\n");
        assert!(grid.cell(0).is_locked());
        assert!(grid.cell(2).is_locked());
        assert_eq!(grid.cell(0).attempts(), 0);
        assert_eq!(grid.cell(2).attempts(), 0);
    }

    #[test]
    fn test_unsatisfiable() {
        let mut grid = template("2 1\n++\n");
        let report = fill(&mut grid, "cat\ndog\n", &SearchConfig::default());

        assert_eq!(report.outcome, Outcome::Unsatisfiable);
        assert_eq!(report.searched_fraction(), 1.0);
        assert!(grid.cell(0).is_empty());
        assert!(grid.cell(1).is_empty());
        assert_eq!(grid.cell(0).preferred(), None);
    }

    #[test]
    fn test_unsatisfiable_after_backtracking() {
        let mut grid = template("2 2\n++\n++\n");
        let words = "ab\ncd\n";
        for backtracker in [BacktrackerKind::Naive, BacktrackerKind::Smart] {
            let report = fill(&mut grid, words, &config(WalkerKind::Flood, backtracker));

            assert_eq!(report.outcome, Outcome::Unsatisfiable);
            assert!(report.statistics.backtracks > 0);
            assert_eq!(grid.num_empty(), 4);
            assert!((0..4).all(|cell| grid.cell(cell).preferred().is_none()));
        }
    }

    #[test]
    fn test_no_open_cells() {
        let alphabet = Alphabet::default();
        let mut grid = template("3 1\ncat\n");
        let index = build_index(IndexKind::Sorted, &WordList::parse("cat\n", &alphabet));

        let result = compile(&mut grid, index.as_ref(), &alphabet, &SearchConfig::default());
        assert!(matches!(result, Err(Error::NoEmptyCells)));
    }

    #[test]
    fn test_smart_backtracker_jumps() {
        // Cell 2 dead-ends on the choice at cell 0; cell 1 is irrelevant and gets skipped.
        let words = "ax\nbc\ncb\n";
        let alphabet = Alphabet::default();

        let mut grid = Grid::parse_general("0 1\n0 2\n2 3\n").unwrap();
        let report = fill(&mut grid, words, &config(WalkerKind::Prefix, BacktrackerKind::Smart));
        assert!(report.is_solved());
        assert_eq!(grid.render(&alphabet, OutputFormat::Ascii), "bc (0,1)\nbc (0,2)\ncb (2,3)\n");
        assert_eq!(report.statistics.backtracks, 1);
        assert_eq!(report.statistics.backjumps, 1);
        // Skipped over on the way back, so its letter was remembered.
        assert_eq!(grid.cell(1).preferred(), alphabet.symbol('x'));

        let mut grid = Grid::parse_general("0 1\n0 2\n2 3\n").unwrap();
        let report = fill(&mut grid, words, &config(WalkerKind::Prefix, BacktrackerKind::Naive));
        assert!(report.is_solved());
        assert_eq!(grid.render(&alphabet, OutputFormat::Ascii), "bc (0,1)\nbc (0,2)\ncb (2,3)\n");
        assert_eq!(report.statistics.backtracks, 2);
        assert_eq!(report.statistics.backjumps, 0);
        assert_eq!(grid.cell(1).preferred(), None);
    }

    #[test]
    fn test_strategies_agree() {
        let words = "bit\nice\nten\ncat\nact\ntab\nbat\ntic\n";
        let walkers = [WalkerKind::Prefix, WalkerKind::Flood];
        let backtrackers = [BacktrackerKind::Naive, BacktrackerKind::Smart];

        for walker in walkers {
            for backtracker in backtrackers {
                let mut grid = template("3 3\n+++\n+++\n+++\n");
                let report = fill(&mut grid, words, &config(walker, backtracker));

                assert!(report.is_solved(), "{walker:?}/{backtracker:?} found no fill");
                assert_all_words_valid(&grid, words);
                let fraction = report.searched_fraction();
                assert!((0.0..=1.0).contains(&fraction));
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let words = "bit\nice\nten\ncat\nact\ntab\nbat\ntic\n";
        let run = || {
            let mut grid = template("3 3\n+++\n+ +\n+++\n");
            let report = fill(&mut grid, words, &SearchConfig::default());
            (grid.render(&Alphabet::default(), OutputFormat::Ascii), report.rejected, report.statistics.states)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn test_max_states() {
        let mut grid = Grid::parse_general("0 1\n0 2\n2 3\n").unwrap();
        let config = SearchConfig {
            walker: WalkerKind::Prefix,
            max_states: Some(1),
            ..SearchConfig::default()
        };
        let report = fill(&mut grid, "ax\nbc\ncb\n", &config);

        assert_eq!(report.outcome, Outcome::Aborted);
        assert_eq!(report.statistics.states, 1);
        assert_eq!(grid.num_empty(), 4);
        assert!(grid.cell(1).preferred().is_none());
        assert!(report.searched_fraction() < 1.0);
    }

    #[test]
    fn test_preferred_letter_is_tried_first() {
        let alphabet = Alphabet::default();
        let mut grid = template("2 1\n++\n");
        let word_list = WordList::parse("ab\nba\n", &alphabet);
        let index = build_index(IndexKind::Sorted, &word_list);

        // Leave a remembered 'b' in the first cell.
        let b = CellState::Letter(alphabet.symbol('b').unwrap());
        grid.set_symbol(0, b).unwrap();
        grid.clear(0, true).unwrap();
        assert_eq!(grid.cell(0).preferred(), Some(Symbol::new(1)));

        let report = compile(&mut grid, index.as_ref(), &alphabet, &SearchConfig::default()).unwrap();
        assert!(report.is_solved());
        assert_eq!(grid.render(&alphabet, OutputFormat::Simple), "ba\n");
    }

    #[test]
    fn test_smart_keeps_conflicts_from_earlier_retries() {
        let words = "cba\naa\nbcc\nab\ncc\nbcb\ncac\nba\nbbcb\nbcbb\n";
        let contents = "4 4\n++++\n+ +\n++\n++++\n";

        let mut naive = template(contents);
        let naive_report =
            fill(&mut naive, words, &config(WalkerKind::Prefix, BacktrackerKind::Naive));
        assert_eq!(naive_report.outcome, Outcome::Solved);

        let mut smart = template(contents);
        let smart_report =
            fill(&mut smart, words, &config(WalkerKind::Prefix, BacktrackerKind::Smart));
        assert_eq!(smart_report.outcome, Outcome::Solved);
        assert_all_words_valid(&smart, words);
    }

    #[derive(Debug, Clone)]
    struct Puzzle {
        template: String,
        words: Vec<String>,
    }

    prop_compose! {
        fn puzzle()(width in 2usize..5, height in 2usize..5)
            (rows in vec(vec(prop_oneof![3 => Just('+'), 1 => Just(' ')], width), height),
             words in vec("[a-c]{2,4}", 0..12), width in Just(width), height in Just(height))
            -> Puzzle {
            let rows: Vec<String> = rows.iter().map(|row| row.iter().collect()).collect();
            Puzzle { template: format!("{width} {height}\n{}\n", rows.join("\n")), words }
        }
    }

    proptest! {
        #[test]
        fn test_backtrackers_agree(p in puzzle()) {
            let words = p.words.join("\n");
            let Ok(blank) = Grid::parse_template(&p.template, &Alphabet::default()) else {
                return Ok(());
            };
            if blank.num_empty() == 0 {
                return Ok(());
            }

            for walker in [WalkerKind::Prefix, WalkerKind::Flood] {
                let mut naive = blank.clone();
                let naive_report = fill(&mut naive, &words, &config(walker, BacktrackerKind::Naive));
                let mut smart = blank.clone();
                let smart_report = fill(&mut smart, &words, &config(walker, BacktrackerKind::Smart));

                assert_eq!(naive_report.outcome, smart_report.outcome, "{walker:?} on {p:?}");
                if smart_report.is_solved() {
                    assert_all_words_valid(&naive, &words);
                    assert_all_words_valid(&smart, &words);
                }
            }
        }
    }
}
