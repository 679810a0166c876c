use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use log::info;
use smallvec::SmallVec;

use crate::config::OutputFormat;
use crate::dict::{DictIndex, Pattern};
use crate::error::{Error, Result};
use crate::symbol::{Alphabet, CellState, Symbol, SymbolSet};
use crate::MAX_WORDS_PER_CELL;

/// An identifier for a cell, based on its index in the grid's `cells` field. In template grids
/// this is `y * width + x`.
pub type CellId = usize;

/// An identifier for a word block, based on its index in the grid's `blocks` field.
pub type BlockId = usize;

/// A cell's membership in a word block: which block, and where in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordRef {
    pub block: BlockId,
    pub pos: usize,
}

/// A single position in the grid.
#[derive(Debug, Clone)]
pub struct Cell {
    state: CellState,

    /// The letter this cell held when the search last skipped back over it, tried first the next
    /// time the cell is filled.
    preferred: Option<Symbol>,

    /// How many letters have been written here, for statistics.
    attempts: u32,

    /// Set for cells fixed by the grid file; the search never writes to them.
    locked: bool,

    words: SmallVec<[WordRef; MAX_WORDS_PER_CELL]>,
}

impl Cell {
    fn new(state: CellState) -> Cell {
        Cell {
            state,
            preferred: None,
            attempts: 0,
            locked: false,
            words: SmallVec::new(),
        }
    }

    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn preferred(&self) -> Option<Symbol> {
        self.preferred
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_empty(&self) -> bool {
        self.state == CellState::Empty
    }

    pub fn is_outside(&self) -> bool {
        self.state == CellState::Outside
    }

    pub fn is_inside(&self) -> bool {
        !self.is_outside()
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.state, CellState::Letter(_))
    }

    /// The word blocks this cell belongs to.
    pub fn words(&self) -> &[WordRef] {
        &self.words
    }

    fn set_state(&mut self, state: CellState) {
        if let CellState::Letter(_) = state {
            self.attempts += 1;
        }
        self.state = state;
    }

    fn clear(&mut self, save_preferred: bool) {
        self.preferred = if save_preferred { self.state.letter() } else { None };
        self.state = CellState::Empty;
    }
}

/// One fillable run of cells, in reading order.
#[derive(Debug, Clone)]
pub struct WordBlock {
    cells: Vec<CellId>,
}

impl WordBlock {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[CellId] {
        &self.cells
    }

    /// The current letters of this block, `None` where the cell is still open.
    pub fn pattern(&self, grid: &Grid) -> Pattern {
        self.cells.iter().map(|&id| grid.cell(id).state().letter()).collect()
    }
}

/// The constraint graph: every cell and every word block. Cells refer to blocks and blocks refer
/// to cells by index only; the grid owns both.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<Cell>,
    blocks: Vec<WordBlock>,

    /// Width and height for grids loaded from a template. General grids have no geometry.
    dimensions: Option<(usize, usize)>,

    /// Returned for any cell id past the end of the grid.
    outside: Cell,
}

impl Grid {
    fn with_cells(cells: Vec<Cell>, dimensions: Option<(usize, usize)>) -> Grid {
        Grid {
            cells,
            blocks: vec![],
            dimensions,
            outside: Cell::new(CellState::Outside),
        }
    }

    /// Build a grid from a template: a `"<width> <height>"` line followed by `height` rows where
    /// `+` is an open cell, a space is a block and a letter is a fixed letter. Short rows are padded
    /// with blocks. Word blocks are every horizontal and vertical run of two or more non-block cells.
    pub fn parse_template(contents: &str, alphabet: &Alphabet) -> Result<Grid> {
        let mut lines = contents.lines();
        let header = lines.next().ok_or_else(|| Error::format("Grid file is empty"))?;

        let dimensions: Vec<&str> = header.split_whitespace().collect();
        let (width, height) = match dimensions[..] {
            [width, height] => match (width.parse::<usize>(), height.parse::<usize>()) {
                (Ok(width), Ok(height)) => (width, height),
                _ => return Err(Error::format(format!("Invalid grid dimensions '{header}'"))),
            },
            _ => return Err(Error::format(format!("Invalid grid dimensions '{header}'"))),
        };
        if width == 0 || height == 0 {
            return Err(Error::format("Grid dimensions must be at least 1"));
        }

        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            let line = lines.next().ok_or_else(|| {
                Error::format(format!("Not enough lines in grid file: expected {height} rows"))
            })?;
            let mut chars = line.trim_end_matches('\r').chars();

            for x in 0..width {
                let state = match chars.next() {
                    None | Some(' ') => CellState::Outside,
                    Some('+') => CellState::Empty,
                    Some(c) if c.is_alphabetic() => match alphabet.symbol(c) {
                        Some(symbol) => CellState::Letter(symbol),
                        None => {
                            return Err(Error::format(format!(
                                "Letter '{c}' at ({x}, {y}) is not in the alphabet"
                            )))
                        }
                    },
                    Some(c) => {
                        return Err(Error::format(format!(
                            "Invalid character '{c}' at ({x}, {y}) in grid file"
                        )))
                    }
                };
                cells.push(Cell::new(state));
            }
        }

        let mut grid = Grid::with_cells(cells, Some((width, height)));
        grid.build_words();

        if let Some(id) = (0..grid.cells.len())
            .find(|&id| grid.cells[id].is_empty() && grid.cells[id].words.is_empty())
        {
            return Err(Error::format(format!(
                "Open cell at ({}, {}) is not part of any word",
                id % width,
                id / width
            )));
        }

        grid.lock();
        Ok(grid)
    }

    pub fn load_template(path: impl AsRef<Path>, alphabet: &Alphabet) -> Result<Grid> {
        let grid = Grid::parse_template(&read_file(path.as_ref())?, alphabet)?;
        info!(
            "Loaded {}x{} grid with {} words",
            grid.width(),
            grid.height(),
            grid.blocks.len()
        );
        Ok(grid)
    }

    /// Build a grid from explicit word blocks: each line lists the cell numbers of one block, in
    /// order, separated by anything that isn't a digit. Lines without numbers are ignored. Cell
    /// numbers that never appear are blocks.
    pub fn parse_general(contents: &str) -> Result<Grid> {
        let mut grid = Grid::with_cells(vec![], None);

        for line in contents.lines() {
            let cell_ids = line
                .split(|c: char| !c.is_ascii_digit())
                .filter(|number| !number.is_empty())
                .map(|number| {
                    number
                        .parse::<CellId>()
                        .map_err(|_| Error::format(format!("Cell number '{number}' is too large")))
                })
                .collect::<Result<Vec<CellId>>>()?;

            if cell_ids.is_empty() {
                continue;
            }

            for &id in &cell_ids {
                if id >= grid.cells.len() {
                    grid.cells.resize_with(id + 1, || Cell::new(CellState::Outside));
                }
                grid.cells[id].state = CellState::Empty;
            }
            grid.add_block(cell_ids);
        }

        grid.lock();
        Ok(grid)
    }

    pub fn load_general(path: impl AsRef<Path>) -> Result<Grid> {
        let grid = Grid::parse_general(&read_file(path.as_ref())?)?;
        info!("Loaded grid with {} cells and {} words", grid.cells.len(), grid.blocks.len());
        Ok(grid)
    }

    fn add_block(&mut self, cells: Vec<CellId>) {
        let block = self.blocks.len();
        for (pos, &id) in cells.iter().enumerate() {
            self.cells[id].words.push(WordRef { block, pos });
        }
        self.blocks.push(WordBlock { cells });
    }

    /// Derive word blocks from the template geometry: rows first, then columns.
    fn build_words(&mut self) {
        let (width, height) = match self.dimensions {
            Some(dimensions) => dimensions,
            None => return,
        };

        let rows = (0..height).map(|y| (0..width).map(|x| y * width + x).collect::<Vec<_>>());
        let columns = (0..width).map(|x| (0..height).map(|y| y * width + x).collect::<Vec<_>>());
        let runs: Vec<Vec<CellId>> = rows
            .chain(columns)
            .flat_map(|line| {
                line.split(|&id| self.cells[id].is_outside())
                    .filter(|run| run.len() > 1)
                    .map(<[CellId]>::to_vec)
                    .collect::<Vec<_>>()
            })
            .collect();

        for run in runs {
            self.add_block(run);
        }
    }

    /// Lock every cell that isn't open, so the search leaves fixed letters and blocks alone.
    pub fn lock(&mut self) {
        for cell in &mut self.cells {
            if !cell.is_empty() {
                cell.locked = true;
            }
        }
    }

    /// The cell with the given id, or a shared block cell if the id is out of range.
    pub fn cell(&self, id: CellId) -> &Cell {
        self.cells.get(id).unwrap_or(&self.outside)
    }

    /// The cell at the given coordinates of a template grid, or a block cell if the coordinates
    /// are off the grid.
    pub fn cell_at(&self, x: isize, y: isize) -> &Cell {
        match self.cell_id_at(x, y) {
            Some(id) => self.cell(id),
            None => &self.outside,
        }
    }

    pub fn cell_id_at(&self, x: isize, y: isize) -> Option<CellId> {
        let (width, height) = self.dimensions?;
        if x < 0 || y < 0 || x as usize >= width || y as usize >= height {
            return None;
        }
        Some(y as usize * width + x as usize)
    }

    fn cell_mut(&mut self, id: CellId) -> Result<&mut Cell> {
        self.cells
            .get_mut(id)
            .ok_or_else(|| Error::invariant(format!("cell {id} is outside the grid")))
    }

    pub fn block(&self, id: BlockId) -> Result<&WordBlock> {
        self.blocks
            .get(id)
            .ok_or_else(|| Error::invariant(format!("word block {id} does not exist")))
    }

    pub fn blocks(&self) -> &[WordBlock] {
        &self.blocks
    }

    /// Write a letter (or clear) a cell. Fails for locked cells.
    pub fn set_symbol(&mut self, id: CellId, state: CellState) -> Result<()> {
        let cell = self.cell_mut(id)?;
        if cell.locked {
            return Err(Error::LockedCell(id));
        }
        cell.set_state(state);
        Ok(())
    }

    /// Empty a cell, remembering its letter as the preferred one if `save_preferred` is set and
    /// forgetting any preference otherwise.
    pub fn clear(&mut self, id: CellId, save_preferred: bool) -> Result<()> {
        let cell = self.cell_mut(id)?;
        if cell.locked {
            return Err(Error::LockedCell(id));
        }
        cell.clear(save_preferred);
        Ok(())
    }

    /// Empty every cell the search may write to and drop all preferences.
    pub fn reset_open_cells(&mut self) {
        for cell in &mut self.cells {
            if !cell.locked {
                cell.state = CellState::Empty;
                cell.preferred = None;
            }
        }
    }

    /// The letters allowed in a cell: the intersection, over every block the cell belongs to, of
    /// the letters the dictionary allows at the cell's position given the block's current letters.
    pub fn find_possible(&self, id: CellId, dict: &dyn DictIndex) -> Result<SymbolSet> {
        let cell = self.cell(id);
        if cell.words.is_empty() {
            return Err(Error::invariant(format!("cell {id} is not part of any word")));
        }

        let mut possible = SymbolSet::all(crate::MAX_ALPHABET_SIZE);
        for word in &cell.words {
            let block = self.block(word.block)?;
            possible &= dict.find_possible(&block.pattern(self), word.pos);
            if possible.is_empty() {
                break;
            }
        }
        Ok(possible)
    }

    pub fn dimensions(&self) -> Option<(usize, usize)> {
        self.dimensions
    }

    pub fn width(&self) -> usize {
        self.dimensions.map_or(0, |(width, _)| width)
    }

    pub fn height(&self) -> usize {
        self.dimensions.map_or(0, |(_, height)| height)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_empty(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_empty()).count()
    }

    /// Number of cells the search may write to.
    pub fn num_open(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.locked).count()
    }

    /// The current contents of a block as a string, `-` for open cells.
    pub fn word(&self, block: &WordBlock, alphabet: &Alphabet) -> String {
        block.cells.iter().map(|&id| display_char(self.cell(id), alphabet)).collect()
    }

    pub fn render(&self, alphabet: &Alphabet, format: OutputFormat) -> String {
        match (self.dimensions, format) {
            (None, _) => self.render_blocks(alphabet),
            (Some(_), OutputFormat::Simple) => self.render_simple(alphabet),
            (Some(_), OutputFormat::Ascii) => self.render_ascii(alphabet),
        }
    }

    /// One character per cell, one line per row.
    pub fn render_simple(&self, alphabet: &Alphabet) -> String {
        let mut result = String::new();
        for y in 0..self.height() {
            for x in 0..self.width() {
                result.push(display_char(self.cell(y * self.width() + x), alphabet));
            }
            result.push('\n');
        }
        result
    }

    /// Boxed rendering with `XXX` for blocks.
    pub fn render_ascii(&self, alphabet: &Alphabet) -> String {
        let separator = format!("+{}", "---+".repeat(self.width()));
        let mut result = format!("{separator}\n");

        for y in 0..self.height() {
            result.push('|');
            for x in 0..self.width() {
                let cell = self.cell(y * self.width() + x);
                if cell.is_outside() {
                    result.push_str("XXX|");
                } else {
                    let _ = write!(result, " {} |", display_char(cell, alphabet));
                }
            }
            result.push('\n');
            result.push_str(&separator);
            result.push('\n');
        }
        result
    }

    /// Each word block on its own line as `word (cell,cell,...)`; used for general grids.
    pub fn render_blocks(&self, alphabet: &Alphabet) -> String {
        let mut result = String::new();
        for block in &self.blocks {
            let cells: Vec<String> = block.cells.iter().map(|id| id.to_string()).collect();
            let _ = writeln!(result, "{} ({})", self.word(block, alphabet), cells.join(","));
        }
        result
    }

    /// Fraction of non-block cells that take part in both a horizontal and a vertical run.
    /// Always 0 for general grids.
    pub fn interlock_degree(&self) -> f64 {
        let mut interlocked = 0;
        let mut total = 0;

        for y in 0..self.height() as isize {
            for x in 0..self.width() as isize {
                if self.cell_at(x, y).is_outside() {
                    continue;
                }
                let vertical = self.cell_at(x, y - 1).is_inside() || self.cell_at(x, y + 1).is_inside();
                let horizontal = self.cell_at(x - 1, y).is_inside() || self.cell_at(x + 1, y).is_inside();
                if vertical && horizontal {
                    interlocked += 1;
                }
                total += 1;
            }
        }

        if total == 0 {
            0.0
        } else {
            interlocked as f64 / total as f64
        }
    }

    /// Number of cells reachable from `id` by following word blocks `level` times, counting the
    /// cell itself.
    pub fn cell_dependencies(&self, id: CellId, level: usize) -> usize {
        let mut reached: BTreeSet<CellId> = BTreeSet::from([id]);

        for _ in 0..level {
            let next: Vec<CellId> = reached
                .iter()
                .flat_map(|&id| self.cell(id).words.iter())
                .filter_map(|word| self.blocks.get(word.block))
                .flat_map(|block| block.cells.iter().copied())
                .collect();
            reached.extend(next);
        }

        reached.len()
    }

    /// Average of `cell_dependencies` over every non-block cell.
    pub fn dependency_degree(&self, level: usize) -> f64 {
        let inside: Vec<CellId> = (0..self.cells.len()).filter(|&id| self.cells[id].is_inside()).collect();
        if inside.is_empty() {
            return 0.0;
        }

        let total: usize = inside.iter().map(|&id| self.cell_dependencies(id, level)).sum();
        total as f64 / inside.len() as f64
    }

    /// Average number of letters written to each non-block cell.
    pub fn attempt_average(&self) -> f64 {
        let inside: Vec<&Cell> = self.cells.iter().filter(|cell| cell.is_inside()).collect();
        if inside.is_empty() {
            return 0.0;
        }

        inside.iter().map(|cell| cell.attempts as f64).sum::<f64>() / inside.len() as f64
    }
}

fn display_char(cell: &Cell, alphabet: &Alphabet) -> char {
    match cell.state {
        CellState::Letter(symbol) => alphabet.char(symbol),
        CellState::Empty => '-',
        CellState::Outside => ' ',
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
