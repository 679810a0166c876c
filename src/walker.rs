use log::trace;

use crate::config::WalkerKind;
use crate::error::{Error, Result};
use crate::grid::{CellId, Grid};

/// Decides which open cell the search fills next, and remembers the order it filled them in so
/// that the search can retreat.
#[derive(Debug, Clone)]
pub struct Walker {
    kind: WalkerKind,

    /// The cell being filled. Not part of `history`.
    current: CellId,

    /// Cells filled before `current`, oldest first.
    history: Vec<CellId>,

    /// Number of open cells when the walker was created.
    limit: usize,

    started: bool,
}

impl Walker {
    pub fn new(kind: WalkerKind, grid: &Grid) -> Walker {
        Walker {
            kind,
            current: 0,
            history: vec![],
            limit: grid.num_empty(),
            started: false,
        }
    }

    pub fn current(&self) -> CellId {
        self.current
    }

    pub fn history(&self) -> &[CellId] {
        &self.history
    }

    /// 1-based depth of the current cell.
    pub fn step_no(&self) -> usize {
        self.history.len() + 1
    }

    /// Whether there are open cells left after the current one.
    pub fn more_steps(&self) -> bool {
        self.history.len() + 1 < self.limit
    }

    /// Move to the next cell to fill. The first call picks the lowest-numbered open cell; later
    /// calls push the current cell onto the history first.
    pub fn forward(&mut self, grid: &Grid) -> Result<()> {
        if !self.started {
            self.current = first_empty(grid)?;
            self.started = true;
            return Ok(());
        }

        self.history.push(self.current);
        self.current = match self.kind {
            WalkerKind::Prefix => next_empty_after(grid, self.current)?,
            WalkerKind::Flood => self.next_adjacent(grid)?,
        };
        trace!("walker at cell {} (step {})", self.current, self.step_no());
        Ok(())
    }

    /// Find an open cell next to one that has already been visited, scanning the history from
    /// the oldest cell. Falls back to the lowest-numbered open cell if none is adjacent.
    fn next_adjacent(&self, grid: &Grid) -> Result<CellId> {
        for &visited in &self.history {
            for word in grid.cell(visited).words() {
                let block = grid.block(word.block)?;

                let neighbours = [word.pos.checked_sub(1), Some(word.pos + 1)];
                for pos in neighbours.into_iter().flatten() {
                    if let Some(&id) = block.cells().get(pos) {
                        if grid.cell(id).is_empty() {
                            return Ok(id);
                        }
                    }
                }
            }
        }

        first_empty(grid)
    }

    /// Clear the current cell and step back to the previous one. With `save_preferred` the
    /// cleared letter is remembered as the cell's preferred letter; otherwise any preference is
    /// dropped.
    pub fn backward(&mut self, grid: &mut Grid, save_preferred: bool) -> Result<()> {
        let previous = self
            .history
            .pop()
            .ok_or_else(|| Error::invariant("walker has no earlier cell to return to"))?;

        if !grid.cell(self.current).is_outside() {
            grid.clear(self.current, save_preferred)?;
        }
        self.current = previous;
        Ok(())
    }

    /// Step back, saving preferred letters, until `cell` is the current cell. Returns the number
    /// of steps taken.
    pub fn back_to(&mut self, grid: &mut Grid, cell: CellId) -> Result<usize> {
        let mut steps = 0;
        while self.current != cell {
            self.backward(grid, true)?;
            steps += 1;
        }
        Ok(steps)
    }

    /// Step back at least once, then keep going until `stop_here` accepts the current cell or the
    /// first cell is reached. The dead-end cell is cleared without a preference; cells skipped after
    /// it keep theirs. Returns the number of steps taken.
    pub fn back_to_one_of<F>(&mut self, grid: &mut Grid, mut stop_here: F) -> Result<usize>
    where
        F: FnMut(CellId) -> bool,
    {
        self.backward(grid, false)?;
        let mut steps = 1;

        while !stop_here(self.current) && !self.history.is_empty() {
            self.backward(grid, true)?;
            steps += 1;
        }
        Ok(steps)
    }
}

fn first_empty(grid: &Grid) -> Result<CellId> {
    (0..grid.num_cells()).find(|&id| grid.cell(id).is_empty()).ok_or(Error::NoEmptyCells)
}

fn next_empty_after(grid: &Grid, cell: CellId) -> Result<CellId> {
    (cell + 1..grid.num_cells())
        .find(|&id| grid.cell(id).is_empty())
        .ok_or_else(|| Error::invariant(format!("no open cell after cell {cell}")))
}
