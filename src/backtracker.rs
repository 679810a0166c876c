use log::trace;

use crate::config::BacktrackerKind;
use crate::error::Result;
use crate::grid::{CellId, Grid};
use crate::walker::Walker;

/// Chooses where the search resumes after a dead end.
pub trait Backtracker {
    /// Called when the walker's current cell has no admissible letter left. Moves the walker back
    /// to the cell the search should retry and returns how many cells it retreated.
    fn backtrack(&mut self, walker: &mut Walker, grid: &mut Grid) -> Result<usize>;

    /// Whether the search should stop unwinding at `cell`.
    fn stop_here(&mut self, _cell: CellId) -> bool {
        true
    }
}

pub fn new_backtracker(kind: BacktrackerKind) -> Box<dyn Backtracker> {
    match kind {
        BacktrackerKind::Naive => Box::new(NaiveBacktracker),
        BacktrackerKind::Smart => Box::new(SmartBacktracker::default()),
    }
}

/// Always steps back exactly one cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveBacktracker;

impl Backtracker for NaiveBacktracker {
    fn backtrack(&mut self, walker: &mut Walker, grid: &mut Grid) -> Result<usize> {
        walker.backward(grid, false)?;
        Ok(1)
    }
}

/// A cell that shares a word with a dead end, recorded along with the depth at which the dead end
/// happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BacktrackPoint {
    pub depth: usize,
    pub cell: CellId,
}

/// Conflict-directed backjumping. At a dead end, every filled cell sharing a word with the dead
/// end becomes a candidate; the walker then unwinds to the most recently filled candidate,
/// skipping cells that cannot have caused the conflict.
#[derive(Debug, Clone, Default)]
pub struct SmartBacktracker {
    points: Vec<BacktrackPoint>,
}

impl SmartBacktracker {
    pub fn points(&self) -> &[BacktrackPoint] {
        &self.points
    }
}

impl Backtracker for SmartBacktracker {
    fn backtrack(&mut self, walker: &mut Walker, grid: &mut Grid) -> Result<usize> {
        let depth = walker.step_no();
        let dead_end = walker.current();

        // A point stays alive exactly as long as its cell keeps the letter it had when the point
        // was recorded, that is while the cell is still on the walker's history.
        let history = walker.history();
        self.points.retain(|point| history.contains(&point.cell));

        for word in grid.cell(dead_end).words() {
            let block = grid.block(word.block)?;
            for &cell in block.cells() {
                let named = self.points.iter().any(|point| point.cell == cell);
                if !named && history.contains(&cell) {
                    self.points.push(BacktrackPoint { depth, cell });
                }
            }
        }
        trace!("backtrack points at depth {}: {:?}", depth, self.points);

        walker.back_to_one_of(grid, |cell| self.stop_here(cell))
    }

    /// Consume the first point naming `cell`, if any.
    fn stop_here(&mut self, cell: CellId) -> bool {
        match self.points.iter().position(|point| point.cell == cell) {
            Some(index) => {
                self.points.remove(index);
                true
            }
            None => false,
        }
    }
}
