// Sparse settlement grid and unlocked plots.
//
// The grid maps a `CellCoord` to what occupies it: a building or a resource
// node (`CellRef`). Cells not in the map are empty. A cell is only valid for
// placement if its plot has been unlocked; the set of unlocked plots lives
// alongside the cell map.
//
// Invariant: a cell holds at most one building or node. `occupy` refuses an
// occupied or locked cell, and `release` only clears a cell if it still
// points at the entity being removed.
//
// JSON object keys must be strings, so the grid serializes as explicit lists
// (`GridRepr`) instead of as maps keyed by coordinates.

use crate::types::{BuildingId, CellCoord, NodeId, PlotCoord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// What stands on a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellRef {
    Building(BuildingId),
    Node(NodeId),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GridRepr", into = "GridRepr")]
pub struct Grid {
    cells: BTreeMap<CellCoord, CellRef>,
    plots: BTreeSet<PlotCoord>,
}

#[derive(Serialize, Deserialize)]
struct GridRepr {
    plots: Vec<PlotCoord>,
    cells: Vec<(CellCoord, CellRef)>,
}

impl From<GridRepr> for Grid {
    fn from(repr: GridRepr) -> Self {
        Self {
            cells: repr.cells.into_iter().collect(),
            plots: repr.plots.into_iter().collect(),
        }
    }
}

impl From<Grid> for GridRepr {
    fn from(grid: Grid) -> Self {
        Self {
            plots: grid.plots.into_iter().collect(),
            cells: grid.cells.into_iter().collect(),
        }
    }
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a plot buildable. Returns false if it already was.
    pub fn unlock_plot(&mut self, plot: PlotCoord) -> bool {
        self.plots.insert(plot)
    }

    pub fn is_unlocked(&self, plot: PlotCoord) -> bool {
        self.plots.contains(&plot)
    }

    pub fn plots(&self) -> impl Iterator<Item = PlotCoord> + '_ {
        self.plots.iter().copied()
    }

    pub fn plot_count(&self) -> usize {
        self.plots.len()
    }

    /// Whether `plot` touches an unlocked plot on one of its four sides.
    pub fn borders_unlocked(&self, plot: PlotCoord) -> bool {
        plot.neighbors().iter().any(|n| self.is_unlocked(*n))
    }

    pub fn get(&self, cell: CellCoord) -> Option<CellRef> {
        self.cells.get(&cell).copied()
    }

    pub fn in_bounds(&self, cell: CellCoord) -> bool {
        self.is_unlocked(cell.plot())
    }

    /// Unlocked and unoccupied.
    pub fn is_free(&self, cell: CellCoord) -> bool {
        self.in_bounds(cell) && !self.cells.contains_key(&cell)
    }

    /// Put an entity on a cell. Refuses locked or occupied cells.
    pub fn occupy(&mut self, cell: CellCoord, what: CellRef) -> bool {
        if !self.is_free(cell) {
            return false;
        }
        self.cells.insert(cell, what);
        true
    }

    /// Clear a cell, but only if it still holds `what`.
    pub fn release(&mut self, cell: CellCoord, what: CellRef) -> bool {
        if self.cells.get(&cell) == Some(&what) {
            self.cells.remove(&cell);
            true
        } else {
            false
        }
    }

    pub fn free_cells_in(&self, plot: PlotCoord) -> Vec<CellCoord> {
        plot.cells().filter(|c| self.is_free(*c)).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = (CellCoord, CellRef)> + '_ {
        self.cells.iter().map(|(c, r)| (*c, *r))
    }

    /// Drop cells whose occupant no longer exists.
    pub fn retain(&mut self, mut keep: impl FnMut(CellCoord, CellRef) -> bool) {
        self.cells.retain(|c, r| keep(*c, *r));
    }
}
