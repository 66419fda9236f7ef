/*!

The N×N population grid, stored as one flat row-major buffer indexed by `row * size + col`.

Workers never receive copies of the grid. They get a [`GridView`], a borrowed window over the
rows they own plus their halo, which is enough to evaluate every neighborhood they need.

*/

use crate::stats::StateCounts;
use crate::transition::CellState;
use log::debug;
use rand::Rng;
use rustc_hash::FxHashSet;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    size: usize,
    cells: Vec<CellState>,
}

impl Grid {
    /// A grid of `size * size` susceptible cells.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Grid {
            size,
            cells: vec![CellState::Susceptible; size * size],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[row * self.size + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, state: CellState) {
        self.cells[row * self.size + col] = state;
    }

    /// Marks one cell infected, regardless of its current state.
    pub fn infect(&mut self, row: usize, col: usize) {
        self.set(row, col, CellState::Infected);
    }

    /// Infects `count` uniformly random cells. Positions may repeat, so the number of distinct
    /// infected cells, which is returned, can be lower than `count`.
    pub fn scatter_infections<R: Rng>(&mut self, count: usize, rng: &mut R) -> usize {
        if self.size == 0 {
            return 0;
        }
        let mut seeded = FxHashSet::default();
        for _ in 0..count {
            let row = rng.random_range(0..self.size);
            let col = rng.random_range(0..self.size);
            self.infect(row, col);
            seeded.insert((row, col));
        }
        debug!("scattered {count} infections over {} distinct cells", seeded.len());
        seeded.len()
    }

    /// A view over rows `rows`.
    #[must_use]
    pub fn view(&self, rows: Range<usize>) -> GridView<'_> {
        GridView {
            size: self.size,
            first_row: rows.start,
            cells: &self.cells[rows.start * self.size..rows.end * self.size],
        }
    }

    /// A view over the whole grid.
    #[must_use]
    pub fn full_view(&self) -> GridView<'_> {
        self.view(0..self.size)
    }

    /// Overwrites rows starting at `first_row` with `rows`, which holds whole rows row-major.
    pub(crate) fn write_rows(&mut self, first_row: usize, rows: &[CellState]) {
        let start = first_row * self.size;
        self.cells[start..start + rows.len()].copy_from_slice(rows);
    }

    /// Wraps a row-major buffer of exactly `size * size` states.
    pub(crate) fn from_cells(size: usize, cells: Vec<CellState>) -> Self {
        debug_assert_eq!(cells.len(), size * size);
        Grid { size, cells }
    }

    #[must_use]
    pub fn count_rows(&self, rows: Range<usize>) -> StateCounts {
        self.view(rows).counts()
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        self.count_rows(0..self.size)
    }
}

/// A read-only window over a contiguous run of grid rows. Rows are addressed by their global
/// index.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    size: usize,
    first_row: usize,
    cells: &'a [CellState],
}

impl GridView<'_> {
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// The global rows covered by this view.
    #[must_use]
    pub fn rows(&self) -> Range<usize> {
        let row_count = if self.size == 0 { 0 } else { self.cells.len() / self.size };
        self.first_row..self.first_row + row_count
    }

    #[inline]
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> CellState {
        self.cells[(row - self.first_row) * self.size + col]
    }

    /// Counts infected cells within Chebyshev distance `radius` of `(row, col)`, excluding the
    /// cell itself. Positions outside the view are absent, not wrapped.
    #[must_use]
    pub fn infected_neighbors(&self, row: usize, col: usize, radius: usize) -> u32 {
        let rows = self.rows();
        let row_lo = row.saturating_sub(radius).max(rows.start);
        let row_hi = (row + radius + 1).min(rows.end);
        let col_lo = col.saturating_sub(radius);
        let col_hi = (col + radius + 1).min(self.size);

        let mut count = 0;
        for r in row_lo..row_hi {
            let offset = (r - self.first_row) * self.size;
            for c in col_lo..col_hi {
                if (r, c) != (row, col) && self.cells[offset + c] == CellState::Infected {
                    count += 1;
                }
            }
        }
        count
    }

    #[must_use]
    pub fn counts(&self) -> StateCounts {
        let mut counts = StateCounts::default();
        for state in self.cells {
            counts.record(*state);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::initialization_rng;

    #[test]
    fn new_grid_is_susceptible() {
        let grid = Grid::new(5);
        let counts = grid.counts();
        assert_eq!(counts.susceptible, 25);
        assert_eq!(counts.total(), 25);
    }

    #[test]
    fn corner_has_three_neighbors() {
        let mut grid = Grid::new(4);
        for (row, col) in [(0, 1), (1, 0), (1, 1), (2, 2)] {
            grid.infect(row, col);
        }
        // (2, 2) is at distance 2 from the corner
        assert_eq!(grid.full_view().infected_neighbors(0, 0, 1), 3);
        assert_eq!(grid.full_view().infected_neighbors(0, 0, 2), 4);
    }

    #[test]
    fn self_is_not_a_neighbor() {
        let mut grid = Grid::new(3);
        grid.infect(1, 1);
        assert_eq!(grid.full_view().infected_neighbors(1, 1, 1), 0);
        assert_eq!(grid.full_view().infected_neighbors(0, 0, 1), 1);
    }

    #[test]
    fn no_wraparound_at_edges() {
        let mut grid = Grid::new(5);
        grid.infect(4, 4);
        grid.infect(0, 4);
        assert_eq!(grid.full_view().infected_neighbors(0, 0, 1), 0);
    }

    #[test]
    fn view_uses_global_rows() {
        let mut grid = Grid::new(6);
        grid.infect(3, 2);
        let view = grid.view(2..5);
        assert_eq!(view.rows(), 2..5);
        assert_eq!(view.get(3, 2), CellState::Infected);
        assert_eq!(view.infected_neighbors(4, 3, 1), 1);
        assert_eq!(view.counts().infected, 1);
        assert_eq!(view.counts().total(), 18);
    }

    #[test]
    fn view_clips_to_its_rows() {
        let mut grid = Grid::new(6);
        grid.infect(1, 0);
        // Row 1 is outside the view, so the neighbor is not visible.
        assert_eq!(grid.view(2..4).infected_neighbors(2, 0, 1), 0);
        assert_eq!(grid.view(1..4).infected_neighbors(2, 0, 1), 1);
    }

    #[test]
    fn scatter_reports_distinct_cells() {
        let mut grid = Grid::new(10);
        let mut rng = initialization_rng(3);
        let distinct = grid.scatter_infections(20, &mut rng);
        assert!(distinct <= 20);
        assert_eq!(grid.counts().infected as usize, distinct);
    }

    #[test]
    fn scatter_on_tiny_grid_collides() {
        let mut grid = Grid::new(1);
        let mut rng = initialization_rng(3);
        assert_eq!(grid.scatter_infections(5, &mut rng), 1);
    }

    #[test]
    fn write_rows_overwrites_block() {
        let mut grid = Grid::new(3);
        grid.write_rows(1, &[CellState::Dead; 3]);
        assert_eq!(grid.count_rows(1..2).dead, 3);
        assert_eq!(grid.count_rows(0..1).dead, 0);
        assert_eq!(grid.count_rows(2..3).dead, 0);
    }
}
