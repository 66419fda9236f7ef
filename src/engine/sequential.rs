use super::{Engine, EngineState};
use crate::config::Configuration;
use crate::error::SimError;
use crate::grid::Grid;
use crate::random::block_rng;
use crate::stats::DayStats;
use crate::transition::{CellState, sweep_rows};

/// Computes each day with one full sweep on the calling thread.
#[derive(Debug)]
pub struct SequentialEngine {
    state: EngineState,
}

impl SequentialEngine {
    pub fn new(config: Configuration) -> Result<Self, SimError> {
        Ok(SequentialEngine {
            state: EngineState::new(config)?,
        })
    }
}

impl Engine for SequentialEngine {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn state(&self) -> &EngineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    fn simulate_day(&mut self) -> Result<DayStats, SimError> {
        let state = &self.state;
        let size = state.grid.size();
        let day = state.next_day();

        // The whole grid is one block, block 0.
        let mut rng = block_rng(state.config.seed, day, 0);
        let mut cells = vec![CellState::default(); size * size];
        let new_infections =
            sweep_rows(&state.grid.full_view(), 0..size, &state.rule, &mut rng, &mut cells);
        let next = Grid::from_cells(size, cells);

        let counts = next.counts();
        self.state.commit_day(next, new_infections, counts)
    }
}
