/*!

Row-block parallel engine. Each day runs as two fork-join phases on a persistent `rayon` pool:

1. **Update.** Every block reads its owned rows plus halo from the current grid (a shared
   immutable borrow, never a copy) and returns freshly computed owned rows together with its
   new-infection count. Once all blocks have returned, the rows are assembled into the next
   day's grid.
2. **Reduction.** Every block counts the four states in its owned rows of the assembled grid;
   the counts are summed into the day's statistics.

Neither phase starts until the previous one has fully joined, and the authoritative grid is
replaced only after both have succeeded. A failing or panicking block fails the whole day.

Block `i` on day `d` draws from a generator seeded with `(seed, d, i)`, so a run is reproducible
for a given thread count regardless of scheduling.

*/

use super::{Engine, EngineState};
use crate::config::Configuration;
use crate::error::SimError;
use crate::grid::Grid;
use crate::partition::{Block, Partitioner};
use crate::random::block_rng;
use crate::stats::{DayStats, StateCounts, StatsReducer};
use crate::transition::{CellState, TransitionRule, sweep_rows};
use log::trace;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// What a block returns from the update phase.
#[derive(Debug)]
struct BlockUpdate {
    block: Block,
    /// Owned rows only, row-major.
    cells: Vec<CellState>,
    new_infections: u64,
}

/// The update-phase task run for each block.
type UpdateFn = fn(&Grid, &Block, &TransitionRule, u64, u32) -> Result<BlockUpdate, SimError>;

pub struct ParallelEngine {
    state: EngineState,
    partitioner: Partitioner,
    pool: ThreadPool,
}

impl ParallelEngine {
    /// Builds an engine with `config.num_threads` workers.
    pub fn new(config: Configuration) -> Result<Self, SimError> {
        let state = EngineState::new(config)?;
        let config = state.config();
        let partitioner = Partitioner::new(config.size, config.num_threads, config.radius);
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|index| format!("sird-worker-{index}"))
            .build()
            .map_err(|e| SimError::ThreadPool(e.to_string()))?;

        Ok(ParallelEngine {
            state,
            partitioner,
            pool,
        })
    }

    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.partitioner.workers()
    }

    #[must_use]
    pub fn partitioner(&self) -> &Partitioner {
        &self.partitioner
    }

    fn update_phase(&self, day: u32, update: UpdateFn) -> Result<Vec<BlockUpdate>, SimError> {
        let blocks = self.partitioner.blocks();
        let grid = &self.state.grid;
        let rule = &self.state.rule;
        let seed = self.state.config.seed;

        self.pool.install(|| {
            blocks
                .par_iter()
                .map(|block| run_task(day, block.index, || update(grid, block, rule, seed, day)))
                .collect()
        })
    }

    fn reduction_phase(&self, day: u32, grid: &Grid) -> Result<StateCounts, SimError> {
        let blocks = self.partitioner.blocks();

        let block_counts: Vec<StateCounts> = self.pool.install(|| {
            blocks
                .par_iter()
                .map(|block| run_task(day, block.index, || Ok(grid.count_rows(block.owned_rows()))))
                .collect::<Result<_, SimError>>()
        })?;

        Ok(StatsReducer::reduce(block_counts))
    }
}

impl Engine for ParallelEngine {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn state(&self) -> &EngineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut EngineState {
        &mut self.state
    }

    fn simulate_day(&mut self) -> Result<DayStats, SimError> {
        self.step(|grid, block, rule, seed, day| Ok(update_block(grid, block, rule, seed, day)))
    }
}

impl ParallelEngine {
    /// Computes one day with `update` as the per-block task of the update phase.
    fn step(&mut self, update: UpdateFn) -> Result<DayStats, SimError> {
        let day = self.state.next_day();
        let size = self.state.grid.size();

        let updates = self.update_phase(day, update)?;
        let mut next = Grid::new(size);
        let mut new_infections = 0;
        for result in updates {
            let expected = result.block.row_count() * size;
            if result.cells.len() != expected {
                return Err(SimError::Consistency(format!(
                    "block {} returned {} cells for rows {:?}, expected {expected}",
                    result.block.index,
                    result.cells.len(),
                    result.block.owned_rows()
                )));
            }
            next.write_rows(result.block.start, &result.cells);
            new_infections += result.new_infections;
        }

        let counts = self.reduction_phase(day, &next)?;
        self.state.commit_day(next, new_infections, counts)
    }
}

/// Computes the next states of `block`'s owned rows from its halo window.
fn update_block(
    grid: &Grid,
    block: &Block,
    rule: &TransitionRule,
    seed: u64,
    day: u32,
) -> BlockUpdate {
    let mut cells = vec![CellState::default(); block.row_count() * grid.size()];
    let new_infections = if block.is_empty() {
        0
    } else {
        let view = grid.view(block.halo_rows());
        let mut rng = block_rng(seed, day, block.index);
        sweep_rows(&view, block.owned_rows(), rule, &mut rng, &mut cells)
    };
    trace!(
        "day {day}: block {} rows {:?} halo {:?} new infections {new_infections}",
        block.index,
        block.owned_rows(),
        block.halo_rows()
    );

    BlockUpdate {
        block: *block,
        cells,
        new_infections,
    }
}

/// Runs one block task, turning an error or a panic into [`SimError::WorkerFailure`].
fn run_task<T>(
    day: u32,
    block: usize,
    task: impl FnOnce() -> Result<T, SimError>,
) -> Result<T, SimError> {
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(SimError::WorkerFailure {
            day,
            block,
            message: error.to_string(),
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_string());
            Err(SimError::WorkerFailure { day, block, message })
        }
    }
}
