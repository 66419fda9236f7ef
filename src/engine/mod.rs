/*!

Simulation engines. [`SequentialEngine`] sweeps the whole grid on the calling thread;
[`ParallelEngine`] splits each day into row blocks and runs them on a worker pool. Both share
[`EngineState`] and the [`Engine::run`] loop, so they differ only in how one day is computed.

Given the same [`Configuration`] (including its seed), a parallel engine with one thread
produces exactly the same history as the sequential engine.

*/

mod parallel;
mod sequential;

pub use parallel::ParallelEngine;
pub use sequential::SequentialEngine;

use crate::config::Configuration;
use crate::error::SimError;
use crate::grid::Grid;
use crate::history::History;
use crate::random::initialization_rng;
use crate::stats::{DayStats, StateCounts, StatsReducer};
use crate::transition::TransitionRule;
use log::{debug, info};
use std::time::{Duration, Instant};

/// The progress callback fires on every iteration of [`Engine::run`] divisible by this,
/// starting with the first.
pub const CALLBACK_INTERVAL: u32 = 10;

/// A run may stop early once nobody is infected, but only on iterations after this one.
/// Iterations are zero-based, so the earliest stop is after simulated day 12.
pub const EARLY_EXIT_AFTER_DAY: u32 = 10;

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub duration: Duration,
    pub history: History,
    pub final_stats: DayStats,
    pub r0: f64,
}

/// Grid, counters, and history common to both engines. Only the owning engine mutates it, and
/// only once a whole day has been computed.
#[derive(Debug)]
pub struct EngineState {
    config: Configuration,
    rule: TransitionRule,
    grid: Grid,
    stats: DayStats,
    history: History,
}

impl EngineState {
    pub fn new(config: Configuration) -> Result<Self, SimError> {
        config.validate()?;
        let rule = TransitionRule::new(config.rates())?;
        let grid = Grid::new(config.size);
        let stats = DayStats {
            susceptible: config.population(),
            ..DayStats::default()
        };
        Ok(EngineState {
            config,
            rule,
            grid,
            stats,
            history: History::new(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    #[must_use]
    pub fn rule(&self) -> &TransitionRule {
        &self.rule
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn stats(&self) -> &DayStats {
        &self.stats
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Resets to day 0 with `count` infections at random positions, drawn from the seed's
    /// initialization stream. Returns the number of distinct infected cells.
    pub fn initialize(&mut self, count: usize) -> usize {
        self.grid = Grid::new(self.config.size);
        let mut rng = initialization_rng(self.config.seed);
        let distinct = self.grid.scatter_infections(count, &mut rng);
        self.record_day_zero();
        distinct
    }

    /// Resets to day 0 with exactly the listed cells infected.
    pub fn initialize_at(&mut self, cells: &[(usize, usize)]) -> Result<(), SimError> {
        let size = self.config.size;
        if let Some((row, col)) = cells.iter().find(|(row, col)| *row >= size || *col >= size) {
            return Err(SimError::config(format!(
                "initial infection ({row}, {col}) lies outside the {size}x{size} grid"
            )));
        }
        self.grid = Grid::new(size);
        for &(row, col) in cells {
            self.grid.infect(row, col);
        }
        self.record_day_zero();
        Ok(())
    }

    fn record_day_zero(&mut self) {
        self.stats = DayStats::default();
        self.stats.set_counts(self.grid.counts());
        self.history.clear();
        self.history.push(self.stats);
    }

    /// The day the next sweep computes.
    fn next_day(&self) -> u32 {
        self.stats.day + 1
    }

    /// Installs the next day's grid and counts, and appends the day to the history.
    fn commit_day(
        &mut self,
        grid: Grid,
        new_infections: u64,
        counts: StateCounts,
    ) -> Result<DayStats, SimError> {
        StatsReducer::check_conservation(&counts, self.config.population())?;
        let mut stats = self.stats.next_day(new_infections);
        stats.set_counts(counts);

        self.grid = grid;
        self.stats = stats;
        self.history.push(stats);
        debug!(
            "day {}: S={} I={} R={} D={} new={}",
            stats.day, stats.susceptible, stats.infected, stats.recovered, stats.dead, new_infections
        );
        Ok(stats)
    }
}

pub trait Engine {
    /// Short name used in log messages and output file names.
    fn name(&self) -> &'static str;

    fn state(&self) -> &EngineState;

    fn state_mut(&mut self) -> &mut EngineState;

    /// Advances the grid by one day and returns that day's statistics. On error nothing about
    /// the engine has changed.
    fn simulate_day(&mut self) -> Result<DayStats, SimError>;

    fn initialize(&mut self, count: usize) -> usize {
        self.state_mut().initialize(count)
    }

    fn initialize_at(&mut self, cells: &[(usize, usize)]) -> Result<(), SimError> {
        self.state_mut().initialize_at(cells)
    }

    fn grid(&self) -> &Grid {
        self.state().grid()
    }

    fn stats(&self) -> &DayStats {
        self.state().stats()
    }

    fn history(&self) -> &History {
        self.state().history()
    }

    /// Simulates up to `days` days. Iterations are numbered from 0, so iteration `i` computes
    /// day `i + 1`. `callback(i, stats)` runs after iterations 0, 10, 20, ... and the run ends
    /// early once no cell is infected after an iteration past the tenth. An engine that was
    /// never initialized starts from its current grid as day 0.
    fn run<F>(&mut self, days: u32, mut callback: F) -> Result<SimulationResult, SimError>
    where
        F: FnMut(u32, &DayStats),
        Self: Sized,
    {
        if days == 0 {
            return Err(SimError::config("days must be positive"));
        }
        if self.state().history.is_empty() {
            self.state_mut().record_day_zero();
        }

        info!("starting {} simulation for {days} days", self.name());
        let start = Instant::now();
        for iteration in 0..days {
            let stats = self.simulate_day()?;
            if iteration % CALLBACK_INTERVAL == 0 {
                callback(iteration, &stats);
            }
            if stats.infected == 0 && iteration > EARLY_EXIT_AFTER_DAY {
                info!("epidemic ended on day {}", stats.day);
                break;
            }
        }
        let duration = start.elapsed();
        info!("{} simulation finished in {:.2}s", self.name(), duration.as_secs_f64());

        let state = self.state();
        Ok(SimulationResult {
            duration,
            history: state.history.clone(),
            final_stats: state.stats,
            r0: state.history.estimate_r0(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration {
            size: 8,
            days: 20,
            initial_infected: 4,
            seed: 11,
            ..Configuration::default()
        }
    }

    #[test]
    fn new_state_is_all_susceptible() {
        let state = EngineState::new(config()).unwrap();
        assert_eq!(state.stats().susceptible, 64);
        assert_eq!(state.stats().day, 0);
        assert!(state.history().is_empty());
    }

    #[test]
    fn invalid_config_fails_fast() {
        let result = EngineState::new(Configuration { gamma: 0.8, delta: 0.5, ..config() });
        assert!(matches!(result, Err(SimError::Configuration(_))));
    }

    #[test]
    fn initialize_records_day_zero() {
        let mut state = EngineState::new(config()).unwrap();
        let distinct = state.initialize(4);
        assert_eq!(state.history().len(), 1);
        assert_eq!(state.stats().infected as usize, distinct);
        assert_eq!(state.stats().cumulative_infections, 0);
        assert_eq!(state.stats().counts().total(), 64);
    }

    #[test]
    fn initialize_is_reproducible() {
        let mut a = EngineState::new(config()).unwrap();
        let mut b = EngineState::new(config()).unwrap();
        a.initialize(6);
        b.initialize(6);
        assert_eq!(a.grid(), b.grid());
    }

    #[test]
    fn initialize_at_rejects_out_of_bounds() {
        let mut state = EngineState::new(config()).unwrap();
        assert!(state.initialize_at(&[(8, 0)]).is_err());
        assert!(state.initialize_at(&[(7, 7), (0, 0)]).is_ok());
        assert_eq!(state.stats().infected, 2);
    }

    #[test]
    fn commit_checks_conservation() {
        let mut state = EngineState::new(config()).unwrap();
        state.initialize(1);
        let grid = state.grid().clone();
        let result = state.commit_day(grid, 0, StateCounts::default());
        assert!(matches!(result, Err(SimError::Consistency(_))));
        assert_eq!(state.history().len(), 1);
    }
}
