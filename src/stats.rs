use crate::error::SimError;
use crate::transition::CellState;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// How many cells are in each state within some region of the grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateCounts {
    pub susceptible: u64,
    pub infected: u64,
    pub recovered: u64,
    pub dead: u64,
}

impl StateCounts {
    #[inline]
    pub fn record(&mut self, state: CellState) {
        match state {
            CellState::Susceptible => self.susceptible += 1,
            CellState::Infected => self.infected += 1,
            CellState::Recovered => self.recovered += 1,
            CellState::Dead => self.dead += 1,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.susceptible + self.infected + self.recovered + self.dead
    }
}

impl Add for StateCounts {
    type Output = StateCounts;

    fn add(self, other: StateCounts) -> StateCounts {
        StateCounts {
            susceptible: self.susceptible + other.susceptible,
            infected: self.infected + other.infected,
            recovered: self.recovered + other.recovered,
            dead: self.dead + other.dead,
        }
    }
}

impl AddAssign for StateCounts {
    fn add_assign(&mut self, other: StateCounts) {
        *self = *self + other;
    }
}

/// One row of the run history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub day: u32,
    pub susceptible: u64,
    pub infected: u64,
    pub recovered: u64,
    pub dead: u64,
    pub new_infections: u64,
    pub cumulative_infections: u64,
}

impl DayStats {
    #[must_use]
    pub fn counts(&self) -> StateCounts {
        StateCounts {
            susceptible: self.susceptible,
            infected: self.infected,
            recovered: self.recovered,
            dead: self.dead,
        }
    }

    pub fn set_counts(&mut self, counts: StateCounts) {
        self.susceptible = counts.susceptible;
        self.infected = counts.infected;
        self.recovered = counts.recovered;
        self.dead = counts.dead;
    }

    /// Advances to the next day, folding in that day's new infections. State counts are left
    /// for the caller to fill in.
    #[must_use]
    pub fn next_day(&self, new_infections: u64) -> DayStats {
        DayStats {
            day: self.day + 1,
            new_infections,
            cumulative_infections: self.cumulative_infections + new_infections,
            ..*self
        }
    }
}

/// Sums per-block state counts into grid-wide counts.
pub struct StatsReducer;

impl StatsReducer {
    pub fn reduce<I: IntoIterator<Item = StateCounts>>(blocks: I) -> StateCounts {
        blocks.into_iter().fold(StateCounts::default(), Add::add)
    }

    /// Fails with [`SimError::Consistency`] unless the counts cover the whole population.
    pub fn check_conservation(counts: &StateCounts, population: u64) -> Result<(), SimError> {
        if counts.total() == population {
            Ok(())
        } else {
            Err(SimError::Consistency(format!(
                "state counts {counts:?} sum to {} but the population is {population}",
                counts.total()
            )))
        }
    }
}
