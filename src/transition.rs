/*!

The per-cell update rule of the SIR+D automaton, and [`sweep_rows`], which applies it to a run
of rows. Both engines go through `sweep_rows`, so a parallel run with one block draws exactly
the same random numbers, in the same order, as a sequential run.

*/

use crate::config::ModelRates;
use crate::error::SimError;
use crate::grid::GridView;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::Range;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CellState {
    #[default]
    Susceptible,
    Infected,
    Recovered,
    Dead,
}

impl CellState {
    /// Recovered and Dead never change again.
    #[must_use]
    pub fn is_absorbing(self) -> bool {
        matches!(self, CellState::Recovered | CellState::Dead)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransitionRule {
    rates: ModelRates,
}

impl TransitionRule {
    pub fn new(rates: ModelRates) -> Result<Self, SimError> {
        rates.validate()?;
        Ok(TransitionRule { rates })
    }

    #[must_use]
    pub fn rates(&self) -> &ModelRates {
        &self.rates
    }

    #[must_use]
    pub fn radius(&self) -> usize {
        self.rates.radius
    }

    /// `1 - (1 - beta)^k`
    #[must_use]
    pub fn infection_probability(&self, infected_neighbors: u32) -> f64 {
        let exponent = i32::try_from(infected_neighbors).unwrap_or(i32::MAX);
        1.0 - (1.0 - self.rates.beta).powi(exponent)
    }

    /// Computes the next state of one cell. Susceptible and Infected cells consume exactly one
    /// uniform draw each; absorbing cells consume none.
    pub fn next_state<R: Rng>(
        &self,
        state: CellState,
        infected_neighbors: u32,
        rng: &mut R,
    ) -> CellState {
        match state {
            CellState::Susceptible => {
                let u: f64 = rng.random();
                if u < self.infection_probability(infected_neighbors) {
                    CellState::Infected
                } else {
                    CellState::Susceptible
                }
            }
            CellState::Infected => {
                let u: f64 = rng.random();
                if u < self.rates.delta {
                    CellState::Dead
                } else if u < self.rates.delta + self.rates.gamma {
                    CellState::Recovered
                } else {
                    CellState::Infected
                }
            }
            CellState::Recovered | CellState::Dead => state,
        }
    }
}

/// Computes the next state of every cell in `rows` (global row indices) from `view`, writing
/// them row-major into `out`, and returns the number of new infections. `view` must contain
/// `rows` plus the halo the rule's radius requires; `out` must hold exactly `rows.len()` rows.
pub fn sweep_rows<R: Rng>(
    view: &GridView<'_>,
    rows: Range<usize>,
    rule: &TransitionRule,
    rng: &mut R,
    out: &mut [CellState],
) -> u64 {
    let size = view.size();
    debug_assert_eq!(out.len(), rows.len() * size);

    let radius = rule.radius();
    let mut new_infections = 0;
    for (local_row, row) in rows.enumerate() {
        for col in 0..size {
            let state = view.get(row, col);
            let neighbors = match state {
                CellState::Susceptible => view.infected_neighbors(row, col, radius),
                _ => 0,
            };
            let next = rule.next_state(state, neighbors, rng);
            if state == CellState::Susceptible && next == CellState::Infected {
                new_infections += 1;
            }
            out[local_row * size + col] = next;
        }
    }
    new_infections
}
