/*!

A stochastic SIR+D (Susceptible/Infected/Recovered/Dead) cellular automaton on an N×N grid.

Each day every cell's next state is computed from the previous day's grid: a susceptible cell
is infected with probability `1 - (1 - beta)^k` where `k` counts infected cells within the
contact radius, and an infected cell dies with probability `delta` or recovers with
probability `gamma`. Recovered and dead cells never change.

Two engines compute the same model. [`SequentialEngine`] sweeps the whole grid on one thread;
[`ParallelEngine`] splits the grid into row blocks with halo rows and runs them on a worker
pool. With a shared seed, a one-thread parallel run reproduces the sequential run exactly.

```rust
use sird_grid::{Configuration, Engine, SequentialEngine};

let config = Configuration { size: 50, days: 30, initial_infected: 5, seed: 1, ..Configuration::default() };
let mut engine = SequentialEngine::new(config.clone()).unwrap();
engine.initialize(config.initial_infected);
let result = engine.run(config.days, |day, stats| println!("day {day}: {} infected", stats.infected)).unwrap();
assert_eq!(result.history.len() as u32, result.final_stats.day + 1);
```

*/

pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod history;
pub mod log;
pub mod partition;
pub mod random;
pub mod report;
pub mod stats;
pub mod transition;

pub use config::{Configuration, ModelRates};
pub use engine::{Engine, EngineState, ParallelEngine, SequentialEngine, SimulationResult};
pub use error::SimError;
pub use grid::{Grid, GridView};
pub use history::History;
pub use partition::{Block, Partitioner};
pub use stats::{DayStats, StateCounts, StatsReducer};
pub use transition::{CellState, TransitionRule};
