use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info, warn};
use sird_grid::{
    Configuration, DayStats, Engine, ParallelEngine, SequentialEngine, SimulationResult,
    log::set_log_level,
    report::{
        ScalingRecord, Summary, compare_runs, prepare_output_dir, write_history_csv,
        write_scaling_csv, write_scaling_json,
    },
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sird", about = "Run the SIR+D grid epidemic simulation")]
struct Args {
    /// Console log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a single simulation and write its history and summary.
    Run {
        /// JSON configuration file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = EngineKind::Parallel)]
        engine: EngineKind,
        /// Overrides `numThreads`.
        #[arg(long)]
        threads: Option<usize>,
        /// Overrides `days`.
        #[arg(long)]
        days: Option<u32>,
        /// Overrides `seed`.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
    },
    /// Time a sequential baseline against parallel runs at several thread counts.
    Scaling {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, value_delimiter = ',', default_values_t = [1, 2, 4, 8])]
        threads: Vec<usize>,
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum EngineKind {
    Sequential,
    Parallel,
}

fn load_config(path: Option<&Path>) -> Result<Configuration> {
    match path {
        Some(path) => Configuration::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => {
            let config = Configuration::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn print_progress(_iteration: u32, stats: &DayStats) {
    println!(
        "Day {}: S={}, I={}, R={}, D={}",
        stats.day, stats.susceptible, stats.infected, stats.recovered, stats.dead
    );
}

fn simulate<E: Engine>(
    mut engine: E,
    config: &Configuration,
    verbose: bool,
) -> Result<SimulationResult> {
    let distinct = engine.initialize(config.initial_infected);
    info!("{} initial infections over {distinct} distinct cells", config.initial_infected);
    let result = if verbose {
        engine.run(config.days, print_progress)?
    } else {
        engine.run(config.days, |_, _| {})?
    };
    Ok(result)
}

fn run_single(config: &Configuration, kind: EngineKind, output_dir: &Path) -> Result<()> {
    println!("Grid: {0}x{0}, population {1}, days {2}", config.size, config.population(), config.days);

    let (name, result) = match kind {
        EngineKind::Sequential => {
            let engine = SequentialEngine::new(config.clone())?;
            ("sequential", simulate(engine, config, true)?)
        }
        EngineKind::Parallel => {
            println!("Threads: {}", config.num_threads);
            let engine = ParallelEngine::new(config.clone())?;
            ("parallel", simulate(engine, config, true)?)
        }
    };

    println!();
    println!("Duration: {:.2}s", result.duration.as_secs_f64());
    println!("Estimated R0: {:.2}", result.r0);
    println!("Total infected: {}", result.final_stats.cumulative_infections);
    println!("Dead: {}", result.final_stats.dead);
    println!("Recovered: {}", result.final_stats.recovered);

    prepare_output_dir(output_dir)?;
    let csv_path = output_dir.join(format!("{name}.csv"));
    write_history_csv(&result, &csv_path)?;
    let summary_path = output_dir.join(format!("{name}_summary.json"));
    Summary::new(config, &result).write_json(&summary_path)?;
    println!("Results written to {} and {}", csv_path.display(), summary_path.display());
    Ok(())
}

fn run_scaling(config: &Configuration, threads: &[usize], output_dir: &Path) -> Result<()> {
    println!("Running sequential baseline...");
    let sequential = simulate(SequentialEngine::new(config.clone())?, config, false)?;
    println!("Sequential: {:.2}s", sequential.duration.as_secs_f64());

    let mut records = vec![ScalingRecord::baseline(&sequential)];
    for &count in threads {
        let parallel_config = Configuration { num_threads: count, ..config.clone() };
        parallel_config.validate()?;
        let engine = ParallelEngine::new(parallel_config.clone())?;
        let parallel = simulate(engine, &parallel_config, false)?;

        let comparison = compare_runs(&sequential, &parallel, count);
        println!(
            "{count} threads: {:.2}s, speed-up {:.2}x, efficiency {:.1}%",
            parallel.duration.as_secs_f64(),
            comparison.speedup,
            comparison.efficiency * 100.0
        );
        if !comparison.is_consistent() {
            warn!(
                "{count} threads: cumulative infections differ from sequential by {:.2}%",
                comparison.infection_difference * 100.0
            );
        }
        records.push(ScalingRecord::parallel(&sequential, &parallel, count));
    }

    prepare_output_dir(output_dir)?;
    write_scaling_csv(&records, output_dir.join("scaling.csv"))?;
    write_scaling_json(&records, output_dir.join("scaling.json"))?;
    println!("Scaling results written to {}", output_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    set_log_level(args.log_level)?;

    match args.command {
        Command::Run { config, engine, threads, days, seed, output_dir } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(threads) = threads {
                config.num_threads = threads;
            }
            if let Some(days) = days {
                config.days = days;
            }
            if let Some(seed) = seed {
                config.seed = seed;
            }
            config.validate()?;
            run_single(&config, engine, &output_dir)
        }
        Command::Scaling { config, threads, output_dir } => {
            let config = load_config(config.as_deref())?;
            run_scaling(&config, &threads, &output_dir)
        }
    }
}
