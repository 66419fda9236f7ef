/*!

Run outputs: the per-day CSV, a JSON summary of a single run, and the speed-up table that
compares parallel runs against a sequential baseline.

*/

use crate::config::Configuration;
use crate::engine::SimulationResult;
use crate::error::SimError;
use crate::stats::DayStats;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

/// Relative difference in cumulative infections below which two runs are considered to agree.
pub const CONSISTENCY_TOLERANCE: f64 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub config: Configuration,
    /// Wall-clock seconds.
    pub duration: f64,
    #[serde(rename = "R0")]
    pub r0: f64,
    pub final_stats: DayStats,
    pub peak_infected: u64,
    pub peak_day: u32,
}

impl Summary {
    #[must_use]
    pub fn new(config: &Configuration, result: &SimulationResult) -> Self {
        let (peak_day, peak_infected) = result.history.peak().unwrap_or_default();
        Summary {
            config: config.clone(),
            duration: result.duration.as_secs_f64(),
            r0: result.r0,
            final_stats: result.final_stats,
            peak_infected,
            peak_day,
        }
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    Sequential,
    Parallel,
}

impl RunKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunKind::Sequential => "sequential",
            RunKind::Parallel => "parallel",
        }
    }
}

/// One row of the scaling table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingRecord {
    pub threads: usize,
    #[serde(rename = "type")]
    pub kind: RunKind,
    pub duration: f64,
    pub speedup: f64,
    pub efficiency: f64,
}

/// How a parallel run compares with a sequential baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    pub speedup: f64,
    pub efficiency: f64,
    /// `|seq - par| / seq` over cumulative infections; zero when the baseline had none.
    pub infection_difference: f64,
}

impl Comparison {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.infection_difference < CONSISTENCY_TOLERANCE
    }
}

#[must_use]
pub fn compare_runs(
    sequential: &SimulationResult,
    parallel: &SimulationResult,
    threads: usize,
) -> Comparison {
    let parallel_secs = parallel.duration.as_secs_f64();
    let speedup = if parallel_secs > 0.0 {
        sequential.duration.as_secs_f64() / parallel_secs
    } else {
        0.0
    };
    let efficiency = speedup / threads.max(1) as f64;

    let baseline = sequential.final_stats.cumulative_infections;
    let other = parallel.final_stats.cumulative_infections;
    let infection_difference = if baseline == 0 {
        0.0
    } else {
        baseline.abs_diff(other) as f64 / baseline as f64
    };

    Comparison {
        speedup,
        efficiency,
        infection_difference,
    }
}

impl ScalingRecord {
    #[must_use]
    pub fn baseline(sequential: &SimulationResult) -> Self {
        ScalingRecord {
            threads: 1,
            kind: RunKind::Sequential,
            duration: sequential.duration.as_secs_f64(),
            speedup: 1.0,
            efficiency: 1.0,
        }
    }

    #[must_use]
    pub fn parallel(sequential: &SimulationResult, parallel: &SimulationResult, threads: usize) -> Self {
        let comparison = compare_runs(sequential, parallel, threads);
        ScalingRecord {
            threads,
            kind: RunKind::Parallel,
            duration: parallel.duration.as_secs_f64(),
            speedup: comparison.speedup,
            efficiency: comparison.efficiency,
        }
    }
}

/// Writes the scaling table as CSV, with duration, speed-up and efficiency to four decimals.
pub fn write_scaling_csv(records: &[ScalingRecord], path: impl AsRef<Path>) -> Result<(), SimError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["threads", "type", "duration", "speedup", "efficiency"])?;
    for record in records {
        writer.write_record([
            record.threads.to_string(),
            record.kind.as_str().to_string(),
            format!("{:.4}", record.duration),
            format!("{:.4}", record.speedup),
            format!("{:.4}", record.efficiency),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_scaling_json(records: &[ScalingRecord], path: impl AsRef<Path>) -> Result<(), SimError> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, records)?;
    Ok(())
}

/// Writes the run history as CSV to `path`.
pub fn write_history_csv(result: &SimulationResult, path: impl AsRef<Path>) -> Result<(), SimError> {
    let file = BufWriter::new(File::create(path)?);
    result.history.write_csv(file)
}

/// Creates `dir` and any missing parents.
pub fn prepare_output_dir(dir: impl AsRef<Path>) -> Result<(), SimError> {
    fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::History;
    use std::time::Duration;

    fn result(duration_ms: u64, infected_by_day: &[u64], cumulative: u64) -> SimulationResult {
        let mut history = History::new();
        for (day, infected) in infected_by_day.iter().enumerate() {
            history.push(DayStats {
                day: day as u32,
                susceptible: 100 - infected,
                infected: *infected,
                ..DayStats::default()
            });
        }
        let final_stats = DayStats {
            cumulative_infections: cumulative,
            ..*history.last().unwrap()
        };
        SimulationResult {
            duration: Duration::from_millis(duration_ms),
            history,
            final_stats,
            r0: 1.25,
        }
    }

    #[test]
    fn summary_reports_peak() {
        let run = result(1500, &[2, 9, 5, 9], 20);
        let summary = Summary::new(&Configuration::default(), &run);
        assert_eq!(summary.peak_day, 1);
        assert_eq!(summary.peak_infected, 9);
        assert_eq!(summary.duration, 1.5);
    }

    #[test]
    fn summary_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let summary = Summary::new(&Configuration::default(), &result(10, &[1, 2], 1));
        summary.write_json(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"R0\""));
        assert!(text.contains("\"peakInfected\""));
        assert!(text.contains("\"initialInfected\""));
        assert_eq!(Summary::read_json(&path).unwrap(), summary);
    }

    #[test]
    fn speedup_and_efficiency() {
        let sequential = result(4000, &[1], 100);
        let parallel = result(1000, &[1], 103);
        let comparison = compare_runs(&sequential, &parallel, 8);
        assert_eq!(comparison.speedup, 4.0);
        assert_eq!(comparison.efficiency, 0.5);
        assert!((comparison.infection_difference - 0.03).abs() < 1e-12);
        assert!(comparison.is_consistent());

        let diverged = result(1000, &[1], 150);
        assert!(!compare_runs(&sequential, &diverged, 8).is_consistent());
    }

    #[test]
    fn scaling_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let sequential = result(2000, &[1], 10);
        let records = vec![
            ScalingRecord::baseline(&sequential),
            ScalingRecord::parallel(&sequential, &result(1000, &[1], 10), 2),
            ScalingRecord::parallel(&sequential, &result(1000, &[1], 10), 3),
        ];

        let csv_path = dir.path().join("scaling.csv");
        write_scaling_csv(&records, &csv_path).unwrap();
        let csv = fs::read_to_string(&csv_path).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("threads,type,duration,speedup,efficiency"));
        assert_eq!(lines.next(), Some("1,sequential,2.0000,1.0000,1.0000"));
        assert_eq!(lines.next(), Some("2,parallel,1.0000,2.0000,1.0000"));
        assert_eq!(lines.next(), Some("3,parallel,1.0000,2.0000,0.6667"));

        let json_path = dir.path().join("scaling.json");
        write_scaling_json(&records, &json_path).unwrap();
        let parsed: Vec<ScalingRecord> =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn output_dir_and_history_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("runs");
        prepare_output_dir(&nested).unwrap();
        prepare_output_dir(&nested).unwrap();

        let path = nested.join("history.csv");
        let run = result(10, &[1, 2, 3], 2);
        write_history_csv(&run, &path).unwrap();
        let parsed = History::read_csv(File::open(&path).unwrap()).unwrap();
        assert_eq!(parsed, run.history);
    }
}
