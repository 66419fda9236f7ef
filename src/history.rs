/*!

The append-only record of a run, one [`DayStats`] per simulated day starting with day 0, and the
trailing-window reproduction-number estimate computed from it.

The CSV form has the header
`day,susceptible,infected,recovered,dead,newInfections,cumulativeInfections`
followed by one integer row per recorded day.

*/

use crate::error::SimError;
use crate::stats::DayStats;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Number of trailing days used by [`History::estimate_r0`].
pub const R0_WINDOW: usize = 7;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<DayStats>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        History::default()
    }

    pub fn push(&mut self, stats: DayStats) {
        self.entries.push(stats);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&DayStats> {
        self.entries.last()
    }

    #[must_use]
    pub fn entries(&self) -> &[DayStats] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DayStats> {
        self.entries.iter()
    }

    /// New infections per currently infected individual over the last seven recorded days:
    /// `sum(newInfections) / mean(infected)` within the window. Zero when fewer than two days
    /// are recorded, nobody has been infected since day 0, or nobody in the window is infected.
    #[must_use]
    pub fn estimate_r0(&self) -> f64 {
        let Some(latest) = self.entries.last() else {
            return 0.0;
        };
        if latest.cumulative_infections == 0 {
            return 0.0;
        }

        let window = &self.entries[self.entries.len().saturating_sub(R0_WINDOW)..];
        if window.len() < 2 {
            return 0.0;
        }

        let new_infections: u64 = window.iter().map(|day| day.new_infections).sum();
        let mean_infected =
            window.iter().map(|day| day.infected).sum::<u64>() as f64 / window.len() as f64;
        if mean_infected > 0.0 {
            new_infections as f64 / mean_infected
        } else {
            0.0
        }
    }

    /// The first day with the highest infected count, as `(day, infected)`.
    #[must_use]
    pub fn peak(&self) -> Option<(u32, u64)> {
        self.entries
            .iter()
            .fold(None, |best: Option<&DayStats>, day| match best {
                Some(b) if b.infected >= day.infected => Some(b),
                _ => Some(day),
            })
            .map(|day| (day.day, day.infected))
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), SimError> {
        let mut writer = csv::Writer::from_writer(writer);
        for day in &self.entries {
            writer.serialize(day)?;
        }
        // An empty history still gets its header.
        if self.entries.is_empty() {
            writer.write_record(CSV_HEADER)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_csv(&self) -> Result<String, SimError> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| SimError::Consistency(e.to_string()))
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self, SimError> {
        let mut reader = csv::Reader::from_reader(reader);
        let entries = reader
            .deserialize()
            .collect::<Result<Vec<DayStats>, csv::Error>>()?;
        Ok(History { entries })
    }
}

const CSV_HEADER: [&str; 7] = [
    "day",
    "susceptible",
    "infected",
    "recovered",
    "dead",
    "newInfections",
    "cumulativeInfections",
];

impl<'a> IntoIterator for &'a History {
    type Item = &'a DayStats;
    type IntoIter = std::slice::Iter<'a, DayStats>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(day: u32, infected: u64, new_infections: u64, cumulative_infections: u64) -> DayStats {
        DayStats {
            day,
            susceptible: 100 - infected,
            infected,
            recovered: 0,
            dead: 0,
            new_infections,
            cumulative_infections,
        }
    }

    fn history(days: &[DayStats]) -> History {
        let mut history = History::new();
        for d in days {
            history.push(*d);
        }
        history
    }

    #[test]
    fn r0_needs_two_days() {
        assert_eq!(History::new().estimate_r0(), 0.0);
        assert_eq!(history(&[day(0, 5, 3, 3)]).estimate_r0(), 0.0);
    }

    #[test]
    fn r0_is_zero_without_infections() {
        let h = history(&[day(0, 5, 0, 0), day(1, 5, 0, 0)]);
        assert_eq!(h.estimate_r0(), 0.0);
    }

    #[test]
    fn r0_is_zero_when_nobody_infected() {
        let h = history(&[day(0, 0, 0, 0), day(1, 0, 1, 1)]);
        assert_eq!(h.estimate_r0(), 0.0);
    }

    #[test]
    fn r0_over_short_history() {
        // new = 0 + 4 = 4, mean infected = (2 + 6) / 2 = 4
        let h = history(&[day(0, 2, 0, 0), day(1, 6, 4, 4)]);
        assert_eq!(h.estimate_r0(), 1.0);
    }

    #[test]
    fn r0_uses_trailing_week_only() {
        let mut days = vec![day(0, 10, 50, 50)];
        let mut cumulative = 50;
        for d in 1..=7 {
            cumulative += 2;
            days.push(day(d, 4, 2, cumulative));
        }
        // Day 0 falls out of the window: 7 * 2 / 4
        assert_eq!(history(&days).estimate_r0(), 3.5);
    }

    #[test]
    fn peak_prefers_first_maximum() {
        let h = history(&[day(0, 1, 0, 0), day(1, 7, 6, 6), day(2, 7, 1, 7), day(3, 3, 0, 7)]);
        assert_eq!(h.peak(), Some((1, 7)));
        assert_eq!(History::new().peak(), None);
    }

    #[test]
    fn csv_layout() {
        let h = history(&[day(0, 1, 0, 0), day(1, 3, 2, 2)]);
        let csv = h.to_csv().unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("day,susceptible,infected,recovered,dead,newInfections,cumulativeInfections")
        );
        assert_eq!(lines.next(), Some("0,99,1,0,0,0,0"));
        assert_eq!(lines.next(), Some("1,97,3,0,0,2,2"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn csv_round_trip() {
        let h = history(&[day(0, 1, 0, 0), day(1, 3, 2, 2), day(2, 4, 2, 4)]);
        let parsed = History::read_csv(h.to_csv().unwrap().as_bytes()).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn empty_history_has_header() {
        let csv = History::new().to_csv().unwrap();
        assert!(csv.starts_with("day,susceptible"));
        assert!(History::read_csv(csv.as_bytes()).unwrap().is_empty());
    }
}
