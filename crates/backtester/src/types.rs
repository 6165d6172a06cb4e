// In crates/backtester/src/types.rs

use chrono::{DateTime, Utc};
use observers::Series;
use serde::Serialize;

/// A series tagged with the observer that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedSeries {
    pub observer: &'static str,
    pub series: Series,
}

/// The outcome of a run: the timestamp of every step and all observed series.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub steps: usize,
    pub timestamps: Vec<DateTime<Utc>>,
    pub series: Vec<ObservedSeries>,
}

impl RunReport {
    /// Finds the series `name` of `observer` (e.g., "Broker", "value").
    pub fn find(&self, observer: &str, name: &str) -> Option<&Series> {
        self.series
            .iter()
            .find(|entry| entry.observer == observer && entry.series.name() == name)
            .map(|entry| &entry.series)
    }
}
