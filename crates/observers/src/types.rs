// In crates/observers/src/types.rs

use broker::Broker;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Error, Result};

/// A single sample taken at a simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub step: usize,
    pub value: Decimal,
}

/// A named, append-only sequence of samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    name: &'static str,
    /// Name to display when plotting; defaults to `name`.
    label: String,
    points: Vec<SeriesPoint>,
}

impl Series {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            label: name.to_string(),
            points: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    pub fn push(&mut self, step: usize, value: Decimal) {
        self.points.push(SeriesPoint { step, value });
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<Decimal> {
        self.points.iter().map(|point| point.value).collect()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Fund-mode choice of a sampler: an optional override, settled against the
/// broker when the observer starts.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FundSwitch {
    requested: Option<bool>,
    resolved: Option<bool>,
}

impl FundSwitch {
    pub(crate) fn new(requested: Option<bool>) -> Self {
        Self { requested, resolved: None }
    }

    pub(crate) fn resolve(&mut self, broker: &dyn Broker) -> bool {
        let fund = self.requested.unwrap_or_else(|| broker.fund_mode());
        self.resolved = Some(fund);
        fund
    }

    pub(crate) fn resolved(&self) -> Option<bool> {
        self.resolved
    }

    pub(crate) fn get(&self, observer: &'static str) -> Result<bool> {
        self.resolved.ok_or(Error::NotStarted { observer })
    }
}
