// In crates/backtester/src/lib.rs

pub mod feed;
pub mod types;

use anyhow::Context;
use broker::{Broker, MarkToMarket};
use core_types::MarketSnapshot;
use observers::Observer;
use tracing::{debug, info};

pub use feed::{load_feed, parse_feed};
pub use types::{ObservedSeries, RunReport};

/// The step driver for a simulation run.
///
/// For every snapshot of the feed the broker is marked to market and advanced,
/// then the step hook runs (typically a strategy submitting orders), and finally
/// every observer samples the broker. Orders submitted by the hook are therefore
/// executed at the following step.
pub struct Backtester<B: Broker + MarkToMarket> {
    broker: B,
    observers: Vec<Box<dyn Observer>>,
}

impl<B: Broker + MarkToMarket> Backtester<B> {
    pub fn new(broker: B, observers: Vec<Box<dyn Observer>>) -> Self {
        Self { broker, observers }
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    pub fn into_broker(self) -> B {
        self.broker
    }

    /// Runs the whole feed through the broker.
    ///
    /// # Arguments
    ///
    /// * `feed`: The snapshots, in time order.
    /// * `hook`: Called at every step, after the broker has processed it and
    ///   before the observers sample it.
    pub fn run<H>(&mut self, feed: &[MarketSnapshot], mut hook: H) -> anyhow::Result<RunReport>
    where
        H: FnMut(usize, &MarketSnapshot, &mut B) -> anyhow::Result<()>,
    {
        self.broker.start().context("Failed to start broker")?;
        for observer in &mut self.observers {
            observer
                .start(&self.broker)
                .with_context(|| format!("Failed to start observer {}", observer.name()))?;
        }
        info!(broker = self.broker.name(), observers = self.observers.len(), steps = feed.len(), "Starting run.");

        let mut timestamps = Vec::with_capacity(feed.len());
        for (step, snapshot) in feed.iter().enumerate() {
            self.broker.mark(snapshot);
            self.broker
                .next()
                .with_context(|| format!("Broker failed at step {step}"))?;

            hook(step, snapshot, &mut self.broker)?;

            for observer in &mut self.observers {
                observer
                    .next(step, &self.broker)
                    .with_context(|| format!("Observer {} failed at step {step}", observer.name()))?;
            }
            timestamps.push(snapshot.timestamp);
            debug!(step, timestamp = %snapshot.timestamp, "Step complete.");
        }

        self.broker.stop().context("Failed to stop broker")?;

        let series = self
            .observers
            .iter()
            .flat_map(|observer| {
                observer.series().into_iter().map(move |series| ObservedSeries {
                    observer: observer.name(),
                    series: series.clone(),
                })
            })
            .collect();

        info!(steps = feed.len(), "Run finished.");
        Ok(RunReport {
            steps: feed.len(),
            timestamps,
            series,
        })
    }
}
