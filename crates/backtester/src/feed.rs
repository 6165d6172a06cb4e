// In crates/backtester/src/feed.rs

use std::path::Path;

use anyhow::{Context, Result};
use core_types::MarketSnapshot;

/// Parses a JSON price feed: an array of `{ "timestamp": ..., "prices": { "SYM": 1.0 } }`.
///
/// Timestamps must be strictly increasing.
pub fn parse_feed(json: &str) -> Result<Vec<MarketSnapshot>> {
    let feed: Vec<MarketSnapshot> = serde_json::from_str(json).context("Invalid price feed")?;

    if let Some(pair) = feed.windows(2).find(|pair| pair[0].timestamp >= pair[1].timestamp) {
        anyhow::bail!(
            "Price feed timestamps must increase: {} is followed by {}",
            pair[0].timestamp,
            pair[1].timestamp
        );
    }
    Ok(feed)
}

pub fn load_feed(path: impl AsRef<Path>) -> Result<Vec<MarketSnapshot>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read price feed {}", path.display()))?;
    let feed = parse_feed(&json)?;
    tracing::info!(path = %path.display(), steps = feed.len(), "Loaded price feed.");
    Ok(feed)
}
