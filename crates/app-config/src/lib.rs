// In crates/app-config/src/lib.rs

use std::path::Path;

use config::{Config, Environment, File, FileFormat};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{
    AppSettings, BrokerSettings, FeedSettings, HistoryFile, InstrumentCommission, ObserverSettings, Settings,
};

/// Loads the application settings from various sources.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads from a default `base.toml` file.
/// 2. Merges settings from an environment-specific file (e.g., `development.toml`).
/// 3. Merges settings from environment variables.
pub fn load_settings() -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());

    let settings = Config::builder()
        .add_source(File::with_name("config/base"))
        .add_source(File::with_name(&format!("config/{}", environment)).required(false))
        // e.g. `APP_BROKER__STARTING_CASH=50000`
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let settings: Settings = settings.try_deserialize()?;

    Ok(settings)
}

/// Loads settings from a TOML document, without the file and environment layers.
pub fn load_settings_from_str(content: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::from_str(content, FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

/// Loads pre-recorded orders and fund values to seed a broker with.
pub fn load_history(path: impl AsRef<Path>) -> Result<HistoryFile> {
    let content = std::fs::read_to_string(path)?;

    let history: HistoryFile = toml::from_str(&content)?;
    Ok(history)
}
