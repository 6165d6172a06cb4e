// In crates/app-config/src/types.rs

use broker::SimulationSettings;
use commission::CommissionParams;
use core_types::{FundRecord, HistoricalOrder, Symbol};
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    #[serde(default)]
    pub broker: BrokerSettings,
    #[serde(default)]
    pub observers: ObserverSettings,
    pub feed: FeedSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    pub log_level: String,
}

/// The `[broker]` section: account, fund accounting and commission schemes.
#[derive(Deserialize, Debug, Clone)]
pub struct BrokerSettings {
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    #[serde(default = "default_true")]
    pub check_submit: bool,
    #[serde(default)]
    pub slippage_percent: Decimal,

    /// Report the account in fund shares.
    #[serde(default)]
    pub fund_mode: bool,
    /// Value of one fund share at start; the broker's default when absent.
    #[serde(default)]
    pub fund_start_value: Option<Decimal>,

    /// The scheme used for every instrument without its own entry.
    #[serde(default)]
    pub default_commission: CommissionParams,
    #[serde(default)]
    pub commissions: Vec<InstrumentCommission>,

    /// A TOML file of pre-recorded orders and fund values (see [`HistoryFile`]).
    #[serde(default)]
    pub history_path: Option<String>,
}

/// A `[[broker.commissions]]` entry.
#[derive(Deserialize, Debug, Clone)]
pub struct InstrumentCommission {
    pub symbol: Symbol,
    pub params: CommissionParams,
}

fn default_starting_cash() -> Decimal {
    SimulationSettings::default().starting_cash
}

fn default_true() -> bool {
    true
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
            check_submit: true,
            slippage_percent: Decimal::ZERO,
            fund_mode: false,
            fund_start_value: None,
            default_commission: CommissionParams::default(),
            commissions: Vec::new(),
            history_path: None,
        }
    }
}

impl BrokerSettings {
    pub fn simulation(&self) -> SimulationSettings {
        SimulationSettings {
            starting_cash: self.starting_cash,
            check_submit: self.check_submit,
            slippage_percent: self.slippage_percent,
        }
    }

    pub fn instrument_commissions(&self) -> Vec<(Symbol, CommissionParams)> {
        self.commissions
            .iter()
            .map(|entry| (entry.symbol.clone(), entry.params.clone()))
            .collect()
    }
}

/// The `[observers]` section.
#[derive(Deserialize, Debug, Clone)]
pub struct ObserverSettings {
    /// Observer names, e.g. "broker", "value", "fundval".
    #[serde(default = "default_observers")]
    pub enabled: Vec<String>,
    /// Fund-mode override for the value samplers; follows the broker when absent.
    #[serde(default)]
    pub fund: Option<bool>,
}

fn default_observers() -> Vec<String> {
    vec!["broker".to_string()]
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self {
            enabled: default_observers(),
            fund: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct FeedSettings {
    /// Path of the JSON price feed.
    pub path: String,
}

// --- Structs for the history file ---

/// Orders and fund values recorded before the run.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct HistoryFile {
    /// Queue notifications for the replayed orders.
    #[serde(default)]
    pub notify: bool,
    #[serde(default)]
    pub orders: Vec<HistoricalOrder>,
    #[serde(default)]
    pub fund: Vec<FundRecord>,
}
