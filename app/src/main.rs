// In app/src/main.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use app_config::Settings;
use backtester::{load_feed, Backtester, RunReport};
use broker::{Broker, SimulatedBroker};
use clap::{Parser, Subcommand};
use core_types::Symbol;
use observers::create_observers;
use rust_decimal::Decimal;
use tracing_subscriber::prelude::*;

mod strategy;

use crate::strategy::{MultiTradeSettings, MultiTradeStrategy};

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = "A broker simulation with per-step state observers.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the multi-trade SMA crossover strategy over the configured price feed.
    Backtest {
        /// The symbol to trade (e.g., "ORCL").
        #[arg(short, long)]
        symbol: String,

        /// Period of the simple moving average.
        #[arg(long, default_value_t = 15)]
        period: usize,

        /// Size of every new entry.
        #[arg(long, default_value_t = Decimal::ONE)]
        stake: Decimal,

        /// Cycle entries through trade ids 0, 1, 2.
        #[arg(long)]
        mtrade: bool,

        /// Do only long operations.
        #[arg(long)]
        only_long: bool,

        /// Overrides the feed path of the configuration.
        #[arg(long)]
        feed: Option<PathBuf>,

        /// Writes the full report as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Lists the commission scheme every configured instrument resolves to.
    Commissions,
}

// --- Main Application Entry Point ---

fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    // `--help` must not depend on the config directory.
    let cli = Cli::parse();

    let settings = app_config::load_settings().context("Failed to load settings")?;
    init_tracing(&settings.app.log_level);

    tracing::info!(environment = %settings.app.environment, "Starting broker simulation");

    match cli.command {
        Commands::Backtest {
            symbol,
            period,
            stake,
            mtrade,
            only_long,
            feed,
            report,
        } => {
            let strategy_settings = MultiTradeSettings {
                symbol: Symbol::new(symbol),
                period,
                stake,
                only_long,
                multi_trade: mtrade,
            };
            handle_backtest(&settings, strategy_settings, feed, report)?;
        }
        Commands::Commissions => {
            handle_commissions(&settings)?;
        }
    }

    tracing::info!("Broker simulation has finished successfully.");
    Ok(())
}

fn init_tracing(log_level: &str) {
    let level = log_level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("observers", tracing::Level::INFO)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
}

/// Builds the simulated broker described by the `[broker]` section.
fn build_broker(settings: &Settings) -> Result<SimulatedBroker> {
    let broker_settings = &settings.broker;
    let mut broker = SimulatedBroker::new(broker_settings.simulation());

    broker.set_commission(broker_settings.default_commission.clone(), None)?;
    for (symbol, params) in broker_settings.instrument_commissions() {
        tracing::debug!(%symbol, "Registering commission scheme.");
        broker.set_commission(params, Some(symbol))?;
    }
    broker.set_fund_mode(broker_settings.fund_mode, broker_settings.fund_start_value)?;

    if let Some(path) = &broker_settings.history_path {
        let history = app_config::load_history(path).with_context(|| format!("Failed to load history {path}"))?;
        tracing::info!(orders = history.orders.len(), fund_records = history.fund.len(), "Loaded broker history.");
        broker.add_order_history(history.orders, history.notify)?;
        broker.set_fund_history(history.fund)?;
    }
    Ok(broker)
}

fn handle_backtest(
    settings: &Settings,
    strategy_settings: MultiTradeSettings,
    feed_path: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let broker = build_broker(settings)?;
    let observers = create_observers(settings.observers.enabled.as_slice(), settings.observers.fund)?;

    let feed_path = feed_path.unwrap_or_else(|| PathBuf::from(&settings.feed.path));
    let feed = load_feed(&feed_path)?;

    let mut strategy = MultiTradeStrategy::new(strategy_settings)?;
    tracing::info!(strategy = strategy.name(), steps = feed.len(), "Starting backtest.");

    let mut backtester = Backtester::new(broker, observers);
    let report = backtester.run(&feed, |step, snapshot, broker| strategy.on_step(step, snapshot, broker))?;

    let broker = backtester.broker();
    print_run_report(&report, broker.cash()?, broker.value(None)?, strategy.completed_orders());

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report saved.");
    }
    Ok(())
}

fn handle_commissions(settings: &Settings) -> Result<()> {
    let mut broker = build_broker(settings)?;
    broker.start()?;

    let mut symbols: Vec<Symbol> = settings
        .broker
        .instrument_commissions()
        .into_iter()
        .map(|(symbol, _)| symbol)
        .collect();
    symbols.push(Symbol::from("<any other>"));

    println!("\n--- Commission Schemes ---");
    for symbol in &symbols {
        let scheme = broker.commission_info(symbol);
        println!(
            "  - {:<12} {:?} | rate: {} | stocklike: {} | mult: {} | margin: {}",
            symbol.as_str(),
            scheme.comm_type(),
            scheme.rate(),
            scheme.is_stocklike(),
            scheme.mult(),
            scheme.margin_for(Decimal::ZERO),
        );
    }
    Ok(())
}

fn print_run_report(report: &RunReport, cash: Decimal, value: Decimal, completed_orders: usize) {
    println!("\n--- Backtest Complete ---");
    println!("-------------------------");
    println!("Steps: {} | Completed orders: {}", report.steps, completed_orders);
    println!("Final cash: {:.2} | Final value: {:.2}", cash, value);
    println!("-------------------------");

    for entry in &report.series {
        let series = &entry.series;
        let values = series.values();
        match (values.iter().min(), values.iter().max(), series.last()) {
            (Some(min), Some(max), Some(last)) => println!(
                "  - {}.{} [{}]: last {:.2} | min {:.2} | max {:.2}",
                entry.observer,
                series.name(),
                series.label(),
                last.value,
                min,
                max
            ),
            _ => println!("  - {}.{} [{}]: no samples", entry.observer, series.name(), series.label()),
        }
    }
}
