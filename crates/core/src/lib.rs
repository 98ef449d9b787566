//! Liquidator core logic.
//!
//! This crate provides the polling liquidation bot:
//! - Runtime configuration and required startup settings
//! - Positive-margin working set deciding which accounts each cycle fetches
//! - Per-cycle market and price-feed maps
//! - Account evaluation and liquidation triggers
//! - Liquidation transaction submission with priority fees and send retries
//! - Scanner orchestration with a crash-and-restart supervisor

pub mod config;
mod error;
mod evaluator;
mod liquidator;
mod market_data;
mod scanner;
mod working_set;

#[cfg(test)]
mod testing;

pub use config::{BotConfig, LogFormat, Settings};
pub use error::{ConfigError, LiquidatorError};
pub use evaluator::{AccountEvaluator, Evaluation};
pub use liquidator::{
    resolve_market_accounts, send_with_retries, LiquidationExecutor, Liquidator,
    DEFAULT_MAX_SEND_ATTEMPTS,
};
pub use market_data::{build_market_maps, MarketData};
pub use scanner::{CycleReport, ScanState, Scanner, ScannerConfig};
pub use working_set::{FetchScope, WorkingSet};
