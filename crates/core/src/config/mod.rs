//! Configuration for the liquidation bot.
//!
//! This module provides:
//! - Runtime tunables (polling interval, commitment, priority fee level, retries)
//! - Required startup settings (RPC endpoint, liquidator accounts, signing key)

mod bot;
mod settings;

pub use bot::{BotConfig, LogFormat};
pub use settings::Settings;

/// Environment variable names.
pub mod env {
    // Required
    pub const RPC_URL: &str = "RPC_URL";
    pub const LIQUIDATOR_MARGIN_ACCOUNT: &str = "LIQUIDATOR_MARGIN_ACCOUNT";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";

    // Optional tunables
    pub const CONFIG_PATH: &str = "LIQUIDATOR_CONFIG";
    pub const INTERVAL: &str = "INTERVAL";
    pub const COMMITMENT: &str = "COMMITMENT";
    pub const PRIORITY_LEVEL: &str = "PRIORITY_LEVEL";
    pub const MAX_SEND_ATTEMPTS: &str = "MAX_SEND_ATTEMPTS";
    pub const EXCHANGE_INDEX: &str = "EXCHANGE_INDEX";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
}
