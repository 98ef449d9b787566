//! Error types callers need to tell apart.
//!
//! Everything else flows through `anyhow::Result`.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing env var: {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to load config file {path}: {reason}")]
    File { path: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiquidatorError {
    #[error("invalid exchange address {0}")]
    InvalidExchange(Pubkey),

    #[error("market {market_id} is not in the market map")]
    MissingMarket { market_id: u32 },
}
