//! Required startup settings.

use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::env;
use crate::error::ConfigError;
use liquidator_chain::load_keypair;

/// Settings the bot cannot start without.
#[derive(Clone)]
pub struct Settings {
    pub rpc_url: String,
    /// Margin account that receives liquidated positions
    pub liquidator_margin_account: Pubkey,
    pub signer: Arc<Keypair>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("rpc_url", &self.rpc_url)
            .field("liquidator_margin_account", &self.liquidator_margin_account)
            .field("signer", &self.signer.pubkey())
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings from an injectable variable source.
    ///
    /// Variables are checked in order: `RPC_URL`, `LIQUIDATOR_MARGIN_ACCOUNT`,
    /// `PRIVATE_KEY`. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get_env = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let rpc_url = get_env(env::RPC_URL)?;
        let liquidator_margin_account = get_env(env::LIQUIDATOR_MARGIN_ACCOUNT)?;
        let private_key = get_env(env::PRIVATE_KEY)?;

        let liquidator_margin_account =
            Pubkey::from_str(&liquidator_margin_account).map_err(|e| ConfigError::Invalid {
                var: env::LIQUIDATOR_MARGIN_ACCOUNT,
                reason: e.to_string(),
            })?;

        let signer = load_keypair(&private_key).map_err(|e| ConfigError::Invalid {
            var: env::PRIVATE_KEY,
            reason: e.to_string(),
        })?;

        Ok(Self {
            rpc_url,
            liquidator_margin_account,
            signer: Arc::new(signer),
        })
    }
}
