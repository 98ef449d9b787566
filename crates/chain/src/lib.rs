//! Liquidator chain interaction layer.
//!
//! This crate provides:
//! - Protocol capability traits and the account model the liquidator sees
//! - RPC client setup with configurable commitment
//! - RPC-backed account fetching with a pluggable decoder
//! - Transaction assembly, signing and submission
//! - Signing key loading

mod fetcher;
pub mod protocol;
mod provider;
mod sender;
mod signer;
mod transaction;

pub use fetcher::{RpcAccountFetcher, MAX_CONCURRENT_BATCHES, MAX_MULTIPLE_ACCOUNTS};
pub use protocol::{
    AccountDecoder, AccountFetcher, ExchangeState, LiquidateAccounts, LiquidationInstructions,
    MarginAccountState, MarginEvaluator, MarginSnapshot, MarketMap, MarketState, PositionMarkets,
    PriceFeedMap, ProgramAccount, Protocol,
};
pub use provider::{connect, parse_commitment, DEFAULT_COMMITMENT};
pub use sender::{RpcTransactionSender, TransactionSubmitter};
pub use signer::{load_keypair, KeypairError};
pub use transaction::TransactionDraft;
