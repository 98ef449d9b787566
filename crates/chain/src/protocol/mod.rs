//! Protocol abstraction layer.
//!
//! The exchange program's account layouts, margin math and instruction
//! encoding live in the protocol SDK. This module describes the narrow
//! capabilities the liquidator needs from it:
//!
//! - [`AccountFetcher`]: exchange, market, price-feed and margin-account reads
//! - [`MarginEvaluator`]: margin snapshots and the in-liquidation flag
//! - [`LiquidationInstructions`]: program addresses and the liquidate instruction
//!
//! All three are generic over a [`Protocol`] type bundle so the orchestration
//! core never depends on concrete account structs.
//!
//! # Example
//!
//! ```rust,ignore
//! use liquidator_chain::protocol::{AccountFetcher, MarginEvaluator};
//!
//! let exchange = fetcher.get_exchange(&exchange_address).await?;
//! let snapshot = evaluator.margins(&account, &exchange, &markets, &feeds, now)?;
//! if snapshot.can_liquidate {
//!     // build and send a liquidation...
//! }
//! ```

mod decoder;

pub use decoder::AccountDecoder;

use anyhow::Result;
use async_trait::async_trait;
use smallvec::SmallVec;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

/// Market ids referenced by one margin account's positions.
pub type PositionMarkets = SmallVec<[u32; 8]>;

/// Markets keyed by market id.
pub type MarketMap<M> = HashMap<u32, ProgramAccount<M>>;

/// Price feeds keyed by feed address.
pub type PriceFeedMap<F> = HashMap<Pubkey, F>;

/// Exchange state needed by the liquidator.
pub trait ExchangeState: Send + Sync {
    /// Ids of every market hosted by the exchange. Id 0 is a placeholder slot.
    fn market_ids(&self) -> &[u32];
}

/// Market state needed by the liquidator.
pub trait MarketState: Send + Sync {
    fn id(&self) -> u32;

    /// Address of the oracle feed pricing this market's underlying.
    fn price_feed(&self) -> Pubkey;
}

/// Margin account state needed by the liquidator.
pub trait MarginAccountState: Send + Sync {
    fn owner(&self) -> Pubkey;

    fn exchange(&self) -> Pubkey;

    /// Market id of every open position, in position order.
    fn position_market_ids(&self) -> PositionMarkets;

    /// Whether the program has already flagged this account mid-liquidation.
    fn in_liquidation(&self) -> bool;
}

/// Type bundle naming a protocol SDK's account types.
pub trait Protocol: Send + Sync + 'static {
    type Exchange: ExchangeState;
    /// Cloned into a fresh market map every polling cycle.
    type Market: MarketState + Clone;
    type MarginAccount: MarginAccountState;
    type PriceFeed: Send + Sync;
    /// Optional extra arguments for the liquidate instruction.
    type LiquidateParams: Send + Sync;
}

/// An account together with the address it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramAccount<T> {
    pub address: Pubkey,
    pub account: T,
}

impl<T> ProgramAccount<T> {
    pub fn new(address: Pubkey, account: T) -> Self {
        Self { address, account }
    }
}

/// Result of evaluating one margin account against current prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MarginSnapshot {
    /// Collateral needed to keep every open position.
    pub total_required_margin: i128,
    /// Collateral left to absorb further losses.
    pub available_margin: i128,
    /// The protocol's liquidation verdict.
    pub can_liquidate: bool,
}

impl MarginSnapshot {
    /// Both required and available margin are nonzero.
    pub fn is_margined(&self) -> bool {
        self.available_margin != 0 && self.total_required_margin != 0
    }
}

/// Accounts referenced by a liquidate instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidateAccounts {
    /// Account being liquidated
    pub margin_account: Pubkey,
    /// Exchange the account belongs to
    pub exchange: Pubkey,
    /// Owner of the liquidated account
    pub owner: Pubkey,
    /// Liquidator signer
    pub liquidator: Pubkey,
    /// Liquidator's own margin account, receiving the seized positions
    pub liquidator_margin_account: Pubkey,
}

/// Read access to protocol accounts.
///
/// Every list-returning method yields `None` for entries that do not exist
/// on chain; callers skip those. Transport failures are errors.
#[async_trait]
pub trait AccountFetcher<P: Protocol>: Send + Sync {
    async fn get_exchange(&self, address: &Pubkey) -> Result<Option<P::Exchange>>;

    /// Returned list is aligned with `addresses`.
    async fn get_markets(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<P::Market>>>>;

    /// Full scan of every margin account owned by the program.
    async fn get_all_margin_accounts(
        &self,
    ) -> Result<Vec<Option<ProgramAccount<P::MarginAccount>>>>;

    /// Returned list is aligned with `addresses`.
    async fn get_margin_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<P::MarginAccount>>>>;

    /// Returned list is aligned with `addresses`.
    async fn get_price_feeds(&self, addresses: &[Pubkey]) -> Result<Vec<Option<P::PriceFeed>>>;
}

/// Margin computation, owned by the protocol SDK.
pub trait MarginEvaluator<P: Protocol>: Send + Sync {
    /// Evaluate `account` at `unix_timestamp` (seconds).
    fn margins(
        &self,
        account: &ProgramAccount<P::MarginAccount>,
        exchange: &P::Exchange,
        markets: &MarketMap<P::Market>,
        price_feeds: &PriceFeedMap<P::PriceFeed>,
        unix_timestamp: i64,
    ) -> Result<MarginSnapshot>;

    /// Cheap check that needs no prices.
    fn in_liquidation(&self, account: &P::MarginAccount) -> bool {
        account.in_liquidation()
    }
}

/// Program addresses and instruction encoding, owned by the protocol SDK.
pub trait LiquidationInstructions<P: Protocol>: Send + Sync {
    /// Address of the exchange with the given index.
    fn exchange_address(&self, index: u64) -> Pubkey;

    /// Address of market `market_id` on `exchange`.
    fn market_address(&self, exchange: &Pubkey, market_id: u32) -> Pubkey;

    /// Encode a liquidate instruction. Market and price-feed addresses are
    /// aligned with the account's positions.
    fn liquidate(
        &self,
        accounts: &LiquidateAccounts,
        market_addresses: &[Pubkey],
        price_feed_addresses: &[Pubkey],
        params: Option<&P::LiquidateParams>,
    ) -> Result<Instruction>;
}
