//! In-memory protocol and chain doubles shared by unit tests.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::liquidator::LiquidationExecutor;
use liquidator_api::{PriorityFeeEstimator, PriorityLevel};
use liquidator_chain::{
    AccountFetcher, ExchangeState, LiquidateAccounts, LiquidationInstructions,
    MarginAccountState, MarginEvaluator, MarginSnapshot, MarketMap, MarketState, PositionMarkets,
    PriceFeedMap, ProgramAccount, Protocol, TransactionSubmitter,
};

pub const PROGRAM_ID: Pubkey = Pubkey::new_from_array([7; 32]);

pub struct TestProtocol;

impl Protocol for TestProtocol {
    type Exchange = TestExchange;
    type Market = TestMarket;
    type MarginAccount = TestMarginAccount;
    type PriceFeed = TestPriceFeed;
    type LiquidateParams = ();
}

#[derive(Debug, Clone)]
pub struct TestExchange {
    pub market_ids: Vec<u32>,
}

impl ExchangeState for TestExchange {
    fn market_ids(&self) -> &[u32] {
        &self.market_ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMarket {
    pub id: u32,
    pub price_feed: Pubkey,
}

impl MarketState for TestMarket {
    fn id(&self) -> u32 {
        self.id
    }

    fn price_feed(&self) -> Pubkey {
        self.price_feed
    }
}

/// Margin account whose evaluation result is fixed up front.
#[derive(Debug, Clone)]
pub struct TestMarginAccount {
    pub owner: Pubkey,
    pub exchange: Pubkey,
    pub markets: Vec<u32>,
    pub in_liquidation: bool,
    pub snapshot: MarginSnapshot,
}

impl TestMarginAccount {
    pub fn with_snapshot(snapshot: MarginSnapshot) -> Self {
        Self {
            owner: Pubkey::new_unique(),
            exchange: exchange_address(0),
            markets: Vec::new(),
            in_liquidation: false,
            snapshot,
        }
    }
}

impl MarginAccountState for TestMarginAccount {
    fn owner(&self) -> Pubkey {
        self.owner
    }

    fn exchange(&self) -> Pubkey {
        self.exchange
    }

    fn position_market_ids(&self) -> PositionMarkets {
        self.markets.iter().copied().collect()
    }

    fn in_liquidation(&self) -> bool {
        self.in_liquidation
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPriceFeed {
    pub price: i64,
}

pub fn snapshot(required: i128, available: i128, can_liquidate: bool) -> MarginSnapshot {
    MarginSnapshot {
        total_required_margin: required,
        available_margin: available,
        can_liquidate,
    }
}

pub fn margin_account(snapshot: MarginSnapshot) -> ProgramAccount<TestMarginAccount> {
    ProgramAccount::new(
        Pubkey::new_unique(),
        TestMarginAccount::with_snapshot(snapshot),
    )
}

pub fn market(id: u32) -> ProgramAccount<TestMarket> {
    ProgramAccount::new(
        market_address(&exchange_address(0), id),
        TestMarket {
            id,
            price_feed: price_feed_address(id),
        },
    )
}

pub fn market_map(ids: &[u32]) -> MarketMap<TestMarket> {
    ids.iter().map(|id| (*id, market(*id))).collect()
}

pub fn price_feed_address(market_id: u32) -> Pubkey {
    Pubkey::find_program_address(&[b"feed".as_slice(), &market_id.to_le_bytes()], &PROGRAM_ID).0
}

pub fn exchange_address(index: u64) -> Pubkey {
    Pubkey::find_program_address(&[b"exchange".as_slice(), &index.to_le_bytes()], &PROGRAM_ID).0
}

pub fn market_address(exchange: &Pubkey, market_id: u32) -> Pubkey {
    Pubkey::find_program_address(
        &[b"market".as_slice(), exchange.as_ref(), &market_id.to_le_bytes()],
        &PROGRAM_ID,
    )
    .0
}

/// Which fetcher method was called, with its keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    Exchange(Pubkey),
    Markets(Vec<Pubkey>),
    AllMarginAccounts,
    MarginAccounts(Vec<Pubkey>),
    PriceFeeds(Vec<Pubkey>),
}

/// Fetcher serving fixed accounts and recording every call.
#[derive(Default)]
pub struct MockFetcher {
    pub exchange: Option<TestExchange>,
    pub markets: HashMap<Pubkey, ProgramAccount<TestMarket>>,
    pub price_feeds: HashMap<Pubkey, TestPriceFeed>,
    /// Result of a full scan, absent entries included
    pub all_accounts: Vec<Option<ProgramAccount<TestMarginAccount>>>,
    /// Accounts served by keyed fetches
    pub accounts: HashMap<Pubkey, ProgramAccount<TestMarginAccount>>,
    pub calls: Mutex<Vec<FetchCall>>,
}

impl MockFetcher {
    /// Exchange 0 with the given markets, each with a price feed.
    pub fn with_markets(ids: &[u32]) -> Self {
        let mut exchange_ids = vec![0];
        exchange_ids.extend_from_slice(ids);

        let mut fetcher = Self {
            exchange: Some(TestExchange {
                market_ids: exchange_ids,
            }),
            ..Default::default()
        };
        for id in ids {
            let market = market(*id);
            fetcher.price_feeds.insert(
                market.account.price_feed,
                TestPriceFeed {
                    price: *id as i64 * 100,
                },
            );
            fetcher.markets.insert(market.address, market);
        }
        fetcher
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().clone()
    }

    pub fn margin_account_calls(&self) -> Vec<FetchCall> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    FetchCall::AllMarginAccounts | FetchCall::MarginAccounts(_)
                )
            })
            .collect()
    }
}

#[async_trait]
impl AccountFetcher<TestProtocol> for MockFetcher {
    async fn get_exchange(&self, address: &Pubkey) -> Result<Option<TestExchange>> {
        self.calls.lock().push(FetchCall::Exchange(*address));
        if *address != exchange_address(0) {
            return Ok(None);
        }
        Ok(self.exchange.clone())
    }

    async fn get_markets(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<TestMarket>>>> {
        self.calls.lock().push(FetchCall::Markets(addresses.to_vec()));
        Ok(addresses
            .iter()
            .map(|a| self.markets.get(a).cloned())
            .collect())
    }

    async fn get_all_margin_accounts(
        &self,
    ) -> Result<Vec<Option<ProgramAccount<TestMarginAccount>>>> {
        self.calls.lock().push(FetchCall::AllMarginAccounts);
        Ok(self.all_accounts.clone())
    }

    async fn get_margin_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<TestMarginAccount>>>> {
        self.calls
            .lock()
            .push(FetchCall::MarginAccounts(addresses.to_vec()));
        Ok(addresses
            .iter()
            .map(|a| self.accounts.get(a).cloned())
            .collect())
    }

    async fn get_price_feeds(&self, addresses: &[Pubkey]) -> Result<Vec<Option<TestPriceFeed>>> {
        self.calls
            .lock()
            .push(FetchCall::PriceFeeds(addresses.to_vec()));
        Ok(addresses
            .iter()
            .map(|a| self.price_feeds.get(a).cloned())
            .collect())
    }
}

/// Call order shared between doubles.
pub type CallLog = Arc<Mutex<Vec<&'static str>>>;

/// Returns the snapshot stored on each account.
#[derive(Default)]
pub struct MockEvaluator {
    pub timestamps: Mutex<Vec<i64>>,
    pub calls: CallLog,
}

impl MarginEvaluator<TestProtocol> for MockEvaluator {
    fn margins(
        &self,
        account: &ProgramAccount<TestMarginAccount>,
        _exchange: &TestExchange,
        _markets: &MarketMap<TestMarket>,
        _price_feeds: &PriceFeedMap<TestPriceFeed>,
        unix_timestamp: i64,
    ) -> Result<MarginSnapshot> {
        self.timestamps.lock().push(unix_timestamp);
        self.calls.lock().push("margins");
        Ok(account.account.snapshot)
    }
}

pub struct MockInstructions;

impl LiquidationInstructions<TestProtocol> for MockInstructions {
    fn exchange_address(&self, index: u64) -> Pubkey {
        exchange_address(index)
    }

    fn market_address(&self, exchange: &Pubkey, market_id: u32) -> Pubkey {
        market_address(exchange, market_id)
    }

    fn liquidate(
        &self,
        accounts: &LiquidateAccounts,
        market_addresses: &[Pubkey],
        price_feed_addresses: &[Pubkey],
        _params: Option<&()>,
    ) -> Result<Instruction> {
        let mut metas = vec![
            AccountMeta::new(accounts.margin_account, false),
            AccountMeta::new(accounts.exchange, false),
            AccountMeta::new_readonly(accounts.owner, false),
            AccountMeta::new(accounts.liquidator, true),
            AccountMeta::new(accounts.liquidator_margin_account, false),
        ];
        metas.extend(
            market_addresses
                .iter()
                .chain(price_feed_addresses)
                .map(|a| AccountMeta::new_readonly(*a, false)),
        );
        Ok(Instruction::new_with_bytes(PROGRAM_ID, &[1], metas))
    }
}

/// Records liquidated accounts and returns a fixed signature.
#[derive(Default)]
pub struct RecordingExecutor {
    pub liquidated: Mutex<Vec<Pubkey>>,
    pub fail: bool,
    pub calls: CallLog,
}

impl RecordingExecutor {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn liquidated(&self) -> Vec<Pubkey> {
        self.liquidated.lock().clone()
    }
}

#[async_trait]
impl LiquidationExecutor<TestProtocol> for RecordingExecutor {
    async fn liquidate(
        &self,
        account: &ProgramAccount<TestMarginAccount>,
        _markets: &MarketMap<TestMarket>,
    ) -> Result<Signature> {
        self.liquidated.lock().push(account.address);
        self.calls.lock().push("liquidate");
        if self.fail {
            anyhow::bail!("simulated submission failure");
        }
        Ok(Signature::default())
    }
}

/// Fails the first `failures` sends, then confirms.
pub struct MockSubmitter {
    pub blockhash: Hash,
    pub failures: usize,
    pub attempts: AtomicUsize,
    pub sent: Mutex<Vec<Transaction>>,
}

impl MockSubmitter {
    pub fn failing(failures: usize) -> Self {
        Self {
            blockhash: Hash::new_unique(),
            failures,
            attempts: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.blockhash)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().push(transaction.clone());
        if attempt <= self.failures {
            anyhow::bail!("blockhash not found (attempt {})", attempt);
        }
        Ok(transaction.signatures[0])
    }
}

/// Fixed fee estimate, recording requested levels.
pub struct MockFees {
    pub fee: u64,
    pub levels: Mutex<Vec<PriorityLevel>>,
}

impl MockFees {
    pub fn new(fee: u64) -> Self {
        Self {
            fee,
            levels: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PriorityFeeEstimator for MockFees {
    async fn estimate(&self, transaction: &Transaction, level: PriorityLevel) -> Result<u64> {
        anyhow::ensure!(
            !transaction.signatures.is_empty(),
            "estimate requested for an unsigned transaction"
        );
        self.levels.lock().push(level);
        Ok(self.fee)
    }
}
