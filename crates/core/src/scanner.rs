//! Polling scanner for the liquidation bot.
//!
//! Each cycle rebuilds market data, fetches margin accounts (every account
//! while the working set is empty, otherwise only its members) and evaluates
//! them one by one. Any error aborts the run; [`Scanner::supervise`] then
//! starts over from a fresh bootstrap.

use anyhow::Result;
use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::config::BotConfig;
use crate::error::LiquidatorError;
use crate::evaluator::AccountEvaluator;
use crate::liquidator::LiquidationExecutor;
use crate::market_data::build_market_maps;
use crate::working_set::{FetchScope, WorkingSet};
use liquidator_chain::{
    AccountFetcher, ExchangeState, LiquidationInstructions, MarginEvaluator, ProgramAccount,
    Protocol,
};

/// Scanner configuration.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Index of the exchange to watch
    pub exchange_index: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            exchange_index: 0,
        }
    }
}

impl From<&BotConfig> for ScannerConfig {
    fn from(config: &BotConfig) -> Self {
        Self {
            interval: config.interval(),
            exchange_index: config.exchange_index,
        }
    }
}

/// State owned by one scanner run.
pub struct ScanState<P: Protocol> {
    pub exchange_address: Pubkey,
    pub exchange: P::Exchange,
    /// Markets fetched at bootstrap, aligned with the exchange's non-zero market ids
    pub markets: Vec<Option<ProgramAccount<P::Market>>>,
    pub working_set: WorkingSet,
}

/// Summary of one polling cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    /// Entries returned by the fetch, absent ones included
    pub fetched: usize,
    pub evaluated: usize,
    pub liquidations: usize,
    pub added: usize,
    pub working_set_size: usize,
    pub full_scan: bool,
}

/// Polling liquidation scanner.
pub struct Scanner<P: Protocol> {
    fetcher: Arc<dyn AccountFetcher<P>>,
    evaluator: Arc<dyn MarginEvaluator<P>>,
    instructions: Arc<dyn LiquidationInstructions<P>>,
    executor: Arc<dyn LiquidationExecutor<P>>,
    config: ScannerConfig,
}

impl<P: Protocol> Scanner<P> {
    pub fn new(
        fetcher: Arc<dyn AccountFetcher<P>>,
        evaluator: Arc<dyn MarginEvaluator<P>>,
        instructions: Arc<dyn LiquidationInstructions<P>>,
        executor: Arc<dyn LiquidationExecutor<P>>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            fetcher,
            evaluator,
            instructions,
            executor,
            config,
        }
    }

    /// Resolve the exchange and fetch its markets once.
    #[instrument(skip(self), fields(exchange_index = self.config.exchange_index))]
    pub async fn bootstrap(&self) -> Result<ScanState<P>> {
        let exchange_address = self
            .instructions
            .exchange_address(self.config.exchange_index);

        let exchange = self
            .fetcher
            .get_exchange(&exchange_address)
            .await?
            .ok_or(LiquidatorError::InvalidExchange(exchange_address))?;

        let market_addresses: Vec<Pubkey> = exchange
            .market_ids()
            .iter()
            .filter(|id| **id != 0)
            .map(|id| self.instructions.market_address(&exchange_address, *id))
            .collect();

        let markets = self.fetcher.get_markets(&market_addresses).await?;

        info!(
            exchange = %exchange_address,
            markets = markets.iter().flatten().count(),
            "Bootstrap complete"
        );

        Ok(ScanState {
            exchange_address,
            exchange,
            markets,
            working_set: WorkingSet::new(),
        })
    }

    /// Run one fetch-evaluate-act cycle.
    pub async fn run_cycle(&self, state: &mut ScanState<P>) -> Result<CycleReport> {
        let scope = state.working_set.scope();
        let full_scan = scope == FetchScope::All;

        let accounts = async {
            match &scope {
                FetchScope::All => self.fetcher.get_all_margin_accounts().await,
                FetchScope::Addresses(addresses) => {
                    self.fetcher.get_margin_accounts(addresses).await
                }
            }
        };

        let (market_data, accounts) = tokio::try_join!(
            build_market_maps(self.fetcher.as_ref(), &state.markets),
            accounts
        )?;

        let evaluator = AccountEvaluator::new(
            self.evaluator.as_ref(),
            self.executor.as_ref(),
            &state.exchange,
            &market_data.markets,
            &market_data.price_feeds,
        );

        let mut report = CycleReport {
            fetched: accounts.len(),
            full_scan,
            ..Default::default()
        };

        for account in &accounts {
            let Some(account) = account else {
                continue;
            };

            let evaluation = evaluator
                .evaluate(
                    Some(account),
                    Utc::now().timestamp(),
                    &mut state.working_set,
                )
                .await?;

            report.evaluated += 1;
            report.liquidations += evaluation.signatures.len();
            report.added += evaluation.added as usize;
        }

        report.working_set_size = state.working_set.len();

        info!(
            fetched = report.fetched,
            evaluated = report.evaluated,
            liquidations = report.liquidations,
            working_set = report.working_set_size,
            full_scan,
            timestamp = %Utc::now().to_rfc3339(),
            "Cycle complete"
        );

        Ok(report)
    }

    /// Run cycles until one fails. The first cycle starts immediately.
    pub async fn run(&self, state: &mut ScanState<P>) -> Result<()> {
        info!(interval_secs = self.config.interval.as_secs(), "Starting scanner loop");

        loop {
            self.run_cycle(state).await?;
            tokio::time::sleep(self.config.interval).await;
        }
    }

    /// Run forever, restarting from a fresh bootstrap whenever a run fails.
    ///
    /// `initial` is the state from a bootstrap the caller already performed.
    pub async fn supervise(&self, initial: ScanState<P>) {
        let mut state = Some(initial);
        let mut restarts: u64 = 0;

        loop {
            if let Err(e) = self.run_once(state.take()).await {
                restarts += 1;
                error!(error = ?e, restarts, "Liquidator run failed, restarting");
                // Let other tasks make progress between restarts
                tokio::task::yield_now().await;
            }
            info!(restarts, "Starting liquidator");
        }
    }

    async fn run_once(&self, state: Option<ScanState<P>>) -> Result<()> {
        let mut state = match state {
            Some(state) => state,
            None => self.bootstrap().await?,
        };
        self.run(&mut state).await
    }
}
