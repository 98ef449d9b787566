//! Per-account evaluation: liquidation triggers and working-set bookkeeping.

use anyhow::Result;
use liquidator_chain::{
    MarginEvaluator, MarginSnapshot, MarketMap, PriceFeedMap, ProgramAccount, Protocol,
};
use solana_sdk::signature::Signature;
use tracing::{debug, info};

use crate::liquidator::LiquidationExecutor;
use crate::working_set::WorkingSet;

/// Outcome of evaluating one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Signatures of liquidations submitted for the account
    pub signatures: Vec<Signature>,
    pub snapshot: Option<MarginSnapshot>,
    /// Whether the account joined the working set
    pub added: bool,
}

/// Evaluates margin accounts against one cycle's market data.
pub struct AccountEvaluator<'a, P: Protocol> {
    evaluator: &'a dyn MarginEvaluator<P>,
    executor: &'a dyn LiquidationExecutor<P>,
    exchange: &'a P::Exchange,
    markets: &'a MarketMap<P::Market>,
    price_feeds: &'a PriceFeedMap<P::PriceFeed>,
}

impl<'a, P: Protocol> AccountEvaluator<'a, P> {
    pub fn new(
        evaluator: &'a dyn MarginEvaluator<P>,
        executor: &'a dyn LiquidationExecutor<P>,
        exchange: &'a P::Exchange,
        markets: &'a MarketMap<P::Market>,
        price_feeds: &'a PriceFeedMap<P::PriceFeed>,
    ) -> Self {
        Self {
            evaluator,
            executor,
            exchange,
            markets,
            price_feeds,
        }
    }

    /// Evaluate `account` at `unix_timestamp`.
    ///
    /// An account already flagged in liquidation is liquidated before its
    /// margin is checked, and again if the snapshot also allows it. Absent
    /// accounts are skipped. Submission errors propagate.
    pub async fn evaluate(
        &self,
        account: Option<&ProgramAccount<P::MarginAccount>>,
        unix_timestamp: i64,
        working_set: &mut WorkingSet,
    ) -> Result<Evaluation> {
        let Some(account) = account else {
            return Ok(Evaluation::default());
        };

        let mut evaluation = Evaluation::default();

        if self.evaluator.in_liquidation(&account.account) {
            info!(account = %account.address, "Liquidating account already in liquidation");
            let signature = self.executor.liquidate(account, self.markets).await?;
            info!(account = %account.address, signature = %signature, "Liquidation submitted");
            evaluation.signatures.push(signature);
        }

        let snapshot = self.evaluator.margins(
            account,
            self.exchange,
            self.markets,
            self.price_feeds,
            unix_timestamp,
        )?;

        debug!(
            account = %account.address,
            required = %snapshot.total_required_margin,
            available = %snapshot.available_margin,
            can_liquidate = snapshot.can_liquidate,
            "Margin snapshot"
        );

        if snapshot.can_liquidate {
            info!(account = %account.address, "Starting liquidation");
            let signature = self.executor.liquidate(account, self.markets).await?;
            info!(account = %account.address, signature = %signature, "Liquidation submitted");
            evaluation.signatures.push(signature);
        }

        evaluation.added = working_set.record(account.address, &snapshot);
        evaluation.snapshot = Some(snapshot);

        Ok(evaluation)
    }
}
