//! Liquidation transaction builder and submitter.

use anyhow::{Context, Result};
use async_trait::async_trait;
use solana_sdk::compute_budget::ComputeBudgetInstruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::error::LiquidatorError;
use liquidator_api::{PriorityFeeEstimator, PriorityLevel};
use liquidator_chain::{
    LiquidateAccounts, LiquidationInstructions, MarginAccountState, MarketMap, MarketState,
    ProgramAccount, Protocol, TransactionDraft, TransactionSubmitter,
};

/// Send attempts per liquidation transaction.
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 5;

/// Submits a liquidation for one margin account.
#[async_trait]
pub trait LiquidationExecutor<P: Protocol>: Send + Sync {
    async fn liquidate(
        &self,
        account: &ProgramAccount<P::MarginAccount>,
        markets: &MarketMap<P::Market>,
    ) -> Result<Signature>;
}

/// Liquidation executor.
pub struct Liquidator<P: Protocol> {
    /// Protocol instruction encoding
    instructions: Arc<dyn LiquidationInstructions<P>>,

    submitter: Arc<dyn TransactionSubmitter>,

    fees: Arc<dyn PriorityFeeEstimator>,

    /// Fee payer and liquidator authority
    signer: Arc<Keypair>,

    /// Margin account receiving the liquidated positions
    liquidator_margin_account: Pubkey,

    priority_level: PriorityLevel,

    max_send_attempts: u32,
}

impl<P: Protocol> Liquidator<P> {
    /// Create a new liquidator.
    pub fn new(
        instructions: Arc<dyn LiquidationInstructions<P>>,
        submitter: Arc<dyn TransactionSubmitter>,
        fees: Arc<dyn PriorityFeeEstimator>,
        signer: Arc<Keypair>,
        liquidator_margin_account: Pubkey,
    ) -> Self {
        Self {
            instructions,
            submitter,
            fees,
            signer,
            liquidator_margin_account,
            priority_level: PriorityLevel::Medium,
            max_send_attempts: DEFAULT_MAX_SEND_ATTEMPTS,
        }
    }

    /// Set the priority fee urgency.
    pub fn with_priority_level(mut self, priority_level: PriorityLevel) -> Self {
        self.priority_level = priority_level;
        self
    }

    /// Set send attempts per transaction (at least 1).
    pub fn with_max_send_attempts(mut self, max_send_attempts: u32) -> Self {
        self.max_send_attempts = max_send_attempts.max(1);
        self
    }

    pub fn signer_pubkey(&self) -> Pubkey {
        self.signer.pubkey()
    }

    fn liquidate_accounts(&self, account: &ProgramAccount<P::MarginAccount>) -> LiquidateAccounts {
        LiquidateAccounts {
            margin_account: account.address,
            exchange: account.account.exchange(),
            owner: account.account.owner(),
            liquidator: self.signer.pubkey(),
            liquidator_margin_account: self.liquidator_margin_account,
        }
    }
}

#[async_trait]
impl<P: Protocol> LiquidationExecutor<P> for Liquidator<P> {
    #[instrument(skip_all, fields(account = %account.address))]
    async fn liquidate(
        &self,
        account: &ProgramAccount<P::MarginAccount>,
        markets: &MarketMap<P::Market>,
    ) -> Result<Signature> {
        let start = Instant::now();

        let market_ids = account.account.position_market_ids();
        let (market_addresses, price_feed_addresses) =
            resolve_market_accounts(&market_ids, markets)?;

        let accounts = self.liquidate_accounts(account);
        let instruction = self.instructions.liquidate(
            &accounts,
            &market_addresses,
            &price_feed_addresses,
            None,
        )?;

        let payer = self.signer.pubkey();
        let signer: &Keypair = &self.signer;
        let blockhash = self.submitter.latest_blockhash().await?;

        let draft = TransactionDraft::new(vec![instruction]);
        let unpriced = draft.build_signed(&payer, &[signer], blockhash)?;

        let fee = self.fees.estimate(&unpriced, self.priority_level).await?;
        debug!(
            micro_lamports = fee,
            level = %self.priority_level,
            "Priority fee estimated"
        );

        let transaction = draft
            .with_instruction(ComputeBudgetInstruction::set_compute_unit_price(fee))
            .build_signed(&payer, &[signer], blockhash)?;

        info!(
            positions = market_ids.len(),
            priority_fee = fee,
            "Submitting liquidation transaction"
        );

        let signature =
            send_with_retries(self.submitter.as_ref(), &transaction, self.max_send_attempts)
                .await?;

        info!(
            signature = %signature,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Liquidation confirmed"
        );

        Ok(signature)
    }
}

/// Market and price-feed addresses for each position, in position order.
pub fn resolve_market_accounts<M: MarketState>(
    position_market_ids: &[u32],
    markets: &MarketMap<M>,
) -> Result<(Vec<Pubkey>, Vec<Pubkey>), LiquidatorError> {
    let mut market_addresses = Vec::with_capacity(position_market_ids.len());
    let mut price_feed_addresses = Vec::with_capacity(position_market_ids.len());

    for market_id in position_market_ids {
        let market = markets
            .get(market_id)
            .ok_or(LiquidatorError::MissingMarket {
                market_id: *market_id,
            })?;
        market_addresses.push(market.address);
        price_feed_addresses.push(market.account.price_feed());
    }

    Ok((market_addresses, price_feed_addresses))
}

/// Send and confirm `transaction`, retrying failed sends up to `max_attempts`
/// times in total. The last error is returned once attempts run out.
pub async fn send_with_retries(
    submitter: &dyn TransactionSubmitter,
    transaction: &Transaction,
    max_attempts: u32,
) -> Result<Signature> {
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match submitter.send_and_confirm(transaction).await {
            Ok(signature) => return Ok(signature),
            Err(e) if attempt < max_attempts => {
                warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    "Transaction send failed, retrying"
                );
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Liquidation transaction failed after {} attempts", attempt)
                })
            }
        }
    }
}
