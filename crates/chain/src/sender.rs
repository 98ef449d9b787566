//! Transaction submission over RPC.

use anyhow::Result;
use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::hash::Hash;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Blockhash lookup and send-and-confirm.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    /// Most recent blockhash at the client's commitment.
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Send `transaction` and wait until it reaches the client's commitment.
    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature>;
}

/// Submitter using a shared nonblocking RPC client.
pub struct RpcTransactionSender {
    client: Arc<RpcClient>,
}

impl RpcTransactionSender {
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }
}

impl std::fmt::Debug for RpcTransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcTransactionSender")
            .field("rpc_url", &self.client.url())
            .field("commitment", &self.client.commitment().commitment)
            .finish()
    }
}

#[async_trait]
impl TransactionSubmitter for RpcTransactionSender {
    async fn latest_blockhash(&self) -> Result<Hash> {
        let blockhash = self.client.get_latest_blockhash().await?;
        debug!(blockhash = %blockhash, "Fetched latest blockhash");
        Ok(blockhash)
    }

    async fn send_and_confirm(&self, transaction: &Transaction) -> Result<Signature> {
        let start = Instant::now();
        let signature = self.client.send_and_confirm_transaction(transaction).await?;

        info!(
            signature = %signature,
            confirm_ms = start.elapsed().as_millis(),
            "Transaction confirmed"
        );

        Ok(signature)
    }
}
