//! RPC provider setup.

use anyhow::{Context, Result};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Commitment used when none is configured.
pub const DEFAULT_COMMITMENT: &str = "confirmed";

/// Parse a commitment level name (`processed`, `confirmed`, `finalized`).
pub fn parse_commitment(commitment: Option<&str>) -> Result<CommitmentConfig> {
    let name = commitment.unwrap_or(DEFAULT_COMMITMENT);
    CommitmentConfig::from_str(name)
        .map_err(|e| anyhow::anyhow!("Invalid commitment '{}': {:?}", name, e))
}

/// Build a shared RPC client and verify the endpoint answers.
pub async fn connect(rpc_url: &str, commitment: CommitmentConfig) -> Result<Arc<RpcClient>> {
    info!(
        rpc = rpc_url,
        commitment = ?commitment.commitment,
        "Initializing RPC client"
    );

    let client = Arc::new(RpcClient::new_with_commitment(
        rpc_url.to_string(),
        commitment,
    ));

    let slot = client
        .get_slot()
        .await
        .with_context(|| format!("RPC endpoint {} is unreachable", rpc_url))?;
    info!(slot = slot, "RPC connection verified");

    Ok(client)
}
