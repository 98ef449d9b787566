//! Priority fee estimation client.
//!
//! Calls the `getPriorityFeeEstimate` JSON-RPC method exposed by the chain
//! RPC provider with a serialized transaction and an urgency level.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::transaction::Transaction;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

/// Urgency level for a priority fee estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PriorityLevel {
    Min,
    Low,
    #[default]
    Medium,
    High,
    VeryHigh,
}

impl PriorityLevel {
    /// Wire name used by the estimator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "veryHigh",
        }
    }
}

impl fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriorityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "veryhigh" | "very_high" | "very-high" => Ok(Self::VeryHigh),
            other => anyhow::bail!("Unknown priority level: {}", other),
        }
    }
}

/// Source of compute-unit price estimates.
#[async_trait]
pub trait PriorityFeeEstimator: Send + Sync {
    /// Estimated price in micro-lamports per compute unit.
    async fn estimate(&self, transaction: &Transaction, level: PriorityLevel) -> Result<u64>;
}

/// HTTP client for the `getPriorityFeeEstimate` RPC method.
#[derive(Clone)]
pub struct PriorityFeeClient {
    client: reqwest::Client,
    rpc_url: String,
}

impl fmt::Debug for PriorityFeeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityFeeClient")
            .field("rpc_url", &self.rpc_url)
            .finish()
    }
}

impl PriorityFeeClient {
    /// Create a client posting to `rpc_url`.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            rpc_url: rpc_url.into(),
        }
    }
}

#[async_trait]
impl PriorityFeeEstimator for PriorityFeeClient {
    #[instrument(skip_all, fields(level = %level))]
    async fn estimate(&self, transaction: &Transaction, level: PriorityLevel) -> Result<u64> {
        let encoded = encode_transaction(transaction)?;
        let request = EstimateRequest::new(&encoded, level);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Priority fee API error: {} - {}", status, body);
        }

        let body: EstimateResponse = response.json().await?;
        let fee = body.into_estimate()?;

        debug!(level = %level, micro_lamports = fee, "Priority fee estimate");

        Ok(fee)
    }
}

/// Base58 of the bincode wire format.
fn encode_transaction(transaction: &Transaction) -> Result<String> {
    let bytes = bincode::serialize(transaction)?;
    Ok(bs58::encode(bytes).into_string())
}

// JSON-RPC request/response types

#[derive(Debug, Serialize)]
struct EstimateRequest<'a> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'static str,
    params: [EstimateParams<'a>; 1],
}

impl<'a> EstimateRequest<'a> {
    fn new(transaction: &'a str, priority_level: PriorityLevel) -> Self {
        Self {
            jsonrpc: "2.0",
            id: "1",
            method: "getPriorityFeeEstimate",
            params: [EstimateParams {
                transaction,
                options: EstimateOptions { priority_level },
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct EstimateParams<'a> {
    transaction: &'a str,
    options: EstimateOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EstimateOptions {
    priority_level: PriorityLevel,
}

#[derive(Debug, Deserialize)]
struct EstimateResponse {
    result: Option<EstimateResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EstimateResult {
    priority_fee_estimate: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl EstimateResponse {
    /// Whole micro-lamports, rounded up.
    fn into_estimate(self) -> Result<u64> {
        if let Some(error) = self.error {
            anyhow::bail!(
                "Priority fee estimate failed: {} (code {})",
                error.message,
                error.code
            );
        }

        let estimate = self
            .result
            .and_then(|r| r.priority_fee_estimate)
            .ok_or_else(|| anyhow::anyhow!("Missing priorityFeeEstimate in response"))?;

        if !estimate.is_finite() || estimate < 0.0 {
            anyhow::bail!("Invalid priority fee estimate: {}", estimate);
        }

        Ok(estimate.ceil() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::instruction::{AccountMeta, Instruction};
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::signature::{Keypair, Signer};

    #[test]
    fn test_priority_level_parsing() {
        assert_eq!("medium".parse::<PriorityLevel>().unwrap(), PriorityLevel::Medium);
        assert_eq!("MIN".parse::<PriorityLevel>().unwrap(), PriorityLevel::Min);
        assert_eq!("veryHigh".parse::<PriorityLevel>().unwrap(), PriorityLevel::VeryHigh);
        assert_eq!("very_high".parse::<PriorityLevel>().unwrap(), PriorityLevel::VeryHigh);
        assert!("urgent".parse::<PriorityLevel>().is_err());
        assert_eq!(PriorityLevel::default(), PriorityLevel::Medium);
    }

    #[test]
    fn test_request_shape() {
        let request = EstimateRequest::new("3xyz", PriorityLevel::VeryHigh);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": "1",
                "method": "getPriorityFeeEstimate",
                "params": [{
                    "transaction": "3xyz",
                    "options": { "priorityLevel": "veryHigh" }
                }]
            })
        );
    }

    #[test]
    fn test_parse_estimate_rounds_up() {
        let json = r#"{"jsonrpc":"2.0","id":"1","result":{"priorityFeeEstimate":1200.25}}"#;
        let response: EstimateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_estimate().unwrap(), 1201);

        let json = r#"{"jsonrpc":"2.0","id":"1","result":{"priorityFeeEstimate":0.0}}"#;
        let response: EstimateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_estimate().unwrap(), 0);
    }

    #[test]
    fn test_parse_rpc_error() {
        let json = r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32602,"message":"invalid transaction"}}"#;
        let response: EstimateResponse = serde_json::from_str(json).unwrap();

        let err = response.into_estimate().unwrap_err().to_string();
        assert!(err.contains("invalid transaction"));
        assert!(err.contains("-32602"));
    }

    #[test]
    fn test_parse_missing_estimate() {
        let json = r#"{"jsonrpc":"2.0","id":"1","result":{}}"#;
        let response: EstimateResponse = serde_json::from_str(json).unwrap();
        assert!(response.into_estimate().is_err());
    }

    #[test]
    fn test_encode_transaction_is_base58_wire_format() {
        let payer = Keypair::new();
        let instruction = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(payer.pubkey(), true)],
        );
        let mut tx = Transaction::new_with_payer(&[instruction], Some(&payer.pubkey()));
        tx.sign(&[&payer], Hash::new_unique());

        let encoded = encode_transaction(&tx).unwrap();
        let decoded: Transaction =
            bincode::deserialize(&bs58::decode(encoded).into_vec().unwrap()).unwrap();
        assert_eq!(decoded, tx);
    }
}
