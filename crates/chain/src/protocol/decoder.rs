//! Account decoding hook for the RPC-backed fetcher.

use super::Protocol;
use anyhow::Result;
use solana_client::rpc_filter::RpcFilterType;
use solana_sdk::pubkey::Pubkey;

/// Decodes raw account data into a protocol's account types.
///
/// Implemented by the protocol SDK. The fetcher treats a decode failure the
/// same as a missing account.
pub trait AccountDecoder<P: Protocol>: Send + Sync {
    /// Program owning the exchange, market and margin accounts.
    fn program_id(&self) -> Pubkey;

    /// `getProgramAccounts` filters selecting margin accounts
    /// (typically a discriminator memcmp plus a data size).
    fn margin_account_filters(&self) -> Vec<RpcFilterType>;

    fn decode_exchange(&self, data: &[u8]) -> Result<P::Exchange>;

    fn decode_market(&self, data: &[u8]) -> Result<P::Market>;

    fn decode_margin_account(&self, data: &[u8]) -> Result<P::MarginAccount>;

    fn decode_price_feed(&self, data: &[u8]) -> Result<P::PriceFeed>;
}
