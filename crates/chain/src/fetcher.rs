//! RPC-backed account fetcher.
//!
//! Reads raw accounts over JSON-RPC and hands their data to an
//! [`AccountDecoder`]. Keyed reads are split into `getMultipleAccounts`
//! batches with a bounded number in flight; results keep the caller's ordering.

use crate::protocol::{AccountDecoder, AccountFetcher, ProgramAccount, Protocol};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::TryFutureExt;
use solana_account_decoder::UiAccountEncoding;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_sdk::account::Account;
use solana_sdk::pubkey::Pubkey;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Maximum keys accepted by a single `getMultipleAccounts` call.
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Maximum `getMultipleAccounts` batches in flight at once.
pub const MAX_CONCURRENT_BATCHES: usize = 4;

/// Account fetcher backed by a Solana RPC node.
pub struct RpcAccountFetcher<D> {
    client: Arc<RpcClient>,
    decoder: D,
}

impl<D> RpcAccountFetcher<D> {
    pub fn new(client: Arc<RpcClient>, decoder: D) -> Self {
        Self { client, decoder }
    }

    async fn get_multiple(&self, addresses: &[Pubkey]) -> Result<Vec<Option<Account>>> {
        let client = &self.client;
        fetch_batched(addresses, |chunk| {
            client
                .get_multiple_accounts(chunk)
                .map_err(anyhow::Error::from)
        })
        .await
    }
}

impl<D> std::fmt::Debug for RpcAccountFetcher<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcAccountFetcher")
            .field("rpc_url", &self.client.url())
            .finish_non_exhaustive()
    }
}

/// Run `fetch` over `MAX_MULTIPLE_ACCOUNTS`-sized chunks, at most
/// `MAX_CONCURRENT_BATCHES` at a time, and reassemble in input order.
///
/// A batch answering with the wrong number of entries is an error.
async fn fetch_batched<'a, F, Fut>(
    addresses: &'a [Pubkey],
    fetch: F,
) -> Result<Vec<Option<Account>>>
where
    F: Fn(&'a [Pubkey]) -> Fut + Sync,
    Fut: Future<Output = Result<Vec<Option<Account>>>> + Send + 'a,
{
    if addresses.is_empty() {
        return Ok(Vec::new());
    }

    let chunks = addresses.chunks(MAX_MULTIPLE_ACCOUNTS);
    let batches: Vec<Vec<Option<Account>>> = stream::iter(chunks)
        .map(|chunk| {
            let batch = fetch(chunk);
            async move {
                let accounts = batch.await?;
                anyhow::ensure!(
                    accounts.len() == chunk.len(),
                    "getMultipleAccounts returned {} entries for {} addresses",
                    accounts.len(),
                    chunk.len()
                );
                Ok(accounts)
            }
        })
        .buffered(MAX_CONCURRENT_BATCHES)
        .boxed()
        .try_collect()
        .await?;

    Ok(batches.into_iter().flatten().collect())
}

/// Decode one fetched entry; missing or undecodable accounts become `None`.
fn decode_entry<T>(
    address: &Pubkey,
    account: Option<Account>,
    kind: &'static str,
    decode: impl Fn(&[u8]) -> Result<T>,
) -> Option<T> {
    let account = account?;
    match decode(&account.data) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            debug!(address = %address, kind, error = %e, "Skipping undecodable account");
            None
        }
    }
}

/// Decode entries aligned with `addresses`, tagging each with its own address.
fn decode_aligned<T>(
    addresses: &[Pubkey],
    accounts: Vec<Option<Account>>,
    kind: &'static str,
    decode: impl Fn(&[u8]) -> Result<T>,
) -> Vec<Option<ProgramAccount<T>>> {
    addresses
        .iter()
        .zip(accounts)
        .map(|(address, account)| {
            decode_entry(address, account, kind, &decode)
                .map(|decoded| ProgramAccount::new(*address, decoded))
        })
        .collect()
}

#[async_trait]
impl<P, D> AccountFetcher<P> for RpcAccountFetcher<D>
where
    P: Protocol,
    D: AccountDecoder<P>,
{
    #[instrument(skip(self))]
    async fn get_exchange(&self, address: &Pubkey) -> Result<Option<P::Exchange>> {
        let account = self
            .client
            .get_account_with_commitment(address, self.client.commitment())
            .await?
            .value;

        Ok(decode_entry(address, account, "exchange", |data| {
            AccountDecoder::<P>::decode_exchange(&self.decoder, data)
        }))
    }

    async fn get_markets(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<P::Market>>>> {
        let accounts = self.get_multiple(addresses).await?;

        Ok(decode_aligned(addresses, accounts, "market", |data| {
            AccountDecoder::<P>::decode_market(&self.decoder, data)
        }))
    }

    async fn get_all_margin_accounts(
        &self,
    ) -> Result<Vec<Option<ProgramAccount<P::MarginAccount>>>> {
        let config = RpcProgramAccountsConfig {
            filters: Some(AccountDecoder::<P>::margin_account_filters(&self.decoder)),
            account_config: RpcAccountInfoConfig {
                encoding: Some(UiAccountEncoding::Base64),
                commitment: Some(self.client.commitment()),
                ..RpcAccountInfoConfig::default()
            },
            ..RpcProgramAccountsConfig::default()
        };

        let program_id = AccountDecoder::<P>::program_id(&self.decoder);
        let accounts = self
            .client
            .get_program_accounts_with_config(&program_id, config)
            .await?;

        debug!(count = accounts.len(), "Fetched all margin accounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| {
                decode_entry(&address, Some(account), "margin_account", |data| {
                    AccountDecoder::<P>::decode_margin_account(&self.decoder, data)
                })
                .map(|decoded| ProgramAccount::new(address, decoded))
            })
            .collect())
    }

    async fn get_margin_accounts(
        &self,
        addresses: &[Pubkey],
    ) -> Result<Vec<Option<ProgramAccount<P::MarginAccount>>>> {
        let accounts = self.get_multiple(addresses).await?;

        Ok(decode_aligned(addresses, accounts, "margin_account", |data| {
            AccountDecoder::<P>::decode_margin_account(&self.decoder, data)
        }))
    }

    async fn get_price_feeds(&self, addresses: &[Pubkey]) -> Result<Vec<Option<P::PriceFeed>>> {
        let accounts = self.get_multiple(addresses).await?;

        Ok(decode_aligned(addresses, accounts, "price_feed", |data| {
            AccountDecoder::<P>::decode_price_feed(&self.decoder, data)
        })
        .into_iter()
        .map(|feed| feed.map(|feed| feed.account))
        .collect())
    }
}
