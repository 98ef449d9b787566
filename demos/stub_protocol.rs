//! Runs the bot over a stub protocol with a flat little-endian account layout.
//!
//! Stands in for a real SDK to show how the capability traits plug into
//! [`parcl_liquidator::launch`]. Needs the usual `RPC_URL`,
//! `LIQUIDATOR_MARGIN_ACCOUNT` and `PRIVATE_KEY`, plus `STUB_PROGRAM_ID`.
//!
//! ```text
//! cargo run --example stub_protocol
//! ```

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use parcl_liquidator::protocol::{
    ExchangeState, LiquidateAccounts, LiquidationInstructions, MarginAccountState,
    MarginEvaluator, MarginSnapshot, MarketMap, MarketState, PositionMarkets, PriceFeedMap,
    ProgramAccount, Protocol,
};
use parcl_liquidator::{launch, AccountDecoder, ProtocolComponents, RpcAccountFetcher};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

const MARGIN_ACCOUNT_TAG: u8 = 3;
const LIQUIDATE_TAG: u8 = 9;

struct StubProtocol;

impl Protocol for StubProtocol {
    type Exchange = StubExchange;
    type Market = StubMarket;
    type MarginAccount = StubMarginAccount;
    type PriceFeed = i64;
    type LiquidateParams = ();
}

struct StubExchange {
    market_ids: Vec<u32>,
}

impl ExchangeState for StubExchange {
    fn market_ids(&self) -> &[u32] {
        &self.market_ids
    }
}

#[derive(Clone)]
struct StubMarket {
    id: u32,
    price_feed: Pubkey,
}

impl MarketState for StubMarket {
    fn id(&self) -> u32 {
        self.id
    }

    fn price_feed(&self) -> Pubkey {
        self.price_feed
    }
}

struct StubMarginAccount {
    owner: Pubkey,
    exchange: Pubkey,
    in_liquidation: bool,
    required_margin: i64,
    available_margin: i64,
    market_ids: PositionMarkets,
}

impl MarginAccountState for StubMarginAccount {
    fn owner(&self) -> Pubkey {
        self.owner
    }

    fn exchange(&self) -> Pubkey {
        self.exchange
    }

    fn position_market_ids(&self) -> PositionMarkets {
        self.market_ids.clone()
    }

    fn in_liquidation(&self) -> bool {
        self.in_liquidation
    }
}

/// Cursor over account bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self
            .data
            .get(self.pos..self.pos + N)
            .and_then(|b| <[u8; N]>::try_from(b).ok())
            .with_context(|| format!("account data ends at byte {}", self.data.len()))?;
        self.pos += N;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_le_bytes(self.take()?))
    }

    fn pubkey(&mut self) -> Result<Pubkey> {
        Ok(Pubkey::new_from_array(self.take()?))
    }
}

struct StubDecoder {
    program_id: Pubkey,
}

impl AccountDecoder<StubProtocol> for StubDecoder {
    fn program_id(&self) -> Pubkey {
        self.program_id
    }

    fn margin_account_filters(&self) -> Vec<RpcFilterType> {
        vec![RpcFilterType::Memcmp(Memcmp::new_raw_bytes(
            0,
            vec![MARGIN_ACCOUNT_TAG],
        ))]
    }

    fn decode_exchange(&self, data: &[u8]) -> Result<StubExchange> {
        let mut reader = Reader::new(data);
        let count = reader.u8()?;
        let market_ids = (0..count).map(|_| reader.u32()).collect::<Result<_>>()?;
        Ok(StubExchange { market_ids })
    }

    fn decode_market(&self, data: &[u8]) -> Result<StubMarket> {
        let mut reader = Reader::new(data);
        Ok(StubMarket {
            id: reader.u32()?,
            price_feed: reader.pubkey()?,
        })
    }

    fn decode_margin_account(&self, data: &[u8]) -> Result<StubMarginAccount> {
        let mut reader = Reader::new(data);
        anyhow::ensure!(reader.u8()? == MARGIN_ACCOUNT_TAG, "not a margin account");
        let owner = reader.pubkey()?;
        let exchange = reader.pubkey()?;
        let in_liquidation = reader.u8()? != 0;
        let required_margin = reader.i64()?;
        let available_margin = reader.i64()?;
        let count = reader.u8()?;
        let market_ids = (0..count).map(|_| reader.u32()).collect::<Result<_>>()?;
        Ok(StubMarginAccount {
            owner,
            exchange,
            in_liquidation,
            required_margin,
            available_margin,
            market_ids,
        })
    }

    fn decode_price_feed(&self, data: &[u8]) -> Result<i64> {
        Reader::new(data).i64()
    }
}

/// Takes the margins stored on the account at face value.
struct StubMargins;

impl MarginEvaluator<StubProtocol> for StubMargins {
    fn margins(
        &self,
        account: &ProgramAccount<StubMarginAccount>,
        _exchange: &StubExchange,
        markets: &MarketMap<StubMarket>,
        price_feeds: &PriceFeedMap<i64>,
        _unix_timestamp: i64,
    ) -> Result<MarginSnapshot> {
        for id in &account.account.market_ids {
            let market = markets
                .get(id)
                .with_context(|| format!("market {id} not loaded"))?;
            anyhow::ensure!(
                price_feeds.contains_key(&market.account.price_feed),
                "no price for market {id}"
            );
        }

        let required = i128::from(account.account.required_margin);
        let available = i128::from(account.account.available_margin);
        Ok(MarginSnapshot {
            total_required_margin: required,
            available_margin: available,
            can_liquidate: required > 0 && available < required,
        })
    }
}

struct StubInstructions {
    program_id: Pubkey,
}

impl LiquidationInstructions<StubProtocol> for StubInstructions {
    fn exchange_address(&self, index: u64) -> Pubkey {
        Pubkey::find_program_address(
            &[b"exchange".as_slice(), &index.to_le_bytes()],
            &self.program_id,
        )
        .0
    }

    fn market_address(&self, exchange: &Pubkey, market_id: u32) -> Pubkey {
        Pubkey::find_program_address(
            &[b"market".as_slice(), exchange.as_ref(), &market_id.to_le_bytes()],
            &self.program_id,
        )
        .0
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
        Ok(Instruction::new_with_bytes(
            self.program_id,
            &[LIQUIDATE_TAG],
            metas,
        ))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    launch(|client| {
        let raw = std::env::var("STUB_PROGRAM_ID").context("Missing env var STUB_PROGRAM_ID")?;
        let program_id = Pubkey::from_str(&raw).context("Invalid STUB_PROGRAM_ID")?;

        Ok(ProtocolComponents::<StubProtocol>::new(
            Arc::new(RpcAccountFetcher::new(client, StubDecoder { program_id })),
            Arc::new(StubMargins),
            Arc::new(StubInstructions { program_id }),
        ))
    })
    .await
}
