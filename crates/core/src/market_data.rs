//! Per-cycle market and price-feed maps.

use anyhow::Result;
use liquidator_chain::{
    AccountFetcher, MarketMap, MarketState, PriceFeedMap, ProgramAccount, Protocol,
};
use solana_sdk::pubkey::Pubkey;
use tracing::debug;

/// Market data needed to evaluate margin accounts for one cycle.
pub struct MarketData<P: Protocol> {
    pub markets: MarketMap<P::Market>,
    pub price_feeds: PriceFeedMap<P::PriceFeed>,
}

/// Rebuild the market map from the bootstrap market list and fetch a fresh
/// price feed for every present market. Absent markets and feeds are skipped.
pub async fn build_market_maps<P: Protocol>(
    fetcher: &dyn AccountFetcher<P>,
    markets: &[Option<ProgramAccount<P::Market>>],
) -> Result<MarketData<P>> {
    let markets: MarketMap<P::Market> = markets
        .iter()
        .flatten()
        .map(|market| (market.account.id(), market.clone()))
        .collect();

    let feed_addresses: Vec<Pubkey> = markets
        .values()
        .map(|market| market.account.price_feed())
        .collect();

    let feeds = fetcher.get_price_feeds(&feed_addresses).await?;
    let price_feeds: PriceFeedMap<P::PriceFeed> = feed_addresses
        .into_iter()
        .zip(feeds)
        .filter_map(|(address, feed)| feed.map(|feed| (address, feed)))
        .collect();

    debug!(
        markets = markets.len(),
        price_feeds = price_feeds.len(),
        "Market maps built"
    );

    Ok(MarketData {
        markets,
        price_feeds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{market, price_feed_address, MockFetcher, TestProtocol};

    #[tokio::test]
    async fn test_build_market_maps() {
        let fetcher = MockFetcher::with_markets(&[1, 2]);
        let bootstrap = vec![Some(market(1)), Some(market(2))];

        let data = build_market_maps::<TestProtocol>(&fetcher, &bootstrap)
            .await
            .unwrap();

        assert_eq!(data.markets.len(), 2);
        assert_eq!(data.markets[&1], market(1));
        assert_eq!(data.price_feeds.len(), 2);
        assert_eq!(data.price_feeds[&price_feed_address(2)].price, 200);
    }

    #[tokio::test]
    async fn test_absent_markets_and_feeds_are_skipped() {
        let mut fetcher = MockFetcher::with_markets(&[1, 2]);
        fetcher.price_feeds.remove(&price_feed_address(2));
        let bootstrap = vec![Some(market(1)), None, Some(market(2))];

        let data = build_market_maps::<TestProtocol>(&fetcher, &bootstrap)
            .await
            .unwrap();

        assert_eq!(data.markets.len(), 2);
        assert_eq!(data.price_feeds.len(), 1);
        assert!(data.price_feeds.contains_key(&price_feed_address(1)));
    }

    #[tokio::test]
    async fn test_feeds_are_refetched_each_call() {
        let fetcher = MockFetcher::with_markets(&[3]);
        let bootstrap = vec![Some(market(3))];

        build_market_maps::<TestProtocol>(&fetcher, &bootstrap)
            .await
            .unwrap();
        build_market_maps::<TestProtocol>(&fetcher, &bootstrap)
            .await
            .unwrap();

        let feed_calls = fetcher
            .calls()
            .into_iter()
            .filter(|c| matches!(c, crate::testing::FetchCall::PriceFeeds(_)))
            .count();
        assert_eq!(feed_calls, 2);
    }
}
