//! Market data: coin listings, quotes and the providers behind them.
//!
//! The primary provider (CoinMarketCap) ranks coins by market cap and quotes
//! prices by id or symbol. The secondary provider (CoinGecko) is used to
//! cross-check listings and as a price fallback.

pub mod coingecko;
pub mod coinmarketcap;
pub mod fallback;
pub mod reconcile;
pub mod sampler;

pub use coingecko::CoinGeckoClient;
pub use coinmarketcap::CoinMarketCapClient;
pub use fallback::FallbackPriceSource;
pub use reconcile::{reconcile_coins, ReconciledCoin, Reconciler, Reconciliation};
pub use sampler::{random_indexes, select_unique_coins};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::bracket::PriceQuote;
use crate::error::AutomationResult;

/// Classification tag excluded from every bracket
pub const STABLECOIN_TAG: &str = "stablecoin";

/// A tradeable asset as seeded into a bracket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: u64,
    pub symbol: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Coin {
    pub fn is_stablecoin(&self) -> bool {
        self.tags.contains(STABLECOIN_TAG)
    }
}

/// Ranked listing entry from the primary provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedCoin {
    pub id: u64,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ListedCoin {
    pub fn is_stablecoin(&self) -> bool {
        self.tags.contains(STABLECOIN_TAG)
    }
}

impl From<&ListedCoin> for Coin {
    fn from(listed: &ListedCoin) -> Self {
        Coin {
            id: listed.id,
            symbol: listed.symbol.clone(),
            tags: listed.tags.clone(),
        }
    }
}

/// Coin as known to the secondary provider (string ids like "bitcoin")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryCoin {
    pub id: String,
    pub symbol: String,
    pub name: String,
}

/// Primary market-data provider
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Top coins by market cap, best first
    async fn listings(&self, limit: u32) -> AutomationResult<Vec<ListedCoin>>;

    /// Latest quotes keyed by provider id
    async fn quotes_by_ids(&self, ids: &[u64]) -> AutomationResult<HashMap<u64, PriceQuote>>;

    /// Latest quotes keyed by symbol
    async fn quotes_by_symbols(
        &self,
        symbols: &[String],
    ) -> AutomationResult<HashMap<String, PriceQuote>>;
}

/// Secondary market-data provider
#[async_trait]
pub trait SecondaryMarket: Send + Sync {
    async fn markets(&self, per_page: u32, page: u32) -> AutomationResult<Vec<SecondaryCoin>>;

    /// USD prices keyed by secondary id
    async fn simple_prices(&self, ids: &[String]) -> AutomationResult<HashMap<String, f64>>;
}

/// Split an oracle argument like `"1,1027,0,,5426"` into ids, dropping
/// empty and zero entries.
pub fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .filter(|id| *id != 0)
        .collect()
}

/// Split a comma-separated list of string ids, dropping empty entries.
pub fn parse_name_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
