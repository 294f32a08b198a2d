//! Oracle computations
//!
//! Short, stateless computations run by the decentralized oracle network.
//! Each returns the string the network hands back to the contract.

use rand::Rng;
use tracing::{info, warn};

use crate::bracket::{BracketWidth, NewGamePayload};
use crate::error::{AutomationError, AutomationResult};
use crate::market::sampler::select_from_listing;
use crate::market::{
    parse_id_list, parse_name_list, random_indexes, FallbackPriceSource, MarketData, Reconciler,
    Reconciliation, SecondaryMarket,
};

/// Index universe for `random_indexes_wire` (top-100 registry)
pub const TOP_COINS_UNIVERSE: usize = 100;

/// Secondary market page size when cross-checking listings
const GECKO_PAGE_SIZE: u32 = 250;

/// Seed a new bracket with `width` random non-stablecoin coins from the top `listing_limit`.
pub async fn new_game_coins<M, R>(
    market: &M,
    width: BracketWidth,
    listing_limit: u32,
    rng: &mut R,
) -> AutomationResult<NewGamePayload>
where
    M: MarketData + ?Sized,
    R: Rng + ?Sized,
{
    let listing = market.listings(listing_limit).await?;
    let coins = select_from_listing(&listing, width.slots(), rng)?;
    info!(
        "Selected {} coins for a new game: {}",
        coins.len(),
        coins.iter().map(|c| c.symbol.as_str()).collect::<Vec<_>>().join(",")
    );
    NewGamePayload::from_coins(width, &coins)
}

/// Current prices for the coins in `cmc_ids` as a comma-separated list of
/// fixed-point values, padded with zeros to the bracket width.
pub async fn advance_prices<P, S>(
    source: &FallbackPriceSource<P, S>,
    width: BracketWidth,
    cmc_ids: &str,
    gecko_ids: &str,
) -> AutomationResult<String>
where
    P: MarketData,
    S: SecondaryMarket,
{
    let ids = parse_id_list(cmc_ids);
    if ids.len() > width.slots() {
        return Err(AutomationError::OutOfRange(format!(
            "{} coins do not fit a {}-slot bracket",
            ids.len(),
            width.slots()
        )));
    }
    let names = parse_name_list(gecko_ids);
    let prices = source.prices(width, &ids, &names).await?;
    Ok(prices.iter().map(u64::to_string).collect::<Vec<_>>().join(","))
}

/// Fetch both listings concurrently and reconcile a page of them.
///
/// `target == 0` short-circuits without any request. Upstream failures and an
/// empty listing on either side degrade to an empty result at the same
/// offset; only configuration errors propagate.
pub async fn top_coins<M, S>(
    market: &M,
    secondary: &S,
    reconciler: &Reconciler,
    listing_limit: u32,
    offset: usize,
    target: usize,
) -> AutomationResult<Reconciliation>
where
    M: MarketData + ?Sized,
    S: SecondaryMarket + ?Sized,
{
    let empty = Reconciliation { next_offset: offset, coins: Vec::new() };
    if target == 0 {
        return Ok(empty);
    }

    let fetched = tokio::try_join!(
        market.listings(listing_limit),
        secondary.markets(GECKO_PAGE_SIZE, 1),
        secondary.markets(GECKO_PAGE_SIZE, 2),
    );
    let (primary, page_one, page_two) = match fetched {
        Ok(listings) => listings,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!("Top coin listings unavailable: {}", e);
            return Ok(empty);
        }
    };

    if primary.is_empty() || page_one.is_empty() {
        warn!(
            "Invalid market response: {} primary coins, {} on the first secondary page",
            primary.len(),
            page_one.len()
        );
        return Ok(empty);
    }

    let mut secondary_coins = page_one;
    secondary_coins.extend(page_two);
    let result = reconciler.reconcile(&primary, &secondary_coins, offset, target);
    info!(
        "Reconciled {} coins, resuming at offset {}",
        result.coins.len(),
        result.next_offset
    );
    Ok(result)
}

/// `size` distinct indexes into the top-coin registry, comma separated
pub fn random_indexes_wire<R: Rng + ?Sized>(size: usize, rng: &mut R) -> AutomationResult<String> {
    let indexes = random_indexes(size, TOP_COINS_UNIVERSE, rng)?;
    Ok(indexes.iter().map(usize::to_string).collect::<Vec<_>>().join(","))
}
