//! Redundant price source: primary provider by id, secondary by name on failure.

use tracing::warn;

use super::{MarketData, SecondaryMarket};
use crate::bracket::{pad_to, to_fixed_point, BracketWidth};
use crate::error::{AutomationError, AutomationResult};

pub struct FallbackPriceSource<P, S> {
    primary: P,
    secondary: S,
}

impl<P: MarketData, S: SecondaryMarket> FallbackPriceSource<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }

    /// Fixed-point prices positional with `cmc_ids` (or `gecko_ids` when the
    /// primary fails), missing coins as 0, padded to the bracket width.
    pub async fn prices(
        &self,
        width: BracketWidth,
        cmc_ids: &[u64],
        gecko_ids: &[String],
    ) -> AutomationResult<Vec<u64>> {
        match self.primary.quotes_by_ids(cmc_ids).await {
            Ok(quotes) if !quotes.is_empty() => {
                let mut prices: Vec<u64> = cmc_ids
                    .iter()
                    .map(|id| quotes.get(id).map(|q| to_fixed_point(q.price)).unwrap_or(0))
                    .collect();
                pad_to(&mut prices, width.slots(), 0);
                return Ok(prices);
            }
            Ok(_) => warn!("Primary price source returned no quotes, trying secondary"),
            Err(e) => warn!("Primary price source failed: {}, trying secondary", e),
        }

        let quotes = self.secondary.simple_prices(gecko_ids).await.map_err(|e| {
            AutomationError::Upstream(format!("Both price sources failed: {}", e))
        })?;
        if quotes.is_empty() {
            return Err(AutomationError::Upstream("Both price sources failed".to_string()));
        }

        let mut prices: Vec<u64> = gecko_ids
            .iter()
            .map(|id| quotes.get(id).map(|usd| to_fixed_point(*usd)).unwrap_or(0))
            .collect();
        pad_to(&mut prices, width.slots(), 0);
        Ok(prices)
    }
}
