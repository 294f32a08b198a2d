//! Cross-source coin reconciliation.
//!
//! Joins the primary ranked listing with the secondary provider's coin list
//! by symbol *and* name, so a coin ends up with both providers' ids. Calls are
//! resumable: the returned offset is where the next call should start.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::{ListedCoin, SecondaryCoin};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledCoin {
    pub cmc_id: u64,
    pub gecko_id: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Primary-listing index to resume from
    pub next_offset: usize,
    pub coins: Vec<ReconciledCoin>,
}

impl Reconciliation {
    /// Oracle wire form: `offset;cmcId,geckoId,SYM;...`, empty when nothing matched
    pub fn to_wire(&self) -> String {
        if self.coins.is_empty() {
            return String::new();
        }
        let coins: Vec<String> = self
            .coins
            .iter()
            .map(|c| format!("{},{},{}", c.cmc_id, c.gecko_id, c.symbol))
            .collect();
        format!("{};{}", self.next_offset, coins.join(";"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    /// Upper-cased symbols never accepted (delisted or renamed assets)
    excluded_symbols: HashSet<String>,
    /// Max coins accepted per call, to stay inside the execution budget
    limit_per_call: Option<usize>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_excluded_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded_symbols = symbols
            .into_iter()
            .map(|s| s.as_ref().to_uppercase())
            .collect();
        self
    }

    pub fn with_limit_per_call(mut self, limit: usize) -> Self {
        self.limit_per_call = Some(limit);
        self
    }

    fn is_skipped(&self, coin: &ListedCoin) -> bool {
        coin.is_stablecoin() || self.excluded_symbols.contains(&coin.symbol.to_uppercase())
    }

    /// Walk `primary` from `offset`, accepting up to `target` coins that the
    /// secondary source lists under the same symbol and name.
    pub fn reconcile(
        &self,
        primary: &[ListedCoin],
        secondary: &[SecondaryCoin],
        offset: usize,
        target: usize,
    ) -> Reconciliation {
        // Later entries overwrite earlier ones sharing a symbol
        let lookup: HashMap<String, (&str, String)> = secondary
            .iter()
            .map(|c| (c.symbol.to_lowercase(), (c.id.as_str(), c.name.to_lowercase())))
            .collect();

        let cap = self.limit_per_call.map_or(target, |limit| limit.min(target));
        let mut coins = Vec::new();
        let mut index = offset;

        while index < primary.len() && coins.len() < cap {
            let candidate = &primary[index];
            index += 1;

            if self.is_skipped(candidate) {
                continue;
            }

            if let Some((gecko_id, name)) = lookup.get(&candidate.symbol.to_lowercase()) {
                if *name == candidate.name.to_lowercase() {
                    coins.push(ReconciledCoin {
                        cmc_id: candidate.id,
                        gecko_id: gecko_id.to_string(),
                        symbol: candidate.symbol.clone(),
                    });
                }
            }
        }

        Reconciliation { next_offset: index.max(offset), coins }
    }
}

/// Reconcile with no exclusions and no per-call cap
pub fn reconcile_coins(
    primary: &[ListedCoin],
    secondary: &[SecondaryCoin],
    offset: usize,
    target: usize,
) -> Reconciliation {
    Reconciler::default().reconcile(primary, secondary, offset, target)
}
