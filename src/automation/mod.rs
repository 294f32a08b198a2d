//! Webhook Automation - Round Advancement Invocation
//!
//! One invocation reads every active game from the bracket contract, prices
//! its coins, computes the round results and submits them together with an
//! optional new game in a single `performGames` call.
//!
//! ## Flow:
//! 1. `ExecutionGuard` drops duplicate or too-frequent triggers
//! 2. New-game coins are drawn (8 slots: every run, 16 slots: when a final is live)
//! 3. Active games are read and all symbols in play are quoted
//! 4. `RoundAdvancer` computes results; unready games are left out
//! 5. The batch is submitted; success marks the minute as executed
//!
//! Failures never retry inside the invocation; the platform's next trigger
//! picks the work up again.

pub mod alert;
pub mod store;

pub use alert::{AlertLevel, AlertSink, HttpAlertSink, LogAlertSink};
pub use store::{ExecutionGuard, GuardDecision, KeyValueStore, MemoryStore};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::bracket::{
    AdvanceBatch, BracketGame, BracketWidth, NewGamePayload, PriceQuote, RngFlip, RoundAdvancer,
};
use crate::config::AutomationConfig;
use crate::error::AutomationResult;
use crate::market::sampler::select_from_listing;
use crate::market::MarketData;

/// Bracket contract as seen by the automation
#[async_trait]
pub trait GameContract: Send + Sync {
    /// Snapshots of every game still in play
    async fn active_games(&self) -> AutomationResult<Vec<BracketGame>>;

    /// Submit the new game and/or round results; returns the transaction hash
    async fn perform_games(
        &self,
        new_game: Option<&NewGamePayload>,
        update: Option<&AdvanceBatch>,
        timestamp: u64,
    ) -> AutomationResult<String>;
}

#[derive(Debug, Clone)]
pub struct AutomationSettings {
    pub width: BracketWidth,
    pub listing_limit: u32,
    pub min_interval_secs: u64,
    /// Deployment name used in alert messages
    pub network: String,
}

impl AutomationSettings {
    pub fn from_config(config: &AutomationConfig, network: impl Into<String>) -> Self {
        Self {
            width: config.bracket_width,
            listing_limit: config.listing_limit,
            min_interval_secs: config.min_interval_secs,
            network: network.into(),
        }
    }
}

/// What one invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Skipped(GuardDecision),
    NothingToDo,
    Submitted { tx_hash: String, advanced: usize, new_game: bool },
    Aborted(String),
}

pub struct AdvanceAutomation {
    settings: AutomationSettings,
    contract: Arc<dyn GameContract>,
    market: Arc<dyn MarketData>,
    alerts: Arc<dyn AlertSink>,
    store: Arc<dyn KeyValueStore>,
    rng: Mutex<StdRng>,
}

impl AdvanceAutomation {
    pub fn new(
        settings: AutomationSettings,
        contract: Arc<dyn GameContract>,
        market: Arc<dyn MarketData>,
        alerts: Arc<dyn AlertSink>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            settings,
            contract,
            market,
            alerts,
            store,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Wire an automation from loaded configuration. Alerts go to the
    /// configured relay, or only to the log when none is set.
    pub fn from_config(
        config: &AutomationConfig,
        network: impl Into<String>,
        contract: Arc<dyn GameContract>,
        market: Arc<dyn MarketData>,
        store: Arc<dyn KeyValueStore>,
    ) -> AutomationResult<Self> {
        let alerts: Arc<dyn AlertSink> = match &config.alert {
            Some(alert) => Arc::new(HttpAlertSink::new(alert, config.http_timeout)?),
            None => Arc::new(LogAlertSink),
        };
        Ok(Self::new(
            AutomationSettings::from_config(config, network),
            contract,
            market,
            alerts,
            store,
        ))
    }

    pub fn settings(&self) -> &AutomationSettings {
        &self.settings
    }

    /// Deterministic draws and tie-breaks
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    async fn alert(&self, message: &str) {
        let message = format!("{} on {}", message, self.settings.network);
        error!("{}", message);
        if let Err(e) = self.alerts.send(AlertLevel::Error, &message).await {
            error!("Failed to send error log: {}", e);
        }
    }

    async fn abort(&self, message: &str) -> RunOutcome {
        self.alert(message).await;
        RunOutcome::Aborted(message.to_string())
    }

    /// Run one invocation at `now_secs` (unix seconds).
    ///
    /// Only store failures surface as `Err`; everything else is reported
    /// through the alert sink and the returned outcome.
    pub async fn run(&self, now_secs: u64) -> AutomationResult<RunOutcome> {
        let guard = ExecutionGuard::new(self.store.as_ref(), self.settings.min_interval_secs);
        let minute = match guard.begin(now_secs).await? {
            GuardDecision::Proceed { minute } => minute,
            skipped => return Ok(RunOutcome::Skipped(skipped)),
        };

        let games = match self.contract.active_games().await {
            Ok(games) => games,
            Err(e) => {
                warn!("Failed to fetch active games: {}", e);
                return Ok(self.abort("Failed to fetch active games").await);
            }
        };
        debug!("{} active games", games.len());

        let new_game = if self.wants_new_game(&games) {
            self.draw_new_game().await
        } else {
            None
        };

        let symbols = merge_symbols(new_game.as_ref(), &games);
        if symbols.is_empty() && new_game.is_none() {
            info!("No coins found to update games");
            return Ok(RunOutcome::NothingToDo);
        }

        let mut quotes = if symbols.is_empty() {
            HashMap::new()
        } else {
            match self.market.quotes_by_symbols(&symbols).await {
                Ok(quotes) if !quotes.is_empty() => quotes,
                Ok(_) => return Ok(self.abort("Failed to fetch prices").await),
                Err(e) => {
                    warn!("Price fetch failed: {}", e);
                    return Ok(self.abort("Failed to fetch prices").await);
                }
            }
        };
        self.fill_missing_quotes(&games, &mut quotes).await;

        let results = {
            let mut rng = self.rng.lock();
            let mut advancer = RoundAdvancer::new(self.settings.width, RngFlip(&mut *rng));
            advancer.advance_all(&games, &quotes)
        };
        if results.len() < games.len() {
            info!("{} of {} games are not ready to advance", games.len() - results.len(), games.len());
        }

        let update = if results.is_empty() {
            None
        } else {
            match AdvanceBatch::from_results(self.settings.width, &results) {
                Ok(batch) => Some(batch),
                Err(e) => {
                    warn!("Failed to build advance batch: {}", e);
                    return Ok(self.abort("Failed to create update games calldata").await);
                }
            }
        };

        if new_game.is_none() && update.is_none() {
            info!("Nothing to submit");
            return Ok(RunOutcome::NothingToDo);
        }

        info!(
            "Submitting performGames at {} (new game: {}, advancing: {})",
            minute,
            new_game.is_some(),
            results.len()
        );
        match self
            .contract
            .perform_games(new_game.as_ref(), update.as_ref(), minute)
            .await
        {
            Ok(tx_hash) => {
                info!("Games successfully updated. TX: {}", tx_hash);
                guard.mark_executed(minute).await?;
                Ok(RunOutcome::Submitted {
                    tx_hash,
                    advanced: results.len(),
                    new_game: new_game.is_some(),
                })
            }
            Err(e) => {
                let reason = e.to_string();
                let short = reason.split(" [").next().unwrap_or(&reason);
                Ok(self.abort(&format!("Failed to perform games: {}", short)).await)
            }
        }
    }

    fn wants_new_game(&self, games: &[BracketGame]) -> bool {
        match self.settings.width {
            BracketWidth::Eight => true,
            BracketWidth::Sixteen => {
                let final_round = self.settings.width.final_round();
                games.iter().any(|g| g.round == final_round)
            }
        }
    }

    async fn draw_new_game(&self) -> Option<NewGamePayload> {
        let listing = match self.market.listings(self.settings.listing_limit).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Listing fetch failed: {}", e);
                self.alert("CoinMarketCap API call failed").await;
                return None;
            }
        };

        let drawn = {
            let mut rng = self.rng.lock();
            select_from_listing(&listing, self.settings.width.slots(), &mut *rng)
        };
        match drawn.and_then(|coins| NewGamePayload::from_coins(self.settings.width, &coins)) {
            Ok(payload) => {
                info!("Coins for a new game: {}", payload.active_symbols().collect::<Vec<_>>().join(","));
                Some(payload)
            }
            Err(e) => {
                warn!("Could not draw new game coins: {}", e);
                self.alert("Failed to select coins for a new game").await;
                None
            }
        }
    }

    /// Retry coins the bulk quote missed one by one; failures stay missing
    async fn fill_missing_quotes(&self, games: &[BracketGame], quotes: &mut HashMap<String, PriceQuote>) {
        let missing: Vec<String> = games
            .iter()
            .flat_map(|g| g.active_symbols())
            .filter(|s| !quotes.contains_key(*s))
            .map(str::to_string)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        for symbol in missing {
            warn!("Prices not found for coin {}, fetching individually", symbol);
            match self.market.quotes_by_symbols(std::slice::from_ref(&symbol)).await {
                Ok(mut single) => {
                    if let Some(quote) = single.remove(&symbol) {
                        quotes.insert(symbol, quote);
                    }
                }
                Err(e) => warn!("Individual price fetch for {} failed: {}", symbol, e),
            }
        }
    }
}

/// Ordered union of new-game symbols and symbols in play, without blanks
pub fn merge_symbols(new_game: Option<&NewGamePayload>, games: &[BracketGame]) -> Vec<String> {
    let mut seen = HashSet::new();
    new_game
        .into_iter()
        .flat_map(|payload| payload.active_symbols())
        .chain(games.iter().flat_map(|g| g.active_symbols()))
        .filter(|symbol| seen.insert(symbol.to_string()))
        .map(str::to_string)
        .collect()
}
