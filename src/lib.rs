//! Ace the Brackets - Off-chain Automation
//!
//! Oracle computations and webhook automation for the bracket prediction game.
//!
//! ## Architecture
//!
//! - **Bracket**: round advancement, fixed-point prices, on-chain payloads
//! - **Market**: coin listings, quotes, random draws, cross-source reconciliation
//! - **Oracle**: stateless computations returned to the oracle network
//! - **Automation**: guarded webhook invocation that submits round results

pub mod automation;
pub mod bracket;
pub mod config;
pub mod error;
pub mod market;
pub mod oracle;

// ============================================================================
// PUBLIC API
// ============================================================================

pub use bracket::{
    to_fixed_point, variation, AdvanceBatch, BracketGame, BracketWidth, CoinFlip, NewGamePayload,
    PriceLookup, PriceQuote, RngFlip, RoundAdvancer, RoundResult,
};

pub use market::{
    random_indexes, reconcile_coins, select_unique_coins, Coin, CoinGeckoClient,
    CoinMarketCapClient, FallbackPriceSource, ListedCoin, MarketData, ReconciledCoin, Reconciler,
    Reconciliation, SecondaryCoin, SecondaryMarket,
};

pub use automation::{
    AdvanceAutomation, AlertSink, AutomationSettings, GameContract, GuardDecision, KeyValueStore,
    MemoryStore, RunOutcome,
};

pub use config::AutomationConfig;
pub use error::{AutomationError, AutomationResult};
