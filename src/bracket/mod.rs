//! Bracket Module - Round Advancement for Ace the Brackets
//!
//! A bracket is a single-elimination tournament over coins. Each round pairs
//! slot `i` with slot `i + 1`; the coin whose price moved up the most since
//! its entry price advances.
//!
//! ## Flow:
//! 1. The contract exposes a snapshot of each active game (`BracketGame`)
//! 2. Fresh quotes are fetched for every coin in play (`PriceQuote`)
//! 3. `RoundAdvancer` picks a winner per matchup and validates the shape
//! 4. Ready games are padded and packed into an `AdvanceBatch` for submission

pub mod advance;
pub mod payload;
pub mod price;

pub use advance::{CoinFlip, RngFlip, RoundAdvancer};
pub use payload::{AdvanceBatch, NewGamePayload};
pub use price::{from_fixed_point, to_fixed_point, variation, PRICE_SCALE};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Supported bracket sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BracketWidth {
    Eight,
    Sixteen,
}

impl BracketWidth {
    pub fn from_slots(slots: usize) -> Option<Self> {
        match slots {
            8 => Some(BracketWidth::Eight),
            16 => Some(BracketWidth::Sixteen),
            _ => None,
        }
    }

    /// Total coin slots in round 0
    pub fn slots(self) -> usize {
        match self {
            BracketWidth::Eight => 8,
            BracketWidth::Sixteen => 16,
        }
    }

    /// Matchups in round 0 (= width of the winners arrays)
    pub fn matchups(self) -> usize {
        self.slots() / 2
    }

    /// Round holding the final matchup (2 for 8 slots, 3 for 16)
    pub fn final_round(self) -> u8 {
        match self {
            BracketWidth::Eight => 2,
            BracketWidth::Sixteen => 3,
        }
    }

    /// Coins still competing in `round`; each round halves the field
    pub fn expected_coins(self, round: u8) -> usize {
        self.slots().checked_shr(round as u32).unwrap_or(0)
    }

    /// Games per advance batch on-chain
    pub fn batch_size(self) -> usize {
        match self {
            BracketWidth::Eight => 4,
            BracketWidth::Sixteen => 5,
        }
    }
}

/// Decoded on-chain snapshot of one game
///
/// `coins[i] == ""` marks an empty slot and always pairs with
/// `entry_prices[i] == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketGame {
    pub game_id: u64,
    pub round: u8,
    pub coins: Vec<String>,
    /// Fixed-point entry prices (scale 10^8), 0 = not recorded yet
    pub entry_prices: Vec<u64>,
}

impl BracketGame {
    pub fn new(game_id: u64, round: u8, coins: Vec<String>, entry_prices: Vec<u64>) -> Self {
        Self { game_id, round, coins, entry_prices }
    }

    /// Round 0 with no entry prices: nothing to compare yet, the run only
    /// records entry prices.
    pub fn is_fresh(&self) -> bool {
        self.round == 0 && self.entry_prices.first().copied().unwrap_or(0) == 0
    }

    pub fn active_symbols(&self) -> impl Iterator<Item = &str> {
        self.coins.iter().map(String::as_str).filter(|c| !c.trim().is_empty())
    }
}

/// Market quote for one coin, fetched fresh per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Provider coin id (reported as the matchup winner)
    pub id: u64,
    /// USD price
    pub price: f64,
    /// 24h trading volume change in percent, when the provider reports it
    pub volume_change_24h: Option<f64>,
}

/// Resolves quotes by coin symbol
pub trait PriceLookup {
    fn quote(&self, symbol: &str) -> Option<&PriceQuote>;
}

impl PriceLookup for HashMap<String, PriceQuote> {
    fn quote(&self, symbol: &str) -> Option<&PriceQuote> {
        self.get(symbol)
    }
}

/// Outcome of one round computation, ready for on-chain encoding once padded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub game_id: u64,
    pub coins: Vec<String>,
    /// Current fixed-point prices, positional with the game's slots
    pub prices: Vec<u64>,
    pub variations: Vec<f64>,
    /// Winning coin id per matchup (`winners[i / 2]`)
    pub winners: Vec<u64>,
    #[serde(rename = "pricesWinners")]
    pub prices_winners: Vec<u64>,
}

impl RoundResult {
    /// All-zero filler for unused game slots in a batch
    pub fn empty(width: BracketWidth) -> Self {
        Self {
            game_id: 0,
            coins: vec![String::new(); width.slots()],
            prices: vec![0; width.slots()],
            variations: vec![0.0; width.slots()],
            winners: vec![0; width.matchups()],
            prices_winners: vec![0; width.matchups()],
        }
    }

    /// Pad every sequence to the bracket's fixed width. Padding an already
    /// full-width result is a no-op.
    pub fn pad(&mut self, width: BracketWidth) {
        pad_to(&mut self.coins, width.slots(), String::new());
        pad_to(&mut self.prices, width.slots(), 0);
        pad_to(&mut self.variations, width.slots(), 0.0);
        pad_to(&mut self.winners, width.matchups(), 0);
        pad_to(&mut self.prices_winners, width.matchups(), 0);
    }

    pub fn padded(mut self, width: BracketWidth) -> Self {
        self.pad(width);
        self
    }
}

pub(crate) fn pad_to<T: Clone>(values: &mut Vec<T>, len: usize, fill: T) {
    if values.len() < len {
        values.resize(len, fill);
    }
}
