//! Round advancement: per-matchup winner selection and shape validation.
//!
//! Winner priority for a matchup `(i, i + 1)`:
//! 1. strictly higher price variation since entry
//! 2. on an exact tie, higher 24h volume change
//! 3. otherwise a fair coin flip (`CoinFlip`)

use rand::rngs::ThreadRng;
use rand::Rng;
use tracing::{debug, warn};

use super::price::{to_fixed_point, variation};
use super::{BracketGame, BracketWidth, PriceLookup, RoundResult};

/// Source of the 50/50 tie-break. `true` sends the first coin of the matchup through.
pub trait CoinFlip {
    fn flip(&mut self) -> bool;
}

impl<F: CoinFlip + ?Sized> CoinFlip for &mut F {
    fn flip(&mut self) -> bool {
        (**self).flip()
    }
}

/// `CoinFlip` backed by any `rand` generator
pub struct RngFlip<R: Rng>(pub R);

impl RngFlip<ThreadRng> {
    pub fn thread() -> Self {
        RngFlip(rand::thread_rng())
    }
}

impl<R: Rng> CoinFlip for RngFlip<R> {
    fn flip(&mut self) -> bool {
        self.0.gen_bool(0.5)
    }
}

/// Which side of a matchup advances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    First,
    Second,
}

/// One coin slot resolved against the price lookup
struct Contender {
    id: u64,
    price: u64,
    volume_change: Option<f64>,
    variation: Option<f64>,
}

impl Contender {
    fn resolve<P: PriceLookup + ?Sized>(game: &BracketGame, slot: usize, prices: &P) -> Self {
        let symbol = game.coins.get(slot).map(String::as_str).unwrap_or("");
        let entry = game.entry_prices.get(slot).copied().unwrap_or(0);
        let quote = if symbol.is_empty() { None } else { prices.quote(symbol) };

        let price = quote.map(|q| to_fixed_point(q.price)).unwrap_or(0);
        Self {
            id: quote.map(|q| q.id).unwrap_or(0),
            price,
            volume_change: quote.and_then(|q| q.volume_change_24h),
            variation: variation(entry, price),
        }
    }
}

pub struct RoundAdvancer<F: CoinFlip> {
    width: BracketWidth,
    flip: F,
}

impl<F: CoinFlip> RoundAdvancer<F> {
    pub fn new(width: BracketWidth, flip: F) -> Self {
        Self { width, flip }
    }

    pub fn width(&self) -> BracketWidth {
        self.width
    }

    /// Compute results for every game that is ready to advance.
    ///
    /// Games failing the shape check are left out; siblings are unaffected.
    pub fn advance_all<P: PriceLookup + ?Sized>(
        &mut self,
        games: &[BracketGame],
        prices: &P,
    ) -> Vec<RoundResult> {
        games
            .iter()
            .filter_map(|game| self.advance_game(game, prices))
            .collect()
    }

    /// Compute and validate one game; `None` means "not ready to advance".
    pub fn advance_game<P: PriceLookup + ?Sized>(
        &mut self,
        game: &BracketGame,
        prices: &P,
    ) -> Option<RoundResult> {
        if game.coins.len() > self.width.slots() {
            warn!(
                "Game {} has {} slots, expected at most {}",
                game.game_id,
                game.coins.len(),
                self.width.slots()
            );
            return None;
        }

        let result = self.compute_round(game, prices);
        if !self.is_ready(game, &result) {
            debug!("Game {} (round {}) is not ready to advance", game.game_id, game.round);
            return None;
        }
        Some(result.padded(self.width))
    }

    /// Raw round computation without shape validation, padded to full width.
    pub fn compute_round<P: PriceLookup + ?Sized>(
        &mut self,
        game: &BracketGame,
        prices: &P,
    ) -> RoundResult {
        let slots = game.coins.len().min(self.width.slots());
        let mut actual_prices = vec![0u64; slots];
        let mut variations = vec![0.0f64; slots];
        let mut winners = vec![0u64; self.width.matchups()];
        let mut prices_winners = vec![0u64; self.width.matchups()];

        for index in (0..slots).step_by(2) {
            if game.coins[index].trim().is_empty() {
                continue;
            }

            let first = Contender::resolve(game, index, prices);
            let second = Contender::resolve(game, index + 1, prices);

            actual_prices[index] = first.price;
            if index + 1 < slots {
                actual_prices[index + 1] = second.price;
            }

            if game.entry_prices.get(index).copied().unwrap_or(0) == 0 {
                continue;
            }

            variations[index] = first.variation.unwrap_or(0.0);
            if index + 1 < slots {
                variations[index + 1] = second.variation.unwrap_or(0.0);
            }

            let winner = match self.pick_winner(&first, &second) {
                Some(Side::First) => &first,
                Some(Side::Second) => &second,
                None => continue,
            };
            winners[index / 2] = winner.id;
            prices_winners[index / 2] = winner.price;
        }

        RoundResult {
            game_id: game.game_id,
            coins: game.active_symbols().map(str::to_string).collect(),
            prices: actual_prices,
            variations,
            winners,
            prices_winners,
        }
        .padded(self.width)
    }

    fn pick_winner(&mut self, first: &Contender, second: &Contender) -> Option<Side> {
        match (first.variation, second.variation) {
            (Some(a), Some(b)) if a > b => Some(Side::First),
            (Some(a), Some(b)) if b > a => Some(Side::Second),
            (Some(_), Some(_)) => Some(self.break_tie(first, second)),
            (Some(_), None) => Some(Side::First),
            (None, Some(_)) => Some(Side::Second),
            (None, None) => None,
        }
    }

    /// Equal defined volume changes go to the flip rather than defaulting to
    /// the second coin.
    fn break_tie(&mut self, first: &Contender, second: &Contender) -> Side {
        match (first.volume_change, second.volume_change) {
            (Some(a), Some(b)) if a > b => Side::First,
            (Some(a), Some(b)) if b > a => Side::Second,
            _ => {
                if self.flip.flip() {
                    Side::First
                } else {
                    Side::Second
                }
            }
        }
    }

    /// Shape check: slot, price and winner counts must match the round.
    fn is_ready(&self, game: &BracketGame, result: &RoundResult) -> bool {
        let expected = self.width.expected_coins(game.round);
        if expected < 2 {
            return false;
        }

        let coins = result.coins.iter().filter(|c| !c.is_empty()).count();
        if coins != expected {
            return false;
        }
        if game.is_fresh() {
            return true;
        }

        fn non_zero(values: &[u64]) -> usize {
            values.iter().filter(|v| **v != 0).count()
        }
        non_zero(&result.prices) == expected
            && non_zero(&result.winners) == expected / 2
            && non_zero(&result.prices_winners) == expected / 2
    }
}
