//! Random draws used to seed new brackets.

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::{Coin, ListedCoin};
use crate::error::{AutomationError, AutomationResult};

/// Pick `n` distinct, non-stablecoin coins uniformly at random.
///
/// Duplicates are collapsed by id (first occurrence wins) before the draw.
/// Uses a partial Fisher-Yates over a sparse swap map, so only `n` slots are
/// touched no matter how long the listing is.
pub fn select_unique_coins<R: Rng + ?Sized>(
    coins: &[Coin],
    n: usize,
    rng: &mut R,
) -> AutomationResult<Vec<Coin>> {
    let mut seen = HashSet::new();
    let eligible: Vec<&Coin> = coins
        .iter()
        .filter(|coin| seen.insert(coin.id))
        .filter(|coin| !coin.is_stablecoin())
        .collect();

    if n > eligible.len() {
        return Err(AutomationError::OutOfRange(format!(
            "more elements taken than available: {} requested, {} eligible",
            n,
            eligible.len()
        )));
    }

    let mut swapped: HashMap<usize, usize> = HashMap::with_capacity(n);
    let mut remaining = eligible.len();
    let mut picked = Vec::with_capacity(n);
    for _ in 0..n {
        let x = rng.gen_range(0..remaining);
        let index = *swapped.get(&x).unwrap_or(&x);
        picked.push(eligible[index].clone());

        remaining -= 1;
        let last = *swapped.get(&remaining).unwrap_or(&remaining);
        swapped.insert(x, last);
    }
    Ok(picked)
}

/// Same draw over a ranked listing
pub fn select_from_listing<R: Rng + ?Sized>(
    listing: &[ListedCoin],
    n: usize,
    rng: &mut R,
) -> AutomationResult<Vec<Coin>> {
    let coins: Vec<Coin> = listing.iter().map(Coin::from).collect();
    select_unique_coins(&coins, n, rng)
}

/// `size` distinct indexes from `0..universe` in random order
pub fn random_indexes<R: Rng + ?Sized>(
    size: usize,
    universe: usize,
    rng: &mut R,
) -> AutomationResult<Vec<usize>> {
    if size == 0 {
        return Err(AutomationError::InvalidArgument("size must be positive".to_string()));
    }
    if size > universe {
        return Err(AutomationError::OutOfRange(format!(
            "{} indexes requested from a universe of {}",
            size, universe
        )));
    }

    let mut numbers: Vec<usize> = (0..universe).collect();
    numbers.shuffle(rng);
    numbers.truncate(size);
    Ok(numbers)
}
