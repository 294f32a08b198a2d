//! On-chain payloads: the advance batch and the new-game seed.
//!
//! Encoding follows the Solidity ABI for the tuples the bracket contract
//! decodes:
//! - advance: `(uint256[B], bytes[B], bytes[B], bytes[B])` where each `bytes`
//!   row is itself an encoded `uint256[W]`
//! - new game: `(uint256[W], string[W])`

use serde::{Deserialize, Serialize};

use super::{pad_to, BracketWidth, RoundResult};
use crate::error::{AutomationError, AutomationResult};
use crate::market::Coin;

const WORD: usize = 32;

/// Games advanced in one submission, padded to the contract's batch size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvanceBatch {
    pub width: BracketWidth,
    pub game_ids: Vec<u64>,
    pub prices: Vec<Vec<u64>>,
    pub prices_winners: Vec<Vec<u64>>,
    pub winners: Vec<Vec<u64>>,
}

impl AdvanceBatch {
    pub fn from_results(width: BracketWidth, results: &[RoundResult]) -> AutomationResult<Self> {
        if results.len() > width.batch_size() {
            return Err(AutomationError::OutOfRange(format!(
                "{} games ready but a batch holds {}",
                results.len(),
                width.batch_size()
            )));
        }

        let filler = RoundResult::empty(width);
        let rows = results
            .iter()
            .cloned()
            .map(|r| r.padded(width))
            .chain(std::iter::repeat(filler).take(width.batch_size() - results.len()));

        let mut batch = Self {
            width,
            game_ids: Vec::with_capacity(width.batch_size()),
            prices: Vec::with_capacity(width.batch_size()),
            prices_winners: Vec::with_capacity(width.batch_size()),
            winners: Vec::with_capacity(width.batch_size()),
        };
        for row in rows {
            batch.game_ids.push(row.game_id);
            batch.prices.push(row.prices);
            // The contract reads winner rows with the same width as price rows
            let mut winners = row.winners;
            pad_to(&mut winners, width.slots(), 0);
            let mut prices_winners = row.prices_winners;
            pad_to(&mut prices_winners, width.slots(), 0);
            batch.winners.push(winners);
            batch.prices_winners.push(prices_winners);
        }
        Ok(batch)
    }

    /// Games in the batch that carry a real result
    pub fn active_games(&self) -> usize {
        self.game_ids.iter().filter(|id| **id != 0).count()
    }

    pub fn encode(&self) -> Vec<u8> {
        fn encode_rows(rows: &[Vec<u64>]) -> Vec<Vec<u8>> {
            rows.iter().map(|row| encode_uint_array(row)).collect()
        }

        let mut out = encode_uint_array(&self.game_ids);
        let tails = [
            encode_dynamic_array(&encode_rows(&self.prices)),
            encode_dynamic_array(&encode_rows(&self.prices_winners)),
            encode_dynamic_array(&encode_rows(&self.winners)),
        ];

        let head_len = out.len() + tails.len() * WORD;
        let mut offset = head_len;
        for tail in &tails {
            out.extend_from_slice(&word(offset as u64));
            offset += tail.len();
        }
        for tail in tails {
            out.extend(tail);
        }
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }
}

/// Coins picked to seed a new bracket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGamePayload {
    pub width: BracketWidth,
    pub coin_ids: Vec<u64>,
    pub symbols: Vec<String>,
}

impl NewGamePayload {
    pub fn from_coins(width: BracketWidth, coins: &[Coin]) -> AutomationResult<Self> {
        if coins.len() > width.slots() {
            return Err(AutomationError::OutOfRange(format!(
                "{} coins do not fit a {}-slot bracket",
                coins.len(),
                width.slots()
            )));
        }

        let mut coin_ids: Vec<u64> = coins.iter().map(|c| c.id).collect();
        let mut symbols: Vec<String> = coins.iter().map(|c| c.symbol.clone()).collect();
        pad_to(&mut coin_ids, width.slots(), 0);
        pad_to(&mut symbols, width.slots(), String::new());
        Ok(Self { width, coin_ids, symbols })
    }

    /// Symbols of the selected coins, skipping padding
    pub fn active_symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str).filter(|s| !s.is_empty())
    }

    /// Oracle wire form: `id,SYM;id,SYM;...`
    pub fn to_wire(&self) -> String {
        self.coin_ids
            .iter()
            .zip(&self.symbols)
            .filter(|(id, _)| **id != 0)
            .map(|(id, symbol)| format!("{},{}", id, symbol))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = encode_uint_array(&self.coin_ids);
        out.extend_from_slice(&word((out.len() + WORD) as u64));
        let strings: Vec<Vec<u8>> = self.symbols.iter().map(|s| s.as_bytes().to_vec()).collect();
        out.extend(encode_dynamic_array(&strings));
        out
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.encode()))
    }
}

/// Big-endian `uint256` word
fn word(value: u64) -> [u8; WORD] {
    let mut out = [0u8; WORD];
    out[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Static `uint256[N]`: N words inline
pub fn encode_uint_array(values: &[u64]) -> Vec<u8> {
    values.iter().flat_map(|v| word(*v)).collect()
}

/// Fixed-size array of `bytes`/`string`: offsets first, then length-prefixed
/// payloads padded to whole words
fn encode_dynamic_array(items: &[Vec<u8>]) -> Vec<u8> {
    let mut head = Vec::with_capacity(items.len() * WORD);
    let mut tail = Vec::new();
    for item in items {
        head.extend_from_slice(&word((items.len() * WORD + tail.len()) as u64));
        tail.extend_from_slice(&word(item.len() as u64));
        tail.extend_from_slice(item);
        let rem = item.len() % WORD;
        if rem != 0 {
            tail.resize(tail.len() + WORD - rem, 0);
        }
    }
    head.extend(tail);
    head
}
