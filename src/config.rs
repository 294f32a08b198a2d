//! Runtime configuration loaded from environment variables.
//!
//! The binary calls `dotenv().ok()` first, so a local `.env` file works the
//! same as exported variables.

use std::time::Duration;

use crate::bracket::BracketWidth;
use crate::error::{AutomationError, AutomationResult};

const DEFAULT_LISTING_LIMIT: u32 = 150;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Minimum spacing between two advance attempts (8 minutes)
const DEFAULT_MIN_INTERVAL_SECS: u64 = 8 * 60;

/// Optional alert channel (Sentry-style relay)
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub url: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AutomationConfig {
    pub cmc_api_key: String,
    pub gecko_api_key: Option<String>,
    /// Use the CoinGecko pro host instead of the public one
    pub gecko_pro: bool,
    pub alert: Option<AlertConfig>,
    pub bracket_width: BracketWidth,
    /// How many ranked coins to pull when seeding a new bracket
    pub listing_limit: u32,
    pub http_timeout: Duration,
    pub min_interval_secs: u64,
}

impl AutomationConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AutomationResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup (tests pass a map here)
    pub fn from_lookup<F>(lookup: F) -> AutomationResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cmc_api_key = non_empty("CMC_API_KEY")
            .ok_or_else(|| AutomationError::Config("CMC_API_KEY not set".to_string()))?;

        let alert = match (non_empty("ALERT_URL"), non_empty("ALERT_API_KEY")) {
            (Some(url), Some(api_key)) => Some(AlertConfig { url, api_key }),
            (Some(_), None) => {
                return Err(AutomationError::Config(
                    "ALERT_URL set without ALERT_API_KEY".to_string(),
                ))
            }
            _ => None,
        };

        let bracket_width = match non_empty("BRACKET_WIDTH") {
            Some(raw) => {
                let slots: usize = raw.parse().map_err(|_| {
                    AutomationError::Config(format!("BRACKET_WIDTH is not a number: {}", raw))
                })?;
                BracketWidth::from_slots(slots).ok_or_else(|| {
                    AutomationError::Config(format!("BRACKET_WIDTH must be 8 or 16, got {}", slots))
                })?
            }
            None => BracketWidth::Eight,
        };

        Ok(Self {
            cmc_api_key,
            gecko_api_key: non_empty("COINGECKO_API_KEY"),
            gecko_pro: parse_bool(non_empty("COINGECKO_PRO").as_deref()),
            alert,
            bracket_width,
            listing_limit: parse_or(non_empty("LISTING_LIMIT"), "LISTING_LIMIT", DEFAULT_LISTING_LIMIT)?,
            http_timeout: Duration::from_secs(parse_or(
                non_empty("HTTP_TIMEOUT_SECS"),
                "HTTP_TIMEOUT_SECS",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            min_interval_secs: parse_or(
                non_empty("MIN_INTERVAL_SECS"),
                "MIN_INTERVAL_SECS",
                DEFAULT_MIN_INTERVAL_SECS,
            )?,
        })
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(), Some("1" | "true" | "yes"))
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> AutomationResult<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| AutomationError::Config(format!("{} is invalid: {}", key, value))),
        None => Ok(default),
    }
}
