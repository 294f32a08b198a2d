//! CoinMarketCap REST adapter (listings + latest quotes)

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tracing::debug;

use super::{ListedCoin, MarketData};
use crate::bracket::PriceQuote;
use crate::error::{AutomationError, AutomationResult};

pub const CMC_BASE_URL: &str = "https://pro-api.coinmarketcap.com";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct CmcListing {
    id: u64,
    symbol: String,
    name: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct CmcQuoteEntry {
    id: u64,
    quote: CmcQuote,
}

#[derive(Debug, Deserialize)]
struct CmcQuote {
    #[serde(rename = "USD")]
    usd: Option<CmcUsd>,
}

#[derive(Debug, Deserialize)]
struct CmcUsd {
    price: Option<f64>,
    volume_change_24h: Option<f64>,
}

impl CmcQuoteEntry {
    fn into_quote(self) -> Option<PriceQuote> {
        let usd = self.quote.usd?;
        Some(PriceQuote {
            id: self.id,
            price: usd.price?,
            volume_change_24h: usd.volume_change_24h,
        })
    }
}

#[derive(Clone)]
pub struct CoinMarketCapClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl CoinMarketCapClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> AutomationResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AutomationError::Config("CoinMarketCap API key not set".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, api_key, base_url: CMC_BASE_URL.to_string() })
    }

    /// Point the client at another host (mock servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AutomationResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("X-CMC_PRO_API_KEY", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| AutomationError::Upstream(format!("CoinMarketCap request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AutomationError::Upstream(format!(
                "CoinMarketCap error: {} - {}",
                status, body
            )));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AutomationError::Upstream(format!("Failed to parse CoinMarketCap JSON: {}", e)))?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl MarketData for CoinMarketCapClient {
    async fn listings(&self, limit: u32) -> AutomationResult<Vec<ListedCoin>> {
        let listings: Vec<CmcListing> = self
            .get(
                "/v1/cryptocurrency/listings/latest",
                &[
                    ("start", "1".to_string()),
                    ("limit", limit.to_string()),
                    ("sort", "market_cap".to_string()),
                ],
            )
            .await?;

        if listings.is_empty() {
            return Err(AutomationError::Upstream("CoinMarketCap returned an empty listing".to_string()));
        }
        debug!("CoinMarketCap listing returned {} coins", listings.len());

        Ok(listings
            .into_iter()
            .map(|l| ListedCoin {
                id: l.id,
                symbol: l.symbol,
                name: l.name,
                tags: l.tags.unwrap_or_default().into_iter().collect::<BTreeSet<_>>(),
            })
            .collect())
    }

    async fn quotes_by_ids(&self, ids: &[u64]) -> AutomationResult<HashMap<u64, PriceQuote>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids.iter().map(u64::to_string).collect::<Vec<_>>().join(",");
        let data: HashMap<String, CmcQuoteEntry> = self
            .get(
                "/v1/cryptocurrency/quotes/latest",
                &[("convert", "USD".to_string()), ("id", joined)],
            )
            .await?;

        Ok(data
            .into_values()
            .filter_map(CmcQuoteEntry::into_quote)
            .map(|q| (q.id, q))
            .collect())
    }

    async fn quotes_by_symbols(
        &self,
        symbols: &[String],
    ) -> AutomationResult<HashMap<String, PriceQuote>> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }
        let data: HashMap<String, CmcQuoteEntry> = self
            .get(
                "/v1/cryptocurrency/quotes/latest",
                &[("convert", "USD".to_string()), ("symbol", symbols.join(","))],
            )
            .await?;

        Ok(data
            .into_iter()
            .filter_map(|(symbol, entry)| entry.into_quote().map(|q| (symbol, q)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_entry_parsing() {
        let raw = r#"{
            "BTC": {"id": 1, "symbol": "BTC", "quote": {"USD": {"price": 64000.5, "volume_change_24h": -3.2}}},
            "ETH": {"id": 1027, "symbol": "ETH", "quote": {"USD": {"price": 3100.0}}},
            "XYZ": {"id": 9, "symbol": "XYZ", "quote": {}}
        }"#;
        let data: HashMap<String, CmcQuoteEntry> = serde_json::from_str(raw).unwrap();
        let quotes: HashMap<String, PriceQuote> = data
            .into_iter()
            .filter_map(|(s, e)| e.into_quote().map(|q| (s, q)))
            .collect();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes["BTC"].volume_change_24h, Some(-3.2));
        assert_eq!(quotes["ETH"].volume_change_24h, None);
        assert_eq!(quotes["ETH"].id, 1027);
    }

    #[test]
    fn test_empty_key_is_config_error() {
        let err = CoinMarketCapClient::new("", Duration::from_secs(1)).err().unwrap();
        assert!(err.is_fatal());
    }
}
