//! CoinGecko REST adapter (market pages + simple prices)

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{SecondaryCoin, SecondaryMarket};
use crate::error::{AutomationError, AutomationResult};

pub const GECKO_PUBLIC_URL: &str = "https://api.coingecko.com/api/v3";
pub const GECKO_PRO_URL: &str = "https://pro-api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct GeckoMarket {
    id: String,
    symbol: String,
    name: String,
}

#[derive(Clone)]
pub struct CoinGeckoClient {
    client: Client,
    api_key: Option<String>,
    pro: bool,
    base_url: String,
}

impl CoinGeckoClient {
    /// Public (demo key optional) or pro host (key required)
    pub fn new(api_key: Option<String>, pro: bool, timeout: Duration) -> AutomationResult<Self> {
        if pro && api_key.is_none() {
            return Err(AutomationError::Config("CoinGecko pro host needs an API key".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = if pro { GECKO_PRO_URL } else { GECKO_PUBLIC_URL };
        Ok(Self { client, api_key, pro, base_url: base_url.to_string() })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, mut query: Vec<(&str, String)>) -> AutomationResult<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        match (&self.api_key, self.pro) {
            (Some(key), true) => request = request.header("x-cg-pro-api-key", key),
            (Some(key), false) => query.push(("x_cg_demo_api_key", key.clone())),
            (None, _) => {}
        }

        let response = request
            .query(&query)
            .send()
            .await
            .map_err(|e| AutomationError::Upstream(format!("CoinGecko request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AutomationError::Upstream(format!("CoinGecko error: {} - {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AutomationError::Upstream(format!("Failed to parse CoinGecko JSON: {}", e)))
    }
}

#[async_trait]
impl SecondaryMarket for CoinGeckoClient {
    async fn markets(&self, per_page: u32, page: u32) -> AutomationResult<Vec<SecondaryCoin>> {
        let markets: Vec<GeckoMarket> = self
            .get(
                "/coins/markets",
                vec![
                    ("vs_currency", "usd".to_string()),
                    ("order", "market_cap_desc".to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                    ("sparkline", "false".to_string()),
                ],
            )
            .await?;

        Ok(markets
            .into_iter()
            .map(|m| SecondaryCoin { id: m.id, symbol: m.symbol, name: m.name })
            .collect())
    }

    async fn simple_prices(&self, ids: &[String]) -> AutomationResult<HashMap<String, f64>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let data: HashMap<String, HashMap<String, f64>> = self
            .get(
                "/simple/price",
                vec![("ids", ids.join(",")), ("vs_currencies", "usd".to_string())],
            )
            .await?;

        Ok(data
            .into_iter()
            .filter_map(|(id, prices)| prices.get("usd").map(|usd| (id, *usd)))
            .collect())
    }
}
