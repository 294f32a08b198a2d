//! Alert channel for operational failures

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, warn};

use crate::config::AlertConfig;
use crate::error::{AutomationError, AutomationResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub message: String,
    pub level: AlertLevel,
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, level: AlertLevel, message: &str) -> AutomationResult<()>;
}

/// Posts `{message, level}` to a log relay authenticated by `X-API-Key`
pub struct HttpAlertSink {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpAlertSink {
    pub fn new(config: &AlertConfig, timeout: Duration) -> AutomationResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    async fn send(&self, level: AlertLevel, message: &str) -> AutomationResult<()> {
        let payload = AlertPayload { message: message.to_string(), level };
        let response = self
            .client
            .post(&self.url)
            .header("X-API-Key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| AutomationError::Alert(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AutomationError::Alert(format!("relay answered {}", response.status())));
        }
        Ok(())
    }
}

/// Alert sink that only writes to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, level: AlertLevel, message: &str) -> AutomationResult<()> {
        match level {
            AlertLevel::Error | AlertLevel::Fatal => error!("ALERT: {}", message),
            _ => warn!("ALERT: {}", message),
        }
        Ok(())
    }
}
