//! Platform key-value store and the once-per-minute execution guard.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::info;

use crate::error::{AutomationError, AutomationResult};

/// Key holding the minute of the last attempt
pub const LAST_ATTEMPT_KEY: &str = "lastTimeStamp";
/// Key holding the minute of the last successful submission
pub const EXECUTED_KEY: &str = "executed";

/// Persistent store provided by the automation platform
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AutomationResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> AutomationResult<()>;

    async fn get_number(&self, key: &str) -> AutomationResult<Option<u64>> {
        match self.get(key).await? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| AutomationError::InvalidArgument(format!("{} is not a number: {}", key, raw))),
            None => Ok(None),
        }
    }

    async fn put_number(&self, key: &str, value: u64) -> AutomationResult<()> {
        self.put(key, value.to_string()).await
    }
}

/// In-process store (local runs and tests)
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> AutomationResult<Option<String>> {
        Ok(self.values.read().get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> AutomationResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}

/// Whether an invocation should do any work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed { minute: u64 },
    AlreadyExecuted { minute: u64 },
    TooRecent { last_attempt: u64, minute: u64 },
}

/// Truncate a unix timestamp to its minute
pub fn minute_of(now_secs: u64) -> u64 {
    now_secs / 60 * 60
}

pub struct ExecutionGuard<'a> {
    store: &'a dyn KeyValueStore,
    min_interval_secs: u64,
}

impl<'a> ExecutionGuard<'a> {
    pub fn new(store: &'a dyn KeyValueStore, min_interval_secs: u64) -> Self {
        Self { store, min_interval_secs }
    }

    /// Decide and, when proceeding, record the attempt.
    pub async fn begin(&self, now_secs: u64) -> AutomationResult<GuardDecision> {
        let minute = minute_of(now_secs);

        if self.store.get_number(EXECUTED_KEY).await? == Some(minute) {
            info!("Already executed at {}", minute);
            return Ok(GuardDecision::AlreadyExecuted { minute });
        }

        if let Some(last_attempt) = self.store.get_number(LAST_ATTEMPT_KEY).await? {
            if minute.saturating_sub(last_attempt) < self.min_interval_secs {
                info!("Last attempt at {} is too recent", last_attempt);
                return Ok(GuardDecision::TooRecent { last_attempt, minute });
            }
        }

        self.store.put_number(LAST_ATTEMPT_KEY, minute).await?;
        Ok(GuardDecision::Proceed { minute })
    }

    pub async fn mark_executed(&self, minute: u64) -> AutomationResult<()> {
        self.store.put_number(EXECUTED_KEY, minute).await
    }
}
