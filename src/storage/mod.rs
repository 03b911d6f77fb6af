//! Flat-file persistence for the funding state
//!
//! A single JSON record is kept on disk and rewritten in full on every save.

use crate::error::{BotError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[cfg(test)]
mod tests;

/// Persisted funding record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingState {
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_server_cost: Decimal,
    pub last_balance_check: Option<DateTime<Utc>>,
    /// Epoch milliseconds of the last alerts, newest first
    pub alerts_sent: Vec<i64>,
}

impl FundingState {
    pub fn with_cost(monthly_server_cost: Decimal) -> Self {
        Self {
            monthly_server_cost,
            last_balance_check: None,
            alerts_sent: Vec::new(),
        }
    }

    /// Most recent alert timestamp, 0 when none was ever sent
    pub fn last_alert_ms(&self) -> i64 {
        self.alerts_sent.first().copied().unwrap_or(0)
    }
}

/// On-disk shape where every field may be missing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredState {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    monthly_server_cost: Option<Decimal>,
    #[serde(default)]
    last_balance_check: Option<DateTime<Utc>>,
    #[serde(default)]
    alerts_sent: Option<Vec<i64>>,
}

impl StoredState {
    fn merge_into(self, defaults: &FundingState) -> FundingState {
        FundingState {
            monthly_server_cost: self
                .monthly_server_cost
                .unwrap_or(defaults.monthly_server_cost),
            last_balance_check: self.last_balance_check.or(defaults.last_balance_check),
            alerts_sent: self
                .alerts_sent
                .unwrap_or_else(|| defaults.alerts_sent.clone()),
        }
    }
}

pub struct FundingStore {
    path: PathBuf,
    defaults: FundingState,
    current: RwLock<Option<FundingState>>,
}

impl FundingStore {
    pub fn new(path: impl Into<PathBuf>, default_monthly_cost: Decimal) -> Self {
        Self {
            path: path.into(),
            defaults: FundingState::with_cost(default_monthly_cost),
            current: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_data_directory(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        Ok(())
    }

    async fn read_from_disk(&self) -> Result<FundingState> {
        let data = tokio::fs::read_to_string(&self.path).await?;
        let stored: StoredState = serde_json::from_str(&data)?;
        Ok(stored.merge_into(&self.defaults))
    }

    /// Load the record, falling back to (and writing) defaults when the file
    /// is missing or unreadable
    pub async fn load(&self) -> Result<FundingState> {
        self.ensure_data_directory().await?;
        let mut current = self.current.write().await;

        let state = match self.read_from_disk().await {
            Ok(state) => {
                tracing::info!("Loaded funding state from {}", self.path.display());
                state
            }
            Err(e) => {
                tracing::info!("No existing config found ({}), creating default...", e);
                let state = self.defaults.clone();
                self.write_to_disk(&state).await?;
                state
            }
        };

        *current = Some(state.clone());
        Ok(state)
    }

    async fn write_to_disk(&self, state: &FundingState) -> Result<()> {
        let result = async {
            self.ensure_data_directory().await?;
            let content = serde_json::to_string_pretty(state)?;
            tokio::fs::write(&self.path, content).await?;
            Ok::<_, BotError>(())
        }
        .await;

        if let Err(e) = &result {
            tracing::error!("Error saving config: {}", e);
        }
        result
    }

    /// Overwrite the file with `state` and make it current
    pub async fn save(&self, state: &FundingState) -> Result<()> {
        let mut current = self.current.write().await;
        self.write_to_disk(state).await?;
        *current = Some(state.clone());
        Ok(())
    }

    pub async fn get(&self) -> Result<FundingState> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(BotError::StoreNotLoaded)
    }

    /// Read-modify-write of the current record. The write lock is held until
    /// the file is written, so concurrent updates apply one after another.
    pub async fn update<F>(&self, f: F) -> Result<FundingState>
    where
        F: FnOnce(&mut FundingState),
    {
        let mut current = self.current.write().await;
        let mut state = current.clone().ok_or(BotError::StoreNotLoaded)?;
        f(&mut state);
        self.write_to_disk(&state).await?;
        *current = Some(state.clone());
        Ok(state)
    }

    pub async fn monthly_cost(&self) -> Result<Decimal> {
        Ok(self.get().await?.monthly_server_cost)
    }
}
