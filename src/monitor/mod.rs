//! Balance monitoring and alerting

pub mod health;

pub use health::{create_router, start_health_server, HealthState};


use crate::client::BalanceSource;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::notify::{low_balance_embed, ChatSink};
use crate::storage::FundingStore;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Result of one balance check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub balance: Decimal,
    pub monthly_cost: Decimal,
    /// Balance does not cover the monthly cost
    pub low: bool,
    /// An alert was due and has been recorded
    pub alert_recorded: bool,
    /// The recorded alert reached the notification channel
    pub alert_sent: bool,
}

impl CheckOutcome {
    pub fn status(&self) -> &'static str {
        if self.low {
            "LOW"
        } else {
            "OK"
        }
    }
}

/// True when the balance is under the threshold and the cooldown has passed
pub fn should_alert(
    balance: Decimal,
    monthly_cost: Decimal,
    threshold: Decimal,
    last_alert_ms: i64,
    now_ms: i64,
    cooldown_ms: i64,
) -> bool {
    balance < monthly_cost * threshold && now_ms - last_alert_ms > cooldown_ms
}

/// New alert history with `now_ms` first, at most `keep` entries
pub fn record_alert(history: &[i64], now_ms: i64, keep: usize) -> Vec<i64> {
    std::iter::once(now_ms)
        .chain(history.iter().copied())
        .take(keep.max(1))
        .collect()
}

/// Time until the next multiple of `interval_secs` since the epoch
pub fn next_tick_delay(now: DateTime<Utc>, interval_secs: u64) -> Duration {
    let interval_ms = interval_secs.max(1) as i64 * 1000;
    let now_ms = now.timestamp_millis();
    let next_ms = (now_ms.div_euclid(interval_ms) + 1) * interval_ms;
    Duration::from_millis((next_ms - now_ms) as u64)
}

pub struct BalanceMonitor {
    balance: Arc<dyn BalanceSource>,
    chat: Arc<dyn ChatSink>,
    store: Arc<FundingStore>,
    config: MonitorConfig,
    notification_channel: Option<String>,
    started: AtomicBool,
}

impl BalanceMonitor {
    pub fn new(
        balance: Arc<dyn BalanceSource>,
        chat: Arc<dyn ChatSink>,
        store: Arc<FundingStore>,
        config: MonitorConfig,
        notification_channel: Option<String>,
    ) -> Self {
        Self {
            balance,
            chat,
            store,
            config,
            notification_channel,
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the periodic check loop. Returns false if it is already running.
    pub fn start(self: &Arc<Self>) -> bool {
        if self.started.swap(true, Ordering::SeqCst) {
            return false;
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let delay = next_tick_delay(Utc::now(), monitor.config.check_interval_secs);
                tokio::time::sleep(delay).await;

                if let Err(e) = monitor.check_balance().await {
                    tracing::error!("Monitoring error: {}", e);
                }
            }
        });

        tracing::info!(
            "📊 Balance monitoring started (checks every {}s)",
            self.config.check_interval_secs
        );
        true
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Fetch the balance, record the check and alert when funds run low
    pub async fn check_balance(&self) -> Result<CheckOutcome> {
        let balance = match self.balance.fetch_balance().await {
            Ok(b) => b,
            Err(e) => {
                tracing::error!("Balance check failed: {}", e);
                return Err(e);
            }
        };

        let now = Utc::now();
        let state = self
            .store
            .update(|s| s.last_balance_check = Some(now))
            .await?;
        let monthly_cost = state.monthly_server_cost;

        let now_ms = now.timestamp_millis();
        let cooldown_ms = self.config.alert_cooldown_hours * 3_600_000;
        let alert_due = should_alert(
            balance,
            monthly_cost,
            self.config.low_balance_threshold,
            state.last_alert_ms(),
            now_ms,
            cooldown_ms,
        );

        // Recorded whether or not delivery worked: one attempt per cooldown
        let mut alert_sent = false;
        if alert_due {
            alert_sent = self.send_low_balance_alert(balance, monthly_cost).await;
            let keep = self.config.alert_history;
            self.store
                .update(|s| s.alerts_sent = record_alert(&s.alerts_sent, now_ms, keep))
                .await?;
        }

        let outcome = CheckOutcome {
            balance,
            monthly_cost,
            low: balance < monthly_cost,
            alert_recorded: alert_due,
            alert_sent,
        };
        tracing::info!("💰 Balance check: {:.2}€ ({})", balance, outcome.status());

        Ok(outcome)
    }

    /// Post the alert embed; false when nothing was delivered
    async fn send_low_balance_alert(&self, balance: Decimal, monthly_cost: Decimal) -> bool {
        let Some(channel) = &self.notification_channel else {
            tracing::warn!("No notification channel configured");
            return false;
        };

        match self
            .chat
            .send_embed(channel, &low_balance_embed(balance, monthly_cost))
            .await
        {
            Ok(()) => {
                tracing::info!("🚨 Low balance alert sent");
                true
            }
            Err(e) => {
                tracing::error!("Error sending low balance alert: {}", e);
                false
            }
        }
    }
}
