//! Configuration loading
//!
//! Settings come from a TOML file layered with `FUNDWATCH__SECTION__KEY`
//! environment variables. Plain variable names from existing bot
//! deployments (`DISCORD_BOT_TOKEN`, `PAYPAL_CLIENT_ID`, `PORT`, ...) are
//! honoured as overrides so existing `.env` files keep working.

use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub paypal: PayPalConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// (legacy variable, config key) pairs applied on top of file and prefixed env
const LEGACY_ENV: &[(&str, &str)] = &[
    ("DISCORD_BOT_TOKEN", "discord.bot_token"),
    ("BOT_PREFIX", "discord.prefix"),
    ("ADMIN_USER_ID", "discord.admin_user_id"),
    ("NOTIFICATION_CHANNEL_ID", "discord.notification_channel_id"),
    ("PAYPAL_CLIENT_ID", "paypal.client_id"),
    ("PAYPAL_CLIENT_SECRET", "paypal.client_secret"),
    ("PAYPAL_MODE", "paypal.mode"),
    ("PORT", "health.port"),
    ("BACKEND_CORS_ORIGINS", "simulator.cors_origins"),
    ("ENVIRONMENT", "simulator.environment"),
];

impl Config {
    /// Load configuration from `path` (optional) plus environment
    pub fn load(path: &str) -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("FUNDWATCH")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("discord.command_channel_ids"),
            );

        for (var, key) in LEGACY_ENV {
            let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
            builder = builder.set_override_option(*key, value)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordConfig {
    #[serde(default)]
    pub bot_token: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub admin_user_id: Option<String>,
    #[serde(default)]
    pub notification_channel_id: Option<String>,
    /// Channels polled for commands; empty means the notification channel
    #[serde(default)]
    pub command_channel_ids: Vec<String>,
    #[serde(default = "default_discord_api")]
    pub api_base: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            prefix: default_prefix(),
            admin_user_id: None,
            notification_channel_id: None,
            command_channel_ids: Vec::new(),
            api_base: default_discord_api(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl DiscordConfig {
    pub fn command_channels(&self) -> Vec<String> {
        if !self.command_channel_ids.is_empty() {
            return self.command_channel_ids.clone();
        }
        self.notification_channel_id.iter().cloned().collect()
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_discord_api() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PayPalMode {
    #[default]
    Sandbox,
    Live,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayPalConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub mode: PayPalMode,
    #[serde(default)]
    pub base_url_override: Option<String>,
}

impl PayPalConfig {
    pub fn base_url(&self) -> String {
        if let Some(url) = &self.base_url_override {
            return url.trim_end_matches('/').to_string();
        }
        match self.mode {
            PayPalMode::Live => "https://api.paypal.com".to_string(),
            PayPalMode::Sandbox => "https://api.sandbox.paypal.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Fraction of the monthly cost below which an alert is sent
    #[serde(default = "default_low_balance_threshold")]
    pub low_balance_threshold: Decimal,
    #[serde(default = "default_alert_cooldown_hours")]
    pub alert_cooldown_hours: i64,
    #[serde(default = "default_alert_history")]
    pub alert_history: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: default_check_interval(),
            low_balance_threshold: default_low_balance_threshold(),
            alert_cooldown_hours: default_alert_cooldown_hours(),
            alert_history: default_alert_history(),
        }
    }
}

fn default_check_interval() -> u64 {
    3600
}

fn default_low_balance_threshold() -> Decimal {
    dec!(0.8)
}

fn default_alert_cooldown_hours() -> i64 {
    24
}

fn default_alert_history() -> usize {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_monthly_cost")]
    pub default_monthly_cost: Decimal,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            default_monthly_cost: default_monthly_cost(),
        }
    }
}

impl StorageConfig {
    /// Store path with `~` and env vars expanded
    pub fn resolved_path(&self) -> PathBuf {
        let expanded = shellexpand::full(&self.path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| self.path.clone());
        PathBuf::from(expanded)
    }
}

fn default_storage_path() -> String {
    "data/config.json".to_string()
}

fn default_monthly_cost() -> Decimal {
    dec!(25.00)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_health_port")]
    pub port: u16,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_health_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_health_port() -> u16 {
    10000
}

/// Parameters of one SCPI product
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScpiParams {
    pub price_per_share: f64,
    pub min_investment: f64,
    pub annual_yield: f64,
    pub capital_appreciation: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_simulator_port")]
    pub port: u16,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_environment")]
    pub environment: String,
    /// Comma separated list of allowed origins
    #[serde(default)]
    pub cors_origins: String,
    #[serde(default = "default_comete")]
    pub comete: ScpiParams,
    #[serde(default = "default_activimmo")]
    pub activimmo: ScpiParams,
    #[serde(default = "default_min_duration")]
    pub min_duration: u32,
    #[serde(default = "default_max_duration_full")]
    pub max_duration_full: u32,
    #[serde(default = "default_max_duration_bare")]
    pub max_duration_bare: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_simulator_port(),
            api_prefix: default_api_prefix(),
            environment: default_environment(),
            cors_origins: String::new(),
            comete: default_comete(),
            activimmo: default_activimmo(),
            min_duration: default_min_duration(),
            max_duration_full: default_max_duration_full(),
            max_duration_bare: default_max_duration_bare(),
        }
    }
}

const DEV_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

impl SimulatorConfig {
    /// `api_prefix` as `/segment[/segment...]`, or empty when the API sits at the root
    pub fn api_mount(&self) -> String {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }

    pub fn cors_origins(&self) -> Vec<String> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() && self.environment == "development" {
            return DEV_ORIGINS.iter().map(|o| o.to_string()).collect();
        }
        origins
    }
}

fn default_simulator_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_comete() -> ScpiParams {
    ScpiParams {
        price_per_share: 250.0,
        min_investment: 5000.0,
        annual_yield: 0.045,
        capital_appreciation: 0.025,
    }
}

fn default_activimmo() -> ScpiParams {
    ScpiParams {
        price_per_share: 610.0,
        min_investment: 6100.0,
        annual_yield: 0.055,
        capital_appreciation: 0.03,
    }
}

fn default_min_duration() -> u32 {
    1
}

fn default_max_duration_full() -> u32 {
    20
}

fn default_max_duration_bare() -> u32 {
    12
}
