//! PayPal REST client
//!
//! Authenticates with the OAuth2 client-credentials flow and reads the
//! reporting balances endpoint.

use super::BalanceSource;
use crate::config::PayPalConfig;
use crate::error::{BotError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before the provider says they expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

pub struct PayPalClient {
    http: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BalancesResponse {
    #[serde(default)]
    pub balances: Vec<BalanceEntry>,
}

#[derive(Debug, Deserialize)]
pub struct BalanceEntry {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub primary: bool,
    pub total_balance: Money,
}

#[derive(Debug, Deserialize)]
pub struct Money {
    #[serde(default)]
    pub currency_code: Option<String>,
    pub value: String,
}

impl BalancesResponse {
    /// Primary balance, or the first one listed when none is flagged
    pub fn primary_balance(&self) -> Result<Decimal> {
        let entry = self
            .balances
            .iter()
            .find(|b| b.primary)
            .or_else(|| self.balances.first())
            .ok_or_else(|| BotError::PayPal("No balance information found".into()))?;

        entry
            .total_balance
            .value
            .trim()
            .parse()
            .map_err(|e| BotError::PayPal(format!("Invalid balance value: {}", e)))
    }
}

impl PayPalClient {
    pub fn new(config: &PayPalConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    fn basic_auth(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", STANDARD.encode(raw))
    }

    fn cached_token(&self) -> Option<String> {
        let guard = self.token.lock();
        guard
            .as_ref()
            .filter(|t| Instant::now() < t.expires_at)
            .map(|t| t.access_token.clone())
    }

    /// Get a bearer token, reusing the cached one while it is valid
    pub async fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let url = format!("{}/v1/oauth2/token", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("Accept-Language", "en_US")
            .header("Authorization", self.basic_auth())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("PayPal Auth Error Details: {}", body);
            let err: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let reason = err
                .error_description
                .or(err.error)
                .unwrap_or_else(|| status.to_string());
            return Err(BotError::Auth(reason));
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        tracing::info!("PayPal Authentication successful");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_BUFFER);
        *self.token.lock() = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }

    /// Current primary account balance
    pub async fn get_account_balance(&self) -> Result<Decimal> {
        tracing::debug!(
            base_url = %self.base_url,
            client_id_set = !self.client_id.is_empty(),
            client_secret_set = !self.client_secret.is_empty(),
            "Fetching PayPal balance"
        );

        let token = self.get_access_token().await?;

        let url = format!("{}/v1/reporting/balances", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("PayPal Balance Response ({}): {}", status, body);

        if !status.is_success() {
            tracing::error!("PayPal API Error Details: {}", body);
            let err: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(BotError::PayPal(
                err.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let balances: BalancesResponse = serde_json::from_str(&body)?;
        balances.primary_balance()
    }
}

#[async_trait]
impl BalanceSource for PayPalClient {
    async fn fetch_balance(&self) -> Result<Decimal> {
        self.get_account_balance().await
    }
}
