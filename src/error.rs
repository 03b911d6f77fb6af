//! Error types shared across the crate

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("PayPal Auth Error: {0}")]
    Auth(String),

    #[error("PayPal API Error: {0}")]
    PayPal(String),

    #[error("Discord API Error: {0}")]
    Discord(String),

    #[error("Config not loaded. Call load() first.")]
    StoreNotLoaded,

    #[error("{0}")]
    InvalidParameters(String),

    #[error("{0}")]
    ScpiNotFound(String),

    #[error("{0}")]
    InvestmentTypeNotSupported(String),
}

impl From<config::ConfigError> for BotError {
    fn from(e: config::ConfigError) -> Self {
        BotError::Config(e.to_string())
    }
}

impl BotError {
    /// Errors caused by simulation input rather than by the service itself
    pub fn is_calculation_error(&self) -> bool {
        matches!(
            self,
            BotError::InvalidParameters(_)
                | BotError::ScpiNotFound(_)
                | BotError::InvestmentTypeNotSupported(_)
        )
    }
}
