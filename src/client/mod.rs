//! REST clients for the payment provider and the chat service

pub mod discord;
pub mod paypal;

pub use discord::{DiscordClient, DiscordMessage, DiscordUser};
pub use paypal::PayPalClient;

use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Anything that can report the current account balance
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn fetch_balance(&self) -> Result<Decimal>;
}
