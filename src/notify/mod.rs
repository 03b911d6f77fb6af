//! Outgoing chat notifications

pub mod embed;

pub use embed::{
    balance_embed, format_french_date, low_balance_embed, next_payment_date, progress_bar,
    progress_embed, Embed, EmbedField, EmbedFooter,
};

use crate::error::Result;
use async_trait::async_trait;

/// Destination for bot output
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<()>;

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<()>;

    /// Answer a specific message
    async fn reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()>;
}
