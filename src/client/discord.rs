//! Discord REST client
//!
//! Only the handful of endpoints the bot needs: identify, read channel
//! messages and post messages (plain, embed or reply).

use crate::error::{BotError, Result};
use crate::notify::{ChatSink, Embed};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Clone)]
pub struct DiscordClient {
    http: Client,
    api_base: String,
    bot_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub content: String,
    pub author: DiscordUser,
}

impl DiscordMessage {
    /// Snowflake as a number, for ordering
    pub fn snowflake(&self) -> u64 {
        self.id.parse().unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
struct CreateMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<&'a Embed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reference: Option<MessageReference<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

impl DiscordClient {
    pub fn new(api_base: &str, bot_token: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token: bot_token.to_string(),
        })
    }

    fn auth(&self) -> String {
        format!("Bot {}", self.bot_token)
    }

    /// Turn non-success statuses into errors, waiting out rate limits first
    async fn check(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            if let Ok(limit) = serde_json::from_str::<RateLimited>(&body) {
                tracing::warn!("Discord rate limited, retrying after {:.1}s", limit.retry_after);
                tokio::time::sleep(Duration::from_secs_f64(limit.retry_after.max(0.0))).await;
            }
        }

        Err(BotError::Discord(format!("{}: {}", status, body)))
    }

    /// Identify the bot account (doubles as a login check)
    pub async fn current_user(&self) -> Result<DiscordUser> {
        let url = format!("{}/users/@me", self.api_base);
        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth())
            .send()
            .await?;

        Ok(self.check(response).await?.json().await?)
    }

    /// Messages newer than `after`, oldest first
    pub async fn fetch_messages(
        &self,
        channel_id: &str,
        after: Option<&str>,
        limit: u8,
    ) -> Result<Vec<DiscordMessage>> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let mut query = vec![("limit", limit.to_string())];
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let response = self
            .http
            .get(&url)
            .header("Authorization", self.auth())
            .query(&query)
            .send()
            .await?;

        let mut messages: Vec<DiscordMessage> = self.check(response).await?.json().await?;
        messages.sort_by_key(DiscordMessage::snowflake);
        Ok(messages)
    }

    pub async fn latest_message_id(&self, channel_id: &str) -> Result<Option<String>> {
        let messages = self.fetch_messages(channel_id, None, 1).await?;
        Ok(messages.last().map(|m| m.id.clone()))
    }

    async fn create_message(&self, channel_id: &str, payload: &CreateMessage<'_>) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);
        let response = self
            .http
            .post(&url)
            .header("Authorization", self.auth())
            .json(payload)
            .send()
            .await?;

        self.check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatSink for DiscordClient {
    async fn send_text(&self, channel_id: &str, content: &str) -> Result<()> {
        let payload = CreateMessage {
            content: Some(content),
            embeds: Vec::new(),
            message_reference: None,
        };
        self.create_message(channel_id, &payload).await
    }

    async fn send_embed(&self, channel_id: &str, embed: &Embed) -> Result<()> {
        let payload = CreateMessage {
            content: None,
            embeds: vec![embed],
            message_reference: None,
        };
        self.create_message(channel_id, &payload).await
    }

    async fn reply(&self, channel_id: &str, message_id: &str, content: &str) -> Result<()> {
        let payload = CreateMessage {
            content: Some(content),
            embeds: Vec::new(),
            message_reference: Some(MessageReference { message_id }),
        };
        self.create_message(channel_id, &payload).await
    }
}
