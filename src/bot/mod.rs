//! Chat bot for funding commands
//!
//! Supports `!balance`, `!progress` and `!setcost <amount>` (admin only).
//! Channels are polled over REST; recognised commands are forwarded to the
//! [`CommandHandler`] through a channel.

use crate::client::{BalanceSource, DiscordClient, DiscordMessage};
use crate::error::Result;
use crate::notify::{balance_embed, progress_embed, ChatSink};
use crate::storage::FundingStore;
use chrono::Local;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

#[cfg(test)]
mod tests;

const FETCH_LIMIT: u8 = 50;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub const MSG_GENERIC_ERROR: &str = "❌ Une erreur est survenue. Veuillez réessayer plus tard.";
pub const MSG_COMMAND_ERROR: &str =
    "❌ Une erreur est survenue lors de l'exécution de cette commande!";
pub const MSG_NO_PERMISSION: &str =
    "❌ Vous n'avez pas la permission d'utiliser cette commande.";
pub const MSG_INVALID_AMOUNT: &str =
    "❌ Veuillez fournir un montant valide. Exemple: `!setcost 25.00`";
pub const MSG_SAVE_ERROR: &str =
    "❌ Une erreur est survenue lors de la sauvegarde de la configuration.";

/// Commands understood by the bot
#[derive(Debug, Clone, PartialEq)]
pub enum BotCommand {
    /// Current balance and coverage
    Balance,
    /// Progress towards next month's bill
    Progress,
    /// Set the monthly server cost; argument is validated by the handler
    SetCost { amount: Option<String> },
}

impl BotCommand {
    /// Parse a message; `None` for non-commands and unknown names
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let rest = content.strip_prefix(prefix)?;
        let mut parts = rest.split_whitespace();
        let name = parts.next()?.to_lowercase();

        match name.as_str() {
            "balance" => Some(BotCommand::Balance),
            "progress" => Some(BotCommand::Progress),
            "setcost" => Some(BotCommand::SetCost {
                amount: parts.next().map(str::to_string),
            }),
            _ => None,
        }
    }
}

/// Strictly positive decimal amount
pub fn parse_cost(arg: &str) -> Option<Decimal> {
    let cost: Decimal = arg.trim().parse().ok()?;
    (cost > Decimal::ZERO).then_some(cost)
}

/// A command together with the message that carried it
#[derive(Debug, Clone)]
pub struct IncomingCommand {
    pub command: BotCommand,
    pub message: DiscordMessage,
}

/// Polls chat channels for commands
pub struct DiscordBot {
    client: DiscordClient,
    channels: Vec<String>,
    prefix: String,
    poll_interval: Duration,
    cursors: RwLock<HashMap<String, String>>,
    command_tx: mpsc::Sender<IncomingCommand>,
}

impl DiscordBot {
    pub fn new(
        client: DiscordClient,
        channels: Vec<String>,
        prefix: String,
        poll_interval: Duration,
        command_tx: mpsc::Sender<IncomingCommand>,
    ) -> Self {
        Self {
            client,
            channels,
            prefix,
            poll_interval,
            cursors: RwLock::new(HashMap::new()),
            command_tx,
        }
    }

    /// Command carried by `msg`, if any
    pub fn accept(&self, msg: &DiscordMessage) -> Option<BotCommand> {
        if msg.author.bot {
            return None;
        }
        BotCommand::parse(&msg.content, &self.prefix)
    }

    /// Start polling; never returns
    pub async fn start_polling(self: Arc<Self>) {
        tracing::info!(
            "Starting Discord command listener on {} channel(s)...",
            self.channels.len()
        );

        loop {
            let mut failed = false;
            for channel in &self.channels {
                if let Err(e) = self.poll_channel(channel).await {
                    tracing::error!("Failed to poll Discord channel {}: {}", channel, e);
                    failed = true;
                }
            }

            if failed {
                tokio::time::sleep(ERROR_BACKOFF).await;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_channel(&self, channel: &str) -> Result<()> {
        let cursor = self.cursors.read().await.get(channel).cloned();

        // First visit only records where the channel stands
        let Some(after) = cursor else {
            let latest = self
                .client
                .latest_message_id(channel)
                .await?
                .unwrap_or_else(|| "0".to_string());
            self.cursors.write().await.insert(channel.to_string(), latest);
            return Ok(());
        };

        let messages = self
            .client
            .fetch_messages(channel, Some(&after), FETCH_LIMIT)
            .await?;

        for msg in messages {
            self.cursors
                .write()
                .await
                .insert(channel.to_string(), msg.id.clone());

            if let Some(command) = self.accept(&msg) {
                tracing::info!("Received command {:?} from {}", command, msg.author.username);
                if let Err(e) = self
                    .command_tx
                    .send(IncomingCommand { command, message: msg })
                    .await
                {
                    tracing::warn!(
                        "Dropped command {:?}, handler is gone",
                        e.0.command
                    );
                }
            }
        }

        Ok(())
    }
}

/// Executes commands and answers in the originating channel
pub struct CommandHandler {
    balance: Arc<dyn BalanceSource>,
    chat: Arc<dyn ChatSink>,
    store: Arc<FundingStore>,
    admin_user_id: Option<String>,
}

impl CommandHandler {
    pub fn new(
        balance: Arc<dyn BalanceSource>,
        chat: Arc<dyn ChatSink>,
        store: Arc<FundingStore>,
        admin_user_id: Option<String>,
    ) -> Self {
        Self {
            balance,
            chat,
            store,
            admin_user_id,
        }
    }

    /// Drain the command channel until every sender is gone
    pub async fn run(&self, mut rx: mpsc::Receiver<IncomingCommand>) {
        while let Some(incoming) = rx.recv().await {
            self.handle(incoming.command, &incoming.message).await;
        }
    }

    pub async fn handle(&self, command: BotCommand, message: &DiscordMessage) {
        let result = match command {
            BotCommand::Balance => self.send_balance(&message.channel_id).await,
            BotCommand::Progress => self.send_progress(&message.channel_id).await,
            BotCommand::SetCost { amount } => self.set_cost(amount.as_deref(), message).await,
        };

        if let Err(e) = result {
            tracing::error!("Command execution error: {}", e);
            if let Err(e) = self
                .chat
                .reply(&message.channel_id, &message.id, MSG_COMMAND_ERROR)
                .await
            {
                tracing::error!("Failed to send error reply: {}", e);
            }
        }
    }

    async fn balance_and_cost(&self) -> Result<(Decimal, Decimal)> {
        let balance = self.balance.fetch_balance().await?;
        let cost = self.store.monthly_cost().await?;
        Ok((balance, cost))
    }

    async fn send_balance(&self, channel: &str) -> Result<()> {
        match self.balance_and_cost().await {
            Ok((balance, cost)) => {
                let embed = balance_embed(balance, cost, Local::now().date_naive());
                self.chat.send_embed(channel, &embed).await
            }
            Err(e) => {
                tracing::error!("Balance command error: {}", e);
                self.chat.send_text(channel, MSG_GENERIC_ERROR).await
            }
        }
    }

    async fn send_progress(&self, channel: &str) -> Result<()> {
        match self.balance_and_cost().await {
            Ok((balance, cost)) => {
                self.chat
                    .send_embed(channel, &progress_embed(balance, cost))
                    .await
            }
            Err(e) => {
                tracing::error!("Progress command error: {}", e);
                self.chat.send_text(channel, MSG_GENERIC_ERROR).await
            }
        }
    }

    async fn set_cost(&self, amount: Option<&str>, message: &DiscordMessage) -> Result<()> {
        let channel = &message.channel_id;

        if self.admin_user_id.as_deref() != Some(message.author.id.as_str()) {
            return self.chat.send_text(channel, MSG_NO_PERMISSION).await;
        }

        let Some(cost) = amount.and_then(parse_cost) else {
            return self.chat.send_text(channel, MSG_INVALID_AMOUNT).await;
        };

        match self.store.update(|s| s.monthly_server_cost = cost).await {
            Ok(_) => {
                tracing::info!("Monthly server cost set to {:.2}€", cost);
                let text = format!("✅ Le coût mensuel du serveur a été défini à {:.2}€", cost);
                self.chat.send_text(channel, &text).await
            }
            Err(e) => {
                tracing::error!("Set cost command error: {}", e);
                self.chat.send_text(channel, MSG_SAVE_ERROR).await
            }
        }
    }
}
