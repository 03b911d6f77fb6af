use super::*;
use crate::client::{DiscordUser, MockBalanceSource};
use crate::error::BotError;
use crate::notify::MockChatSink;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn message(author_id: &str, content: &str) -> DiscordMessage {
    DiscordMessage {
        id: "100".to_string(),
        channel_id: "chan".to_string(),
        content: content.to_string(),
        author: DiscordUser {
            id: author_id.to_string(),
            username: "tester".to_string(),
            bot: false,
        },
    }
}

async fn loaded_store(dir: &tempfile::TempDir) -> Arc<FundingStore> {
    let store = Arc::new(FundingStore::new(dir.path().join("config.json"), dec!(25.00)));
    store.load().await.unwrap();
    store
}

/// Channel history served by a local stand-in for the chat API
#[derive(Clone, Default)]
struct ChannelHistory {
    messages: Arc<parking_lot::Mutex<Vec<Value>>>,
}

impl ChannelHistory {
    fn post(&self, id: u64, content: &str, bot: bool) {
        self.messages.lock().push(json!({
            "id": id.to_string(),
            "channel_id": "chan",
            "content": content,
            "author": { "id": "1", "username": "tester", "bot": bot },
        }));
    }
}

fn snowflake_of(msg: &Value) -> u64 {
    msg["id"].as_str().and_then(|id| id.parse().ok()).unwrap_or(0)
}

// Answers newest first, like the real endpoint
async fn list_messages(
    State(history): State<ChannelHistory>,
    Path(_channel): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Vec<Value>> {
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(50);
    let after: Option<u64> = query.get("after").and_then(|a| a.parse().ok());

    let mut found: Vec<Value> = history
        .messages
        .lock()
        .iter()
        .filter(|m| after.map_or(true, |a| snowflake_of(m) > a))
        .cloned()
        .collect();
    found.sort_by_key(|m| std::cmp::Reverse(snowflake_of(m)));
    found.truncate(limit);
    Json(found)
}

async fn serve_history(history: ChannelHistory) -> String {
    let app = Router::new()
        .route("/channels/{channel}/messages", get(list_messages))
        .with_state(history);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn polling_bot(
    history: &ChannelHistory,
) -> (DiscordBot, mpsc::Receiver<IncomingCommand>) {
    let base = serve_history(history.clone()).await;
    let client = DiscordClient::new(&base, "token").unwrap();
    let (tx, rx) = mpsc::channel(16);
    let bot = DiscordBot::new(
        client,
        vec!["chan".to_string()],
        "!".to_string(),
        Duration::from_millis(10),
        tx,
    );
    (bot, rx)
}

async fn cursor_of(bot: &DiscordBot) -> Option<String> {
    bot.cursors.read().await.get("chan").cloned()
}

fn balance_of(amount: Decimal) -> MockBalanceSource {
    let mut balance = MockBalanceSource::new();
    balance.expect_fetch_balance().returning(move || Ok(amount));
    balance
}

#[test]
fn test_parse_known_commands() {
    assert_eq!(BotCommand::parse("!balance", "!"), Some(BotCommand::Balance));
    assert_eq!(BotCommand::parse("!PROGRESS", "!"), Some(BotCommand::Progress));
    assert_eq!(
        BotCommand::parse("!setcost   30.5 extra", "!"),
        Some(BotCommand::SetCost { amount: Some("30.5".to_string()) })
    );
    assert_eq!(
        BotCommand::parse("!setcost", "!"),
        Some(BotCommand::SetCost { amount: None })
    );
}

#[test]
fn test_parse_ignores_other_messages() {
    assert_eq!(BotCommand::parse("balance", "!"), None);
    assert_eq!(BotCommand::parse("!unknown", "!"), None);
    assert_eq!(BotCommand::parse("!", "!"), None);
    assert_eq!(BotCommand::parse("hello !balance", "!"), None);
}

#[test]
fn test_parse_custom_prefix() {
    assert_eq!(BotCommand::parse("fw!balance", "fw!"), Some(BotCommand::Balance));
    assert_eq!(BotCommand::parse("!balance", "fw!"), None);
}

#[test]
fn test_parse_cost() {
    assert_eq!(parse_cost("25.00"), Some(dec!(25.00)));
    assert_eq!(parse_cost(" 12 "), Some(dec!(12)));
    assert_eq!(parse_cost("0"), None);
    assert_eq!(parse_cost("-3"), None);
    assert_eq!(parse_cost("abc"), None);
}

#[test]
fn test_bot_messages_are_ignored() {
    let (tx, _rx) = mpsc::channel(1);
    let client = DiscordClient::new("http://localhost", "token").unwrap();
    let bot = DiscordBot::new(client, vec![], "!".to_string(), Duration::from_secs(1), tx);

    let mut msg = message("1", "!balance");
    assert_eq!(bot.accept(&msg), Some(BotCommand::Balance));

    msg.author.bot = true;
    assert_eq!(bot.accept(&msg), None);
}

#[tokio::test]
async fn test_balance_command_sends_embed() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_embed()
        .withf(|channel, embed| {
            channel == "chan"
                && embed.title.as_deref() == Some("💰 Statut des fonds")
                && embed.field_value("Nous avons") == Some("40.00€")
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(balance_of(dec!(40))),
        Arc::new(chat),
        store,
        None,
    );
    handler.handle(BotCommand::Balance, &message("1", "!balance")).await;
}

#[tokio::test]
async fn test_progress_command_fetch_failure_sends_generic_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut balance = MockBalanceSource::new();
    balance
        .expect_fetch_balance()
        .returning(|| Err(BotError::PayPal("Unknown error".into())));

    let mut chat = MockChatSink::new();
    chat.expect_send_text()
        .withf(|channel, text| channel == "chan" && text == MSG_GENERIC_ERROR)
        .times(1)
        .returning(|_, _| Ok(()));
    chat.expect_send_embed().never();

    let handler = CommandHandler::new(Arc::new(balance), Arc::new(chat), store, None);
    handler.handle(BotCommand::Progress, &message("1", "!progress")).await;
}

#[tokio::test]
async fn test_setcost_requires_admin() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_text()
        .withf(|_, text| text == MSG_NO_PERMISSION)
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(MockBalanceSource::new()),
        Arc::new(chat),
        store.clone(),
        Some("admin".to_string()),
    );
    let cmd = BotCommand::SetCost { amount: Some("40".to_string()) };
    handler.handle(cmd, &message("intruder", "!setcost 40")).await;

    assert_eq!(store.monthly_cost().await.unwrap(), dec!(25.00));
}

#[tokio::test]
async fn test_setcost_without_admin_configured_is_denied() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_text()
        .withf(|_, text| text == MSG_NO_PERMISSION)
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(MockBalanceSource::new()),
        Arc::new(chat),
        store,
        None,
    );
    let cmd = BotCommand::SetCost { amount: Some("40".to_string()) };
    handler.handle(cmd, &message("anyone", "!setcost 40")).await;
}

#[tokio::test]
async fn test_setcost_rejects_invalid_amount() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_text()
        .withf(|_, text| text == MSG_INVALID_AMOUNT)
        .times(2)
        .returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(MockBalanceSource::new()),
        Arc::new(chat),
        store,
        Some("admin".to_string()),
    );
    let msg = message("admin", "!setcost");
    handler.handle(BotCommand::SetCost { amount: None }, &msg).await;
    handler
        .handle(BotCommand::SetCost { amount: Some("-5".to_string()) }, &msg)
        .await;
}

#[tokio::test]
async fn test_setcost_updates_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_text()
        .withf(|_, text| text == "✅ Le coût mensuel du serveur a été défini à 32.50€")
        .times(1)
        .returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(MockBalanceSource::new()),
        Arc::new(chat),
        store.clone(),
        Some("admin".to_string()),
    );
    let cmd = BotCommand::SetCost { amount: Some("32.5".to_string()) };
    handler.handle(cmd, &message("admin", "!setcost 32.5")).await;

    assert_eq!(store.monthly_cost().await.unwrap(), dec!(32.5));
    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("32.5"));
}

#[tokio::test]
async fn test_send_failure_replies_with_command_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_embed()
        .returning(|_, _| Err(BotError::Discord("500".into())));
    chat.expect_reply()
        .withf(|channel, id, text| channel == "chan" && id == "100" && text == MSG_COMMAND_ERROR)
        .times(1)
        .returning(|_, _, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(balance_of(dec!(10))),
        Arc::new(chat),
        store,
        None,
    );
    handler.handle(BotCommand::Progress, &message("1", "!progress")).await;
}

#[tokio::test]
async fn test_run_drains_channel() {
    let dir = tempfile::tempdir().unwrap();
    let store = loaded_store(&dir).await;

    let mut chat = MockChatSink::new();
    chat.expect_send_embed().times(2).returning(|_, _| Ok(()));

    let handler = CommandHandler::new(
        Arc::new(balance_of(dec!(30))),
        Arc::new(chat),
        store,
        None,
    );

    let (tx, rx) = mpsc::channel(4);
    for command in [BotCommand::Balance, BotCommand::Progress] {
        tx.send(IncomingCommand { command, message: message("1", "") })
            .await
            .unwrap();
    }
    drop(tx);
    handler.run(rx).await;
}

#[tokio::test]
async fn test_first_poll_skips_existing_history() {
    let history = ChannelHistory::default();
    history.post(100, "!balance", false);
    history.post(101, "!progress", false);
    let (bot, mut rx) = polling_bot(&history).await;

    bot.poll_channel("chan").await.unwrap();

    assert_eq!(cursor_of(&bot).await.as_deref(), Some("101"));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_poll_forwards_new_commands_oldest_first() {
    let history = ChannelHistory::default();
    history.post(100, "!balance", false);
    let (bot, mut rx) = polling_bot(&history).await;
    bot.poll_channel("chan").await.unwrap();

    history.post(102, "!progress", false);
    history.post(103, "!balance", true);
    history.post(104, "hello", false);
    history.post(105, "!setcost 30", false);
    bot.poll_channel("chan").await.unwrap();

    let first = rx.try_recv().unwrap();
    assert_eq!(first.command, BotCommand::Progress);
    assert_eq!(first.message.id, "102");
    let second = rx.try_recv().unwrap();
    assert_eq!(
        second.command,
        BotCommand::SetCost { amount: Some("30".to_string()) }
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(cursor_of(&bot).await.as_deref(), Some("105"));

    // nothing new since the cursor
    bot.poll_channel("chan").await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_empty_channel_starts_from_zero() {
    let history = ChannelHistory::default();
    let (bot, mut rx) = polling_bot(&history).await;

    bot.poll_channel("chan").await.unwrap();
    assert_eq!(cursor_of(&bot).await.as_deref(), Some("0"));

    history.post(7, "!balance", false);
    bot.poll_channel("chan").await.unwrap();

    assert_eq!(rx.try_recv().unwrap().command, BotCommand::Balance);
    assert_eq!(cursor_of(&bot).await.as_deref(), Some("7"));
}

#[tokio::test]
async fn test_poll_survives_closed_handler() {
    let history = ChannelHistory::default();
    let (bot, rx) = polling_bot(&history).await;
    bot.poll_channel("chan").await.unwrap();
    drop(rx);

    history.post(200, "!balance", false);
    assert!(bot.poll_channel("chan").await.is_ok());
    assert_eq!(cursor_of(&bot).await.as_deref(), Some("200"));
}
