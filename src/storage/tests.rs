use super::*;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn store_in(dir: &tempfile::TempDir) -> FundingStore {
    FundingStore::new(dir.path().join("data").join("config.json"), dec!(25.00))
}

#[tokio::test]
async fn test_get_before_load_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert!(matches!(store.get().await, Err(BotError::StoreNotLoaded)));
}

#[tokio::test]
async fn test_load_creates_default_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);

    let state = store.load().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(25.00));
    assert!(state.last_balance_check.is_none());
    assert!(state.alerts_sent.is_empty());

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["monthlyServerCost"], serde_json::json!(25.0));
    assert!(json["lastBalanceCheck"].is_null());
    assert_eq!(json["alertsSent"], serde_json::json!([]));
}

#[tokio::test]
async fn test_load_merges_missing_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), r#"{"monthlyServerCost": 40.5}"#).unwrap();

    let state = store.load().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(40.5));
    assert!(state.alerts_sent.is_empty());
}

#[tokio::test]
async fn test_load_reads_legacy_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(
        store.path(),
        r#"{
  "monthlyServerCost": 30,
  "lastBalanceCheck": "2025-01-07T10:00:00.000Z",
  "alertsSent": [1736244000000, 1736157600000]
}"#,
    )
    .unwrap();

    let state = store.load().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(30));
    assert!(state.last_balance_check.is_some());
    assert_eq!(state.last_alert_ms(), 1736244000000);
}

#[tokio::test]
async fn test_corrupt_file_is_replaced_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "not json").unwrap();

    let state = store.load().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(25.00));

    let raw = std::fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("monthlyServerCost"));
}

#[tokio::test]
async fn test_update_persists_whole_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.load().await.unwrap();

    store
        .update(|s| {
            s.monthly_server_cost = dec!(32.50);
            s.alerts_sent = vec![42];
        })
        .await
        .unwrap();

    let reopened = store_in(&dir);
    let state = reopened.load().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(32.50));
    assert_eq!(state.alerts_sent, vec![42]);
    assert_eq!(reopened.monthly_cost().await.unwrap(), dec!(32.50));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_are_not_lost() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    store.load().await.unwrap();

    let tasks: Vec<_> = (0..50)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.update(|s| s.alerts_sent.push(i)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let mut alerts = store.get().await.unwrap().alerts_sent;
    alerts.sort_unstable();
    assert_eq!(alerts, (0..50).collect::<Vec<i64>>());

    let reopened = store_in(&dir);
    assert_eq!(reopened.load().await.unwrap().alerts_sent.len(), 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cost_change_survives_concurrent_check_update() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store_in(&dir));
    store.load().await.unwrap();

    let check = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .update(|s| s.last_balance_check = Some(chrono::Utc::now()))
                .await
        })
    };
    let set_cost = {
        let store = store.clone();
        tokio::spawn(async move { store.update(|s| s.monthly_server_cost = dec!(40)).await })
    };
    check.await.unwrap().unwrap();
    set_cost.await.unwrap().unwrap();

    let state = store.get().await.unwrap();
    assert_eq!(state.monthly_server_cost, dec!(40));
    assert!(state.last_balance_check.is_some());
}

#[test]
fn test_last_alert_defaults_to_zero() {
    let state = FundingState::with_cost(dec!(25));
    assert_eq!(state.last_alert_ms(), 0);
}
