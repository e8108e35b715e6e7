use std::{sync::Arc, time::Duration};

use counter_core::{CounterConfig, CounterEngine, StorageAuditSink, INCREMENT_AUDIT_MESSAGE};
use shared::domain::CounterAction;
use storage::Storage;

async fn wait_for_log_len(storage: &Storage, expected: i64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if storage.count_log_len().await.expect("len") >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("audit entries should land");
}

#[tokio::test]
async fn increments_land_in_sqlite_log_and_clear_resets_counter() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("audit").join("counter.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let storage = Storage::new(&database_url).await.expect("db");

    let engine = CounterEngine::with_audit_sink(
        CounterConfig {
            reset_delay: Duration::from_millis(50),
            ..CounterConfig::default()
        },
        Arc::new(StorageAuditSink::new(storage.clone())),
    )
    .expect("engine");
    let mut states = engine.subscribe();

    for _ in 0..3 {
        engine.submit(CounterAction::Increment);
    }
    engine.submit(CounterAction::Decrement);
    assert_eq!(engine.state().count, 2);

    engine.submit(CounterAction::Clear);
    assert!(states.borrow_and_update().is_clear_pending);

    tokio::time::timeout(Duration::from_secs(5), states.changed())
        .await
        .expect("reset within timeout")
        .expect("engine alive");
    let state = states.borrow_and_update().clone();
    assert_eq!(state.count, 0);
    assert!(!state.is_clear_pending);

    wait_for_log_len(&storage, 3).await;
    let logs = storage.list_count_logs().await.expect("list");
    assert_eq!(logs.len(), 3);
    assert!(logs
        .iter()
        .all(|log| log.message == INCREMENT_AUDIT_MESSAGE));
}

#[tokio::test]
async fn closed_audit_store_does_not_disturb_counter() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let engine = CounterEngine::with_audit_sink(
        CounterConfig::default(),
        Arc::new(StorageAuditSink::new(storage.clone())),
    )
    .expect("engine");
    storage.pool().close().await;

    for _ in 0..12 {
        engine.submit(CounterAction::Increment);
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let state = engine.state();
    assert_eq!(state.count, 10);
    assert!(!state.is_increment_enabled);
}
