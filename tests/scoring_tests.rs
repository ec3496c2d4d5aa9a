/// Score updates: counter increments, persistence, and concurrent safety
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use wildcard_engine::{
    MemoryStorage, Outcome, ScoreUpdater, StorageError, ValueSetStore, WildcardStorage,
};

fn store_with(units: &[(&str, &str)]) -> (Arc<ValueSetStore>, MemoryStorage) {
    let storage = MemoryStorage::new();
    for (name, contents) in units {
        storage.add(*name, *contents);
    }
    let store = Arc::new(ValueSetStore::new(Arc::new(storage.clone())));
    (store, storage)
}

fn chosen(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_success_increments_and_recomputes_average() {
    let (store, storage) = store_with(&[(
        "colors",
        r#"[{"value": "red", "success": 2, "blocked": 1}]"#,
    )]);
    let updater = ScoreUpdater::new(store.clone());

    let all_saved = updater
        .update_scores(&chosen(&[("[colors]", "red")]), Outcome::Success)
        .await;
    assert!(all_saved);

    let entries = store.load("colors").await;
    assert_eq!(entries[0].success, 3);
    assert_eq!(entries[0].blocked, 1);
    assert_eq!(entries[0].average, 2);

    // The touched set was persisted back to storage.
    let written = storage.get("colors").unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
    assert_eq!(records[0]["success"], 3);
    assert_eq!(records[0]["average"], 2);
}

#[tokio::test]
async fn test_blocked_increments() {
    let (store, _) = store_with(&[("colors", r#"[{"value": "red"}]"#)]);
    let updater = ScoreUpdater::new(store.clone());

    updater
        .update_scores(&chosen(&[("[colors]", "red")]), Outcome::Blocked)
        .await;

    let entries = store.load("colors").await;
    assert_eq!(entries[0].blocked, 1);
    assert_eq!(entries[0].average, -1);
}

#[tokio::test]
async fn test_braced_token_text_also_updates() {
    let (store, _) = store_with(&[("colors", r#"[{"value": "red"}]"#)]);
    let updater = ScoreUpdater::new(store.clone());

    updater
        .update_scores(&chosen(&[("{colors}", "red")]), Outcome::Success)
        .await;

    let entries = store.load("colors").await;
    assert_eq!(entries[0].success, 1);
}

#[tokio::test]
async fn test_unmatched_value_leaves_entries_untouched() {
    let (store, storage) = store_with(&[("colors", r#"[{"value": "red"}]"#)]);
    let updater = ScoreUpdater::new(store.clone());

    let all_saved = updater
        .update_scores(&chosen(&[("[colors]", "crimson")]), Outcome::Success)
        .await;
    assert!(all_saved);

    let entries = store.load("colors").await;
    assert_eq!(entries[0].success, 0);
    assert_eq!(entries[0].blocked, 0);

    // Nothing was dirty, nothing was rewritten.
    assert_eq!(storage.get("colors").unwrap(), r#"[{"value": "red"}]"#);
}

#[tokio::test]
async fn test_unknown_set_and_bad_token_are_skipped() {
    let (store, _) = store_with(&[("colors", r#"[{"value": "red"}]"#)]);
    let updater = ScoreUpdater::new(store.clone());

    let all_saved = updater
        .update_scores(
            &chosen(&[
                ("[ghost]", "anything"),
                ("not a token", "anything"),
                ("[colors]", "red"),
            ]),
            Outcome::Success,
        )
        .await;
    assert!(all_saved);

    let entries = store.load("colors").await;
    assert_eq!(entries[0].success, 1);
}

#[tokio::test]
async fn test_multiple_sets_all_persisted() {
    let (store, storage) = store_with(&[
        ("colors", r#"[{"value": "red"}]"#),
        ("artists", r#"[{"value": "Monet"}]"#),
    ]);
    let updater = ScoreUpdater::new(store.clone());

    let all_saved = updater
        .update_scores(
            &chosen(&[("[colors]", "red"), ("[1:artists]", "Monet")]),
            Outcome::Success,
        )
        .await;
    assert!(all_saved);

    for name in ["colors", "artists"] {
        let written = storage.get(name).unwrap();
        let records: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
        assert_eq!(records[0]["success"], 1, "set {} not persisted", name);
    }
}

#[tokio::test]
async fn test_empty_map_is_a_noop() {
    let (store, _) = store_with(&[]);
    let updater = ScoreUpdater::new(store);
    assert!(updater.update_scores(&HashMap::new(), Outcome::Success).await);
}

/// Storage whose writes fail for one designated set name.
struct FailingWriteStorage {
    inner: MemoryStorage,
    fail_for: String,
}

#[async_trait]
impl WildcardStorage for FailingWriteStorage {
    async fn read(&self, name: &str) -> Result<String, StorageError> {
        self.inner.read(name).await
    }

    async fn write(&self, name: &str, contents: &str) -> Result<(), StorageError> {
        if name == self.fail_for {
            return Err(StorageError::Io("disk full".to_string()));
        }
        self.inner.write(name, contents).await
    }

    async fn list(&self) -> Vec<String> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn test_one_failed_save_does_not_prevent_the_others() {
    let inner = MemoryStorage::new();
    inner.add("colors", r#"[{"value": "red"}]"#);
    inner.add("artists", r#"[{"value": "Monet"}]"#);
    let store = Arc::new(ValueSetStore::new(Arc::new(FailingWriteStorage {
        inner: inner.clone(),
        fail_for: "colors".to_string(),
    })));
    let updater = ScoreUpdater::new(store.clone());

    let all_saved = updater
        .update_scores(
            &chosen(&[("[colors]", "red"), ("[artists]", "Monet")]),
            Outcome::Success,
        )
        .await;
    // One save failed, so the call reports failure overall...
    assert!(!all_saved);

    // ...but the other set was still persisted.
    let written = inner.get("artists").unwrap();
    let records: Vec<serde_json::Value> = serde_json::from_str(&written).unwrap();
    assert_eq!(records[0]["success"], 1);

    // The failed set kept its increment in the cache even though the
    // write never reached storage.
    assert_eq!(store.load("colors").await[0].success, 1);
    assert_eq!(inner.get("colors").unwrap(), r#"[{"value": "red"}]"#);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_do_not_lose_increments() {
    let (store, _) = store_with(&[("colors", r#"[{"value": "red"}]"#)]);
    let updater = Arc::new(ScoreUpdater::new(store.clone()));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let updater = updater.clone();
        handles.push(tokio::spawn(async move {
            updater
                .update_scores(&chosen(&[("[colors]", "red")]), Outcome::Success)
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let entries = store.load("colors").await;
    assert_eq!(entries[0].success, 20);
    assert_eq!(entries[0].average, 20);
}
