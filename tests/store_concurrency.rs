//! Concurrency behaviour of the JSON store under parallel writers and readers.

use std::sync::Arc;

use bitbets::models::{Collection, JsonMap};
use bitbets::store::JsonStore;
use serde_json::{json, Value};
use tempfile::tempdir;

fn entry(key: &str, value: Value) -> JsonMap {
    let mut map = JsonMap::new();
    map.insert(key.to_string(), value);
    map
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_merges_lose_nothing() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonStore::new(dir.path()));
    store.init().await.unwrap();

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .merge(
                        Collection::Users,
                        entry(&format!("user{}", i), json!(format!("pw{}", i))),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let users = store.load(Collection::Users).await;
    assert_eq!(users.len(), 40);
    for i in 0..40 {
        assert_eq!(users[&format!("user{}", i)], json!(format!("pw{}", i)));
    }

    // A fresh store reads the same thing back from disk.
    let reopened = JsonStore::new(dir.path());
    assert_eq!(reopened.load(Collection::Users).await.len(), 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn readers_never_see_partial_files() {
    let dir = tempdir().unwrap();
    let store = Arc::new(JsonStore::new(dir.path()));
    store.init().await.unwrap();
    let path = store.path(Collection::Guesses);

    let big = |tag: usize| -> JsonMap {
        (0..2000)
            .map(|i| {
                (
                    format!("user{}", i),
                    json!({"cs-f111": {"midsem": (i % 100) as f64, "compre": tag}}),
                )
            })
            .collect()
    };

    let writer = {
        let store = store.clone();
        tokio::spawn(async move {
            for tag in 0..20 {
                store.save(Collection::Guesses, &big(tag)).await.unwrap();
            }
        })
    };

    let reader = tokio::spawn(async move {
        let mut parsed = 0;
        for _ in 0..200 {
            let bytes = tokio::fs::read(&path).await.unwrap();
            let value: Value = serde_json::from_slice(&bytes).expect("file must always be complete JSON");
            assert!(value.is_object());
            parsed += 1;
            tokio::task::yield_now().await;
        }
        parsed
    });

    writer.await.unwrap();
    assert_eq!(reader.await.unwrap(), 200);
    assert_eq!(store.load(Collection::Guesses).await.len(), 2000);
}
