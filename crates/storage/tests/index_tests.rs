use chrono::Utc;
use storage::{Document, MetaValue, StorageAdapter, StorageError, TantivyStorage};
use tempfile::TempDir;

fn doc(url: &str, title: &str, content: &str) -> Document {
    Document::new(url).with_title(title).with_content(content)
}

fn open(dir: &TempDir) -> TantivyStorage {
    TantivyStorage::open(dir.path().join("search.tantivy")).unwrap()
}

#[tokio::test]
async fn store_then_get_round_trips() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    let d = doc("https://example.test/", "Home Page", "welcome to the index")
        .with_metadata("crawled_at", MetaValue::from(Utc::now()))
        .with_metadata(
            "links",
            MetaValue::from(vec!["https://example.test/a".to_string()]),
        );
    storage.store(d.clone()).await.unwrap();

    let got = storage.get("https://example.test/").await.unwrap();
    assert_eq!(got.url, d.url);
    assert_eq!(got.title, d.title);
    assert_eq!(got.content, d.content);
    assert_eq!(got.doc_type, d.doc_type);
    assert_eq!(got.metadata, d.metadata);
}

#[tokio::test]
async fn upsert_keeps_latest_revision() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    storage.store(doc("https://example.test/", "old", "v1")).await.unwrap();
    storage.store(doc("https://example.test/", "new", "v2")).await.unwrap();

    let all = storage.get_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "new");
    assert_eq!(storage.stats().await.unwrap().document_count, 1);
}

#[tokio::test]
async fn batch_store_is_visible_after_return() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    let docs: Vec<_> = (0..25)
        .map(|i| doc(&format!("https://example.test/{i}"), "page", "text"))
        .collect();
    storage.batch_store(docs).await.unwrap();

    assert_eq!(storage.get_all().await.unwrap().len(), 25);
    storage.get("https://example.test/24").await.unwrap();
}

#[tokio::test]
async fn delete_missing_is_surfaced() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    let err = storage.delete("https://example.test/nope").await.unwrap_err();
    assert!(matches!(err, StorageError::DocumentNotFound(_)));
}

#[tokio::test]
async fn delete_removes_document() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    storage.store(doc("https://example.test/a", "a", "x")).await.unwrap();
    storage.delete("https://example.test/a").await.unwrap();

    let err = storage.get("https://example.test/a").await.unwrap_err();
    assert!(matches!(err, StorageError::DocumentNotFound(_)));
}

#[tokio::test]
async fn clear_recreates_an_empty_index() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    storage.store(doc("https://example.test/a", "a", "x")).await.unwrap();
    storage.clear().await.unwrap();

    assert!(storage.get_all().await.unwrap().is_empty());
    assert_eq!(storage.stats().await.unwrap().document_count, 0);

    // The index stays usable after the reset.
    storage.store(doc("https://example.test/b", "b", "y")).await.unwrap();
    assert_eq!(storage.get_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reopening_sees_previously_stored_documents() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("search.tantivy");

    {
        let storage = TantivyStorage::open(&path).unwrap();
        storage.store(doc("https://example.test/persist", "kept", "data")).await.unwrap();
        storage.close().await.unwrap();
    }

    let storage = TantivyStorage::open(&path).unwrap();
    let got = storage.get("https://example.test/persist").await.unwrap();
    assert_eq!(got.title, "kept");
}

#[tokio::test]
async fn operations_after_close_fail() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);
    storage.close().await.unwrap();

    let err = storage.get_all().await.unwrap_err();
    assert!(matches!(err, StorageError::Closed));
}

#[tokio::test]
async fn reserved_metadata_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let storage = open(&dir);

    let bad = doc("https://example.test/", "t", "c")
        .with_metadata("url", MetaValue::from("https://spoof.test/"));
    let err = storage.store(bad).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidDocument(_)));
}
