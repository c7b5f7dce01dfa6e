//! Browser tests for the IndexedDB and localStorage tiers.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

#![cfg(all(target_family = "wasm", target_os = "unknown"))]

use std::sync::Arc;

use quill_storage::{
    BackendKind, BrowserEnvironment, CachedSample, Document, Persistence, Setting,
    StorageSelector, StructuredStore, WELCOME_DOCUMENT, WELCOME_DOCUMENT_ID,
};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
async fn new_database_seeds_the_welcome_document() {
    let store = StructuredStore::open("quill-test-seed").await.unwrap();
    let doc = store.get_document(WELCOME_DOCUMENT_ID).await.unwrap().unwrap();
    assert_eq!(doc.content, WELCOME_DOCUMENT);
}

#[wasm_bindgen_test]
async fn object_stores_are_separate_namespaces() {
    let store = StructuredStore::open("quill-test-namespaces").await.unwrap();
    store.put(Setting::new("theme", "dark").into()).await.unwrap();
    store
        .put(CachedSample::new("theme", "# Not a setting").into())
        .await
        .unwrap();

    assert_eq!(
        store.get("theme").await.unwrap(),
        Some(Setting::new("theme", "dark"))
    );
    assert_eq!(
        store.get_sample("theme").await.unwrap(),
        Some(CachedSample::new("theme", "# Not a setting"))
    );
    assert_eq!(store.get("missing").await.unwrap(), None);
}

#[wasm_bindgen_test]
async fn reopening_keeps_what_was_written() {
    {
        let store = StructuredStore::open("quill-test-reopen").await.unwrap();
        store.put(Document::new(1, "# Mine").into()).await.unwrap();
    }

    let store = StructuredStore::open("quill-test-reopen").await.unwrap();
    assert_eq!(store.get_document(1).await.unwrap().unwrap().content, "# Mine");
}

#[wasm_bindgen_test]
async fn browser_pages_bind_the_structured_tier() {
    let persistence = Persistence::new(Arc::new(StorageSelector::new(BrowserEnvironment)));
    assert_eq!(persistence.backend_kind().await, BackendKind::Structured);

    persistence.save_setting("theme", "dark").await;
    assert_eq!(persistence.get_setting("theme").await.as_deref(), Some("dark"));
}
