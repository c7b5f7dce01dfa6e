#![cfg(not(all(target_family = "wasm", target_os = "unknown")))]

use std::sync::Arc;

use quill_storage::{
    BackendKind, DocumentHandle, FlatStore, KeyValueArea, MemoryArea, Persistence, Setting,
    StorageEnvironment, StorageError, StorageSelector, StructuredStore, WELCOME_DOCUMENT,
};

/// Structured storage is blocked; the flat tier writes into a shared area the
/// test can inspect.
struct NoStructured {
    area: Arc<MemoryArea>,
}

#[async_trait::async_trait]
impl StorageEnvironment for NoStructured {
    fn has_browsing_context(&self) -> bool {
        true
    }

    async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
        Err(StorageError::unavailable(
            BackendKind::Structured,
            "blocked by test",
        ))
    }

    fn open_flat(&self) -> Result<FlatStore, StorageError> {
        Ok(FlatStore::new(Arc::clone(&self.area)))
    }

    fn name(&self) -> &'static str {
        "no-structured"
    }
}

struct Structured;

#[async_trait::async_trait]
impl StorageEnvironment for Structured {
    fn has_browsing_context(&self) -> bool {
        true
    }

    async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
        StructuredStore::open_in_memory()
    }

    fn name(&self) -> &'static str {
        "structured"
    }
}

#[tokio::test]
async fn settings_round_trip_after_demotion() {
    let area = Arc::new(MemoryArea::new());
    let persistence = Persistence::new(Arc::new(StorageSelector::new(NoStructured {
        area: Arc::clone(&area),
    })));

    persistence.save_setting("theme", "dark").await;
    assert_eq!(persistence.backend_kind().await, BackendKind::Flat);
    assert_eq!(persistence.get_setting("theme").await.as_deref(), Some("dark"));
}

#[tokio::test]
async fn flat_tier_stores_settings_under_their_key() {
    let area = Arc::new(MemoryArea::new());
    let persistence = Persistence::new(Arc::new(StorageSelector::new(NoStructured {
        area: Arc::clone(&area),
    })));

    assert_eq!(persistence.get_setting("theme").await, None);

    persistence.save_setting("theme", "light").await;
    assert_eq!(persistence.get_setting("theme").await.as_deref(), Some("light"));

    let raw = area.get_item("theme").unwrap().unwrap();
    let stored: Setting = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored, Setting::new("theme", "light"));
}

#[tokio::test]
async fn saved_document_is_seen_by_a_fresh_read() {
    let persistence = Persistence::new(Arc::new(StorageSelector::new(NoStructured {
        area: Arc::new(MemoryArea::new()),
    })));

    let handle = DocumentHandle::open(persistence.clone(), 1, "# Hello, Markdown!");
    assert_eq!(handle.loaded().await.content, "# Hello, Markdown!");

    persistence.save_document(1, "# Hi").await;
    let doc = persistence.get_document(1).await.unwrap();
    assert_eq!(doc.content, "# Hi");
}

#[tokio::test]
async fn structured_tier_opens_with_the_welcome_document() {
    let persistence = Persistence::new(Arc::new(StorageSelector::new(Structured)));

    let handle = DocumentHandle::open(persistence.clone(), 1, "# Hello, Markdown!");
    assert_eq!(handle.loaded().await.content, WELCOME_DOCUMENT);
    assert_eq!(persistence.backend_kind().await, BackendKind::Structured);

    persistence.save_document(1, "# Hi").await;
    assert_eq!(persistence.get_document(1).await.unwrap().content, "# Hi");
}

#[tokio::test]
async fn file_backed_tiers_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = quill_common::StorageConfig {
        database_path: Some(dir.path().join("quill.sqlite")),
        flat_path: Some(dir.path().join("quill.json")),
        headless: false,
    };

    {
        let persistence = Persistence::new(Arc::new(StorageSelector::from_config(&config)));
        persistence.save_setting("theme", "dark").await;
        persistence.save_document(1, "# Persisted").await;
    }

    let persistence = Persistence::new(Arc::new(StorageSelector::from_config(&config)));
    assert_eq!(persistence.get_setting("theme").await.as_deref(), Some("dark"));
    assert_eq!(
        persistence.get_document(1).await.unwrap().content,
        "# Persisted"
    );
}
