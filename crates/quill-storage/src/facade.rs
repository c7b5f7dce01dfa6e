//! Fail-open document and settings API over the bound backend.
//!
//! Storage is never allowed to break editing: every error is logged and turned
//! into "nothing stored" for reads and a no-op for writes. [`DocumentHandle`]
//! and [`SettingHandle`] are reactive views of a single value whose state is
//! published through a `tokio::sync::watch` channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use n0_future::task;
use tokio::sync::watch;

use crate::backend::BackendKind;
use crate::record::{CachedSample, Document, Record, Setting};
use crate::selector::StorageSelector;

#[derive(Debug, Clone)]
pub struct Persistence {
    selector: Arc<StorageSelector>,
}

impl Persistence {
    pub fn new(selector: Arc<StorageSelector>) -> Self {
        Self { selector }
    }

    /// Persistence over [`StorageSelector::global`].
    pub fn global() -> Self {
        Self::new(StorageSelector::global())
    }

    pub fn selector(&self) -> &Arc<StorageSelector> {
        &self.selector
    }

    pub async fn backend_kind(&self) -> BackendKind {
        self.selector.kind().await
    }

    pub async fn get_document(&self, id: i64) -> Option<Document> {
        match self.selector.get_document(id).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(id, error = %e, "failed to load document");
                None
            }
        }
    }

    pub async fn save_document(&self, id: i64, content: impl Into<String>) {
        self.put(Document::new(id, content).into()).await
    }

    pub async fn get_setting(&self, key: &str) -> Option<String> {
        match self.selector.get(key).await {
            Ok(setting) => setting.map(|s| s.value),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to load setting");
                None
            }
        }
    }

    pub async fn save_setting(&self, key: impl Into<String>, value: impl Into<String>) {
        self.put(Setting::new(key, value).into()).await
    }

    pub async fn get_sample(&self, key: &str) -> Option<String> {
        match self.selector.get_sample(key).await {
            Ok(sample) => sample.map(|s| s.content),
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to load cached sample");
                None
            }
        }
    }

    pub async fn save_sample(&self, key: impl Into<String>, content: impl Into<String>) {
        self.put(CachedSample::new(key, content).into()).await
    }

    async fn put(&self, record: Record) {
        let kind = record.kind();
        let key = record.storage_key();
        if let Err(e) = self.selector.put(record).await {
            tracing::warn!(%kind, key = %key, error = %e, "failed to save record");
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentState {
    pub content: String,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingState {
    pub value: String,
    pub is_loading: bool,
}

/// State shared between a handle and its in-flight fetch.
///
/// The fetch only holds a `Weak`, so a dropped handle makes the late result
/// unobservable. `edited` is set by any local change and makes the fetch
/// leave the value alone.
struct Shared<S> {
    state: watch::Sender<S>,
    edited: AtomicBool,
}

impl<S> Shared<S> {
    fn new(initial: S) -> Arc<Self> {
        let (state, _) = watch::channel(initial);
        Arc::new(Self {
            state,
            edited: AtomicBool::new(false),
        })
    }

    fn edit(&self, f: impl FnOnce(&mut S)) {
        self.edited.store(true, Ordering::SeqCst);
        self.state.send_modify(f);
    }

    /// Apply a fetch result unless the value was edited in the meantime.
    fn resolve(weak: &Weak<Self>, f: impl FnOnce(&mut S, bool)) -> bool {
        let Some(shared) = weak.upgrade() else {
            return false;
        };
        shared.state.send_modify(|state| {
            let edited = shared.edited.load(Ordering::SeqCst);
            f(state, edited)
        });
        true
    }
}

/// One document, loaded once and saved on demand.
pub struct DocumentHandle {
    id: i64,
    persistence: Persistence,
    shared: Arc<Shared<DocumentState>>,
}

impl DocumentHandle {
    /// Start with `default_content` and fetch the stored document in the
    /// background.
    pub fn open(persistence: Persistence, id: i64, default_content: impl Into<String>) -> Self {
        let shared = Shared::new(DocumentState {
            content: default_content.into(),
            is_loading: true,
        });

        let weak = Arc::downgrade(&shared);
        let fetch = persistence.clone();
        task::spawn(async move {
            let stored = fetch.get_document(id).await;
            let applied = Shared::resolve(&weak, |state, edited| {
                if let Some(doc) = stored {
                    if edited {
                        tracing::debug!(id, "discarding late document load after local edit");
                    } else {
                        state.content = doc.content;
                    }
                }
                state.is_loading = false;
            });
            if !applied {
                tracing::debug!(id, "document handle dropped before load finished");
            }
        });

        Self {
            id,
            persistence,
            shared,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn state(&self) -> DocumentState {
        self.shared.state.borrow().clone()
    }

    pub fn content(&self) -> String {
        self.shared.state.borrow().content.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<DocumentState> {
        self.shared.state.subscribe()
    }

    /// Wait for the initial fetch and return the content it settled on.
    pub async fn loaded(&self) -> DocumentState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    /// Replace the local content without persisting it.
    pub fn set_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.shared.edit(|state| state.content = content);
    }

    /// Replace the local content and persist it in the background.
    pub fn save_content(&self, content: impl Into<String>) {
        let content = content.into();
        self.set_content(content.clone());

        let persistence = self.persistence.clone();
        let id = self.id;
        task::spawn(async move {
            persistence.save_document(id, content).await;
        });
    }
}

/// One setting, loaded once and saved on demand.
pub struct SettingHandle {
    key: String,
    persistence: Persistence,
    shared: Arc<Shared<SettingState>>,
}

impl SettingHandle {
    pub fn open(
        persistence: Persistence,
        key: impl Into<String>,
        default_value: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let shared = Shared::new(SettingState {
            value: default_value.into(),
            is_loading: true,
        });

        let weak = Arc::downgrade(&shared);
        let fetch = persistence.clone();
        let fetch_key = key.clone();
        task::spawn(async move {
            let stored = fetch.get_setting(&fetch_key).await;
            Shared::resolve(&weak, |state, edited| {
                if let Some(value) = stored {
                    if !edited {
                        state.value = value;
                    }
                }
                state.is_loading = false;
            });
        });

        Self {
            key,
            persistence,
            shared,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> SettingState {
        self.shared.state.borrow().clone()
    }

    pub fn value(&self) -> String {
        self.shared.state.borrow().value.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.state.borrow().is_loading
    }

    pub fn subscribe(&self) -> watch::Receiver<SettingState> {
        self.shared.state.subscribe()
    }

    pub async fn loaded(&self) -> SettingState {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        settled
    }

    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        self.shared.edit(|state| state.value = value);
    }

    pub fn save(&self, value: impl Into<String>) {
        let value = value.into();
        self.set_value(value.clone());

        let persistence = self.persistence.clone();
        let key = self.key.clone();
        task::spawn(async move {
            persistence.save_setting(key, value).await;
        });
    }
}
