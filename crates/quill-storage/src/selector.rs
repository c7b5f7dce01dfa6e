//! Capability probing and one-time backend binding.
//!
//! Tiers are tried best first: structured, then flat, then null. Whatever
//! probe succeeds first is bound for the lifetime of the selector; probe
//! failures are logged and never reach callers. Opening IndexedDB is
//! asynchronous, so binding is too: the first operation awaits it and every
//! later one finds the backend already in the cell.

use std::sync::{Arc, OnceLock};

use quill_common::{QuillConfig, StorageConfig};
use tokio::sync::OnceCell;

use crate::backend::{Backend, BackendKind};
use crate::error::StorageError;
use crate::flat::FlatStore;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use crate::flat::{FileArea, MemoryArea};
use crate::null::NullStore;
use crate::record::{CachedSample, Document, Record, Setting};
use crate::structured::StructuredStore;

/// What the host can offer for persistence.
#[async_trait::async_trait]
pub trait StorageEnvironment: Send + Sync {
    /// Whether there is a host context to persist into at all.
    fn has_browsing_context(&self) -> bool;

    async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
        Err(StorageError::unavailable(
            BackendKind::Structured,
            "not offered by this environment",
        ))
    }

    fn open_flat(&self) -> Result<FlatStore, StorageError> {
        Err(StorageError::unavailable(
            BackendKind::Flat,
            "not offered by this environment",
        ))
    }

    fn name(&self) -> &'static str;
}

/// A native process persisting to the paths named in its [`StorageConfig`].
///
/// Unset paths fall back to memory, so a bare host still gets a working (if
/// ephemeral) structured store.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
#[derive(Debug, Clone, Default)]
pub struct HostEnvironment {
    config: StorageConfig,
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
impl HostEnvironment {
    pub fn new(config: StorageConfig) -> Self {
        Self { config }
    }
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
#[async_trait::async_trait]
impl StorageEnvironment for HostEnvironment {
    fn has_browsing_context(&self) -> bool {
        !self.config.headless
    }

    async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
        match &self.config.database_path {
            Some(path) => StructuredStore::open(path),
            None => StructuredStore::open_in_memory(),
        }
    }

    fn open_flat(&self) -> Result<FlatStore, StorageError> {
        match &self.config.flat_path {
            Some(path) => FileArea::open(path)
                .map(FlatStore::new)
                .map_err(|e| StorageError::unavailable(BackendKind::Flat, e)),
            None => Ok(FlatStore::new(MemoryArea::new())),
        }
    }

    fn name(&self) -> &'static str {
        "host"
    }
}

/// A browser page: `window` plus IndexedDB or `localStorage`.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserEnvironment;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl BrowserEnvironment {
    const PROBE_KEY: &'static str = "__quill_storage_probe__";
}

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[async_trait::async_trait]
impl StorageEnvironment for BrowserEnvironment {
    fn has_browsing_context(&self) -> bool {
        web_sys::window().is_some()
    }

    async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
        StructuredStore::open(crate::structured::DATABASE_NAME).await
    }

    fn open_flat(&self) -> Result<FlatStore, StorageError> {
        let unavailable = |message: String| StorageError::unavailable(BackendKind::Flat, message);

        let window = web_sys::window().ok_or_else(|| unavailable("no window".into()))?;
        let storage = window
            .local_storage()
            .map_err(|e| unavailable(format!("{:?}", e)))?
            .ok_or_else(|| unavailable("localStorage disabled".into()))?;

        // Private browsing modes can expose a storage object that throws on write.
        storage
            .set_item(Self::PROBE_KEY, "1")
            .map_err(|e| unavailable(format!("{:?}", e)))?;
        if let Err(e) = storage.remove_item(Self::PROBE_KEY) {
            tracing::debug!(error = ?e, "could not remove the storage probe key");
        }

        Ok(FlatStore::new(crate::flat::LocalStorageArea))
    }

    fn name(&self) -> &'static str {
        "browser"
    }
}

/// No host context: always binds the null store.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessEnvironment;

#[async_trait::async_trait]
impl StorageEnvironment for HeadlessEnvironment {
    fn has_browsing_context(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "headless"
    }
}

/// The environment for the current build target.
pub fn default_environment(config: &StorageConfig) -> Box<dyn StorageEnvironment> {
    if config.headless {
        return Box::new(HeadlessEnvironment);
    }
    #[cfg(all(target_family = "wasm", target_os = "unknown"))]
    {
        Box::new(BrowserEnvironment)
    }
    #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
    {
        Box::new(HostEnvironment::new(config.clone()))
    }
}

pub struct StorageSelector {
    env: Box<dyn StorageEnvironment>,
    backend: OnceCell<Backend>,
}

impl std::fmt::Debug for StorageSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSelector")
            .field("env", &self.env.name())
            .field("backend", &self.bound_kind())
            .finish()
    }
}

impl StorageSelector {
    pub fn new(env: impl StorageEnvironment + 'static) -> Self {
        Self::from_boxed(Box::new(env))
    }

    pub fn from_boxed(env: Box<dyn StorageEnvironment>) -> Self {
        Self {
            env,
            backend: OnceCell::new(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::from_boxed(default_environment(config))
    }

    /// A selector already bound to `backend`; no probing happens.
    pub fn with_backend(backend: Backend) -> Self {
        Self {
            env: Box::new(HeadlessEnvironment),
            backend: OnceCell::new_with(Some(backend)),
        }
    }

    /// The process-wide selector, configured from `QUILL_*` variables.
    pub fn global() -> Arc<StorageSelector> {
        static GLOBAL: OnceLock<Arc<StorageSelector>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                let config = QuillConfig::from_env().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "invalid storage environment, using defaults");
                    QuillConfig::default()
                });
                Arc::new(StorageSelector::from_config(&config.storage))
            })
            .clone()
    }

    /// The bound backend, probing on first use. Concurrent first callers
    /// share one probe.
    pub async fn backend(&self) -> &Backend {
        self.backend.get_or_init(|| bind(self.env.as_ref())).await
    }

    pub async fn kind(&self) -> BackendKind {
        self.backend().await.kind()
    }

    /// The bound tier, without probing.
    pub fn bound_kind(&self) -> Option<BackendKind> {
        self.backend.get().map(Backend::kind)
    }

    pub fn is_bound(&self) -> bool {
        self.backend.initialized()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Setting>, StorageError> {
        self.backend().await.get(key).await
    }

    pub async fn put(&self, record: Record) -> Result<Record, StorageError> {
        self.backend().await.put(record).await
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<Document>, StorageError> {
        self.backend().await.get_document(id).await
    }

    pub async fn get_sample(&self, key: &str) -> Result<Option<CachedSample>, StorageError> {
        self.backend().await.get_sample(key).await
    }
}

async fn bind(env: &dyn StorageEnvironment) -> Backend {
    let backend = probe(env).await;
    tracing::info!(env = env.name(), backend = %backend.kind(), "storage backend bound");
    backend
}

async fn probe(env: &dyn StorageEnvironment) -> Backend {
    if !env.has_browsing_context() {
        return Backend::Null(NullStore);
    }

    match env.open_structured().await {
        Ok(store) => return Backend::Structured(store),
        Err(e) => tracing::warn!(error = %e, "structured storage probe failed"),
    }

    match env.open_flat() {
        Ok(store) => Backend::Flat(store),
        Err(e) => {
            tracing::warn!(error = %e, "flat storage probe failed");
            Backend::Null(NullStore)
        }
    }
}

#[cfg(all(test, not(all(target_family = "wasm", target_os = "unknown"))))]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Scripted environment that counts probes.
    #[derive(Default)]
    struct Scripted {
        context: bool,
        structured: bool,
        flat: bool,
        probes: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl StorageEnvironment for Scripted {
        fn has_browsing_context(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.context
        }

        async fn open_structured(&self) -> Result<StructuredStore, StorageError> {
            if self.structured {
                StructuredStore::open_in_memory()
            } else {
                Err(StorageError::unavailable(BackendKind::Structured, "blocked"))
            }
        }

        fn open_flat(&self) -> Result<FlatStore, StorageError> {
            if self.flat {
                Ok(FlatStore::in_memory())
            } else {
                Err(StorageError::unavailable(BackendKind::Flat, "blocked"))
            }
        }

        fn name(&self) -> &'static str {
            "scripted"
        }
    }

    #[tokio::test]
    async fn no_context_binds_null() {
        let selector = StorageSelector::new(Scripted {
            structured: true,
            flat: true,
            ..Default::default()
        });
        assert_eq!(selector.kind().await, BackendKind::Null);
    }

    #[tokio::test]
    async fn prefers_structured() {
        let selector = StorageSelector::new(Scripted {
            context: true,
            structured: true,
            flat: true,
            ..Default::default()
        });
        assert_eq!(selector.kind().await, BackendKind::Structured);
    }

    #[tokio::test]
    async fn demotes_to_flat_then_null() {
        let flat = StorageSelector::new(Scripted {
            context: true,
            flat: true,
            ..Default::default()
        });
        assert_eq!(flat.kind().await, BackendKind::Flat);

        let null = StorageSelector::new(Scripted {
            context: true,
            ..Default::default()
        });
        assert_eq!(null.kind().await, BackendKind::Null);
    }

    #[tokio::test]
    async fn binds_lazily_and_once() {
        let probes = Arc::new(AtomicUsize::new(0));
        let selector = StorageSelector::new(Scripted {
            context: true,
            flat: true,
            probes: Arc::clone(&probes),
            ..Default::default()
        });
        assert!(!selector.is_bound());
        assert_eq!(probes.load(Ordering::SeqCst), 0);

        for _ in 0..3 {
            assert_eq!(selector.kind().await, BackendKind::Flat);
        }
        assert!(selector.is_bound());
        assert_eq!(probes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn headless_config_binds_null() {
        let selector = StorageSelector::from_config(&StorageConfig {
            headless: true,
            ..Default::default()
        });
        assert_eq!(selector.kind().await, BackendKind::Null);
    }

    #[tokio::test]
    async fn unset_host_paths_use_memory_structured_store() {
        let selector = StorageSelector::from_config(&StorageConfig::default());
        assert_eq!(selector.kind().await, BackendKind::Structured);
    }

    #[tokio::test]
    async fn concurrent_first_use_probes_once() {
        let probes = Arc::new(AtomicUsize::new(0));
        let selector = StorageSelector::new(Scripted {
            context: true,
            structured: true,
            probes: Arc::clone(&probes),
            ..Default::default()
        });
        assert_eq!(selector.bound_kind(), None);

        let (a, b) = tokio::join!(selector.kind(), selector.kind());
        assert_eq!((a, b), (BackendKind::Structured, BackendKind::Structured));
        assert_eq!(probes.load(Ordering::SeqCst), 1);
        assert_eq!(selector.bound_kind(), Some(BackendKind::Structured));
    }
}
