use std::fmt;

use crate::error::StorageError;
use crate::flat::FlatStore;
use crate::null::NullStore;
use crate::record::{CachedSample, Document, Record, Setting};
use crate::structured::StructuredStore;

/// Which storage tier a [`Backend`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Structured,
    Flat,
    Null,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Structured => "structured",
            BackendKind::Flat => "flat",
            BackendKind::Null => "null",
        })
    }
}

/// The bound storage tier.
///
/// Chosen once by the [`StorageSelector`](crate::StorageSelector) and never
/// swapped afterwards. Every operation dispatches on the variant. The
/// structured tier is SQLite on native targets and IndexedDB in the browser.
#[derive(Debug)]
pub enum Backend {
    Structured(StructuredStore),
    Flat(FlatStore),
    Null(NullStore),
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Structured(_) => BackendKind::Structured,
            Backend::Flat(_) => BackendKind::Flat,
            Backend::Null(_) => BackendKind::Null,
        }
    }

    /// Look up a setting by key.
    pub async fn get(&self, key: &str) -> Result<Option<Setting>, StorageError> {
        match self {
            #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
            Backend::Structured(store) => store.get(key),
            #[cfg(all(target_family = "wasm", target_os = "unknown"))]
            Backend::Structured(store) => store.get(key).await,
            Backend::Flat(store) => store.get(key),
            Backend::Null(store) => store.get(key),
        }
    }

    /// Persist a record, returning what was stored.
    pub async fn put(&self, record: Record) -> Result<Record, StorageError> {
        match self {
            #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
            Backend::Structured(store) => store.put(record),
            #[cfg(all(target_family = "wasm", target_os = "unknown"))]
            Backend::Structured(store) => store.put(record).await,
            Backend::Flat(store) => store.put(record),
            Backend::Null(store) => store.put(record),
        }
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<Document>, StorageError> {
        match self {
            #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
            Backend::Structured(store) => store.get_document(id),
            #[cfg(all(target_family = "wasm", target_os = "unknown"))]
            Backend::Structured(store) => store.get_document(id).await,
            Backend::Flat(store) => store.get_document(id),
            Backend::Null(store) => store.get_document(id),
        }
    }

    pub async fn get_sample(&self, key: &str) -> Result<Option<CachedSample>, StorageError> {
        match self {
            #[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
            Backend::Structured(store) => store.get_sample(key),
            #[cfg(all(target_family = "wasm", target_os = "unknown"))]
            Backend::Structured(store) => store.get_sample(key).await,
            Backend::Flat(store) => store.get_sample(key),
            Backend::Null(store) => store.get_sample(key),
        }
    }
}

impl From<StructuredStore> for Backend {
    fn from(store: StructuredStore) -> Self {
        Backend::Structured(store)
    }
}

impl From<FlatStore> for Backend {
    fn from(store: FlatStore) -> Self {
        Backend::Flat(store)
    }
}

impl From<NullStore> for Backend {
    fn from(store: NullStore) -> Self {
        Backend::Null(store)
    }
}
