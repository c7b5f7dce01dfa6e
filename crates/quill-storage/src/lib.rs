//! Tiered local persistence.
//!
//! At first use the [`StorageSelector`] probes the host and binds the best
//! available backend: a [`StructuredStore`] (SQLite on native targets,
//! IndexedDB in the browser), a [`FlatStore`] over a string key-value area
//! (browser `localStorage`, a JSON file, or memory), or the [`NullStore`] when
//! there is no host context at all.
//! [`Persistence`] puts a fail-open API over whichever tier was bound.

pub mod backend;
pub mod error;
pub mod facade;
pub mod flat;
pub mod null;
pub mod record;
pub mod samples;
pub mod selector;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub mod structured;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[path = "structured/idb.rs"]
pub mod structured;

pub use crate::backend::{Backend, BackendKind};
pub use crate::error::StorageError;
pub use crate::facade::{DocumentHandle, DocumentState, Persistence, SettingHandle, SettingState};
pub use crate::flat::{AreaError, FileArea, FlatStore, KeyValueArea, MemoryArea};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use crate::flat::LocalStorageArea;
pub use crate::null::NullStore;
pub use crate::record::{
    CachedSample, Document, Record, RecordKind, Setting, WELCOME_DOCUMENT, WELCOME_DOCUMENT_ID,
};
pub use crate::samples::{SampleError, SampleInfo, SampleLibrary, SampleSource, StaticSamples};
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub use crate::selector::BrowserEnvironment;
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub use crate::selector::HostEnvironment;
pub use crate::selector::{
    HeadlessEnvironment, StorageEnvironment, StorageSelector, default_environment,
};
pub use crate::structured::StructuredStore;
