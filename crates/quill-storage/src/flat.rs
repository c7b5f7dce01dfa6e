//! Fallback flat store over a string key-value area.
//!
//! Every record kind shares one namespace: a record lives at
//! [`Record::storage_key`] as its plain JSON form. Reads only return values that
//! parse as the requested shape, so whatever else happens to live in the area
//! reads as absent.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::backend::BackendKind;
use crate::error::StorageError;
use crate::record::{CachedSample, Document, Record, RecordKind, Setting};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct AreaError(pub String);

impl AreaError {
    pub fn new(message: impl ToString) -> Self {
        Self(message.to_string())
    }
}

/// A synchronous string key-value area, in the shape of the browser's
/// `localStorage`.
pub trait KeyValueArea: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError>;

    fn name(&self) -> &'static str;
}

impl<T: KeyValueArea + ?Sized> KeyValueArea for std::sync::Arc<T> {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        (**self).set_item(key, value)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Values held in process memory.
#[derive(Debug, Default)]
pub struct MemoryArea {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryArea {
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> Result<MutexGuard<'_, HashMap<String, String>>, AreaError> {
        self.items
            .lock()
            .map_err(|_| AreaError::new("memory area lock poisoned"))
    }
}

impl KeyValueArea for MemoryArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        Ok(self.items()?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        self.items()?.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// A JSON object on disk, rewritten in full on every write.
#[derive(Debug)]
pub struct FileArea {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileArea {
    /// Open the area at `path`. A missing file is an empty area; a file that
    /// is not a JSON object of strings is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AreaError> {
        let path = path.as_ref().to_path_buf();
        let items = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| AreaError::new(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(AreaError::new(format!("{}: {}", path.display(), e))),
        };
        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> Result<(), AreaError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(AreaError::new)?;
        }
        let contents = serde_json::to_string_pretty(items).map_err(AreaError::new)?;
        fs::write(&self.path, contents).map_err(AreaError::new)
    }
}

impl KeyValueArea for FileArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        let items = self
            .items
            .lock()
            .map_err(|_| AreaError::new("file area lock poisoned"))?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| AreaError::new("file area lock poisoned"))?;
        let previous = items.insert(key.to_owned(), value.to_owned());
        if let Err(e) = self.persist(&items) {
            // Keep memory consistent with what is on disk.
            match previous {
                Some(previous) => items.insert(key.to_owned(), previous),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// The browser's `localStorage`.
///
/// Holds no handle: `web_sys::Storage` is not `Send`, so the storage object is
/// looked up on each access. Construct only after
/// [`BrowserEnvironment`](crate::BrowserEnvironment) has probed it.
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalStorageArea;

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
impl KeyValueArea for LocalStorageArea {
    fn get_item(&self, key: &str) -> Result<Option<String>, AreaError> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::raw()
            .get_item(key)
            .map_err(|e| AreaError::new(format!("{:?}", e)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AreaError> {
        use gloo_storage::{LocalStorage, Storage};
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|e| AreaError::new(format!("{:?}", e)))
    }

    fn name(&self) -> &'static str {
        "localStorage"
    }
}

pub struct FlatStore {
    area: Box<dyn KeyValueArea>,
}

impl fmt::Debug for FlatStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatStore")
            .field("area", &self.area.name())
            .finish()
    }
}

impl FlatStore {
    pub fn new(area: impl KeyValueArea + 'static) -> Self {
        Self {
            area: Box::new(area),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryArea::new())
    }

    pub fn area_name(&self) -> &'static str {
        self.area.name()
    }

    /// Read `key` and parse it as `T`, treating anything else as absent.
    fn read_as<T: DeserializeOwned>(
        &self,
        key: &str,
        kind: RecordKind,
    ) -> Result<Option<T>, StorageError> {
        let raw = self
            .area
            .get_item(key)
            .map_err(|e| StorageError::read_failed(BackendKind::Flat, e))?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::debug!(key, %kind, error = %e, "flat value is not of the expected shape");
                Ok(None)
            }
        }
    }

    pub fn get(&self, key: &str) -> Result<Option<Setting>, StorageError> {
        Ok(self
            .read_as::<Setting>(key, RecordKind::Setting)?
            .filter(|setting| setting.key == key))
    }

    pub fn get_document(&self, id: i64) -> Result<Option<Document>, StorageError> {
        Ok(self
            .read_as::<Document>(&id.to_string(), RecordKind::Document)?
            .filter(|doc| doc.id == id))
    }

    pub fn get_sample(&self, key: &str) -> Result<Option<CachedSample>, StorageError> {
        Ok(self
            .read_as::<CachedSample>(key, RecordKind::Sample)?
            .filter(|sample| sample.key == key))
    }

    /// Write the record at its storage key, overwriting whatever is there.
    pub fn put(&self, record: Record) -> Result<Record, StorageError> {
        let json = record.to_json()?;
        self.area
            .set_item(&record.storage_key(), &json)
            .map_err(|e| StorageError::write_failed(BackendKind::Flat, e))?;
        Ok(record)
    }
}
