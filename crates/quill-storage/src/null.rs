use crate::error::StorageError;
use crate::record::{CachedSample, Document, Record, Setting};

/// Storage for contexts with nowhere to persist (pre-rendering, headless
/// hosts). Reads find nothing, writes succeed without side effects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl NullStore {
    pub fn get(&self, _key: &str) -> Result<Option<Setting>, StorageError> {
        Ok(None)
    }

    pub fn put(&self, record: Record) -> Result<Record, StorageError> {
        Ok(record)
    }

    pub fn get_document(&self, _id: i64) -> Result<Option<Document>, StorageError> {
        Ok(None)
    }

    pub fn get_sample(&self, _key: &str) -> Result<Option<CachedSample>, StorageError> {
        Ok(None)
    }
}
