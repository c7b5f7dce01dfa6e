//! Durable structured store on IndexedDB.
//!
//! One database with an object store per record kind (documents, settings,
//! samples). Each value is the record's JSON text under an out-of-line key:
//! the numeric id for documents, the string key for the other two. Creating
//! the documents store seeds document 1 with [`WELCOME_DOCUMENT`].
//!
//! IndexedDB handles are not `Send`. The database lives in a [`SendWrapper`]
//! and every request future is wrapped the same way before it leaves this
//! module; the browser main thread is the only one that ever touches them.

use js_sys::{Function, Promise, Reflect};
use send_wrapper::SendWrapper;
use serde::de::DeserializeOwned;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbOpenDbRequest, IdbRequest, IdbTransaction, IdbTransactionMode};

use crate::backend::BackendKind;
use crate::error::StorageError;
use crate::record::{
    CachedSample, Document, Record, Setting, WELCOME_DOCUMENT, WELCOME_DOCUMENT_ID,
};

/// Database the browser store opens by default.
pub const DATABASE_NAME: &str = "quill";

const SCHEMA_VERSION: u32 = 1;

const DOCUMENTS: &str = "documents";
const SETTINGS: &str = "settings";
const SAMPLES: &str = "samples";

#[derive(Debug)]
pub struct StructuredStore {
    db: SendWrapper<IdbDatabase>,
    name: String,
}

impl StructuredStore {
    /// Open (creating or upgrading if needed) the database called `name`.
    ///
    /// Fails with `BackendUnavailable` when the page has no IndexedDB or the
    /// browser refuses to open it, as some private browsing modes do.
    pub async fn open(name: &str) -> Result<Self, StorageError> {
        SendWrapper::new(Self::open_local(name.to_owned())).await
    }

    async fn open_local(name: String) -> Result<Self, StorageError> {
        let unavailable = |e: JsValue| StorageError::unavailable(BackendKind::Structured, describe(&e));

        let factory = web_sys::window()
            .ok_or_else(|| StorageError::unavailable(BackendKind::Structured, "no window"))?
            .indexed_db()
            .map_err(unavailable)?
            .ok_or_else(|| StorageError::unavailable(BackendKind::Structured, "IndexedDB disabled"))?;
        let request = factory
            .open_with_u32(&name, SCHEMA_VERSION)
            .map_err(unavailable)?;

        let upgrading = request.clone();
        let on_upgrade = Closure::<dyn FnMut(web_sys::Event)>::new(move |_event: web_sys::Event| {
            if let Err(e) = upgrade(&upgrading) {
                tracing::warn!(error = %describe(&e), "structured storage upgrade failed");
                // Aborting fails the open, so the selector demotes.
                if let Some(tx) = upgrading.transaction() {
                    let _ = tx.abort();
                }
            }
        });
        request.set_onupgradeneeded(Some(on_upgrade.as_ref().unchecked_ref()));
        let opened = settle(&request).await;
        request.set_onupgradeneeded(None);
        drop(on_upgrade);

        let db: IdbDatabase = opened
            .map_err(unavailable)?
            .dyn_into()
            .map_err(unavailable)?;
        tracing::debug!(name = %name, "structured store ready");
        Ok(Self {
            db: SendWrapper::new(db),
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn get(&self, key: &str) -> Result<Option<Setting>, StorageError> {
        let setting: Option<Setting> =
            SendWrapper::new(self.read(SETTINGS, JsValue::from_str(key))).await?;
        Ok(setting.filter(|setting| setting.key == key))
    }

    pub async fn get_document(&self, id: i64) -> Result<Option<Document>, StorageError> {
        let document: Option<Document> =
            SendWrapper::new(self.read(DOCUMENTS, document_key(id))).await?;
        Ok(document.filter(|doc| doc.id == id))
    }

    pub async fn get_sample(&self, key: &str) -> Result<Option<CachedSample>, StorageError> {
        let sample: Option<CachedSample> =
            SendWrapper::new(self.read(SAMPLES, JsValue::from_str(key))).await?;
        Ok(sample.filter(|sample| sample.key == key))
    }

    /// Write into the object store for the record's kind. Last write wins.
    pub async fn put(&self, record: Record) -> Result<Record, StorageError> {
        SendWrapper::new(self.write(record)).await
    }

    async fn read<T: DeserializeOwned>(
        &self,
        store: &'static str,
        key: JsValue,
    ) -> Result<Option<T>, StorageError> {
        let failed = |e: JsValue| StorageError::read_failed(BackendKind::Structured, describe(&e));

        let tx = self.db.transaction_with_str(store).map_err(failed)?;
        let request = tx
            .object_store(store)
            .map_err(failed)?
            .get(&key)
            .map_err(failed)?;
        let value = settle(&request).await.map_err(failed)?;

        match value.as_string() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, record: Record) -> Result<Record, StorageError> {
        let failed = |e: JsValue| StorageError::write_failed(BackendKind::Structured, describe(&e));

        let (store, key) = match &record {
            Record::Setting(setting) => (SETTINGS, JsValue::from_str(&setting.key)),
            Record::Document(document) => (DOCUMENTS, document_key(document.id)),
            Record::Sample(sample) => (SAMPLES, JsValue::from_str(&sample.key)),
        };
        let json = record.to_json()?;

        let tx = self
            .db
            .transaction_with_str_and_mode(store, IdbTransactionMode::Readwrite)
            .map_err(failed)?;
        let done = completion(&tx);
        tx.object_store(store)
            .map_err(failed)?
            .put_with_key(&JsValue::from_str(&json), &key)
            .map_err(failed)?;
        done.await.map_err(|event| failed(failure(&tx, event)))?;
        Ok(record)
    }
}

/// Create whatever object stores are missing.
fn upgrade(request: &IdbOpenDbRequest) -> Result<(), JsValue> {
    let db: IdbDatabase = request.result()?.dyn_into()?;
    let existing = db.object_store_names();

    for store in [SETTINGS, SAMPLES] {
        if !existing.contains(store) {
            db.create_object_store(store)?;
        }
    }

    if !existing.contains(DOCUMENTS) {
        let documents = db.create_object_store(DOCUMENTS)?;
        // A store created just now is empty.
        let welcome = Record::from(Document::new(WELCOME_DOCUMENT_ID, WELCOME_DOCUMENT))
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        documents.put_with_key(
            &JsValue::from_str(&welcome),
            &document_key(WELCOME_DOCUMENT_ID),
        )?;
        tracing::info!("seeded welcome document");
    }
    Ok(())
}

fn document_key(id: i64) -> JsValue {
    JsValue::from_f64(id as f64)
}

/// Wait for `request` to finish and hand back its result.
///
/// Handlers are attached before the first await; requests never complete
/// within the task that made them.
async fn settle(request: &IdbRequest) -> Result<JsValue, JsValue> {
    let done = Promise::new(&mut |resolve: Function, reject: Function| {
        request.set_onsuccess(Some(&resolve));
        request.set_onerror(Some(&reject));
    });
    let outcome = JsFuture::from(done).await;
    request.set_onsuccess(None);
    request.set_onerror(None);

    match outcome {
        Ok(_) => request.result(),
        Err(event) => Err(failure(request, event)),
    }
}

/// Resolves when `tx` commits, rejects when it errors or aborts.
fn completion(tx: &IdbTransaction) -> JsFuture {
    let done = Promise::new(&mut |resolve: Function, reject: Function| {
        tx.set_oncomplete(Some(&resolve));
        tx.set_onerror(Some(&reject));
        tx.set_onabort(Some(&reject));
    });
    JsFuture::from(done)
}

/// The `error` a request or transaction carries, or the event that reported it.
fn failure(target: &JsValue, event: JsValue) -> JsValue {
    Reflect::get(target, &JsValue::from_str("error"))
        .ok()
        .filter(|error| !error.is_null() && !error.is_undefined())
        .unwrap_or(event)
}

fn describe(value: &JsValue) -> String {
    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        return format!("{}: {}", exception.name(), exception.message());
    }
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}
