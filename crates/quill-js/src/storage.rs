//! Promise-returning storage API.
//!
//! None of these reject. Missing values and storage faults both resolve to
//! `undefined`, saves resolve once the write was attempted.

use quill_storage::Persistence;
use wasm_bindgen::prelude::*;

use crate::types::{JsDocument, to_js};

#[wasm_bindgen(js_name = getDocument)]
pub async fn get_document(id: i32) -> JsValue {
    match Persistence::global().get_document(i64::from(id)).await {
        Some(doc) => to_js(&JsDocument::from(doc)),
        None => JsValue::UNDEFINED,
    }
}

#[wasm_bindgen(js_name = saveDocument)]
pub async fn save_document(id: i32, content: String) {
    Persistence::global()
        .save_document(i64::from(id), content)
        .await
}

#[wasm_bindgen(js_name = getSetting)]
pub async fn get_setting(key: String) -> Option<String> {
    Persistence::global().get_setting(&key).await
}

#[wasm_bindgen(js_name = saveSetting)]
pub async fn save_setting(key: String, value: String) {
    Persistence::global().save_setting(key, value).await
}

/// Which storage tier the page ended up on: `"structured"`, `"flat"` or
/// `"null"`.
///
/// Resolves once the one-time storage probe has finished.
#[wasm_bindgen(js_name = storageBackend)]
pub async fn storage_backend() -> String {
    Persistence::global().backend_kind().await.to_string()
}
