//! Plain objects handed to JavaScript.

use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Serialize)]
pub struct JsDocument {
    pub id: i64,
    pub content: String,
}

impl From<quill_storage::Document> for JsDocument {
    fn from(doc: quill_storage::Document) -> Self {
        Self {
            id: doc.id,
            content: doc.content,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsSampleInfo {
    pub key: String,
    pub title: String,
}

impl From<quill_storage::SampleInfo> for JsSampleInfo {
    fn from(info: quill_storage::SampleInfo) -> Self {
        Self {
            key: info.key,
            title: info.title,
        }
    }
}

/// Snapshot of the preview passed to `onPreview` listeners.
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsRenderResult {
    #[wasm_bindgen(getter_with_clone)]
    pub html: String,
    #[wasm_bindgen(js_name = isLoading)]
    pub is_loading: bool,
}

impl From<quill_renderer::RenderResult> for JsRenderResult {
    fn from(result: quill_renderer::RenderResult) -> Self {
        Self {
            html: result.html,
            is_loading: result.is_loading,
        }
    }
}

pub(crate) fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to convert value for js");
        JsValue::UNDEFINED
    })
}
