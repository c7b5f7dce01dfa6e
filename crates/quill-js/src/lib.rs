//! WASM bindings for quill.
//!
//! Exposes the preview renderer, the storage API and an editor session to
//! the JS view layer. Everything here is asynchronous on the JS side and
//! resolves to plain strings and objects.

use quill_renderer::get_or_create_processor;
use wasm_bindgen::prelude::*;

mod editor;
mod storage;
mod types;

pub use editor::QuillEditor;
pub use storage::*;
pub use types::*;

/// Install the panic hook and console tracing.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    quill_common::telemetry::init(quill_common::telemetry::TelemetryConfig::from_env(
        "quill-js",
    ));
}

/// Render markdown to sanitized HTML with the shared processor.
///
/// Rejects only when the pipeline modules could not be loaded; a later call
/// retries the load.
#[wasm_bindgen(js_name = renderMarkdown)]
pub async fn render_markdown(markdown: String) -> Result<String, JsError> {
    get_or_create_processor()
        .process(&markdown)
        .await
        .map_err(|e| JsError::new(&e.to_string()))
}
