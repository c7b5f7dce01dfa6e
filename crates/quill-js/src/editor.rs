//! QuillEditor - the editing session exposed to JavaScript.

use std::rc::Rc;
use std::sync::Arc;

use js_sys::{Array, Function, Promise};
use quill_common::QuillConfig;
use quill_editor::{EditorSession, builtin_samples};
use quill_renderer::get_or_create_processor;
use quill_storage::{Persistence, SampleLibrary};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

use crate::types::{JsRenderResult, JsSampleInfo, to_js};

/// An editor over the active document, its live preview and the editor
/// settings.
///
/// Create one with `await QuillEditor.open()`.
#[wasm_bindgen]
pub struct QuillEditor {
    session: Rc<EditorSession>,
}

#[wasm_bindgen]
impl QuillEditor {
    /// Open the session on the page's storage tier and render the initial
    /// preview.
    pub async fn open() -> QuillEditor {
        let config = QuillConfig::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "invalid config, using defaults");
            QuillConfig::default()
        });
        let persistence = Persistence::global();
        let samples = SampleLibrary::new(persistence.clone(), Arc::new(builtin_samples()));
        let session =
            EditorSession::open(&config, persistence, samples, get_or_create_processor()).await;
        QuillEditor {
            session: Rc::new(session),
        }
    }

    /// Take new editor content. The preview and the save follow on their own
    /// settling windows.
    pub fn edit(&self, text: String) {
        self.session.edit(text);
    }

    /// Load a sample by key. Resolves to the new content, rejects for keys
    /// outside the catalog.
    #[wasm_bindgen(js_name = selectSample)]
    pub fn select_sample(&self, key: String) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            session
                .select_sample(&key)
                .await
                .map(JsValue::from)
                .map_err(|e| JsError::new(&e.to_string()).into())
        })
    }

    pub fn content(&self) -> String {
        self.session.content()
    }

    pub fn html(&self) -> String {
        self.session.html()
    }

    #[wasm_bindgen(js_name = isLoading)]
    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    #[wasm_bindgen(js_name = selectedSample)]
    pub fn selected_sample(&self) -> String {
        self.session.selected_sample()
    }

    pub fn theme(&self) -> String {
        self.session.theme()
    }

    #[wasm_bindgen(js_name = setTheme)]
    pub fn set_theme(&self, value: String) {
        self.session.set_theme(value);
    }

    #[wasm_bindgen(js_name = toggleTheme)]
    pub fn toggle_theme(&self) -> String {
        self.session.toggle_theme()
    }

    /// Call `callback(result)` with a `JsRenderResult` every time the preview
    /// changes. Listening stops when the editor is freed.
    #[wasm_bindgen(js_name = onPreview)]
    pub fn on_preview(&self, callback: Function) {
        let mut rx = self.session.preview();
        spawn_local(async move {
            while rx.changed().await.is_ok() {
                let result = JsRenderResult::from(rx.borrow_and_update().clone());
                if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from(result)) {
                    tracing::warn!(error = ?e, "preview listener threw");
                }
            }
        });
    }

    /// The sample catalog as `[{ key, title }]`.
    pub fn samples(&self) -> Array {
        self.session
            .samples()
            .into_iter()
            .map(|info| to_js(&JsSampleInfo::from(info)))
            .collect()
    }

    /// The preview as a standalone HTML page, or `undefined` when empty.
    #[wasm_bindgen(js_name = exportHtml)]
    pub fn export_html(&self) -> Option<String> {
        self.session.export_html()
    }

    /// Save pending edits now. Resolves to whether there were any.
    pub fn flush(&self) -> Promise {
        let session = Rc::clone(&self.session);
        future_to_promise(async move { Ok(JsValue::from(session.flush().await)) })
    }

    /// Drop pending saves and renders.
    pub fn close(&self) {
        self.session.close();
    }
}
