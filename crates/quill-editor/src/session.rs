//! One editing session over the active document.
//!
//! Typing updates the local content at once, schedules a preview render on
//! the render window, and schedules a save on the (longer) save window. Saves
//! write the document and, when a sample is selected, that sample's cached
//! copy, so coming back to a sample shows the edited version.

use std::sync::Arc;
use std::time::Duration;

use n0_future::task;
use quill_common::{Debouncer, EditorConfig, QuillConfig};
use quill_renderer::{DEFAULT_EXPORT_TITLE, Preview, Processor, RenderResult, standalone_document};
use quill_storage::{
    DocumentHandle, Persistence, SampleError, SampleInfo, SampleLibrary, SettingHandle,
};
use tokio::sync::watch;

use crate::samples::BLANK_SAMPLE_CONTENT;

pub const SELECTED_SAMPLE_KEY: &str = "selectedSample";
pub const THEME_KEY: &str = "theme";

pub const LIGHT_THEME: &str = "light";
pub const DARK_THEME: &str = "dark";

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSave {
    content: String,
    sample: Option<String>,
}

struct Persister {
    persistence: Persistence,
    samples: SampleLibrary,
    document_id: i64,
}

impl Persister {
    async fn persist(&self, save: PendingSave) {
        tracing::debug!(id = self.document_id, sample = ?save.sample, "saving document");
        self.persistence
            .save_document(self.document_id, save.content.clone())
            .await;
        if let Some(key) = save.sample {
            self.samples.update_sample(&key, save.content).await;
        }
    }
}

pub struct EditorSession {
    config: EditorConfig,
    persister: Arc<Persister>,
    document: DocumentHandle,
    selected_sample: SettingHandle,
    theme: SettingHandle,
    preview: Preview,
    saver: Debouncer<PendingSave>,
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("document_id", &self.config.document_id)
            .field("selected_sample", &self.selected_sample.value())
            .field("theme", &self.theme.value())
            .field("preview", &self.preview)
            .field("saver", &self.saver)
            .finish()
    }
}

impl EditorSession {
    /// Open the active document and the editor settings, wait for their stored
    /// values, and render the initial preview.
    ///
    /// When a sample is selected and has a cached copy, that copy replaces the
    /// stored document.
    pub async fn open(
        config: &QuillConfig,
        persistence: Persistence,
        samples: SampleLibrary,
        processor: Arc<Processor>,
    ) -> Self {
        let editor = config.editor.clone();

        let document = DocumentHandle::open(
            persistence.clone(),
            editor.document_id,
            editor.default_content.clone(),
        );
        let selected_sample = SettingHandle::open(
            persistence.clone(),
            SELECTED_SAMPLE_KEY,
            editor.default_sample.clone(),
        );
        let theme = SettingHandle::open(
            persistence.clone(),
            THEME_KEY,
            editor.default_theme.clone(),
        );

        let preview = Preview::new(processor, Duration::from_millis(config.render.debounce_ms));

        let persister = Arc::new(Persister {
            persistence,
            samples,
            document_id: editor.document_id,
        });
        let saving = Arc::clone(&persister);
        let saver = Debouncer::new(
            Duration::from_millis(editor.save_debounce_ms),
            move |save: PendingSave| {
                let persister = Arc::clone(&saving);
                task::spawn(async move {
                    persister.persist(save).await;
                });
            },
        );

        document.loaded().await;
        let selection = selected_sample.loaded().await.value;
        theme.loaded().await;

        // The selected sample's cached copy is what the editor last showed.
        if !selection.is_empty() {
            if let Some(cached) = persister
                .persistence
                .get_sample(&selection)
                .await
                .filter(|content| !content.is_empty())
            {
                tracing::debug!(key = %selection, "restoring selected sample");
                document.set_content(cached);
            }
        }

        let session = Self {
            config: editor,
            persister,
            document,
            selected_sample,
            theme,
            preview,
            saver,
        };
        session.preview.render(&session.document.content()).await;
        let backend = session.persister.persistence.backend_kind().await;
        tracing::debug!(
            id = session.config.document_id,
            %backend,
            "editor session opened"
        );
        session
    }

    pub fn content(&self) -> String {
        self.document.content()
    }

    /// Take new editor content.
    pub fn edit(&self, content: impl Into<String>) {
        let content = content.into();
        self.document.set_content(content.clone());
        self.preview.schedule(content.clone());

        let sample = Some(self.selected_sample.value()).filter(|key| !key.is_empty());
        self.saver.call(PendingSave { content, sample });
    }

    /// Load a sample into the editor and remember it as the selection.
    ///
    /// An empty key clears the selection and shows the blank starter text.
    /// Unsaved edits to the previous sample are saved first.
    pub async fn select_sample(&self, key: &str) -> Result<String, SampleError> {
        if !key.is_empty() && !self.samples().iter().any(|info| info.key == key) {
            return Err(SampleError::Unknown(key.to_owned()));
        }

        self.flush().await;
        self.selected_sample.save(key);

        let content = if key.is_empty() {
            BLANK_SAMPLE_CONTENT.to_owned()
        } else {
            self.persister.samples.get_sample(key).await
        };
        tracing::debug!(key, len = content.len(), "sample selected");

        self.document.set_content(content.clone());
        self.preview.schedule(content.clone());
        Ok(content)
    }

    pub fn selected_sample(&self) -> String {
        self.selected_sample.value()
    }

    pub fn samples(&self) -> Vec<SampleInfo> {
        self.persister.samples.samples()
    }

    pub fn theme(&self) -> String {
        self.theme.value()
    }

    pub fn set_theme(&self, value: impl Into<String>) {
        self.theme.save(value);
    }

    /// Flip between light and dark, returning the new theme.
    pub fn toggle_theme(&self) -> String {
        let next = if self.theme() == DARK_THEME {
            LIGHT_THEME
        } else {
            DARK_THEME
        };
        self.set_theme(next);
        next.to_owned()
    }

    pub fn preview(&self) -> watch::Receiver<RenderResult> {
        self.preview.subscribe()
    }

    pub fn html(&self) -> String {
        self.preview.current().html
    }

    pub fn is_loading(&self) -> bool {
        self.preview.current().is_loading
    }

    /// Drop any scheduled render and render the current content now.
    pub async fn render_now(&self) -> RenderResult {
        self.preview.cancel();
        self.preview.render(&self.content()).await;
        self.preview.current()
    }

    /// The current preview as a complete HTML page, if there is anything to
    /// export.
    pub fn export_html(&self) -> Option<String> {
        standalone_document(&self.html(), DEFAULT_EXPORT_TITLE)
    }

    /// Run the pending save now. Returns whether there was one.
    pub async fn flush(&self) -> bool {
        match self.saver.take() {
            Some(save) => {
                self.persister.persist(save).await;
                true
            }
            None => false,
        }
    }

    /// Drop pending saves and renders.
    pub fn close(&self) {
        self.saver.cancel();
        self.preview.cancel();
    }
}
