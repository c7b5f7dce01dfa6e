use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use quill_common::QuillConfig;
use quill_common::perf::TimingGuard;

use crate::chain::Chain;
use crate::error::RenderError;
use crate::loader::PipelineLoader;
use crate::modules::{BuiltinModules, ModuleSource};

/// Shown in place of the preview when a stage fails.
pub const RENDER_ERROR_HTML: &str =
    r#"<div class="render-error"><p>Error parsing markdown</p></div>"#;

/// Turns markdown into sanitized HTML.
///
/// Modules are loaded on the first non-blank input and the chain over them is
/// built once; every later call reuses both.
#[derive(Debug)]
pub struct Processor {
    loader: PipelineLoader,
    chain: OnceLock<Chain>,
    runs: AtomicUsize,
}

impl Processor {
    pub fn new(source: impl ModuleSource + 'static) -> Self {
        Self::from_source(Arc::new(source))
    }

    pub fn from_source(source: Arc<dyn ModuleSource>) -> Self {
        Self {
            loader: PipelineLoader::new(source),
            chain: OnceLock::new(),
            runs: AtomicUsize::new(0),
        }
    }

    /// The process-wide processor over the built-in modules.
    pub fn shared() -> Arc<Processor> {
        static SHARED: OnceLock<Arc<Processor>> = OnceLock::new();
        SHARED
            .get_or_init(|| {
                let config = QuillConfig::from_env().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "invalid render environment, using defaults");
                    QuillConfig::default()
                });
                Arc::new(Processor::new(BuiltinModules::new(config.render)))
            })
            .clone()
    }

    pub fn loader(&self) -> &PipelineLoader {
        &self.loader
    }

    /// How many times the chain has run.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    pub async fn process(&self, markdown: &str) -> Result<String, RenderError> {
        if markdown.trim().is_empty() {
            return Ok(String::new());
        }

        let modules = self
            .loader
            .load_modules()
            .await
            .map_err(RenderError::PipelineLoadFailed)?;
        let chain = self.chain.get_or_init(|| Chain::new(modules));

        self.runs.fetch_add(1, Ordering::SeqCst);
        let _timing = TimingGuard::new("markdown chain run");
        match chain.run(markdown) {
            Ok(html) => Ok(html),
            Err(e) => {
                tracing::error!(stage = %e.stage(), error = %e, "error parsing markdown");
                Ok(RENDER_ERROR_HTML.to_owned())
            }
        }
    }
}

/// Shorthand for [`Processor::shared`].
pub fn get_or_create_processor() -> Arc<Processor> {
    Processor::shared()
}
