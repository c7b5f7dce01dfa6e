//! The loadable parts of the transformation chain.

use markdown_weaver::Options;
use quill_common::RenderConfig;

use crate::autolink::Autolinker;
use crate::error::LoadError;
#[cfg(feature = "syntax-highlighting")]
use crate::highlight::Highlighter;
use crate::html::{HighlightCode, HtmlOptions};

/// Parser options for the GFM superset.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM
}

/// Everything the chain needs, loaded once.
pub struct PipelineModules {
    pub options: Options,
    pub autolink: Autolinker,
    pub allow_raw_html: bool,
    pub sanitizer: ammonia::Builder<'static>,
    pub highlighter: Option<Box<dyn HighlightCode>>,
}

impl PipelineModules {
    pub fn html_options(&self) -> HtmlOptions<'_> {
        HtmlOptions {
            allow_raw_html: self.allow_raw_html,
            highlighter: self.highlighter.as_deref(),
        }
    }
}

impl std::fmt::Debug for PipelineModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineModules")
            .field("options", &self.options)
            .field("allow_raw_html", &self.allow_raw_html)
            .field("highlighting", &self.highlighter.is_some())
            .finish_non_exhaustive()
    }
}

/// Provides the pipeline modules.
#[async_trait::async_trait]
pub trait ModuleSource: Send + Sync {
    async fn load(&self) -> Result<PipelineModules, LoadError>;
}

/// Modules compiled into this crate.
#[derive(Debug, Clone, Default)]
pub struct BuiltinModules {
    config: RenderConfig,
}

impl BuiltinModules {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn load_now(&self) -> Result<PipelineModules, LoadError> {
        let _timing = quill_common::perf::TimingGuard::new("pipeline modules load");
        Ok(PipelineModules {
            options: markdown_options(),
            autolink: Autolinker::new()?,
            allow_raw_html: self.config.allow_raw_html,
            sanitizer: crate::sanitize::policy(),
            highlighter: self.highlighter(),
        })
    }

    #[cfg(feature = "syntax-highlighting")]
    fn highlighter(&self) -> Option<Box<dyn HighlightCode>> {
        self.config
            .highlight_code
            .then(|| Box::new(Highlighter::load()) as Box<dyn HighlightCode>)
    }

    #[cfg(not(feature = "syntax-highlighting"))]
    fn highlighter(&self) -> Option<Box<dyn HighlightCode>> {
        None
    }
}

#[async_trait::async_trait]
impl ModuleSource for BuiltinModules {
    async fn load(&self) -> Result<PipelineModules, LoadError> {
        self.load_now()
    }
}
