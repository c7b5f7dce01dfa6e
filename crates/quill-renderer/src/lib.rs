//! Markdown to sanitized HTML for the live preview.
//!
//! The [`Processor`] loads its [`PipelineModules`] lazily through a
//! coalescing [`PipelineLoader`] and runs every input through the same
//! [`Chain`]: parse, GFM extensions, HTML conversion, allow-list sanitizing,
//! serialization. [`Preview`] wraps it in debounced, reactive state, and
//! [`standalone_document`] turns a finished preview into an exportable page.

pub mod autolink;
pub mod chain;
pub mod document;
pub mod error;
#[cfg(feature = "syntax-highlighting")]
pub mod highlight;
pub mod html;
pub mod loader;
pub mod modules;
pub mod preview;
pub mod processor;
pub mod sanitize;

pub use crate::chain::{Chain, Stage};
pub use crate::document::{DEFAULT_EXPORT_TITLE, standalone_document};
pub use crate::error::{LoadError, ProcessError, RenderError};
pub use crate::loader::PipelineLoader;
pub use crate::modules::{BuiltinModules, ModuleSource, PipelineModules, markdown_options};
pub use crate::preview::{Preview, RenderResult};
pub use crate::processor::{Processor, RENDER_ERROR_HTML, get_or_create_processor};
