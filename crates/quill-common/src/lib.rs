//! Shared plumbing for the quill crates: configuration, tracing setup,
//! debounced scheduling and timing helpers.

pub mod config;
pub mod error;
pub mod perf;
pub mod schedule;
pub mod telemetry;

pub use crate::config::{
    DEFAULT_DOCUMENT_CONTENT, EditorConfig, QuillConfig, RenderConfig, StorageConfig,
};
pub use crate::error::ConfigError;
pub use crate::schedule::{Debouncer, debounce};
