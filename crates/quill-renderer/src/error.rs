use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::chain::Stage;

/// The pipeline modules could not be loaded.
#[derive(Debug, Error, Diagnostic)]
pub enum LoadError {
    #[error("failed to load pipeline modules: {message}")]
    #[diagnostic(
        code(render::load),
        help("the load is retried on the next render")
    )]
    PipelineLoadFailed { message: String },
}

impl LoadError {
    pub fn new(message: impl ToString) -> Self {
        Self::PipelineLoadFailed {
            message: message.to_string(),
        }
    }
}

/// A stage of the transformation chain failed.
#[derive(Debug, Error, Diagnostic)]
pub enum ProcessError {
    #[error("{stage} stage failed: {message}")]
    #[diagnostic(code(render::process))]
    PipelineProcessFailed { stage: Stage, message: String },
}

impl ProcessError {
    pub fn new(stage: Stage, message: impl ToString) -> Self {
        Self::PipelineProcessFailed {
            stage,
            message: message.to_string(),
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::PipelineProcessFailed { stage, .. } => *stage,
        }
    }
}

/// What [`Processor::process`](crate::Processor::process) can fail with.
///
/// Stage failures never show up here; they become inline error HTML.
#[derive(Debug, Error, Diagnostic)]
pub enum RenderError {
    #[error("markdown pipeline unavailable: {0}")]
    #[diagnostic(
        code(render::unavailable),
        help("keep showing the previous preview; the next render retries the load")
    )]
    PipelineLoadFailed(#[source] Arc<LoadError>),
}
