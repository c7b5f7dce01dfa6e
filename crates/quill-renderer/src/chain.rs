//! The transformation chain.
//!
//! Stages always run in [`Stage`] order, each handing its output to the next:
//! markdown text, parsed events, extended events, raw HTML, sanitized
//! document, HTML string. A panic inside a stage is caught and reported as a
//! [`ProcessError`] naming that stage.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use markdown_weaver::{Event, Parser};

use crate::error::ProcessError;
use crate::html;
use crate::modules::PipelineModules;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Parse,
    Extend,
    Convert,
    Sanitize,
    Serialize,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Parse,
        Stage::Extend,
        Stage::Convert,
        Stage::Sanitize,
        Stage::Serialize,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Parse => "parse",
            Stage::Extend => "extend",
            Stage::Convert => "convert",
            Stage::Sanitize => "sanitize",
            Stage::Serialize => "serialize",
        })
    }
}

/// A configured chain over one set of loaded modules.
#[derive(Debug, Clone)]
pub struct Chain {
    modules: Arc<PipelineModules>,
}

impl Chain {
    pub fn new(modules: Arc<PipelineModules>) -> Self {
        Self { modules }
    }

    pub fn modules(&self) -> &Arc<PipelineModules> {
        &self.modules
    }

    /// Run every stage over `markdown`.
    pub fn run(&self, markdown: &str) -> Result<String, ProcessError> {
        let events = stage(Stage::Parse, || Ok(self.parse(markdown)))?;
        let events = stage(Stage::Extend, || Ok(self.extend(events)))?;
        let raw = stage(Stage::Convert, || self.convert(events))?;
        let document = stage(Stage::Sanitize, || Ok(self.sanitize(&raw)))?;
        stage(Stage::Serialize, || Ok(document.to_string()))
    }

    fn parse<'a>(&self, markdown: &'a str) -> Vec<Event<'a>> {
        Parser::new_ext(markdown, self.modules.options).collect()
    }

    fn extend<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        self.modules.autolink.apply(events)
    }

    fn convert(&self, events: Vec<Event<'_>>) -> Result<String, ProcessError> {
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter(), self.modules.html_options())
            .map_err(|e| ProcessError::new(Stage::Convert, e))?;
        Ok(out)
    }

    fn sanitize(&self, raw: &str) -> ammonia::Document {
        self.modules.sanitizer.clean(raw)
    }
}

fn stage<T>(
    stage: Stage,
    f: impl FnOnce() -> Result<T, ProcessError>,
) -> Result<T, ProcessError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panicked".to_owned());
            Err(ProcessError::new(stage, message))
        }
    }
}

#[cfg(test)]
mod tests {
    use quill_common::RenderConfig;

    use super::*;
    use crate::modules::BuiltinModules;

    fn chain() -> Chain {
        let modules = BuiltinModules::new(RenderConfig {
            highlight_code: false,
            ..Default::default()
        })
        .load_now()
        .unwrap();
        Chain::new(Arc::new(modules))
    }

    #[test]
    fn renders_gfm() {
        let html = chain().run("# Title\n\n~~gone~~ and https://example.com\n").unwrap();
        insta::assert_snapshot!(html.trim(), @r#"
        <h1>Title</h1>
        <p><del>gone</del> and <a href="https://example.com">https://example.com</a></p>
        "#);
    }

    #[test]
    fn panics_are_attributed_to_their_stage() {
        let err = stage(Stage::Extend, || -> Result<(), ProcessError> {
            panic!("boom");
        })
        .unwrap_err();
        assert_eq!(err.stage(), Stage::Extend);
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn stages_run_in_order() {
        let names: Vec<_> = Stage::ALL.iter().map(Stage::to_string).collect();
        assert_eq!(names, ["parse", "extend", "convert", "sanitize", "serialize"]);
    }
}
