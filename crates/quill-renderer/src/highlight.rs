//! Classed syntax highlighting with syntect.
//!
//! Output is `<span class="...">` markup only, no inline styles, so it
//! survives sanitization and is themed by the page stylesheet.

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

#[derive(Debug)]
pub struct Highlighter {
    syntaxes: SyntaxSet,
}

impl Highlighter {
    /// Load the bundled syntax definitions.
    pub fn load() -> Self {
        let _timing = quill_common::perf::TimingGuard::new("syntax set load");
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Highlight `code` as `language`, if the language is known.
    pub fn highlight(&self, language: &str, code: &str) -> Option<String> {
        let syntax = self.syntaxes.find_syntax_by_token(language)?;
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                tracing::debug!(language, error = %e, "highlighting failed, emitting plain code");
                return None;
            }
        }
        Some(generator.finalize())
    }
}
