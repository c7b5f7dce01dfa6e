use quill_storage::StaticSamples;

const HELLO_MD: &str = include_str!("../samples/hello.md");
const INTRO_MD: &str = include_str!("../samples/intro.md");
const FEATURES_MD: &str = include_str!("../samples/features.md");
const USAGE_MD: &str = include_str!("../samples/usage.md");

/// Shown when no sample is selected.
pub const BLANK_SAMPLE_CONTENT: &str = "# Hello, Markdown!\n\nStart typing to see live preview!";

/// The samples shipped with the editor, in menu order.
pub fn builtin_samples() -> StaticSamples {
    StaticSamples::new()
        .with("hello", "Hello World", HELLO_MD)
        .with("intro", "Introduction", INTRO_MD)
        .with("features", "Features", FEATURES_MD)
        .with("usage", "Usage Guide", USAGE_MD)
}
