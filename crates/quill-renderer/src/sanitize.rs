//! Allow-list sanitizer policy.
//!
//! This is the only thing standing between untrusted markdown (which may carry
//! raw HTML) and the preview DOM. Anything not listed here is dropped: unknown
//! tags are unwrapped to their text, and the tags in [`REMOVED_WITH_CONTENT`]
//! disappear together with everything inside them.

use std::collections::{HashMap, HashSet};

use ammonia::{Builder, UrlRelative};

pub const ALLOWED_TAGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "em", "strong", "del", "s", "b", "i",
    "ul", "ol", "li", "blockquote", "code", "pre", "a", "img", "table", "thead", "tbody", "tr",
    "th", "td", "div", "span", "input", "sup",
];

pub const REMOVED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "textarea", "noscript", "template",
];

pub const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

const TAG_ATTRIBUTES: &[(&str, &[&str])] = &[
    ("a", &["href", "title", "rel"]),
    ("div", &["id"]),
    ("img", &["src", "alt", "title"]),
    ("code", &["data-language"]),
    ("ol", &["start"]),
    ("th", &["align"]),
    ("td", &["align"]),
    ("input", &["checked"]),
];

/// Build the sanitizer used by the sanitize stage.
pub fn policy() -> Builder<'static> {
    let tag_attributes: HashMap<&'static str, HashSet<&'static str>> = TAG_ATTRIBUTES
        .iter()
        .map(|(tag, attrs)| (*tag, attrs.iter().copied().collect()))
        .collect();

    let mut builder = Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .clean_content_tags(REMOVED_WITH_CONTENT.iter().copied().collect())
        .generic_attributes(HashSet::from(["class"]))
        .tag_attributes(tag_attributes)
        // Inputs only ever render as read-only checkboxes.
        .set_tag_attribute_value("input", "type", "checkbox")
        .set_tag_attribute_value("input", "disabled", "")
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .url_relative(UrlRelative::PassThrough)
        .link_rel(None)
        .strip_comments(true);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(html: &str) -> String {
        policy().clean(html).to_string()
    }

    #[test]
    fn scripts_are_removed_with_their_content() {
        let out = clean("<p>hi</p><script>alert(1)</script>");
        assert_eq!(out, "<p>hi</p>");
    }

    #[test]
    fn unknown_tags_are_unwrapped() {
        assert_eq!(clean("<section><p>x</p></section>"), "<p>x</p>");
        assert_eq!(clean("<font color=red>x</font>"), "x");
    }

    #[test]
    fn event_handlers_and_styles_are_dropped() {
        let out = clean(r#"<p onclick="evil()" style="color:red" class="note">x</p>"#);
        assert_eq!(out, r#"<p class="note">x</p>"#);
    }

    #[test]
    fn javascript_urls_are_dropped() {
        let out = clean(r#"<a href="javascript:alert(1)">x</a>"#);
        assert!(!out.contains("javascript"));
        assert!(out.contains(">x</a>"));
    }

    #[test]
    fn relative_and_mailto_links_pass() {
        let out = clean(r##"<a href="#fn-1">1</a><a href="mailto:me@example.com">m</a>"##);
        assert!(out.contains(r##"href="#fn-1""##));
        assert!(out.contains(r#"href="mailto:me@example.com""#));
    }

    #[test]
    fn inputs_become_disabled_checkboxes() {
        let out = clean(r#"<input type="text" value="x" checked="">"#);
        assert!(out.contains(r#"type="checkbox""#));
        assert!(out.contains("disabled"));
        assert!(out.contains("checked"));
        assert!(!out.contains("value"));
    }

    #[test]
    fn footnote_targets_keep_their_ids() {
        let out = clean(
            r##"<sup class="footnote-reference"><a href="#fn-1">1</a></sup><div class="footnote-definition" id="fn-1"><p>note</p></div>"##,
        );
        assert!(out.contains(r##"href="#fn-1""##));
        assert!(out.contains(r#"id="fn-1""#));
    }

    #[test]
    fn ids_are_only_kept_on_divs() {
        assert_eq!(clean(r#"<p id="x">a</p>"#), "<p>a</p>");
    }

    #[test]
    fn links_cannot_open_new_browsing_contexts() {
        let out = clean(r#"<a href="https://example.com" target="_blank">x</a>"#);
        assert!(!out.contains("target"));
        assert!(out.contains(r#"href="https://example.com""#));
    }

    #[test]
    fn comments_are_stripped() {
        assert_eq!(clean("<p>a<!-- hidden --></p>"), "<p>a</p>");
    }
}
