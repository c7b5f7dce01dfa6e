//! Bare URL autolinking.
//!
//! The parser only links `<https://...>`-style autolinks. This pass finds bare
//! `http://`, `https://` and `www.` URLs in text and wraps them in links, the
//! way GFM's extended autolinks do. Text inside links, images, code blocks and
//! inline `<a>` HTML is left alone.

use markdown_weaver::{CowStr, Event, LinkType, Tag, TagEnd};
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use regex::Regex;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
use regex_lite::Regex;

use crate::error::LoadError;

const URL_PATTERN: &str = r"(?i)(?:https?://|www\.)[^\s<>]+";

#[derive(Debug, Clone)]
pub struct Autolinker {
    pattern: Regex,
}

impl Autolinker {
    pub fn new() -> Result<Self, LoadError> {
        let pattern = Regex::new(URL_PATTERN).map_err(LoadError::new)?;
        Ok(Self { pattern })
    }

    /// Rewrite an event stream, linking bare URLs in plain text.
    pub fn apply<'a>(&self, events: Vec<Event<'a>>) -> Vec<Event<'a>> {
        let mut out = Vec::with_capacity(events.len());
        let mut skip_depth = 0usize;
        let mut pending: Option<String> = None;

        for event in events {
            if let Event::Text(text) = &event {
                if skip_depth == 0 {
                    pending.get_or_insert_with(String::new).push_str(text);
                    continue;
                }
            }
            if let Some(text) = pending.take() {
                self.link_text(text, &mut out);
            }

            match &event {
                Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                    skip_depth += 1
                }
                Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                    skip_depth = skip_depth.saturating_sub(1)
                }
                Event::InlineHtml(html) if opens_anchor(html) => skip_depth += 1,
                Event::InlineHtml(html) if closes_anchor(html) => {
                    skip_depth = skip_depth.saturating_sub(1)
                }
                _ => {}
            }
            out.push(event);
        }
        if let Some(text) = pending.take() {
            self.link_text(text, &mut out);
        }
        out
    }

    fn link_text<'a>(&self, text: String, out: &mut Vec<Event<'a>>) {
        let mut last = 0;
        for found in self.pattern.find_iter(&text) {
            let start = found.start();
            if !at_boundary(&text[..start]) {
                continue;
            }
            let url = trim_trailing(found.as_str());
            if url.len() <= "www.".len() || !url.contains('.') {
                continue;
            }
            let end = start + url.len();

            if start > last {
                out.push(Event::Text(CowStr::from(text[last..start].to_owned())));
            }
            let dest = if url.len() >= 4 && url[..4].eq_ignore_ascii_case("www.") {
                format!("http://{}", url)
            } else {
                url.to_owned()
            };
            out.push(Event::Start(Tag::Link {
                link_type: LinkType::Autolink,
                dest_url: CowStr::from(dest),
                title: CowStr::from(""),
                id: CowStr::from(""),
            }));
            out.push(Event::Text(CowStr::from(url.to_owned())));
            out.push(Event::End(TagEnd::Link));
            last = end;
        }
        if last < text.len() {
            out.push(Event::Text(CowStr::from(text[last..].to_owned())));
        }
    }
}

fn opens_anchor(html: &str) -> bool {
    let html = html.trim_start();
    html.len() > 2
        && html[..2].eq_ignore_ascii_case("<a")
        && html[2..].starts_with(|c: char| c.is_whitespace() || c == '>')
}

fn closes_anchor(html: &str) -> bool {
    html.trim().eq_ignore_ascii_case("</a>")
}

/// A URL has to start a word: at the beginning of the text or after
/// whitespace or one of the emphasis/paren delimiters.
fn at_boundary(before: &str) -> bool {
    match before.chars().next_back() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '(' | '*' | '_' | '~' | '"' | '\''),
    }
}

/// Drop trailing punctuation that is more likely sentence than URL, and a
/// closing paren that has no opening partner inside the URL.
fn trim_trailing(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().next_back() else {
            return url;
        };
        let trimmed = match last {
            '?' | '!' | '.' | ',' | ':' | '*' | '_' | '~' | '\'' | '"' | ';' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trimmed {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}
