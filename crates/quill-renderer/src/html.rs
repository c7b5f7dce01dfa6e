//! Event stream to HTML.
//!
//! Output is unsanitized: raw HTML from the markdown is passed through (when
//! allowed) and cleaned up later by the sanitize stage.

use std::collections::HashMap;

use markdown_weaver::{
    Alignment, BlockQuoteKind, CodeBlockKind, CowStr, Event, Event::*, LinkType, Tag, TagEnd,
};
use markdown_weaver_escape::{FmtWriter, StrWrite, escape_href, escape_html, escape_html_body_text};

/// Something that can turn code into highlighted markup.
pub trait HighlightCode: Send + Sync {
    fn highlight(&self, language: &str, code: &str) -> Option<String>;
}

#[cfg(feature = "syntax-highlighting")]
impl HighlightCode for crate::highlight::Highlighter {
    fn highlight(&self, language: &str, code: &str) -> Option<String> {
        crate::highlight::Highlighter::highlight(self, language, code)
    }
}

#[derive(Clone, Copy, Default)]
pub struct HtmlOptions<'m> {
    /// Pass raw HTML through instead of escaping it.
    pub allow_raw_html: bool,
    pub highlighter: Option<&'m dyn HighlightCode>,
}

enum TableState {
    Head,
    Body,
}

/// A fenced or indented code block being collected.
struct CodeBlock {
    language: Option<String>,
    text: String,
}

struct HtmlWriter<'a, 'm, I, W> {
    iter: I,
    writer: W,
    options: HtmlOptions<'m>,

    /// Whether or not the last write wrote a newline.
    end_newline: bool,

    /// Inside a metadata or weaver block, whose text is not written.
    in_non_writing_block: bool,

    code_block: Option<CodeBlock>,

    table_state: TableState,
    table_alignments: Vec<Alignment>,
    table_cell_index: usize,
    numbers: HashMap<CowStr<'a>, usize>,
}

impl<'a, 'm, I, W> HtmlWriter<'a, 'm, I, W>
where
    I: Iterator<Item = Event<'a>>,
    W: StrWrite,
{
    fn new(iter: I, writer: W, options: HtmlOptions<'m>) -> Self {
        Self {
            iter,
            writer,
            options,
            end_newline: true,
            in_non_writing_block: false,
            code_block: None,
            table_state: TableState::Head,
            table_alignments: vec![],
            table_cell_index: 0,
            numbers: HashMap::new(),
        }
    }

    #[inline]
    fn write_newline(&mut self) -> Result<(), W::Error> {
        self.end_newline = true;
        self.writer.write_str("\n")
    }

    /// Writes a buffer, and tracks whether or not a newline was written.
    #[inline]
    fn write(&mut self, s: &str) -> Result<(), W::Error> {
        self.writer.write_str(s)?;

        if !s.is_empty() {
            self.end_newline = s.ends_with('\n');
        }
        Ok(())
    }

    /// Start a block-level tag on a fresh line.
    fn write_block(&mut self, s: &str) -> Result<(), W::Error> {
        if !self.end_newline {
            self.write_newline()?;
        }
        self.write(s)
    }

    fn run(mut self) -> Result<(), W::Error> {
        while let Some(event) = self.iter.next() {
            if let Some(block) = self.code_block.as_mut() {
                match event {
                    Text(text) => {
                        block.text.push_str(&text);
                        continue;
                    }
                    End(TagEnd::CodeBlock) => {
                        self.finish_code_block()?;
                        continue;
                    }
                    _ => {}
                }
            }

            match event {
                Start(tag) => self.start_tag(tag)?,
                End(tag) => self.end_tag(tag)?,
                Text(text) => {
                    if !self.in_non_writing_block {
                        escape_html_body_text(&mut self.writer, &text)?;
                        self.end_newline = text.ends_with('\n');
                    }
                }
                Code(text) => {
                    self.write("<code>")?;
                    escape_html_body_text(&mut self.writer, &text)?;
                    self.write("</code>")?;
                }
                InlineMath(text) => {
                    self.write(r#"<span class="math math-inline">"#)?;
                    escape_html(&mut self.writer, &text)?;
                    self.write("</span>")?;
                }
                DisplayMath(text) => {
                    self.write(r#"<span class="math math-display">"#)?;
                    escape_html(&mut self.writer, &text)?;
                    self.write("</span>")?;
                }
                Html(html) | InlineHtml(html) => {
                    if self.options.allow_raw_html {
                        self.write(&html)?;
                    } else {
                        escape_html_body_text(&mut self.writer, &html)?;
                        self.end_newline = html.ends_with('\n');
                    }
                }
                SoftBreak => self.write_newline()?,
                HardBreak => self.write("<br />\n")?,
                Rule => self.write_block("<hr />\n")?,
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    self.write("<sup class=\"footnote-reference\"><a href=\"#fn-")?;
                    escape_html(&mut self.writer, &name)?;
                    self.write("\">")?;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(&mut self.writer, "{}", number)?;
                    self.write("</a></sup>")?;
                }
                TaskListMarker(true) => {
                    self.write("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>\n")?
                }
                TaskListMarker(false) => self.write("<input disabled=\"\" type=\"checkbox\"/>\n")?,
                WeaverBlock(_) => {}
            }
        }
        Ok(())
    }

    fn start_tag(&mut self, tag: Tag<'a>) -> Result<(), W::Error> {
        match tag {
            Tag::HtmlBlock => Ok(()),
            Tag::Paragraph => self.write_block("<p>"),
            Tag::Heading { level, .. } => {
                if !self.end_newline {
                    self.write_newline()?;
                }
                write!(&mut self.writer, "<{}>", level)?;
                self.end_newline = false;
                Ok(())
            }
            Tag::Table(alignments) => {
                self.table_alignments = alignments;
                self.write_block("<table>")
            }
            Tag::TableHead => {
                self.table_state = TableState::Head;
                self.table_cell_index = 0;
                self.write("<thead><tr>")
            }
            Tag::TableRow => {
                self.table_cell_index = 0;
                self.write("<tr>")
            }
            Tag::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("<th")?,
                    TableState::Body => self.write("<td")?,
                }
                match self.table_alignments.get(self.table_cell_index) {
                    Some(&Alignment::Left) => self.write(" align=\"left\">"),
                    Some(&Alignment::Center) => self.write(" align=\"center\">"),
                    Some(&Alignment::Right) => self.write(" align=\"right\">"),
                    _ => self.write(">"),
                }
            }
            Tag::BlockQuote(kind) => {
                let class = match kind {
                    None => "",
                    Some(BlockQuoteKind::Note) => " class=\"markdown-alert-note\"",
                    Some(BlockQuoteKind::Tip) => " class=\"markdown-alert-tip\"",
                    Some(BlockQuoteKind::Important) => " class=\"markdown-alert-important\"",
                    Some(BlockQuoteKind::Warning) => " class=\"markdown-alert-warning\"",
                    Some(BlockQuoteKind::Caution) => " class=\"markdown-alert-caution\"",
                };
                self.write_block(&format!("<blockquote{}>\n", class))
            }
            Tag::CodeBlock(info) => {
                let language = match info {
                    CodeBlockKind::Fenced(info) => info
                        .split([' ', ','])
                        .next()
                        .filter(|lang| !lang.is_empty())
                        .map(str::to_owned),
                    CodeBlockKind::Indented => None,
                };
                self.code_block = Some(CodeBlock {
                    language,
                    text: String::new(),
                });
                Ok(())
            }
            Tag::List(Some(1)) => self.write_block("<ol>\n"),
            Tag::List(Some(start)) => {
                self.write_block("<ol start=\"")?;
                write!(&mut self.writer, "{}", start)?;
                self.write("\">\n")
            }
            Tag::List(None) => self.write_block("<ul>\n"),
            Tag::Item => self.write_block("<li>"),
            Tag::DefinitionList => self.write_block("<dl>\n"),
            Tag::DefinitionListTitle => self.write_block("<dt>"),
            Tag::DefinitionListDefinition => self.write_block("<dd>"),
            Tag::Subscript => self.write("<sub>"),
            Tag::Superscript => self.write("<sup>"),
            Tag::Emphasis => self.write("<em>"),
            Tag::Strong => self.write("<strong>"),
            Tag::Strikethrough => self.write("<del>"),
            Tag::Link {
                link_type: LinkType::Email,
                dest_url,
                title,
                id: _,
            } => {
                self.write("<a href=\"mailto:")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.write_title(&title)?;
                self.write("\">")
            }
            Tag::Link {
                link_type: _,
                dest_url,
                title,
                id: _,
            } => {
                self.write("<a href=\"")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.write_title(&title)?;
                self.write("\">")
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.write("<img src=\"")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.write("\" alt=\"")?;
                self.raw_text()?;
                self.write_title(&title)?;
                self.write("\" />")
            }
            // Embeds are shown as plain links to their target.
            Tag::Embed {
                dest_url, title, ..
            } => {
                self.write("<a class=\"embed\" href=\"")?;
                escape_href(&mut self.writer, &dest_url)?;
                self.write_title(&title)?;
                self.write("\">")
            }
            Tag::WeaverBlock(..) | Tag::MetadataBlock(_) => {
                self.in_non_writing_block = true;
                Ok(())
            }
            Tag::FootnoteDefinition(name) => {
                self.write_block("<div class=\"footnote-definition\" id=\"fn-")?;
                escape_html(&mut self.writer, &name)?;
                self.write("\"><sup class=\"footnote-definition-label\">")?;
                let len = self.numbers.len() + 1;
                let number = *self.numbers.entry(name).or_insert(len);
                write!(&mut self.writer, "{}", number)?;
                self.write("</sup>")
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) -> Result<(), W::Error> {
        match tag {
            TagEnd::HtmlBlock => {}
            TagEnd::Paragraph => self.write("</p>\n")?,
            TagEnd::Heading(level) => {
                write!(&mut self.writer, "</{}>", level)?;
                self.write_newline()?;
            }
            TagEnd::Table => self.write("</tbody></table>\n")?,
            TagEnd::TableHead => {
                self.write("</tr></thead><tbody>\n")?;
                self.table_state = TableState::Body;
            }
            TagEnd::TableRow => self.write("</tr>\n")?,
            TagEnd::TableCell => {
                match self.table_state {
                    TableState::Head => self.write("</th>")?,
                    TableState::Body => self.write("</td>")?,
                }
                self.table_cell_index += 1;
            }
            TagEnd::BlockQuote(_) => self.write("</blockquote>\n")?,
            // Normally consumed by `finish_code_block`.
            TagEnd::CodeBlock => {}
            TagEnd::List(true) => self.write("</ol>\n")?,
            TagEnd::List(false) => self.write("</ul>\n")?,
            TagEnd::Item => self.write("</li>\n")?,
            TagEnd::DefinitionList => self.write("</dl>\n")?,
            TagEnd::DefinitionListTitle => self.write("</dt>\n")?,
            TagEnd::DefinitionListDefinition => self.write("</dd>\n")?,
            TagEnd::Emphasis => self.write("</em>")?,
            TagEnd::Superscript => self.write("</sup>")?,
            TagEnd::Subscript => self.write("</sub>")?,
            TagEnd::Strong => self.write("</strong>")?,
            TagEnd::Strikethrough => self.write("</del>")?,
            TagEnd::Link | TagEnd::Embed => self.write("</a>")?,
            TagEnd::Image => (), // consumed by raw_text
            TagEnd::WeaverBlock(_) | TagEnd::MetadataBlock(_) => {
                self.in_non_writing_block = false;
            }
            TagEnd::FootnoteDefinition => self.write("</div>\n")?,
        }
        Ok(())
    }

    fn write_title(&mut self, title: &str) -> Result<(), W::Error> {
        if !title.is_empty() {
            self.write("\" title=\"")?;
            escape_html(&mut self.writer, title)?;
        }
        Ok(())
    }

    fn finish_code_block(&mut self) -> Result<(), W::Error> {
        let Some(block) = self.code_block.take() else {
            return Ok(());
        };
        if !self.end_newline {
            self.write_newline()?;
        }

        match &block.language {
            Some(language) => {
                self.write("<pre><code class=\"language-")?;
                escape_html(&mut self.writer, language)?;
                self.write("\" data-language=\"")?;
                escape_html(&mut self.writer, language)?;
                self.write("\">")?;
                let highlighted = self
                    .options
                    .highlighter
                    .and_then(|h| h.highlight(language, &block.text));
                match highlighted {
                    Some(html) => self.write(&html)?,
                    None => escape_html_body_text(&mut self.writer, &block.text)?,
                }
            }
            None => {
                self.write("<pre><code>")?;
                escape_html_body_text(&mut self.writer, &block.text)?;
            }
        }
        self.write("</code></pre>\n")
    }

    // run raw text, consuming end tag
    fn raw_text(&mut self) -> Result<(), W::Error> {
        let mut nest = 0;
        while let Some(event) = self.iter.next() {
            match event {
                Start(_) => nest += 1,
                End(_) => {
                    if nest == 0 {
                        break;
                    }
                    nest -= 1;
                }
                Html(_) => {}
                InlineHtml(text) | Code(text) | Text(text) => {
                    // Used in the `alt` attribute, so attribute escaping.
                    escape_html(&mut self.writer, &text)?;
                    self.end_newline = text.ends_with('\n');
                }
                InlineMath(text) | DisplayMath(text) => {
                    escape_html(&mut self.writer, &text)?;
                }
                SoftBreak | HardBreak | Rule => self.write(" ")?,
                FootnoteReference(name) => {
                    let len = self.numbers.len() + 1;
                    let number = *self.numbers.entry(name).or_insert(len);
                    write!(&mut self.writer, "[{}]", number)?;
                }
                TaskListMarker(true) => self.write("[x]")?,
                TaskListMarker(false) => self.write("[ ]")?,
                WeaverBlock(_) => {}
            }
        }
        Ok(())
    }
}

/// Render `events` to an HTML string.
pub fn push_html<'a, I>(s: &mut String, iter: I, options: HtmlOptions<'_>) -> core::fmt::Result
where
    I: Iterator<Item = Event<'a>>,
{
    HtmlWriter::new(iter, FmtWriter(s), options).run()
}

#[cfg(test)]
mod tests {
    use markdown_weaver::{Options, Parser};

    use super::*;

    fn render(markdown: &str, options: HtmlOptions<'_>) -> String {
        let parser = Parser::new_ext(
            markdown,
            Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS | Options::ENABLE_STRIKETHROUGH,
        );
        let mut out = String::new();
        push_html(&mut out, parser, options).unwrap();
        out
    }

    struct Upper;

    impl HighlightCode for Upper {
        fn highlight(&self, _language: &str, code: &str) -> Option<String> {
            Some(code.to_uppercase())
        }
    }

    #[test]
    fn fenced_code_carries_its_language() {
        let html = render("```rust\nlet x = 1;\n```\n", HtmlOptions::default());
        assert_eq!(
            html,
            "<pre><code class=\"language-rust\" data-language=\"rust\">let x = 1;\n</code></pre>\n"
        );
    }

    #[test]
    fn highlighter_output_replaces_code_text() {
        let highlighter = Upper;
        let html = render(
            "```js\nlet x\n```\n",
            HtmlOptions {
                highlighter: Some(&highlighter),
                ..Default::default()
            },
        );
        assert!(html.contains(">LET X\n</code>"));
    }

    #[test]
    fn table_alignment_uses_align() {
        let html = render("| a | b |\n|:--|--:|\n| 1 | 2 |\n", HtmlOptions::default());
        assert!(html.contains("<th align=\"left\">a</th>"));
        assert!(html.contains("<td align=\"right\">2</td>"));
    }

    #[test]
    fn task_items_become_checkboxes() {
        let html = render("- [x] done\n- [ ] todo\n", HtmlOptions::default());
        assert!(html.contains("<input disabled=\"\" type=\"checkbox\" checked=\"\"/>"));
        assert!(html.contains("<input disabled=\"\" type=\"checkbox\"/>"));
    }

    #[test]
    fn raw_html_is_escaped_unless_allowed() {
        let escaped = render("<b>hi</b>\n", HtmlOptions::default());
        assert!(escaped.contains("&lt;b&gt;"));

        let passed = render(
            "<b>hi</b>\n",
            HtmlOptions {
                allow_raw_html: true,
                ..Default::default()
            },
        );
        assert!(passed.contains("<b>hi</b>"));
    }
}
