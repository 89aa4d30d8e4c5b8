//! Markdown to HTML rendering for card content.
//!
//! Fenced code blocks with a language tag the highlighter knows are emitted as
//! class-based highlighting spans, everything else as escaped plain text. Math uses
//! `$...$` (inline) and `$$...$$` (display) and is emitted as
//! `<span class="math math-inline|math-display">` for KaTeX auto-render on the page.

use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::types::Card;

static SYNTAXES: OnceLock<SyntaxSet> = OnceLock::new();

fn syntaxes() -> &'static SyntaxSet {
    SYNTAXES.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Both sides of a card as HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedCard {
    pub front_html: String,
    pub back_html: String,
}

/// Render both sides of a card.
pub fn render_card(card: &Card) -> RenderedCard {
    RenderedCard {
        front_html: render_markdown(&card.front),
        back_html: render_markdown(&card.back),
    }
}

/// Render Markdown (GFM tables, strikethrough, task lists, math) to an HTML fragment.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_MATH);
    let parser = Parser::new_ext(content, options);

    let mut events = Vec::new();
    // (language tag, collected source) while inside a code block
    let mut code_block: Option<(String, String)> = None;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                code_block = Some((language, String::new()));
            }
            Event::Text(text) if code_block.is_some() => {
                if let Some((_, source)) = code_block.as_mut() {
                    source.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, source)) = code_block.take() {
                    events.push(Event::Html(render_code_block(&language, &source).into()));
                }
            }
            // Raw HTML is shown as text, never passed through.
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            other => events.push(other),
        }
    }

    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Highlight `code` as `language`, returning classed `<span>` markup.
///
/// Returns `None` when the language tag is empty or unknown.
pub fn highlight_code(language: &str, code: &str) -> Option<String> {
    if language.is_empty() {
        return None;
    }

    let syntax_set = syntaxes();
    let syntax = syntax_set.find_syntax_by_token(language)?;
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .ok()?;
    }
    Some(generator.finalize())
}

fn render_code_block(language: &str, source: &str) -> String {
    if language.is_empty() {
        return format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(source));
    }

    let class = html_escape::encode_double_quoted_attribute(language);
    match highlight_code(language, source) {
        Some(highlighted) => format!(
            "<pre><code class=\"hljs language-{}\">{}</code></pre>\n",
            class, highlighted
        ),
        None => format!(
            "<pre><code class=\"language-{}\">{}</code></pre>\n",
            class,
            html_escape::encode_text(source)
        ),
    }
}
