//! HTML to plain-text extraction.
//!
//! [`parse_page`] walks the parsed document once and produces both the
//! indexable text and the raw `href` targets of its anchors. Content of
//! `script`, `style`, `noscript` and `template` elements never reaches
//! either output.
//!
//! Text layout rules:
//! - block-level elements (`p`, `div`, headings, list items, table cells, …)
//!   start and end a line;
//! - whitespace runs inside a text node collapse to one space, except under
//!   `pre`/`textarea` where line breaks are kept;
//! - the result is split into lines, each line is trimmed, empty lines are
//!   dropped and the rest are joined with a single `\n`.
//!
//! Malformed markup never fails: the HTML5 parser recovers, and a document
//! with nothing readable yields an empty string.

use scraper::{ElementRef, Html, Node};

/// Nesting depth past which subtrees are not descended into.
const MAX_DEPTH: usize = 256;

const SKIPPED: &[&str] = &["script", "style", "noscript", "template"];

const BLOCK: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "caption", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "option", "p", "pre",
    "section", "summary", "table", "td", "th", "title", "tr", "ul",
];

const PREFORMATTED: &[&str] = &["pre", "textarea"];

/// Text and outgoing links of one HTML page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    pub text: String,
    /// `href` values of `<a>` elements in document order, unresolved.
    pub links: Vec<String>,
}

pub fn parse_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut walker = Walker::default();
    walker.walk(document.root_element(), 0, false);
    ParsedPage {
        text: normalize_lines(&walker.raw),
        links: walker.links,
    }
}

/// Extract only the text of a page.
pub fn html_to_text(html: &str) -> String {
    parse_page(html).text
}

/// Trim every line, drop blank ones and join with single newlines.
pub fn normalize_lines(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct Walker {
    raw: String,
    links: Vec<String>,
}

impl Walker {
    fn walk(&mut self, element: ElementRef<'_>, depth: usize, preformatted: bool) {
        if depth > MAX_DEPTH {
            return;
        }

        for child in element.children() {
            match child.value() {
                Node::Text(text) => {
                    if preformatted {
                        self.raw.push_str(text);
                    } else {
                        push_collapsed(&mut self.raw, text);
                    }
                }
                Node::Element(el) => {
                    let name = el.name();
                    if SKIPPED.contains(&name) {
                        continue;
                    }
                    if name == "a" {
                        if let Some(href) = el.attr("href") {
                            self.links.push(href.to_string());
                        }
                    }

                    let block = BLOCK.contains(&name);
                    if block {
                        self.raw.push('\n');
                    }
                    if let Some(child_el) = ElementRef::wrap(child) {
                        let pre = preformatted || PREFORMATTED.contains(&name);
                        self.walk(child_el, depth + 1, pre);
                    }
                    if block {
                        self.raw.push('\n');
                    }
                }
                _ => {}
            }
        }
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    let body = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let leading = text.starts_with(char::is_whitespace);
    if leading && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&body);
    if !body.is_empty() && text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}
