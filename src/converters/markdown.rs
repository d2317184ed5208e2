//! HTML DOM → Markdown serialization, shared by the HTML, Wikipedia, and
//! Office handlers.
//!
//! Deliberately opinionated in three places, matching what an LLM consumer
//! needs rather than a faithful round-trip:
//!
//! - links with schemes other than `http`/`https`/`file` (javascript:,
//!   mailto:, …) are flattened to their anchor text; kept URLs are
//!   re-serialized through the URL parser so their paths come out
//!   percent-encoded and cannot collide with Markdown syntax
//! - embedded `data:` image URIs are truncated to their header prefix;
//!   megabytes of base64 carry no signal
//! - script/style/noscript subtrees are dropped entirely

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use scraper::node::Node;
use scraper::{ElementRef, Html};

/// Characters that would break a Markdown link target.
const LINK_UNSAFE: &AsciiSet = &CONTROLS.add(b' ').add(b'<').add(b'>').add(b'(').add(b')');

/// Convert an HTML fragment string to Markdown.
pub fn fragment_to_markdown(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    element_to_markdown(fragment.root_element())
}

/// Convert an element subtree to Markdown.
pub fn element_to_markdown(el: ElementRef<'_>) -> String {
    let mut w = Walker::default();
    w.walk_children(el);
    w.out
}

#[derive(Default)]
struct Walker {
    out: String,
    /// One entry per open list; `Some(n)` is an ordered list's next index.
    list_stack: Vec<Option<u32>>,
    preformatted: bool,
}

impl Walker {
    fn walk_children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(t) => self.push_text(t),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.walk_element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if self.preformatted {
            self.out.push_str(text);
            return;
        }
        // HTML whitespace semantics: runs collapse to one space.
        let mut last_was_space = self.out.ends_with([' ', '\n']) || self.out.is_empty();
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    self.out.push(' ');
                    last_was_space = true;
                }
            } else {
                self.out.push(ch);
                last_was_space = false;
            }
        }
    }

    fn walk_element(&mut self, el: ElementRef<'_>) {
        let tag = el.value().name();
        match tag {
            "script" | "style" | "noscript" | "template" | "head" => {}

            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                self.ensure_blank_line();
                self.out.push_str(&"#".repeat(level));
                self.out.push(' ');
                self.walk_children(el);
                self.end_block();
            }

            "p" | "div" | "section" | "article" | "header" | "footer" | "main" | "figure"
            | "figcaption" | "aside" => {
                self.ensure_blank_line();
                self.walk_children(el);
                self.end_block();
            }

            "br" => self.out.push('\n'),
            "hr" => {
                self.ensure_blank_line();
                self.out.push_str("---");
                self.end_block();
            }

            "strong" | "b" => self.wrap_inline(el, "**"),
            "em" | "i" => self.wrap_inline(el, "*"),
            "code" if !self.preformatted => self.wrap_inline(el, "`"),
            "code" => self.walk_children(el),

            "pre" => {
                self.ensure_blank_line();
                self.out.push_str("```\n");
                self.preformatted = true;
                self.walk_children(el);
                self.preformatted = false;
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                self.out.push_str("```");
                self.end_block();
            }

            "blockquote" => {
                let inner = element_to_markdown(el);
                self.ensure_blank_line();
                for line in inner.trim().lines() {
                    self.out.push_str("> ");
                    self.out.push_str(line);
                    self.out.push('\n');
                }
                self.out.push('\n');
            }

            "ul" => {
                self.list_stack.push(None);
                self.ensure_blank_line();
                self.walk_children(el);
                self.list_stack.pop();
                self.end_block();
            }
            "ol" => {
                self.list_stack.push(Some(1));
                self.ensure_blank_line();
                self.walk_children(el);
                self.list_stack.pop();
                self.end_block();
            }
            "li" => {
                if !self.out.ends_with('\n') && !self.out.is_empty() {
                    self.out.push('\n');
                }
                let depth = self.list_stack.len().saturating_sub(1);
                self.out.push_str(&"  ".repeat(depth));
                match self.list_stack.last_mut() {
                    Some(Some(n)) => {
                        self.out.push_str(&format!("{n}. "));
                        *n += 1;
                    }
                    _ => self.out.push_str("* "),
                }
                self.walk_children(el);
            }

            "a" => self.emit_link(el),
            "img" => self.emit_image(el),
            "table" => self.emit_table(el),

            _ => self.walk_children(el),
        }
    }

    fn wrap_inline(&mut self, el: ElementRef<'_>, marker: &str) {
        let text = inline_text(el);
        if text.trim().is_empty() {
            return;
        }
        self.out.push_str(marker);
        self.out.push_str(text.trim());
        self.out.push_str(marker);
    }

    fn emit_link(&mut self, el: ElementRef<'_>) {
        let text = inline_text(el);
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match el.value().attr("href").and_then(sanitize_href) {
            Some(href) => {
                self.out.push_str(&format!("[{text}]({href})"));
            }
            None => self.out.push_str(text),
        }
    }

    fn emit_image(&mut self, el: ElementRef<'_>) {
        let alt = el.value().attr("alt").unwrap_or("");
        let src = el.value().attr("src").unwrap_or("");
        let src = if let Some(stripped) = src.strip_prefix("data:") {
            let header = stripped.split(',').next().unwrap_or("");
            format!("data:{header}...")
        } else {
            src.to_string()
        };
        self.out.push_str(&format!("![{alt}]({src})"));
    }

    fn emit_table(&mut self, el: ElementRef<'_>) {
        self.ensure_blank_line();
        let mut first_row = true;
        for row in el
            .select(&selector("tr"))
            .collect::<Vec<_>>()
        {
            let cells: Vec<String> = row
                .select(&selector("th, td"))
                .map(|c| inline_text(c).trim().replace('|', "\\|"))
                .collect();
            if cells.is_empty() {
                continue;
            }
            self.out.push_str("| ");
            self.out.push_str(&cells.join(" | "));
            self.out.push_str(" |\n");
            if first_row {
                self.out.push_str("| ");
                self.out
                    .push_str(&vec!["---"; cells.len()].join(" | "));
                self.out.push_str(" |\n");
                first_row = false;
            }
        }
        self.out.push('\n');
    }

    fn ensure_blank_line(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if !self.out.ends_with("\n\n") {
            if self.out.ends_with('\n') {
                self.out.push('\n');
            } else {
                self.out.push_str("\n\n");
            }
        }
    }

    fn end_block(&mut self) {
        if !self.out.ends_with("\n\n") {
            self.out.push_str("\n\n");
        }
    }
}

fn selector(css: &str) -> scraper::Selector {
    scraper::Selector::parse(css).expect("static selector")
}

/// Plain text of an element subtree with whitespace collapsed.
pub fn inline_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    let mut last_was_space = true;
    for piece in el.text() {
        for ch in piece.chars() {
            if ch.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(ch);
                last_was_space = false;
            }
        }
    }
    out.trim().to_string()
}

/// Drop non-http/https/file schemes; re-serialize absolute URLs so their
/// paths are percent-encoded. Relative URLs pass through encoded as-is.
fn sanitize_href(href: &str) -> Option<String> {
    match reqwest::Url::parse(href) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if !matches!(scheme, "http" | "https" | "file") {
                return None;
            }
            Some(parsed.to_string())
        }
        // No scheme, so a relative link. Keep it, encoding what Markdown
        // would otherwise misparse.
        Err(_) => Some(utf8_percent_encode(href, LINK_UNSAFE).to_string()),
    }
}
