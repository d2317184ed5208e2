//! Wikipedia-aware HTML conversion.
//!
//! MediaWiki pages have a stable skeleton (`#mw-content-text`,
//! `.mw-page-title-main`) that a targeted parser extracts far more
//! cleanly than the generic readability pass: no sidebars, no language
//! lists, no edit markers. Registered ahead of the generic HTML handler
//! for the same extensions; declines when the skeleton is absent so
//! ordinary pages fall through.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::markdown::{element_to_markdown, inline_text};
use super::{ConvertOptions, DocumentConverter};

pub struct WikipediaConverter;

#[async_trait]
impl DocumentConverter for WikipediaConverter {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if !matches!(opts.extension.as_deref(), Some(".html") | Some(".htm")) {
            return Ok(None);
        }
        let bytes = std::fs::read(source)?;
        let html = String::from_utf8_lossy(&bytes);
        Ok(parse_wiki_page(&html))
    }
}

fn parse_wiki_page(html: &str) -> Option<ConversionResult> {
    // The MediaWiki chrome we never want in the output. Scraper's DOM is
    // immutable, so instead of decomposing nodes we re-serialize the
    // content container with the junk selectors filtered out.
    let doc = Html::parse_document(html);

    let content = doc.select(&sel("div#mw-content-text")).next()?;

    let title = doc
        .select(&sel("span.mw-page-title-main"))
        .next()
        .map(inline_text)
        .or_else(|| doc.select(&sel("title")).next().map(inline_text))
        .filter(|t| !t.is_empty());

    let cleaned = strip_chrome(&html_of(content));
    let body = element_to_markdown(
        Html::parse_fragment(&cleaned)
            .root_element(),
    );
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    let text_content = match &title {
        Some(t) => format!("# {t}\n\n{body}"),
        None => body.to_string(),
    };
    Some(ConversionResult {
        title,
        text_content,
        metadata: Default::default(),
    })
}

fn html_of(el: scraper::ElementRef<'_>) -> String {
    el.html()
}

/// Remove navigation/info-box/edit-marker subtrees by reparsing and
/// re-serializing everything that is not junk.
fn strip_chrome(content_html: &str) -> String {
    let fragment = Html::parse_fragment(content_html);
    let junk = sel(
        ".toc, .infobox, .mw-editsection, .navbox, .sidebar, .hatnote, \
         .mw-jump-link, style, script",
    );
    let junk_ids: std::collections::HashSet<_> =
        fragment.select(&junk).map(|e| e.id()).collect();

    let mut out = String::with_capacity(content_html.len());
    serialize_filtered(fragment.root_element(), &junk_ids, &mut out);
    out
}

fn serialize_filtered(
    el: scraper::ElementRef<'_>,
    junk: &std::collections::HashSet<scraper::ego_tree::NodeId>,
    out: &mut String,
) {
    use scraper::node::Node;
    for child in el.children() {
        match child.value() {
            Node::Text(t) => out.push_str(&html_escape(t)),
            Node::Element(_) => {
                if junk.contains(&child.id()) {
                    continue;
                }
                if let Some(child_el) = scraper::ElementRef::wrap(child) {
                    let name = child_el.value().name();
                    out.push('<');
                    out.push_str(name);
                    for (attr, value) in child_el.value().attrs() {
                        out.push_str(&format!(" {attr}=\"{}\"", html_escape(value)));
                    }
                    out.push('>');
                    serialize_filtered(child_el, junk, out);
                    out.push_str(&format!("</{name}>"));
                }
            }
            _ => {}
        }
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIKI: &str = r#"<html><head><title>Ada Lovelace - Wikipedia</title></head><body>
        <span class="mw-page-title-main">Ada Lovelace</span>
        <div id="mw-content-text">
          <div class="infobox"><table><tr><td>Born 1815</td></tr></table></div>
          <p>Ada Lovelace was an English mathematician, chiefly known for her work
             on the Analytical Engine.</p>
          <span class="mw-editsection">[edit]</span>
          <div class="toc">Contents</div>
        </div>
        </body></html>"#;

    #[test]
    fn extracts_title_and_strips_chrome() {
        let result = parse_wiki_page(WIKI).unwrap();
        assert_eq!(result.title.as_deref(), Some("Ada Lovelace"));
        assert!(result.text_content.starts_with("# Ada Lovelace"));
        assert!(result.text_content.contains("English mathematician"));
        assert!(!result.text_content.contains("[edit]"));
        assert!(!result.text_content.contains("Born 1815"));
        assert!(!result.text_content.contains("Contents"));
    }

    #[test]
    fn declines_pages_without_mediawiki_structure() {
        assert!(parse_wiki_page("<html><body><p>plain page</p></body></html>").is_none());
    }
}
