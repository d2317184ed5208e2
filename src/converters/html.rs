//! Generic HTML conversion: readability-style main-content extraction
//! plus `<meta>` metadata, with a stripped-body fallback.
//!
//! The scoring pass is a compact variant of the classic readability
//! heuristic: paragraphs vote for their ancestors (comma count and text
//! length approximate "real prose"), link-dense containers are penalized,
//! and the best-scoring container becomes the article body. Pages without
//! enough prose to score fall back to a whole-body strip.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::markdown::{element_to_markdown, inline_text};
use super::{ConvertOptions, DocumentConverter};

const SUPPORTED: &[&str] = &[".html", ".htm", ".php", ".asp", ".aspx", ".jsp"];

pub struct HtmlConverter;

#[async_trait]
impl DocumentConverter for HtmlConverter {
    fn name(&self) -> &'static str {
        "html"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        let Some(ext) = opts.extension.as_deref() else {
            return Ok(None);
        };
        if !SUPPORTED.contains(&ext) {
            return Ok(None);
        }
        let bytes = std::fs::read(source)?;
        let html = String::from_utf8_lossy(&bytes);
        Ok(Some(parse_html(&html)))
    }
}

/// Parse an HTML string into a conversion result. Shared with the Word
/// handler, which routes its HTML intermediate through the same path.
pub fn parse_html(html: &str) -> ConversionResult {
    let doc = Html::parse_document(html);
    let metadata = extract_metadata(&doc);
    let title = extract_title(&doc);

    if let Some(main) = main_content(&doc) {
        debug!("readability extraction selected <{}>", main.value().name());
        let text = element_to_markdown(main);
        if !text.trim().is_empty() {
            return ConversionResult {
                title,
                text_content: text.trim().to_string(),
                metadata,
            };
        }
    }
    fallback_parse(&doc, title, metadata)
}

fn extract_title(doc: &Html) -> Option<String> {
    if let Some(t) = doc.select(&sel("title")).next() {
        let text = inline_text(t);
        if !text.is_empty() {
            return Some(text);
        }
    }
    doc.select(&sel(r#"meta[property="og:title"]"#))
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(str::to_owned)
}

fn extract_metadata(doc: &Html) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    let meta_content = |selector: &str| {
        doc.select(&sel(selector))
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(str::to_owned)
    };
    if let Some(author) = meta_content(r#"meta[name="author"]"#) {
        metadata.insert("author".into(), author);
    }
    if let Some(desc) = meta_content(r#"meta[name="description"]"#) {
        metadata.insert("description".into(), desc);
    }
    if let Some(published) = meta_content(r#"meta[property="article:published_time"]"#) {
        metadata.insert("published_time".into(), published);
    } else if let Some(time) = doc
        .select(&sel("time[datetime]"))
        .next()
        .and_then(|t| t.value().attr("datetime"))
    {
        metadata.insert("published_time".into(), time.to_string());
    }
    metadata
}

/// Paragraph-voting candidate selection.
fn main_content(doc: &Html) -> Option<ElementRef<'_>> {
    let mut scores: HashMap<scraper::ego_tree::NodeId, f32> = HashMap::new();

    for para in doc.select(&sel("p, pre")) {
        let text = inline_text(para);
        if text.len() < 25 {
            continue;
        }
        let score =
            1.0 + text.matches(',').count() as f32 + ((text.len() / 100).min(3)) as f32;

        if let Some(parent) = para.parent().and_then(ElementRef::wrap) {
            *scores.entry(parent.id()).or_default() += score;
            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                *scores.entry(grandparent.id()).or_default() += score / 2.0;
            }
        }
    }

    let (best_id, _) = scores
        .into_iter()
        .filter_map(|(id, score)| {
            let el = ElementRef::wrap(doc.tree.get(id)?)?;
            let adjusted = score * (1.0 - link_density(el));
            (adjusted > 0.0).then_some((id, adjusted))
        })
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;

    ElementRef::wrap(doc.tree.get(best_id)?)
}

fn link_density(el: ElementRef<'_>) -> f32 {
    let total = inline_text(el).len() as f32;
    if total == 0.0 {
        return 0.0;
    }
    let linked: usize = el.select(&sel("a")).map(|a| inline_text(a).len()).sum();
    (linked as f32 / total).min(1.0)
}

fn fallback_parse(
    doc: &Html,
    title: Option<String>,
    metadata: BTreeMap<String, String>,
) -> ConversionResult {
    let body = doc.select(&sel("body")).next();
    let text = match body {
        Some(body) => element_to_markdown(body),
        None => element_to_markdown(doc.root_element()),
    };
    ConversionResult {
        title,
        text_content: text.trim().to_string(),
        metadata,
    }
}

fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><head>
        <title>Sample Article</title>
        <meta name="author" content="Ada Lovelace">
        <meta name="description" content="A sample">
        <meta property="article:published_time" content="2024-05-01T10:00:00Z">
        </head><body>
        <nav><a href="/">home</a><a href="/about">about</a></nav>
        <div id="content">
          <p>The first paragraph of the article carries enough prose, with commas,
             to be scored as real content by the extractor.</p>
          <p>A second paragraph keeps the votes flowing, because one paragraph
             alone rarely wins against boilerplate.</p>
        </div>
        <footer>© nobody</footer>
        </body></html>"#;

    #[test]
    fn extracts_main_content_and_metadata() {
        let result = parse_html(ARTICLE);
        assert_eq!(result.title.as_deref(), Some("Sample Article"));
        assert!(result.text_content.contains("first paragraph"));
        assert_eq!(
            result.metadata.get("author").map(String::as_str),
            Some("Ada Lovelace")
        );
        assert_eq!(
            result.metadata.get("published_time").map(String::as_str),
            Some("2024-05-01T10:00:00Z")
        );
    }

    #[test]
    fn falls_back_to_body_when_no_prose_scores() {
        let result = parse_html("<html><title>T</title><body><b>just bold</b></body></html>");
        assert!(result.text_content.contains("just bold"));
    }

    #[tokio::test]
    async fn declines_non_html_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.dat");
        std::fs::write(&path, "<html></html>").unwrap();
        let opts = ConvertOptions {
            extension: Some(".dat".into()),
            ..Default::default()
        };
        let out = HtmlConverter
            .convert(&path, &ConversionConfig::default(), &opts)
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
