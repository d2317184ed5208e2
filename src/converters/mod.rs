//! Format handlers and the capability they all implement.
//!
//! Each handler receives the materialized local source plus the per-call
//! options and either **declines** (`Ok(None)`: not my format, try the
//! next one), **succeeds** (`Ok(Some(result))`), or **fails**
//! (`Err(ConverterError)`: my format, but conversion broke; the
//! dispatcher records it and keeps going).

pub mod archive;
pub mod audio;
pub mod docx;
pub mod html;
pub mod image;
pub mod markdown;
pub mod ooxml;
pub mod pdf;
pub mod pptx;
pub mod structure;
pub mod text;
pub mod wikipedia;
pub mod xlsx;
pub mod youtube;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::pipeline::dispatch::ConverterRegistry;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Per-call conversion options.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// The candidate extension currently being tried (lowercase, dotted).
    /// `None` on the final no-extension dispatch pass.
    pub extension: Option<String>,

    /// Optional free-text question for targeted media analysis (visual
    /// question answering on images).
    pub question: Option<String>,

    /// Source URL context, when the input came from the network. Lets
    /// URL-gated handlers (video platforms) activate.
    pub url: Option<String>,
}

/// A format handler: attempts to transform a typed source into normalized
/// text, declining for non-matching types.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Stable identifier used for dispatch bookkeeping and error reports.
    fn name(&self) -> &'static str;

    /// `Ok(Some(_))` on success, `Ok(None)` to decline, `Err(_)` when the
    /// format matched but conversion broke.
    async fn convert(
        &self,
        source: &Path,
        config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError>;
}

/// Build the default registry with every built-in handler.
///
/// Bucket order encodes priority: for `.html` the structure-aware handlers
/// (Wikipedia, video platform) precede the generic one so a specific
/// parser wins whenever it recognises the page.
pub fn default_registry() -> ConverterRegistry {
    let plain_text: Arc<dyn DocumentConverter> = Arc::new(text::PlainTextConverter);
    let html: Arc<dyn DocumentConverter> = Arc::new(html::HtmlConverter);
    let wiki: Arc<dyn DocumentConverter> = Arc::new(wikipedia::WikipediaConverter);
    let video: Arc<dyn DocumentConverter> = Arc::new(youtube::YouTubeConverter);

    let mut registry = ConverterRegistry::new(Arc::clone(&plain_text));
    registry.register(
        Arc::clone(&plain_text),
        &[
            ".txt", ".md", ".markdown", ".srt", ".csv", ".json", ".jsonld", ".jsonl", ".yaml",
            ".yml",
        ],
    );
    registry.register(Arc::clone(&wiki), &[".html", ".htm"]);
    registry.register(Arc::clone(&video), &[".html", ".htm"]);
    registry.register(Arc::clone(&html), &[".html", ".htm"]);
    registry.register(Arc::new(docx::DocxConverter), &[".docx"]);
    registry.register(Arc::new(xlsx::XlsxConverter), &[".xlsx", ".xls"]);
    registry.register(Arc::new(pptx::PptxConverter), &[".pptx"]);
    registry.register(
        Arc::new(audio::AudioConverter),
        &[".wav", ".mp3", ".m4a", ".flac"],
    );
    registry.register(
        Arc::new(image::ImageConverter),
        &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp", ".tiff"],
    );
    registry.register(Arc::new(archive::ZipConverter), &[".zip"]);
    registry.register(Arc::new(pdf::PdfConverter), &[".pdf"]);
    registry.register(Arc::new(structure::PdbConverter), &[".pdb"]);
    registry
}
