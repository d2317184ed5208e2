//! PDF text extraction.
//!
//! `lopdf` walks the content streams page by page and yields
//! reading-order plain text; layout is not reconstructed. Scanned or
//! image-only PDFs extract to empty text, which still counts as success.
//! Callers needing OCR route the rendered pages through the image
//! handler's vision service themselves.

use async_trait::async_trait;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

pub struct PdfConverter;

#[async_trait]
impl DocumentConverter for PdfConverter {
    fn name(&self) -> &'static str {
        "pdf"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if opts.extension.as_deref() != Some(".pdf") {
            return Ok(None);
        }
        let document = lopdf::Document::load(source)
            .map_err(|e| ConverterError::Parse(format!("unreadable PDF: {e}")))?;

        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let mut parts = Vec::with_capacity(pages.len());
        for page in pages {
            match document.extract_text(&[page]) {
                Ok(text) => parts.push(text),
                Err(e) => {
                    // A single undecodable page loses that page only.
                    tracing::warn!(page, error = %e, "failed to extract page text");
                }
            }
        }

        let title = document_title(&document);
        Ok(Some(ConversionResult {
            title,
            text_content: parts.join("\n\n").trim().to_string(),
            metadata: Default::default(),
        }))
    }
}

fn document_title(document: &lopdf::Document) -> Option<String> {
    let info = document.trailer.get(b"Info").ok()?;
    let info = match info {
        lopdf::Object::Reference(id) => document.get_object(*id).ok()?,
        other => other,
    };
    let title = info.as_dict().ok()?.get(b"Title").ok()?;
    let bytes = title.as_str().ok()?;
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wrong_extension_declines() {
        let out = PdfConverter
            .convert(
                Path::new("/dev/null"),
                &ConversionConfig::default(),
                &ConvertOptions {
                    extension: Some(".txt".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn garbage_bytes_are_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.pdf");
        std::fs::write(&path, b"%PDF-1.4 but then nonsense").unwrap();
        let result = PdfConverter
            .convert(
                &path,
                &ConversionConfig::default(),
                &ConvertOptions {
                    extension: Some(".pdf".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(result.is_err());
    }
}
