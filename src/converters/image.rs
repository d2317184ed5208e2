//! Image conversion: probe metadata, OCR, and vision captioning/VQA.
//!
//! OCR and captioning are two independent collaborator calls. OCR output
//! (when any text exists in the picture) is fed into the captioning
//! prompt as trusted context and appended verbatim to the result; a
//! failed OCR call is only logged and captioning proceeds without it.
//! The captioning call itself is the essential step: when it fails the
//! converter fails. Without a vision service configured the handler still
//! succeeds with metadata plus an inline note.

use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

const SUPPORTED: &[&str] = &[".jpg", ".jpeg", ".png", ".webp", ".gif", ".bmp", ".tiff"];

const METADATA_FIELDS: &[&str] = &[
    "ImageSize",
    "Title",
    "Caption",
    "Description",
    "Keywords",
    "Artist",
    "Author",
    "DateTimeOriginal",
    "CreateDate",
    "GPSPosition",
];

const OCR_PROMPT: &str = "You are a powerful OCR assistant, please carefully analyze and \
accurately extract the text, tables or formulas in the picture.\n\
You can use HTML code to represent the tables, LaTeX code to represent the formulas. \
Note: DO NOT add any redundant description.\n\
If there is no such content, only return: \"There isn't any text in the picture\".";

const NO_TEXT_MARKER: &str = "There isn't any text in the picture";

const FORMAT_RULES: &str = "**Content Format Rules:**\n\
- Tables: Analyze the content and styling, return as well-structured HTML codes.\n\
- Geometric Shapes: Generate vector graphic code (SVG).\n\
- Complex Graphics: Provide extremely detailed description.\n\
- General Images: Generate detailed and comprehensive caption.\n\
- Math: Represent formulas in LaTeX code.";

pub struct ImageConverter;

#[async_trait]
impl DocumentConverter for ImageConverter {
    fn name(&self) -> &'static str {
        "image"
    }

    async fn convert(
        &self,
        source: &Path,
        config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        let Some(ext) = opts.extension.as_deref() else {
            return Ok(None);
        };
        if !SUPPORTED.contains(&ext) {
            return Ok(None);
        }

        let mut content = String::new();
        if let Some(probe) = &config.probe {
            if let Some(metadata) = probe.probe(source).await {
                for field in METADATA_FIELDS {
                    if let Some(value) = metadata.get(*field) {
                        content.push_str(&format!("{field}: {value}\n"));
                    }
                }
            }
        }

        let Some(vision) = &config.vision else {
            content.push_str("\n(No vision service configured; image content not analyzed)");
            return Ok(Some(ConversionResult::with_text(content.trim().to_string())));
        };

        // Independent OCR pass; failure only costs us the OCR context.
        let ocr_result = match vision.analyze(source, OCR_PROMPT).await {
            Ok(text) if !text.contains(NO_TEXT_MARKER) => Some(text),
            Ok(_) => None,
            Err(e) => {
                warn!(source = %source.display(), error = %e, "OCR call failed");
                None
            }
        };

        let prompt = caption_prompt(opts.question.as_deref(), ocr_result.as_deref());
        let caption = vision.analyze(source, &prompt).await?;

        content.push('\n');
        content.push_str(&caption);
        if let Some(ocr) = &ocr_result {
            content.push_str("\n\n---\n\n## Additional OCR Result:\n");
            content.push_str(ocr);
        }

        Ok(Some(ConversionResult::with_text(content.trim().to_string())))
    }
}

fn caption_prompt(question: Option<&str>, ocr_result: Option<&str>) -> String {
    let ocr_block = match ocr_result {
        Some(ocr) => format!(
            "**OCR Extracted Result:**\n\
             This is the OCR result of this image, which is very accurate for the \
             text content. Please refer carefully\n```\n{}\n```\n",
            ocr.trim()
        ),
        None => String::new(),
    };

    match question {
        Some(question) => format!(
            "You are an expert for Visual Question Answering (VQA) task.\n\
             Please analyze the image carefully and provide accurate caption and \
             answer for the following question:\n\
             **Question:**\n```\n{question}\n```\n\n\
             {FORMAT_RULES}\n\n{ocr_block}\n\
             **Output Format:**\n\
             ## Image Caption:\n\
             [Provide an accurate caption of the image, dont miss any key information.]\n\n\
             ## Answer\n\
             [Provide a accurate answer to the question based on the image content and above analysis]"
        ),
        None => format!(
            "You are an expert for analyzing images.\n\
             Please analyze the image carefully and provide accurate caption based on following rules:\n\n\
             {FORMAT_RULES}\n\n{ocr_block}\n\
             **Output Format:**\n\
             ## Image Caption:\n\
             [Provide an accurate caption of the image, dont miss any key information]"
        ),
    }
}
