//! Plain-text conversion, including the structured text sub-formats.
//!
//! Anything that decodes as UTF-8 can be surfaced; the known sub-types are
//! re-serialized into LLM-friendlier shapes first: CSV becomes a Markdown
//! table, JSON and JSONL are pretty-printed, YAML is re-dumped
//! canonically. A sub-type that fails structured parsing falls back to the
//! raw text rather than failing (the bytes were readable, after all).
//! Invalid UTF-8 declines.

use async_trait::async_trait;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

pub struct PlainTextConverter;

#[async_trait]
impl DocumentConverter for PlainTextConverter {
    fn name(&self) -> &'static str {
        "plain-text"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        let bytes = std::fs::read(source)?;
        let Ok(text) = String::from_utf8(bytes) else {
            return Ok(None);
        };

        let text_content = match opts.extension.as_deref() {
            Some(".csv") => csv_to_table(&text).unwrap_or(text),
            Some(".json") | Some(".jsonld") => pretty_json(&text).unwrap_or(text),
            Some(".jsonl") => pretty_jsonl(&text).unwrap_or(text),
            Some(".yaml") | Some(".yml") => redump_yaml(&text).unwrap_or(text),
            _ => text,
        };

        Ok(Some(ConversionResult::with_text(text_content)))
    }
}

/// CSV → Markdown table: header row, `---` separator, data rows.
fn csv_to_table(text: &str) -> Option<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    let mut records = reader.records();

    let header = records.next()?.ok()?;
    let mut out = String::new();
    out.push_str("| ");
    out.push_str(&header.iter().collect::<Vec<_>>().join(" | "));
    out.push_str(" |\n| ");
    out.push_str(&vec!["---"; header.len()].join(" | "));
    out.push_str(" |\n");

    for record in records {
        let record = record.ok()?;
        out.push_str("| ");
        out.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
        out.push_str(" |\n");
    }
    Some(out)
}

fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    serde_json::to_string_pretty(&value).ok()
}

/// JSONL → pretty-printed records joined by `---` rules.
fn pretty_jsonl(text: &str) -> Option<String> {
    let mut rendered = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(line).ok()?;
        rendered.push(serde_json::to_string_pretty(&value).ok()?);
    }
    Some(rendered.join("\n---\n"))
}

fn redump_yaml(text: &str) -> Option<String> {
    let value: serde_yaml::Value = serde_yaml::from_str(text).ok()?;
    serde_yaml::to_string(&value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(content: &[u8], ext: &str) -> Option<ConversionResult> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("f{ext}"));
        std::fs::write(&path, content).unwrap();
        let opts = ConvertOptions {
            extension: Some(ext.to_string()),
            ..Default::default()
        };
        PlainTextConverter
            .convert(&path, &ConversionConfig::default(), &opts)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn csv_becomes_markdown_table() {
        let result = run(b"a,b\n1,2\n", ".csv").await.unwrap();
        assert_eq!(
            result.text_content,
            "| a | b |\n| --- | --- |\n| 1 | 2 |\n"
        );
    }

    #[tokio::test]
    async fn json_is_pretty_printed() {
        let result = run(br#"{"k":[1,2]}"#, ".json").await.unwrap();
        assert!(result.text_content.contains("\"k\": [\n"));
    }

    #[tokio::test]
    async fn jsonl_records_are_separated() {
        let result = run(b"{\"a\":1}\n{\"a\":2}\n", ".jsonl").await.unwrap();
        assert!(result.text_content.contains("---"));
        assert!(result.text_content.contains("\"a\": 2"));
    }

    #[tokio::test]
    async fn yaml_is_redumped() {
        let result = run(b"k:  [1, 2]\n", ".yaml").await.unwrap();
        assert!(result.text_content.contains("k:"));
    }

    #[tokio::test]
    async fn malformed_json_falls_back_to_raw_text() {
        let result = run(b"{not json", ".json").await.unwrap();
        assert_eq!(result.text_content, "{not json");
    }

    #[tokio::test]
    async fn invalid_utf8_declines() {
        let result = run(&[0xFF, 0xFE, 0x00, 0x80], ".txt").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn unknown_extension_reads_verbatim() {
        let result = run("plain content".as_bytes(), ".xyz").await.unwrap();
        assert_eq!(result.text_content, "plain content");
    }
}
