//! Video platform conversion.
//!
//! Activates only when the source URL belongs to the platform: the local
//! bytes (usually the watch page HTML) are ignored in favour of the
//! injected [`VideoInfoService`], which yields structured metadata and an
//! optional transcript. A missing transcript is embedded as an inline
//! note, never a failure: the metadata alone routinely answers questions
//! about a video.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::Path;
use tracing::debug;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;
use crate::services::VideoInfo;

use super::{ConvertOptions, DocumentConverter};

pub struct YouTubeConverter;

#[async_trait]
impl DocumentConverter for YouTubeConverter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn convert(
        &self,
        _source: &Path,
        config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        let Some(url) = opts.url.as_deref() else {
            return Ok(None);
        };
        if !is_platform_url(url) {
            return Ok(None);
        }
        let Some(service) = &config.video else {
            return Ok(None);
        };

        let info = match service.lookup(url).await {
            Ok(info) => info,
            // Private/deleted videos and a missing probe tool both mean
            // "we cannot speak for this URL": decline and let the page
            // HTML handlers have a go.
            Err(e) => {
                debug!(url, error = %e, "video lookup failed; declining");
                return Ok(None);
            }
        };

        Ok(Some(render(&info)))
    }
}

fn is_platform_url(url: &str) -> bool {
    url.contains("youtube.com/") || url.contains("youtu.be/")
}

fn render(info: &VideoInfo) -> ConversionResult {
    let mut stats = Vec::new();
    if let Some(views) = info.view_count {
        stats.push(format!("- **Views:** {}", group_thousands(views)));
    }
    if let Some(likes) = info.like_count {
        stats.push(format!("- **Likes:** {}", group_thousands(likes)));
    }
    match (&info.channel, &info.channel_url) {
        (Some(channel), Some(url)) => stats.push(format!("- **Channel:** [{channel}]({url})")),
        (Some(channel), None) => stats.push(format!("- **Channel:** {channel}")),
        _ => {}
    }
    if let Some(date) = info
        .upload_date
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
    {
        stats.push(format!("- **Upload Date:** {}", date.format("%Y-%m-%d")));
    }
    if let Some(secs) = info.duration_secs {
        stats.push(format!("- **Duration:** {}", format_duration(secs)));
    }
    if !info.tags.is_empty() {
        stats.push(format!("- **Keywords:** {}", info.tags.join(", ")));
    }

    let transcript = info
        .transcript
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| "(Could not retrieve a transcript for this video)".to_string());

    let text_content = format!(
        "# {title}\n\n### Video Metadata\n{stats}\n\n### Description\n{description}\n\n### Transcript\n{transcript}",
        title = info.title,
        stats = stats.join("\n"),
        description = info.description.trim(),
    );

    ConversionResult {
        title: Some(info.title.clone()),
        text_content,
        metadata: Default::default(),
    }
}

fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> VideoInfo {
        VideoInfo {
            title: "Learning Rust".into(),
            description: "A walkthrough.".into(),
            channel: Some("rustlings".into()),
            channel_url: Some("https://youtube.com/@rustlings".into()),
            upload_date: Some("20240317".into()),
            duration_secs: Some(3725),
            view_count: Some(1234567),
            like_count: Some(8901),
            tags: vec!["rust".into(), "tutorial".into()],
            transcript: None,
        }
    }

    #[test]
    fn platform_url_detection() {
        assert!(is_platform_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_platform_url("https://youtu.be/abc"));
        assert!(!is_platform_url("https://vimeo.com/123"));
    }

    #[test]
    fn renders_structured_document() {
        let doc = render(&sample_info());
        assert!(doc.text_content.starts_with("# Learning Rust"));
        assert!(doc.text_content.contains("- **Views:** 1,234,567"));
        assert!(doc.text_content.contains("- **Upload Date:** 2024-03-17"));
        assert!(doc.text_content.contains("- **Duration:** 01:02:05"));
        assert!(doc.text_content.contains("### Description"));
        assert!(doc
            .text_content
            .contains("(Could not retrieve a transcript for this video)"));
    }

    #[test]
    fn transcript_is_embedded_when_present() {
        let mut info = sample_info();
        info.transcript = Some("hello world".into());
        let doc = render(&info);
        assert!(doc.text_content.ends_with("### Transcript\nhello world"));
    }

    #[tokio::test]
    async fn declines_without_url_context() {
        let out = YouTubeConverter
            .convert(
                Path::new("/dev/null"),
                &ConversionConfig::default(),
                &ConvertOptions::default(),
            )
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
