//! Subprocess-backed probes: `exiftool` for media metadata, `yt-dlp` for
//! video platform metadata.
//!
//! Both tools are optional at runtime. A missing binary is reported as
//! "unavailable" (`None` from the metadata probe, `Tool` error from the
//! video probe) and never aborts a conversion on its own.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use super::{MetadataProbe, ServiceError, VideoInfo, VideoInfoService};

/// `exiftool -json <file>` wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifToolProbe;

#[async_trait]
impl MetadataProbe for ExifToolProbe {
    async fn probe(&self, path: &Path) -> Option<BTreeMap<String, String>> {
        let output = Command::new("exiftool")
            .arg("-json")
            .arg(path)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            debug!(path = %path.display(), "exiftool exited non-zero");
            return None;
        }
        let parsed: Value = serde_json::from_slice(&output.stdout).ok()?;
        let first = parsed.as_array()?.first()?.as_object()?;

        let mut map = BTreeMap::new();
        for (key, value) in first {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            map.insert(key.clone(), rendered);
        }
        Some(map)
    }
}

/// `yt-dlp -J` wrapper: extracts platform metadata without downloading the
/// video itself. Transcripts are not fetched here (caption retrieval is a
/// separate network service); `transcript` is always `None`, which the
/// video converter renders as an inline note.
#[derive(Debug, Default, Clone, Copy)]
pub struct YtDlpVideoService;

#[async_trait]
impl VideoInfoService for YtDlpVideoService {
    async fn lookup(&self, url: &str) -> Result<VideoInfo, ServiceError> {
        let output = Command::new("yt-dlp")
            .args(["-J", "--no-playlist", "--no-warnings", "--skip-download"])
            .arg(url)
            .output()
            .await
            .map_err(|e| ServiceError::Tool {
                tool: "yt-dlp".into(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ServiceError::Tool {
                tool: "yt-dlp".into(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let info: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ServiceError::UnexpectedResponse(e.to_string()))?;

        Ok(VideoInfo {
            title: info["title"].as_str().unwrap_or("Video").to_string(),
            description: info["description"].as_str().unwrap_or_default().to_string(),
            channel: info["channel"].as_str().map(str::to_owned),
            channel_url: info["channel_url"].as_str().map(str::to_owned),
            upload_date: info["upload_date"].as_str().map(str::to_owned),
            duration_secs: info["duration"].as_u64(),
            view_count: info["view_count"].as_u64(),
            like_count: info["like_count"].as_u64(),
            tags: info["tags"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|t| t.as_str().map(str::to_owned))
                        .collect()
                })
                .unwrap_or_default(),
            transcript: None,
        })
    }
}
