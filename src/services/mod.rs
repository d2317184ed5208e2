//! Collaborator ports: the external capabilities some converters consume.
//!
//! Each port is a narrow async trait; converters receive implementations
//! through [`crate::config::ConversionConfig`] rather than resolving them
//! from any ambient/global state. That keeps concurrent conversions
//! independent and lets tests substitute deterministic fakes.
//!
//! Default implementations live in [`http`] (OpenAI-compatible vision and
//! speech endpoints) and [`probe`] (`exiftool` / `yt-dlp` subprocesses).
//! All of them are optional: a missing service degrades the affected
//! converter (inline note or metadata-only output) instead of failing the
//! whole conversion.

pub mod http;
pub mod probe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub use http::{OpenAiSpeechService, OpenAiVisionService};
pub use probe::{ExifToolProbe, YtDlpVideoService};

/// Failure of an external collaborator call.
///
/// Converters decide per call whether this is soft (embedded as an inline
/// note, e.g. a missing transcript) or hard (escalated to a converter
/// failure, e.g. the document cannot be analyzed at all).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("http error: {0}")]
    Http(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("tool '{tool}' failed: {detail}")]
    Tool { tool: String, detail: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Speech-to-text: audio file in, transcript out.
///
/// An empty transcript is a valid result (silence); errors are reserved
/// for the service itself breaking.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String, ServiceError>;
}

/// Vision analysis: image plus free-text prompt in, generated text out.
///
/// Used twice per image (once for OCR, once for captioning/VQA), so the
/// prompt fully determines the task.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn analyze(&self, image: &Path, prompt: &str) -> Result<String, ServiceError>;
}

/// Structured metadata for a hosted video.
///
/// Every field except `title` is optional; platforms differ in what they
/// expose. A missing `transcript` is expected and non-fatal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub channel: Option<String>,
    pub channel_url: Option<String>,
    /// Upload date in `YYYYMMDD` form, as reported by the platform.
    pub upload_date: Option<String>,
    pub duration_secs: Option<u64>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub transcript: Option<String>,
}

/// Video metadata/transcript lookup for a platform URL.
#[async_trait]
pub trait VideoInfoService: Send + Sync {
    async fn lookup(&self, url: &str) -> Result<VideoInfo, ServiceError>;
}

/// Local media metadata probe.
///
/// `None` means the probe tool is unavailable or produced nothing usable;
/// converters then simply omit the metadata block.
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> Option<BTreeMap<String, String>>;
}
