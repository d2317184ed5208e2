//! Configuration for document conversion.
//!
//! All behaviour is controlled through [`ConversionConfig`], built via its
//! [`ConversionConfigBuilder`]. The config also carries the injected
//! collaborator services: converters receive them through this object
//! rather than resolving anything from ambient or thread-local state, so
//! concurrent conversions stay independent and tests can substitute fakes.

use crate::error::ConvertError;
use crate::services::{
    ExifToolProbe, MetadataProbe, OpenAiSpeechService, OpenAiVisionService, SpeechToText,
    VideoInfoService, VisionService, YtDlpVideoService,
};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Browser-like user agent; some origins refuse the reqwest default.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

/// Configuration for a conversion engine.
///
/// # Example
/// ```rust
/// use doc2md::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .download_timeout_secs(60)
///     .extract_dir("downloads")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// User agent sent on URL downloads. Default: a browser-like string.
    pub user_agent: String,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Directory where the archive converter extracts zip entries.
    /// Extracted files outlive the conversion call so the caller can
    /// convert them individually afterwards. Default: `downloads`.
    pub extract_dir: PathBuf,

    /// Speech-to-text collaborator for audio conversion. When absent, the
    /// audio converter emits an inline note instead of a transcript.
    pub speech: Option<Arc<dyn SpeechToText>>,

    /// Vision collaborator for image OCR/captioning. When absent, the
    /// image converter produces metadata-only output with an inline note.
    pub vision: Option<Arc<dyn VisionService>>,

    /// Video platform metadata/transcript collaborator.
    /// Default: [`YtDlpVideoService`].
    pub video: Option<Arc<dyn VideoInfoService>>,

    /// Local media metadata probe. Default: [`ExifToolProbe`]; the probe
    /// reports "unavailable" gracefully when the tool is not installed.
    pub probe: Option<Arc<dyn MetadataProbe>>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            download_timeout_secs: 120,
            extract_dir: PathBuf::from("downloads"),
            speech: None,
            vision: None,
            video: Some(Arc::new(YtDlpVideoService)),
            probe: Some(Arc::new(ExifToolProbe)),
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("user_agent", &self.user_agent)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("extract_dir", &self.extract_dir)
            .field("speech", &self.speech.as_ref().map(|_| "<dyn SpeechToText>"))
            .field("vision", &self.vision.as_ref().map(|_| "<dyn VisionService>"))
            .field("video", &self.video.as_ref().map(|_| "<dyn VideoInfoService>"))
            .field("probe", &self.probe.as_ref().map(|_| "<dyn MetadataProbe>"))
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn extract_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.extract_dir = dir.into();
        self
    }

    pub fn speech(mut self, svc: Arc<dyn SpeechToText>) -> Self {
        self.config.speech = Some(svc);
        self
    }

    pub fn vision(mut self, svc: Arc<dyn VisionService>) -> Self {
        self.config.vision = Some(svc);
        self
    }

    pub fn video(mut self, svc: Arc<dyn VideoInfoService>) -> Self {
        self.config.video = Some(svc);
        self
    }

    pub fn probe(mut self, svc: Arc<dyn MetadataProbe>) -> Self {
        self.config.probe = Some(svc);
        self
    }

    /// Disable the media metadata probe entirely.
    pub fn no_probe(mut self) -> Self {
        self.config.probe = None;
        self
    }

    /// Fill the AI services from the environment when not set explicitly:
    /// `OPENAI_API_KEY` (plus optional `OPENAI_BASE_URL`,
    /// `DOC2MD_VISION_MODEL`, `DOC2MD_SPEECH_MODEL`) wires the
    /// OpenAI-compatible vision and speech clients.
    pub fn detect_ai_services_from_env(mut self) -> Self {
        let Ok(key) = std::env::var("OPENAI_API_KEY") else {
            return self;
        };
        if key.is_empty() {
            return self;
        }
        let base = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        if self.config.vision.is_none() {
            let model = std::env::var("DOC2MD_VISION_MODEL")
                .unwrap_or_else(|_| "gpt-4o".to_string());
            self.config.vision = Some(Arc::new(OpenAiVisionService::new(&base, &key, model)));
        }
        if self.config.speech.is_none() {
            let model = std::env::var("DOC2MD_SPEECH_MODEL")
                .unwrap_or_else(|_| "whisper-1".to_string());
            self.config.speech = Some(Arc::new(OpenAiSpeechService::new(&base, &key, model)));
        }
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.download_timeout_secs == 0 {
            return Err(ConvertError::InvalidConfig(
                "download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.extract_dir.as_os_str().is_empty() {
            return Err(ConvertError::InvalidConfig(
                "extract_dir must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
