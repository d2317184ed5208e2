//! Audio conversion: probe metadata plus speech transcription.
//!
//! Transcription is best-effort by contract: a failed or absent
//! speech-to-text collaborator produces an inline note in the transcript
//! section, never a conversion failure. The metadata block alone (track
//! title, artist, duration) is frequently enough for the caller.

use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

const SUPPORTED: &[&str] = &[".wav", ".mp3", ".m4a", ".flac"];

/// Probe fields worth surfacing, in display order.
const METADATA_FIELDS: &[&str] = &[
    "Title",
    "Artist",
    "Author",
    "Band",
    "Album",
    "Genre",
    "Track",
    "DateTimeOriginal",
    "CreateDate",
    "Duration",
];

pub struct AudioConverter;

#[async_trait]
impl DocumentConverter for AudioConverter {
    fn name(&self) -> &'static str {
        "audio"
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

        let transcript_section = match &config.speech {
            Some(speech) => match speech.transcribe(source).await {
                Ok(transcript) => {
                    let transcript = transcript.trim();
                    if transcript.is_empty() {
                        "[No speech detected]".to_string()
                    } else {
                        transcript.to_string()
                    }
                }
                Err(e) => {
                    warn!(source = %source.display(), error = %e, "transcription failed");
                    format!("Error. Could not transcribe this audio. {e}")
                }
            },
            None => "(No speech-to-text service configured; transcript unavailable)".to_string(),
        };
        content.push_str("\n\n### Audio Transcript:\n");
        content.push_str(&transcript_section);

        Ok(Some(ConversionResult::with_text(content.trim().to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{MetadataProbe, ServiceError, SpeechToText};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    struct FixedProbe;

    #[async_trait]
    impl MetadataProbe for FixedProbe {
        async fn probe(&self, _path: &Path) -> Option<BTreeMap<String, String>> {
            let mut m = BTreeMap::new();
            m.insert("Title".to_string(), "Interview".to_string());
            m.insert("Duration".to_string(), "0:01:30".to_string());
            m.insert("Irrelevant".to_string(), "dropped".to_string());
            Some(m)
        }
    }

    struct FixedSpeech(Result<String, ()>);

    #[async_trait]
    impl SpeechToText for FixedSpeech {
        async fn transcribe(&self, _audio: &Path) -> Result<String, ServiceError> {
            match &self.0 {
                Ok(t) => Ok(t.clone()),
                Err(()) => Err(ServiceError::Http("503".into())),
            }
        }
    }

    fn audio_file() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        std::fs::write(&path, b"RIFF\x00\x00\x00\x00WAVEfmt ").unwrap();
        (dir, path)
    }

    fn config(speech: Option<Arc<dyn SpeechToText>>) -> ConversionConfig {
        let mut config = ConversionConfig::default();
        config.probe = Some(Arc::new(FixedProbe));
        config.speech = speech;
        config
    }

    fn wav_opts() -> ConvertOptions {
        ConvertOptions {
            extension: Some(".wav".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn metadata_and_transcript_are_combined() {
        let (_dir, path) = audio_file();
        let cfg = config(Some(Arc::new(FixedSpeech(Ok("hello there".into())))));
        let result = AudioConverter
            .convert(&path, &cfg, &wav_opts())
            .await
            .unwrap()
            .unwrap();
        assert!(result.text_content.contains("Title: Interview"));
        assert!(result.text_content.contains("Duration: 0:01:30"));
        assert!(!result.text_content.contains("Irrelevant"));
        assert!(result.text_content.ends_with("### Audio Transcript:\nhello there"));
    }

    #[tokio::test]
    async fn empty_transcript_reports_no_speech() {
        let (_dir, path) = audio_file();
        let cfg = config(Some(Arc::new(FixedSpeech(Ok("  ".into())))));
        let result = AudioConverter
            .convert(&path, &cfg, &wav_opts())
            .await
            .unwrap()
            .unwrap();
        assert!(result.text_content.contains("[No speech detected]"));
    }

    #[tokio::test]
    async fn transcription_failure_is_an_inline_note_not_an_error() {
        let (_dir, path) = audio_file();
        let cfg = config(Some(Arc::new(FixedSpeech(Err(())))));
        let result = AudioConverter
            .convert(&path, &cfg, &wav_opts())
            .await
            .unwrap()
            .unwrap();
        assert!(result
            .text_content
            .contains("Error. Could not transcribe this audio."));
    }

    #[tokio::test]
    async fn unsupported_extension_declines() {
        let (_dir, path) = audio_file();
        let out = AudioConverter
            .convert(
                &path,
                &config(None),
                &ConvertOptions {
                    extension: Some(".ogg".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
