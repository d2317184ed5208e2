//! Conversion entry points.
//!
//! [`MarkdownConverter`] owns the handler registry and the configuration;
//! one instance is cheap to build and safe to share across concurrent
//! calls (registrations are immutable after construction, every call gets
//! a private source copy). The free [`convert`] / [`convert_sync`]
//! functions cover the one-shot case.

use std::path::Path;
use tracing::info;

use crate::config::ConversionConfig;
use crate::converters::{default_registry, ConvertOptions, DocumentConverter};
use crate::error::ConvertError;
use crate::output::ConversionResult;
use crate::pipeline::dispatch::{dispatch, ConverterRegistry};
use crate::pipeline::identify::{candidates_for_local, candidates_for_response};
use crate::pipeline::input::{
    self, download_url, resolve_local, spool_bytes, spool_response, FetchedResponse,
};
use std::sync::Arc;

/// The conversion engine: registry + config.
pub struct MarkdownConverter {
    config: ConversionConfig,
    registry: ConverterRegistry,
}

impl MarkdownConverter {
    /// Engine with every built-in handler registered.
    pub fn new(config: ConversionConfig) -> Self {
        Self {
            config,
            registry: default_registry(),
        }
    }

    /// Engine with a caller-supplied registry.
    pub fn with_registry(config: ConversionConfig, registry: ConverterRegistry) -> Self {
        Self { config, registry }
    }

    /// Register an additional handler under the given extensions.
    /// Handlers registered later have lower priority within a bucket.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>, extensions: &[&str]) {
        self.registry.register(converter, extensions);
    }

    /// Convert a local path or an HTTP(S) URL, autodetected.
    pub async fn convert(
        &self,
        source: &str,
        opts: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        if input::is_url(source) {
            self.convert_url(source, opts).await
        } else {
            self.convert_local(Path::new(source), opts).await
        }
    }

    /// Convert a local file.
    pub async fn convert_local(
        &self,
        path: &Path,
        opts: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        info!("converting local file: {}", path.display());
        let source = resolve_local(path)?;
        let candidates = candidates_for_local(source.path(), opts.extension.as_deref());
        dispatch(
            &self.registry,
            source.path(),
            &path.display().to_string(),
            &candidates,
            &self.config,
            opts,
        )
        .await
    }

    /// Download a URL and convert the response.
    pub async fn convert_url(
        &self,
        url: &str,
        opts: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        info!("converting url: {url}");
        let (source, fetched) = download_url(url, &self.config).await?;
        let candidates =
            candidates_for_response(&fetched, source.path(), opts.extension.as_deref());
        let mut opts = opts.clone();
        if opts.url.is_none() {
            opts.url = Some(fetched.url.clone());
        }
        // `source` lives until dispatch returns; its temp copy is removed
        // on every exit path when it drops here.
        dispatch(
            &self.registry,
            source.path(),
            url,
            &candidates,
            &self.config,
            &opts,
        )
        .await
    }

    /// Convert a pre-fetched HTTP response (final URL + headers + bytes).
    pub async fn convert_response(
        &self,
        fetched: &FetchedResponse,
        opts: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        info!("converting pre-fetched response: {}", fetched.url);
        let source = spool_response(fetched)?;
        let candidates =
            candidates_for_response(fetched, source.path(), opts.extension.as_deref());
        let mut opts = opts.clone();
        if opts.url.is_none() {
            opts.url = Some(fetched.url.clone());
        }
        dispatch(
            &self.registry,
            source.path(),
            &fetched.url,
            &candidates,
            &self.config,
            &opts,
        )
        .await
    }

    /// Convert raw bytes with no name or header context. Only the explicit
    /// override and magic sniffing can steer dispatch here.
    pub async fn convert_bytes(
        &self,
        bytes: &[u8],
        opts: &ConvertOptions,
    ) -> Result<ConversionResult, ConvertError> {
        let source = spool_bytes(bytes, "download")?;
        let candidates = candidates_for_local(source.path(), opts.extension.as_deref());
        dispatch(
            &self.registry,
            source.path(),
            "<bytes>",
            &candidates,
            &self.config,
            opts,
        )
        .await
    }
}

/// One-shot conversion of a path or URL with the given configuration.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ConvertError)` for input/download failures, for
/// [`ConvertError::ConversionFailed`] when a matching handler broke, and
/// for [`ConvertError::UnsupportedFormat`] when nothing claims the source.
pub async fn convert(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    MarkdownConverter::new(config.clone())
        .convert(source.as_ref(), &ConvertOptions::default())
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionResult, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(convert(source, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MarkdownConverter {
        MarkdownConverter::new(ConversionConfig::default())
    }

    #[tokio::test]
    async fn plain_text_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "hello   \n\n\n\n\nworld\n").unwrap();
        let result = engine()
            .convert(path.to_str().unwrap(), &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text_content, "hello\n\nworld\n");
    }

    #[tokio::test]
    async fn unknown_extension_with_utf8_content_uses_plain_text_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.xyz");
        std::fs::write(&path, "just some text").unwrap();
        let result = engine()
            .convert(path.to_str().unwrap(), &ConvertOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text_content, "just some text");
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = engine()
            .convert("/no/such/file.txt", &ConvertOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn bytes_are_sniffed_without_a_name() {
        let html = b"<!DOCTYPE html><html><title>T</title><body><p>content body here, \
                     with commas, long enough to score as prose for extraction.</p></body></html>";
        let result = engine()
            .convert_bytes(html, &ConvertOptions::default())
            .await
            .unwrap();
        assert!(result.text_content.contains("content body here"));
    }

    #[tokio::test]
    async fn unknown_binary_content_is_unsupported_with_attempts() {
        let bytes: Vec<u8> = (0..64u8).map(|b| b.wrapping_mul(37) | 0x80).collect();
        let err = engine()
            .convert_bytes(&bytes, &ConvertOptions::default())
            .await
            .unwrap_err();
        match err {
            ConvertError::UnsupportedFormat { attempted, .. } => {
                assert_eq!(attempted, vec!["<none>".to_string()]);
            }
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }
}
