//! Error types for the doc2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the conversion as a whole produced no
//!   result (bad input path, download failure, every candidate exhausted).
//!   Returned as `Err(ConvertError)` from the top-level `convert*` functions.
//!
//! * [`ConverterError`] — **Non-fatal at dispatch level**: a single format
//!   handler matched the source but broke while converting it. The
//!   dispatcher records it and moves on to the next candidate; only if no
//!   handler succeeds do the recorded errors surface inside
//!   [`ConvertError::ConversionFailed`].
//!
//! A handler that merely does not recognise the source *declines* by
//! returning `Ok(None)` instead; declining is not an error at all.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the doc2md library.
///
/// Per-converter failures use [`ConverterError`] and drive dispatch
/// fallback rather than propagating here directly.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Dispatch outcomes ─────────────────────────────────────────────────
    /// At least one converter recognised the format but every attempt broke.
    ///
    /// `attempted` lists the candidate extensions in the order they were
    /// tried (the trailing entry `"<none>"` is the no-extension pass);
    /// `errors` accumulates each failing converter's message.
    #[error(
        "could not convert '{source}'. File type was recognized as {attempted:?}. \
         While converting, the following errors were encountered:\n{errors}"
    )]
    ConversionFailed {
        source: String,
        attempted: Vec<String>,
        errors: String,
    },

    /// No registered converter claims the source.
    #[error("could not parse '{source}': the formats {attempted:?} are not supported")]
    UnsupportedFormat {
        source: String,
        attempted: Vec<String>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (temp file creation, runtime setup, …).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A single format handler's failure: the format matched but an internal
/// step broke (corrupt container, collaborator refused, parse error).
///
/// Recoverable at dispatch level: the dispatcher records the message and
/// tries the next candidate.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The source container or payload could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required external collaborator call failed.
    #[error("collaborator error: {0}")]
    Collaborator(String),

    /// Underlying I/O failure while reading the materialized source.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::services::ServiceError> for ConverterError {
    fn from(e: crate::services::ServiceError) -> Self {
        ConverterError::Collaborator(e.to_string())
    }
}
