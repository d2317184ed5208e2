//! Source materialization: normalize any input form to a private local
//! byte copy.
//!
//! ## Why a local copy?
//!
//! Converters need a file-system path: Office containers are opened with
//! seekable readers, probe tools (`exiftool`, speech endpoints) take paths,
//! and magic-byte sniffing reads the file head. Downloading into a
//! [`TempDir`]-backed handle gives every converter a real path while RAII
//! guarantees cleanup on every exit path (success, decline-exhaustion, or
//! error), even across panics.

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// A materialized source: either a caller-owned local file or a private
/// temp copy that is deleted when the handle drops.
pub enum ResolvedSource {
    /// Input was already a local file; not deleted on drop.
    Local(PathBuf),
    /// Input was downloaded or spooled; the `TempDir` keeps the copy alive
    /// until the conversion call exits.
    Spooled { path: PathBuf, _temp_dir: TempDir },
}

impl ResolvedSource {
    /// Path to the local bytes regardless of how they were materialized.
    pub fn path(&self) -> &Path {
        match self {
            ResolvedSource::Local(p) => p,
            ResolvedSource::Spooled { path, .. } => path,
        }
    }
}

/// A pre-fetched HTTP response handed in by the caller: final URL, the
/// type-relevant headers, and the raw body bytes.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// Final URL after redirects.
    pub url: String,
    /// Raw `Content-Type` header value, if present.
    pub content_type: Option<String>,
    /// Raw `Content-Disposition` header value, if present.
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchedResponse {
    /// Build from a live [`reqwest::Response`], consuming the body.
    pub async fn from_response(response: reqwest::Response) -> Result<Self, ConvertError> {
        let url = response.url().to_string();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let content_type = header("content-type");
        let content_disposition = header("content-disposition");
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConvertError::DownloadFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?
            .to_vec();
        Ok(Self {
            url,
            content_type,
            content_disposition,
            bytes,
        })
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a local file path, validating existence and readability.
pub fn resolve_local(path: &Path) -> Result<ResolvedSource, ConvertError> {
    if !path.exists() {
        return Err(ConvertError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    match std::fs::File::open(path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    }
    debug!("resolved local source: {}", path.display());
    Ok(ResolvedSource::Local(path.to_path_buf()))
}

/// Download a URL into a temp-backed handle, returning the handle together
/// with the response header context the format identifier needs.
pub async fn download_url(
    url: &str,
    config: &ConversionConfig,
) -> Result<(ResolvedSource, FetchedResponse), ConvertError> {
    info!("downloading source: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.download_timeout_secs))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            ConvertError::DownloadTimeout {
                url: url.to_string(),
                secs: config.download_timeout_secs,
            }
        } else {
            ConvertError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(ConvertError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let fetched = FetchedResponse::from_response(response).await?;
    let source = spool_response(&fetched)?;
    Ok((source, fetched))
}

/// Write a pre-fetched response's bytes to a private temp copy.
pub fn spool_response(fetched: &FetchedResponse) -> Result<ResolvedSource, ConvertError> {
    let filename = filename_for(&fetched.url);
    spool_bytes(&fetched.bytes, &filename)
}

/// Write raw bytes to a private temp copy.
pub fn spool_bytes(bytes: &[u8], filename: &str) -> Result<ResolvedSource, ConvertError> {
    let temp_dir = TempDir::new().map_err(|e| ConvertError::Internal(e.to_string()))?;
    let path = temp_dir.path().join(filename);
    std::fs::write(&path, bytes).map_err(|e| {
        ConvertError::Internal(format!("failed to write temp copy: {e}"))
    })?;
    debug!("spooled {} bytes to {}", bytes.len(), path.display());
    Ok(ResolvedSource::Spooled {
        path,
        _temp_dir: temp_dir,
    })
}

/// Pick a file name for the temp copy from the URL's last path segment,
/// so suffix-based identification keeps working on the spooled file.
fn filename_for(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return sanitize_filename(last);
                }
            }
        }
    }
    "download".to_string()
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("http://example.com/doc.pdf"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("doc.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn filename_from_url_path() {
        assert_eq!(filename_for("https://host/a/report.xlsx"), "report.xlsx");
        assert_eq!(filename_for("https://host/a/"), "download");
        assert_eq!(filename_for("https://host"), "download");
    }

    #[test]
    fn spooled_copy_is_deleted_on_drop() {
        let spooled = spool_bytes(b"hello", "x.txt").unwrap();
        let path = spooled.path().to_path_buf();
        assert!(path.exists());
        drop(spooled);
        assert!(!path.exists());
    }

    #[test]
    fn missing_local_file_is_reported() {
        let err = resolve_local(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, ConvertError::FileNotFound { .. }));
    }
}
