//! Format identification: build the ordered candidate-extension list for a
//! materialized source.
//!
//! Candidates are appended in decreasing trust: an explicit caller
//! override, the path/URL suffix, response-header hints (MIME type, then
//! `Content-Disposition` filename, then the final resolved URL), and
//! finally a magic-byte sniff of the bytes themselves. The list is
//! deduplicated preserving first-seen order and always terminates with a
//! `None` sentinel, so dispatch makes at least one attempt even when
//! detection fails entirely.

use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use super::input::FetchedResponse;

/// Ordered, deduplicated candidate extensions. Never fails.
#[derive(Debug, Default)]
pub struct CandidateList {
    exts: Vec<String>,
}

impl CandidateList {
    /// Append a candidate. Normalizes to a lowercase dotted extension and
    /// drops empties and duplicates (first occurrence wins).
    pub fn push(&mut self, ext: Option<&str>) {
        let Some(raw) = ext else { return };
        let trimmed = raw.trim().trim_matches('"').trim_matches('\'');
        if trimmed.is_empty() || trimmed == "." {
            return;
        }
        let mut normalized = String::with_capacity(trimmed.len() + 1);
        if !trimmed.starts_with('.') {
            normalized.push('.');
        }
        normalized.push_str(&trimmed.to_ascii_lowercase());
        if !self.exts.contains(&normalized) {
            self.exts.push(normalized);
        }
    }

    /// Finish the list: every candidate as `Some(ext)`, then the sentinel.
    pub fn finish(self) -> Vec<Option<String>> {
        let mut out: Vec<Option<String>> = self.exts.into_iter().map(Some).collect();
        out.push(None);
        out
    }
}

/// Candidates for a local file: override, path suffix, magic sniff.
pub fn candidates_for_local(path: &Path, override_ext: Option<&str>) -> Vec<Option<String>> {
    let mut list = CandidateList::default();
    list.push(override_ext);
    list.push(path.extension().and_then(|e| e.to_str()));
    list.push(sniff_extension(path).as_deref());
    let out = list.finish();
    debug!(?out, "candidate extensions (local)");
    out
}

/// Candidates for a spooled HTTP response: override, MIME type,
/// `Content-Disposition` filename, final URL suffix, magic sniff.
pub fn candidates_for_response(
    fetched: &FetchedResponse,
    local: &Path,
    override_ext: Option<&str>,
) -> Vec<Option<String>> {
    let mut list = CandidateList::default();
    list.push(override_ext);

    if let Some(ct) = &fetched.content_type {
        let essence = ct.split(';').next().unwrap_or("").trim();
        if let Some(exts) = mime_guess::get_mime_extensions_str(essence) {
            list.push(exts.first().copied());
        }
    }

    if let Some(dispo) = &fetched.content_disposition {
        if let Some(m) = RE_DISPO_FILENAME.captures(dispo) {
            let name = m[1].trim().trim_matches('"').trim_matches('\'');
            list.push(suffix_of(name));
        }
    }

    if let Ok(parsed) = reqwest::Url::parse(&fetched.url) {
        list.push(suffix_of(parsed.path()));
    }

    list.push(sniff_extension(local).as_deref());
    let out = list.finish();
    debug!(?out, "candidate extensions (response)");
    out
}

static RE_DISPO_FILENAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename=([^;]+)"#).unwrap());

fn suffix_of(name: &str) -> Option<&str> {
    let idx = name.rfind('.')?;
    let suffix = &name[idx + 1..];
    // Reject path-ish remainders like "com/page" from extensionless URLs.
    if suffix.is_empty() || suffix.contains('/') {
        return None;
    }
    Some(suffix)
}

/// Guess an extension from the first bytes of the materialized file.
///
/// Zip containers are disambiguated into `.docx` / `.xlsx` / `.pptx` /
/// `.zip` by peeking at the archive's entry names; a container-level
/// sniff alone would route every Office document to the archive handler.
pub fn sniff_extension(path: &Path) -> Option<String> {
    let mut head = [0u8; 512];
    let n = std::fs::File::open(path)
        .and_then(|mut f| f.read(&mut head))
        .ok()?;
    let head = &head[..n];

    if head.starts_with(b"PK\x03\x04") {
        return Some(sniff_zip_kind(path).to_string());
    }
    if head.starts_with(b"%PDF") {
        return Some(".pdf".into());
    }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(".png".into());
    }
    if head.starts_with(b"\xFF\xD8\xFF") {
        return Some(".jpg".into());
    }
    if head.starts_with(b"GIF87a") || head.starts_with(b"GIF89a") {
        return Some(".gif".into());
    }
    if head.starts_with(b"BM") && n > 6 {
        return Some(".bmp".into());
    }
    if head.starts_with(b"II*\x00") || head.starts_with(b"MM\x00*") {
        return Some(".tiff".into());
    }
    if head.starts_with(b"RIFF") && n >= 12 {
        match &head[8..12] {
            b"WEBP" => return Some(".webp".into()),
            b"WAVE" => return Some(".wav".into()),
            _ => {}
        }
    }
    if head.starts_with(b"fLaC") {
        return Some(".flac".into());
    }
    if head.starts_with(b"ID3")
        || (n >= 2 && head[0] == 0xFF && matches!(head[1], 0xFB | 0xF3 | 0xF2))
    {
        return Some(".mp3".into());
    }
    if n >= 12 && &head[4..8] == b"ftyp" {
        return Some(".m4a".into());
    }

    let text_head = String::from_utf8_lossy(head).to_ascii_lowercase();
    if text_head.contains("<html") || text_head.contains("<!doctype html") {
        return Some(".html".into());
    }

    None
}

/// Inspect a zip container's entry names to tell Office packages apart
/// from plain archives.
fn sniff_zip_kind(path: &Path) -> &'static str {
    let Ok(file) = std::fs::File::open(path) else {
        return ".zip";
    };
    let Ok(archive) = zip::ZipArchive::new(file) else {
        return ".zip";
    };
    for name in archive.file_names() {
        if name.starts_with("word/") {
            return ".docx";
        }
        if name.starts_with("xl/") {
            return ".xlsx";
        }
        if name.starts_with("ppt/") {
            return ".pptx";
        }
    }
    ".zip"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn candidates_dedupe_preserving_first_seen_order() {
        let mut list = CandidateList::default();
        list.push(Some("PDF"));
        list.push(Some(".pdf"));
        list.push(Some("html"));
        list.push(Some(""));
        list.push(None);
        assert_eq!(
            list.finish(),
            vec![Some(".pdf".to_string()), Some(".html".to_string()), None]
        );
    }

    #[test]
    fn empty_detection_still_yields_the_sentinel() {
        let list = CandidateList::default();
        assert_eq!(list.finish(), vec![None]);
    }

    #[test]
    fn sniffs_pdf_and_png_magic() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("unnamed");
        std::fs::write(&pdf, b"%PDF-1.7 rest").unwrap();
        assert_eq!(sniff_extension(&pdf).as_deref(), Some(".pdf"));

        let png = dir.path().join("img");
        std::fs::write(&png, b"\x89PNG\r\n\x1a\nrest").unwrap();
        assert_eq!(sniff_extension(&png).as_deref(), Some(".png"));
    }

    #[test]
    fn sniffs_html_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page");
        std::fs::write(&page, b"\n <!DOCTYPE HTML><html><body>x</body></html>").unwrap();
        assert_eq!(sniff_extension(&page).as_deref(), Some(".html"));
    }

    #[test]
    fn disambiguates_ooxml_from_plain_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mystery");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("xl/workbook.xml", opts).unwrap();
        writer.write_all(b"<workbook/>").unwrap();
        writer.finish().unwrap();
        assert_eq!(sniff_extension(&path).as_deref(), Some(".xlsx"));

        let plain = dir.path().join("plain");
        let file = std::fs::File::create(&plain).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer.start_file("a.txt", opts).unwrap();
        writer.write_all(b"hi").unwrap();
        writer.finish().unwrap();
        assert_eq!(sniff_extension(&plain).as_deref(), Some(".zip"));
    }

    #[test]
    fn content_disposition_filename_is_used() {
        let fetched = FetchedResponse {
            url: "https://example.com/d".into(),
            content_type: None,
            content_disposition: Some("attachment; filename=\"stats.csv\"".into()),
            bytes: vec![],
        };
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("d");
        std::fs::write(&local, b"a,b\n1,2\n").unwrap();
        let candidates = candidates_for_response(&fetched, &local, None);
        assert!(candidates.contains(&Some(".csv".to_string())));
        assert_eq!(candidates.last(), Some(&None));
    }
}
