//! Zip archive conversion: extract and list, never recurse.
//!
//! The extraction directory is persistent: extracted files must outlive
//! this call so the caller can convert them individually afterwards.

use async_trait::async_trait;
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::{ConvertOptions, DocumentConverter};

pub struct ZipConverter;

#[async_trait]
impl DocumentConverter for ZipConverter {
    fn name(&self) -> &'static str {
        "zip"
    }

    async fn convert(
        &self,
        source: &Path,
        config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if opts.extension.as_deref() != Some(".zip") {
            return Ok(None);
        }

        // Verify the real signature; an extension alone proves nothing.
        let mut magic = [0u8; 4];
        let mut file = std::fs::File::open(source)?;
        if file.read(&mut magic)? < 4 || &magic != b"PK\x03\x04" {
            return Ok(None);
        }

        let mut archive = zip::ZipArchive::new(std::fs::File::open(source)?)
            .map_err(|e| ConverterError::Parse(format!("corrupt zip archive: {e}")))?;

        std::fs::create_dir_all(&config.extract_dir)?;

        let mut extracted: Vec<String> = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| ConverterError::Parse(format!("corrupt zip entry: {e}")))?;
            if entry.is_dir() {
                continue;
            }
            let Some(relative) = safe_entry_path(entry.name()) else {
                continue;
            };
            let target = config.extract_dir.join(&relative);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = std::fs::File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
            extracted.push(target.to_string_lossy().into_owned());
        }

        extracted.sort();

        let mut content = String::from("Downloaded the following files:\n");
        for path in &extracted {
            content.push_str(&format!("* {path}\n"));
        }

        Ok(Some(ConversionResult::titled(
            "Extracted Files",
            content.trim().to_string(),
        )))
    }
}

/// Reject absolute entries and any `..` traversal.
fn safe_entry_path(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn build_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        for (name, bytes) in entries {
            writer.start_file(*name, opts).unwrap();
            writer.write_all(bytes).unwrap();
        }
        writer.finish().unwrap();
    }

    fn zip_opts() -> ConvertOptions {
        ConvertOptions {
            extension: Some(".zip".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn lists_extracted_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("bundle.zip");
        build_zip(&archive_path, &[("b/c.txt", b"two"), ("a.txt", b"one")]);

        let config = ConversionConfig::builder()
            .extract_dir(dir.path().join("out"))
            .build()
            .unwrap();
        let result = ZipConverter
            .convert(&archive_path, &config, &zip_opts())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.title.as_deref(), Some("Extracted Files"));
        let listed: Vec<&str> = result
            .text_content
            .lines()
            .skip(1)
            .map(|l| l.trim_start_matches("* "))
            .collect();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].ends_with("a.txt"));
        assert!(listed[1].ends_with("c.txt"));
        assert!(dir.path().join("out/b/c.txt").exists());
        assert_eq!(std::fs::read(dir.path().join("out/a.txt")).unwrap(), b"one");
    }

    #[tokio::test]
    async fn fake_zip_extension_declines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.zip");
        std::fs::write(&path, b"just text, no signature").unwrap();
        let out = ZipConverter
            .convert(&path, &ConversionConfig::default(), &zip_opts())
            .await
            .unwrap();
        assert!(out.is_none());
    }

    #[tokio::test]
    async fn traversal_entries_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("evil.zip");
        build_zip(&archive_path, &[("../escape.txt", b"nope"), ("ok.txt", b"yes")]);

        let config = ConversionConfig::builder()
            .extract_dir(dir.path().join("out"))
            .build()
            .unwrap();
        let result = ZipConverter
            .convert(&archive_path, &config, &zip_opts())
            .await
            .unwrap()
            .unwrap();
        assert!(result.text_content.contains("ok.txt"));
        assert!(!result.text_content.contains("escape"));
        assert!(!dir.path().join("escape.txt").exists());
    }
}
