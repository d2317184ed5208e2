//! Shared helpers for Office Open XML packages (docx / xlsx / pptx).
//!
//! An OOXML document is a zip container of XML parts. These helpers open
//! the container and hand parts to `quick-xml` streaming readers; the
//! per-format modules own the actual event loops.

use std::io::Read;
use std::path::Path;

use crate::error::ConverterError;

/// Open an OOXML container for reading.
pub fn open_package(path: &Path) -> Result<zip::ZipArchive<std::fs::File>, ConverterError> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file)
        .map_err(|e| ConverterError::Parse(format!("not a readable OOXML package: {e}")))
}

/// Read a named part into a string. Missing part is a parse error:
/// a container without its core part is corrupt for our purposes.
pub fn read_part(
    archive: &mut zip::ZipArchive<std::fs::File>,
    part: &str,
) -> Result<String, ConverterError> {
    let mut entry = archive
        .by_name(part)
        .map_err(|_| ConverterError::Parse(format!("package is missing part '{part}'")))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Read a named part if present.
pub fn read_part_opt(
    archive: &mut zip::ZipArchive<std::fs::File>,
    part: &str,
) -> Option<String> {
    let mut entry = archive.by_name(part).ok()?;
    let mut content = String::new();
    entry.read_to_string(&mut content).ok()?;
    Some(content)
}

/// Minimal escaping for text dropped into generated HTML.
pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_parts_from_a_package() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        writer.start_file("word/document.xml", opts).unwrap();
        writer.write_all(b"<w:document/>").unwrap();
        writer.finish().unwrap();

        let mut archive = open_package(&path).unwrap();
        assert_eq!(read_part(&mut archive, "word/document.xml").unwrap(), "<w:document/>");
        assert!(read_part(&mut archive, "word/missing.xml").is_err());
        assert!(read_part_opt(&mut archive, "word/missing.xml").is_none());
    }

    #[test]
    fn escapes_html_significant_characters() {
        assert_eq!(html_escape(r#"a<b>&"c""#), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
