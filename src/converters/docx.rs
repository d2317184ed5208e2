//! Word document conversion.
//!
//! `word/document.xml` is streamed into an HTML intermediate (headings
//! from paragraph styles, bold/italic runs, tables) which then rides the
//! generic HTML conversion path. Going through HTML rather than straight
//! to Markdown keeps one serialization authority: everything the HTML
//! handler learns (link hygiene, table shapes) applies to Word output for
//! free.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::html::parse_html;
use super::ooxml::{html_escape, open_package, read_part};
use super::{ConvertOptions, DocumentConverter};

pub struct DocxConverter;

#[async_trait]
impl DocumentConverter for DocxConverter {
    fn name(&self) -> &'static str {
        "docx"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if opts.extension.as_deref() != Some(".docx") {
            return Ok(None);
        }
        let mut archive = open_package(source)?;
        let document_xml = read_part(&mut archive, "word/document.xml")?;
        let html = document_to_html(&document_xml)?;
        Ok(Some(parse_html(&html)))
    }
}

fn xml_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Parse(format!("docx xml: {e}"))
}

/// Heading tag for a Word paragraph style id, if it is one of the
/// standard heading styles.
fn heading_tag(style: &str) -> Option<&'static str> {
    match style {
        "Title" | "Heading1" => Some("h1"),
        "Heading2" => Some("h2"),
        "Heading3" => Some("h3"),
        "Heading4" => Some("h4"),
        "Heading5" => Some("h5"),
        "Heading6" => Some("h6"),
        _ => None,
    }
}

fn document_to_html(xml: &str) -> Result<String, ConverterError> {
    let mut reader = Reader::from_str(xml);
    let mut html = String::from("<html><body>\n");

    // Paragraph state: tag decided by pStyle, content buffered until </w:p>.
    let mut para_tag = "p";
    let mut para_buf = String::new();
    let mut in_paragraph = false;

    // Run state. `w:b`/`w:i` inside `w:pPr` describe the paragraph mark,
    // not a run; ignore them there.
    let mut in_ppr = false;
    let mut run_bold = false;
    let mut run_italic = false;
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"p" => {
                    in_paragraph = true;
                    para_tag = "p";
                    para_buf.clear();
                }
                b"pPr" => in_ppr = true,
                b"pStyle" if in_ppr => {
                    if let Some(style) = e
                        .try_get_attribute("w:val")
                        .ok()
                        .flatten()
                        .or_else(|| e.try_get_attribute("val").ok().flatten())
                        .and_then(|a| a.unescape_value().ok())
                    {
                        if let Some(tag) = heading_tag(&style) {
                            para_tag = tag;
                        }
                    }
                }
                b"r" => {
                    run_bold = false;
                    run_italic = false;
                }
                b"b" if !in_ppr => run_bold = true,
                b"i" if !in_ppr => run_italic = true,
                b"t" => in_text = true,
                b"br" => para_buf.push_str("<br/>"),
                b"tab" => para_buf.push('\t'),
                b"tbl" => html.push_str("<table border='1'>\n"),
                b"tr" => html.push_str("<tr>"),
                b"tc" => html.push_str("<td>"),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = html_escape(&t.unescape().map_err(xml_err)?);
                match (run_bold, run_italic) {
                    (true, true) => para_buf.push_str(&format!("<strong><em>{text}</em></strong>")),
                    (true, false) => para_buf.push_str(&format!("<strong>{text}</strong>")),
                    (false, true) => para_buf.push_str(&format!("<em>{text}</em>")),
                    (false, false) => para_buf.push_str(&text),
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"pPr" => in_ppr = false,
                b"p" => {
                    if in_paragraph && !para_buf.trim().is_empty() {
                        html.push_str(&format!("<{para_tag}>{para_buf}</{para_tag}>\n"));
                    }
                    in_paragraph = false;
                }
                b"tc" => html.push_str("</td>"),
                b"tr" => html.push_str("</tr>\n"),
                b"tbl" => html.push_str("</table>\n"),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    html.push_str("</body></html>");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
        <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Report</w:t></w:r></w:p>
        <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>bold lead</w:t></w:r><w:r><w:t xml:space="preserve"> then plain</w:t></w:r></w:p>
        <w:tbl><w:tr><w:tc><w:p><w:r><w:t>k</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>v</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
    </w:body></w:document>"#;

    #[test]
    fn styles_map_to_headings_and_emphasis() {
        let html = document_to_html(DOC).unwrap();
        assert!(html.contains("<h1>Report</h1>"), "got: {html}");
        assert!(html.contains("<strong>bold lead</strong>"));
        assert!(html.contains("then plain"));
    }

    #[test]
    fn tables_survive_the_intermediate() {
        let html = document_to_html(DOC).unwrap();
        assert!(html.contains("<table border='1'>"));
        assert!(html.contains("<td><p>k</p>") || html.contains("<td>"));
    }

    #[tokio::test]
    async fn full_conversion_produces_markdown_heading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.docx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let opts = zip::write::SimpleFileOptions::default();
        use std::io::Write as _;
        writer.start_file("word/document.xml", opts).unwrap();
        writer.write_all(DOC.as_bytes()).unwrap();
        writer.finish().unwrap();

        let convert_opts = ConvertOptions {
            extension: Some(".docx".into()),
            ..Default::default()
        };
        let result = DocxConverter
            .convert(&path, &ConversionConfig::default(), &convert_opts)
            .await
            .unwrap()
            .unwrap();
        assert!(result.text_content.contains("Report"));
        assert!(result.text_content.contains("bold lead"));
    }

    #[tokio::test]
    async fn wrong_extension_declines() {
        let out = DocxConverter
            .convert(
                Path::new("/dev/null"),
                &ConversionConfig::default(),
                &ConvertOptions {
                    extension: Some(".zip".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.is_none());
    }
}
