//! PowerPoint conversion.
//!
//! Slides are walked in deck order. Each slide contributes a numbered
//! heading, then its shapes as they appear in the XML: pictures (alt text
//! when the author provided it, placeholder name otherwise), tables
//! (built as HTML and rendered through the shared HTML→Markdown
//! serializer), and text frames (the title frame promoted to a heading).
//! Speaker notes, when present, close out each slide.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::markdown::fragment_to_markdown;
use super::ooxml::{html_escape, open_package, read_part_opt};
use super::{ConvertOptions, DocumentConverter};

pub struct PptxConverter;

#[async_trait]
impl DocumentConverter for PptxConverter {
    fn name(&self) -> &'static str {
        "pptx"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if opts.extension.as_deref() != Some(".pptx") {
            return Ok(None);
        }
        let mut archive = open_package(source)?;

        let mut slide_numbers: Vec<usize> = archive
            .file_names()
            .filter_map(|name| {
                name.strip_prefix("ppt/slides/slide")?
                    .strip_suffix(".xml")?
                    .parse()
                    .ok()
            })
            .collect();
        slide_numbers.sort_unstable();
        if slide_numbers.is_empty() {
            return Err(ConverterError::Parse("presentation has no slides".into()));
        }

        let deck_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "presentation".to_string());
        let mut out = format!(
            "# PowerPoint: {deck_name}\n\nNumber of slides: {}\n",
            slide_numbers.len()
        );

        for number in slide_numbers {
            let slide_xml = read_part_opt(&mut archive, &format!("ppt/slides/slide{number}.xml"));
            out.push_str(&format!("\n## Slide {number}\n\n"));
            if let Some(xml) = slide_xml {
                render_slide(&xml, number, &mut out)?;
            }
            if let Some(notes_xml) =
                read_part_opt(&mut archive, &format!("ppt/notesSlides/notesSlide{number}.xml"))
            {
                let notes = gather_text(&notes_xml)?;
                if !notes.trim().is_empty() {
                    out.push_str("\n#### Notes:\n");
                    out.push_str(notes.trim());
                    out.push('\n');
                }
            }
        }

        Ok(Some(ConversionResult::with_text(out.trim().to_string())))
    }
}

fn xml_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Parse(format!("pptx xml: {e}"))
}

fn attr(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn render_slide(xml: &str, slide_number: usize, out: &mut String) -> Result<(), ConverterError> {
    let mut reader = Reader::from_str(xml);

    // Shape state.
    let mut in_shape = false;
    let mut shape_is_title = false;
    let mut shape_paragraphs: Vec<String> = Vec::new();
    let mut current_paragraph = String::new();
    let mut in_text = false;

    // Picture state.
    let mut in_picture = false;
    let mut picture_index = 0usize;

    // Table state: build HTML, convert at </a:tbl>.
    let mut table_html: Option<String> = None;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sp" => {
                    in_shape = true;
                    shape_is_title = false;
                    shape_paragraphs.clear();
                    current_paragraph.clear();
                }
                b"ph" if in_shape => {
                    if matches!(attr(e, "type").as_deref(), Some("title") | Some("ctrTitle")) {
                        shape_is_title = true;
                    }
                }
                b"pic" => {
                    in_picture = true;
                    picture_index += 1;
                }
                b"cNvPr" if in_picture => {
                    let alt = attr(e, "descr").filter(|d| !d.trim().is_empty());
                    let label = match alt {
                        Some(alt) => alt,
                        None => format!(
                            "[{}]",
                            attr(e, "name")
                                .unwrap_or_else(|| format!("Picture {picture_index}"))
                        ),
                    };
                    out.push_str(&format!(
                        "**Image {slide_number}-{picture_index}:** {label}\n\n"
                    ));
                }
                b"tbl" => table_html = Some(String::from("<table>")),
                b"tr" => {
                    if let Some(t) = table_html.as_mut() {
                        t.push_str("<tr>");
                    }
                }
                b"tc" => {
                    if let Some(t) = table_html.as_mut() {
                        t.push_str("<td>");
                    }
                }
                b"t" => in_text = true,
                b"br" if in_shape => current_paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(xml_err)?;
                if let Some(table) = table_html.as_mut() {
                    table.push_str(&html_escape(&text));
                } else if in_shape {
                    current_paragraph.push_str(&text);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if in_shape && table_html.is_none() => {
                    if !current_paragraph.trim().is_empty() {
                        shape_paragraphs.push(current_paragraph.trim().to_string());
                    }
                    current_paragraph.clear();
                }
                b"sp" => {
                    in_shape = false;
                    if !shape_paragraphs.is_empty() {
                        if shape_is_title {
                            out.push_str(&format!("### {}\n\n", shape_paragraphs.join(" ")));
                        } else {
                            out.push_str(&shape_paragraphs.join("\n"));
                            out.push_str("\n\n");
                        }
                        shape_paragraphs.clear();
                    }
                }
                b"tc" => {
                    if let Some(t) = table_html.as_mut() {
                        t.push_str("</td>");
                    }
                }
                b"tr" => {
                    if let Some(t) = table_html.as_mut() {
                        t.push_str("</tr>");
                    }
                }
                b"tbl" => {
                    if let Some(html) = table_html.take() {
                        let table = fragment_to_markdown(&format!("{html}</table>"));
                        out.push_str("#### Table:\n\n");
                        out.push_str(table.trim());
                        out.push_str("\n\n");
                    }
                }
                b"pic" => in_picture = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

/// All `a:t` text of a part, paragraph-separated. Used for speaker notes.
fn gather_text(xml: &str) -> Result<String, ConverterError> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::Text(t) if in_text => out.push_str(&t.unescape().map_err(xml_err)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const SLIDE: &str = r#"<p:sld xmlns:p="p" xmlns:a="a"><p:cSld><p:spTree>
        <p:sp><p:nvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
          <p:txBody><a:p><a:r><a:t>Quarterly Results</a:t></a:r></a:p></p:txBody></p:sp>
        <p:sp><p:txBody><a:p><a:r><a:t>Revenue grew.</a:t></a:r></a:p>
          <a:p><a:r><a:t>Costs fell.</a:t></a:r></a:p></p:txBody></p:sp>
        <p:pic><p:nvPicPr><p:cNvPr id="4" name="Picture 3" descr="A bar chart"/></p:nvPicPr></p:pic>
        <p:graphicFrame><a:tbl><a:tr><a:tc><a:txBody><a:p><a:r><a:t>k</a:t></a:r></a:p></a:txBody></a:tc>
          <a:tc><a:txBody><a:p><a:r><a:t>v</a:t></a:r></a:p></a:txBody></a:tc></a:tr></a:tbl></p:graphicFrame>
    </p:spTree></p:cSld></p:sld>"#;

    const NOTES: &str = r#"<p:notes xmlns:p="p" xmlns:a="a"><p:txBody>
        <a:p><a:r><a:t>Remember to mention margins.</a:t></a:r></a:p></p:txBody></p:notes>"#;

    #[test]
    fn slide_renders_title_text_picture_and_table() {
        let mut out = String::new();
        render_slide(SLIDE, 1, &mut out).unwrap();
        assert!(out.contains("### Quarterly Results"), "got: {out}");
        assert!(out.contains("Revenue grew.\nCosts fell."));
        assert!(out.contains("**Image 1-1:** A bar chart"));
        assert!(out.contains("| k | v |"));
    }

    #[tokio::test]
    async fn deck_conversion_includes_notes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let zopts = zip::write::SimpleFileOptions::default();
        writer.start_file("ppt/slides/slide1.xml", zopts).unwrap();
        writer.write_all(SLIDE.as_bytes()).unwrap();
        writer
            .start_file("ppt/notesSlides/notesSlide1.xml", zopts)
            .unwrap();
        writer.write_all(NOTES.as_bytes()).unwrap();
        writer.finish().unwrap();

        let result = PptxConverter
            .convert(
                &path,
                &ConversionConfig::default(),
                &ConvertOptions {
                    extension: Some(".pptx".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(result.text_content.contains("## Slide 1"));
        assert!(result.text_content.contains("#### Notes:"));
        assert!(result.text_content.contains("Remember to mention margins."));
    }

    #[tokio::test]
    async fn corrupt_container_is_a_failure_not_a_decline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, b"PK\x03\x04 not really a zip").unwrap();
        let err = PptxConverter
            .convert(
                &path,
                &ConversionConfig::default(),
                &ConvertOptions {
                    extension: Some(".pptx".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(err.is_err());
    }
}
