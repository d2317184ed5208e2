//! Excel workbook conversion.
//!
//! Every sheet becomes an HTML table. HTML rather than a Markdown grid
//! because per-cell styling matters downstream: a bold header or a
//! highlighted cell often *is* the answer to a question about a
//! spreadsheet. Style attributes are emitted only when non-default, so an
//! unstyled cell stays a bare `<td>`.
//!
//! Styles resolve through the workbook's indirection chain:
//! `c@s → cellXfs[s] → (fontId, fillId) → fonts/fills`. Shared strings
//! (`t="s"`) resolve through `xl/sharedStrings.xml`.

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;

use crate::config::ConversionConfig;
use crate::error::ConverterError;
use crate::output::ConversionResult;

use super::ooxml::{html_escape, open_package, read_part, read_part_opt};
use super::{ConvertOptions, DocumentConverter};

pub struct XlsxConverter;

#[async_trait]
impl DocumentConverter for XlsxConverter {
    fn name(&self) -> &'static str {
        "xlsx"
    }

    async fn convert(
        &self,
        source: &Path,
        _config: &ConversionConfig,
        opts: &ConvertOptions,
    ) -> Result<Option<ConversionResult>, ConverterError> {
        if !matches!(opts.extension.as_deref(), Some(".xlsx") | Some(".xls")) {
            return Ok(None);
        }
        let mut archive = open_package(source)?;

        let shared = read_part_opt(&mut archive, "xl/sharedStrings.xml")
            .map(|xml| parse_shared_strings(&xml))
            .transpose()?
            .unwrap_or_default();
        let styles = read_part_opt(&mut archive, "xl/styles.xml")
            .map(|xml| parse_styles(&xml))
            .transpose()?
            .unwrap_or_default();
        let sheet_names = parse_sheet_names(&read_part(&mut archive, "xl/workbook.xml")?)?;

        let mut html = String::new();
        for (index, name) in sheet_names.iter().enumerate() {
            let part = format!("xl/worksheets/sheet{}.xml", index + 1);
            let Some(sheet_xml) = read_part_opt(&mut archive, &part) else {
                continue;
            };
            html.push_str(&format!("<h2>{}</h2>\n<table border='1'>\n", html_escape(name)));
            render_sheet(&sheet_xml, &shared, &styles, &mut html)?;
            html.push_str("</table>\n\n");
        }

        Ok(Some(ConversionResult::with_text(html.trim().to_string())))
    }
}

// ── Style model ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
struct FontStyle {
    bold: bool,
    italic: bool,
    /// `RRGGBB` hex, already stripped of the alpha prefix.
    color: Option<String>,
}

#[derive(Debug, Default)]
struct Stylesheet {
    fonts: Vec<FontStyle>,
    /// Fill foreground colors, `RRGGBB` hex.
    fills: Vec<Option<String>>,
    /// `cellXfs` entries: (fontId, fillId).
    cell_xfs: Vec<(usize, usize)>,
}

impl Stylesheet {
    /// CSS for a cell's style index; empty string when everything is
    /// default (black text, no emphasis, no fill).
    fn css_for(&self, style_index: Option<usize>) -> String {
        let Some((font_id, fill_id)) = style_index.and_then(|i| self.cell_xfs.get(i)) else {
            return String::new();
        };
        let mut css = String::new();
        if let Some(font) = self.fonts.get(*font_id) {
            if font.bold {
                css.push_str("font-weight:bold;");
            }
            if font.italic {
                css.push_str("font-style:italic;");
            }
            if let Some(rgb) = &font.color {
                if rgb != "000000" {
                    css.push_str(&format!("color:#{rgb};"));
                }
            }
        }
        if let Some(Some(rgb)) = self.fills.get(*fill_id) {
            css.push_str(&format!("background-color:#{rgb};"));
        }
        css
    }
}

fn xml_err(e: impl std::fmt::Display) -> ConverterError {
    ConverterError::Parse(format!("xlsx xml: {e}"))
}

fn attr(e: &quick_xml::events::BytesStart<'_>, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Strip an `AARRGGBB` value to `RRGGBB`; reject the transparent sentinel.
fn rgb_of(value: String) -> Option<String> {
    if value == "00000000" || value.len() < 6 {
        return None;
    }
    Some(value[value.len() - 6..].to_string())
}

// ── Part parsers ─────────────────────────────────────────────────────────

fn parse_shared_strings(xml: &str) -> Result<Vec<String>, ConverterError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Event::Text(t) if in_t => current.push_str(&t.unescape().map_err(xml_err)?),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

fn parse_styles(xml: &str) -> Result<Stylesheet, ConverterError> {
    let mut reader = Reader::from_str(xml);
    let mut styles = Stylesheet::default();

    #[derive(PartialEq)]
    enum Section {
        None,
        Fonts,
        Fills,
        CellXfs,
    }
    let mut section = Section::None;
    let mut font: Option<FontStyle> = None;
    let mut fill: Option<Option<String>> = None;

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let empty = matches!(event, Event::Empty(_));
                match e.local_name().as_ref() {
                    b"fonts" => section = Section::Fonts,
                    b"fills" => section = Section::Fills,
                    b"cellXfs" => section = Section::CellXfs,
                    b"font" if section == Section::Fonts => {
                        font = Some(FontStyle::default());
                        if empty {
                            styles.fonts.push(font.take().unwrap());
                        }
                    }
                    b"b" => {
                        if let Some(f) = font.as_mut() {
                            f.bold = attr(e, "val").map(|v| v != "0").unwrap_or(true);
                        }
                    }
                    b"i" => {
                        if let Some(f) = font.as_mut() {
                            f.italic = attr(e, "val").map(|v| v != "0").unwrap_or(true);
                        }
                    }
                    b"color" => {
                        if let Some(f) = font.as_mut() {
                            f.color = attr(e, "rgb").and_then(rgb_of);
                        }
                    }
                    b"fill" if section == Section::Fills => {
                        fill = Some(None);
                        if empty {
                            styles.fills.push(fill.take().unwrap());
                        }
                    }
                    b"fgColor" => {
                        if let Some(f) = fill.as_mut() {
                            *f = attr(e, "rgb").and_then(rgb_of);
                        }
                    }
                    b"xf" if section == Section::CellXfs => {
                        let font_id = attr(e, "fontId")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        let fill_id = attr(e, "fillId")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(0);
                        styles.cell_xfs.push((font_id, fill_id));
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"fonts" | b"fills" | b"cellXfs" => section = Section::None,
                b"font" => {
                    if let Some(f) = font.take() {
                        styles.fonts.push(f);
                    }
                }
                b"fill" => {
                    if let Some(f) = fill.take() {
                        styles.fills.push(f);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(styles)
}

fn parse_sheet_names(xml: &str) -> Result<Vec<String>, ConverterError> {
    let mut reader = Reader::from_str(xml);
    let mut names = Vec::new();
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                names.push(attr(&e, "name").unwrap_or_else(|| format!("Sheet{}", names.len() + 1)));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    if names.is_empty() {
        return Err(ConverterError::Parse("workbook declares no sheets".into()));
    }
    Ok(names)
}

/// Column index (0-based) from a cell reference like `C7`.
fn column_of(cell_ref: &str) -> usize {
    let mut col = 0usize;
    for ch in cell_ref.chars().take_while(|c| c.is_ascii_alphabetic()) {
        col = col * 26 + (ch.to_ascii_uppercase() as usize - 'A' as usize + 1);
    }
    col.saturating_sub(1)
}

fn render_sheet(
    xml: &str,
    shared: &[String],
    styles: &Stylesheet,
    out: &mut String,
) -> Result<(), ConverterError> {
    let mut reader = Reader::from_str(xml);

    let mut row_index = 0usize;
    let mut next_column = 0usize;
    let mut in_row = false;
    let mut in_value = false;
    let mut in_inline_t = false;

    // Current cell state, captured at <c>.
    let mut cell_type = String::new();
    let mut cell_style: Option<usize> = None;
    let mut cell_column = 0usize;
    let mut cell_value = String::new();

    loop {
        let event = reader.read_event().map_err(xml_err)?;
        match &event {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    in_row = true;
                    next_column = 0;
                    out.push_str("<tr>");
                }
                b"c" if in_row => {
                    cell_type = attr(e, "t").unwrap_or_default();
                    cell_style = attr(e, "s").and_then(|v| v.parse().ok());
                    cell_column = attr(e, "r")
                        .map(|r| column_of(&r))
                        .unwrap_or(next_column);
                    cell_value.clear();
                    if matches!(event, Event::Empty(_)) {
                        emit_cell(
                            out, row_index, &mut next_column, cell_column, "", cell_style, styles,
                        );
                    }
                }
                b"v" => in_value = true,
                b"t" => in_inline_t = true,
                _ => {}
            },
            Event::Text(t) if in_value || in_inline_t => {
                cell_value.push_str(&t.unescape().map_err(xml_err)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" => in_value = false,
                b"t" => in_inline_t = false,
                b"c" => {
                    let resolved = if cell_type == "s" {
                        cell_value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i))
                            .cloned()
                            .unwrap_or_default()
                    } else {
                        cell_value.clone()
                    };
                    emit_cell(
                        out,
                        row_index,
                        &mut next_column,
                        cell_column,
                        &resolved,
                        cell_style,
                        styles,
                    );
                }
                b"row" => {
                    in_row = false;
                    out.push_str("</tr>\n");
                    row_index += 1;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(())
}

fn emit_cell(
    out: &mut String,
    row_index: usize,
    next_column: &mut usize,
    cell_column: usize,
    value: &str,
    style_index: Option<usize>,
    styles: &Stylesheet,
) {
    let tag = if row_index == 0 { "th" } else { "td" };
    // Pad skipped columns so rows stay aligned.
    while *next_column < cell_column {
        out.push_str(&format!("<{tag}></{tag}>"));
        *next_column += 1;
    }
    let css = styles.css_for(style_index);
    if css.is_empty() {
        out.push_str(&format!("<{tag}>{}</{tag}>", html_escape(value)));
    } else {
        out.push_str(&format!("<{tag} style=\"{css}\">{}</{tag}>", html_escape(value)));
    }
    *next_column += 1;
}
