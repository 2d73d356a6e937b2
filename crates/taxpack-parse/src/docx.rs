//! WordprocessingML (DOCX) reading.
//!
//! Reads the parts of a `.docx` package the envelope stage needs: the first
//! section's page geometry, the body-level paragraphs with their paragraph
//! and run formatting, and the raw style definitions so referenced styles
//! can be carried into a new document.
//!
//! Paragraphs inside tables and text boxes are not body-level and are
//! skipped. Runs wrapped in hyperlinks or insertions count as part of their
//! paragraph; deleted text (`w:delText`) does not.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use zip::ZipArchive;

use crate::error::BackendError;

/// Page size and margins of a section, in twentieths of a point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGeometry {
    /// Page width.
    pub width: Option<u32>,
    /// Page height.
    pub height: Option<u32>,
    /// Top margin.
    pub top: Option<i32>,
    /// Right margin.
    pub right: Option<i32>,
    /// Bottom margin.
    pub bottom: Option<i32>,
    /// Left margin.
    pub left: Option<i32>,
}

impl PageGeometry {
    /// US Letter with one-inch margins.
    pub fn letter() -> Self {
        Self {
            width: Some(12240),
            height: Some(15840),
            top: Some(1440),
            right: Some(1440),
            bottom: Some(1440),
            left: Some(1440),
        }
    }
}

/// Paragraph indentation, in twentieths of a point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Indentation {
    /// Left (start) indent.
    pub left: Option<i32>,
    /// Right (end) indent.
    pub right: Option<i32>,
    /// First-line indent.
    pub first_line: Option<i32>,
    /// Hanging indent (a negative first-line indent).
    pub hanging: Option<i32>,
}

impl Indentation {
    /// Returns true if no indentation is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Paragraph-level formatting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParagraphFormat {
    /// Paragraph style id (`w:pStyle`).
    pub style: Option<String>,
    /// Justification value (`w:jc`), e.g. `left`, `center`, `right`, `both`.
    pub alignment: Option<String>,
    /// Indentation.
    pub indent: Indentation,
    /// Space before the paragraph.
    pub space_before: Option<u32>,
    /// Space after the paragraph.
    pub space_after: Option<u32>,
}

/// Run-level formatting. `None` means "inherit from style".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunFormat {
    /// Bold.
    pub bold: Option<bool>,
    /// Italic.
    pub italic: Option<bool>,
    /// Underline kind (`single`, `double`, `none`, ...).
    pub underline: Option<String>,
    /// Font family.
    pub font: Option<String>,
    /// Font size in half-points.
    pub size: Option<u32>,
    /// RGB color as six uppercase hex digits.
    pub color: Option<String>,
}

/// A run of uniformly formatted text. Tabs are `\t`, line breaks `\n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    /// Run text.
    pub text: String,
    /// Run formatting.
    pub format: RunFormat,
}

/// A body-level paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    /// Paragraph formatting.
    pub format: ParagraphFormat,
    /// Runs in order.
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Concatenated text of all runs.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// A raw `w:style` element from a style part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleDefinition {
    /// The `w:styleId`.
    pub id: String,
    /// The `w:basedOn` parent style id.
    pub based_on: Option<String>,
    /// The complete `<w:style>...</w:style>` markup.
    pub xml: String,
}

/// Style definitions of a document and the namespaces their markup uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    /// Namespace declarations (and `mc:Ignorable`) of the style part root.
    pub namespaces: Vec<(String, String)>,
    /// Style definitions in document order.
    pub styles: Vec<StyleDefinition>,
}

impl StyleSheet {
    /// Look up a style by id.
    pub fn get(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.iter().find(|s| s.id == id)
    }

    /// The style `id` followed by its `basedOn` ancestors.
    ///
    /// Unknown ids are skipped and cycles are cut.
    pub fn lineage(&self, id: &str) -> Vec<&StyleDefinition> {
        let mut chain: Vec<&StyleDefinition> = Vec::new();
        let mut next = Some(id.to_string());
        while let Some(current) = next.take() {
            if chain.iter().any(|s| s.id == current) {
                break;
            }
            if let Some(style) = self.get(&current) {
                next = style.based_on.clone();
                chain.push(style);
            }
        }
        chain
    }
}

/// The readable content of a `.docx` package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDocument {
    /// Geometry of the first section.
    pub geometry: PageGeometry,
    /// Body-level paragraphs in order.
    pub paragraphs: Vec<Paragraph>,
    /// Style definitions.
    pub styles: StyleSheet,
}

impl WordDocument {
    /// Read a `.docx` file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid package.
    pub fn open_file(path: &Path) -> Result<Self, BackendError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Parse a `.docx` package from memory.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Package`] if the bytes are not a ZIP archive or
    /// lack `word/document.xml`, and [`BackendError::Xml`] for malformed XML.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BackendError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let document_xml = read_part(&mut archive, "word/document.xml")?
            .ok_or_else(|| BackendError::Package("missing word/document.xml".to_string()))?;
        let (geometry, paragraphs) = parse_document_xml(&document_xml)?;

        let styles = match read_part(&mut archive, "word/styles.xml")? {
            Some(xml) => parse_styles_xml(&xml)?,
            None => StyleSheet::default(),
        };

        Ok(Self {
            geometry,
            paragraphs,
            styles,
        })
    }
}

/// Read a package part as UTF-8, or `None` if it does not exist.
fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>, BackendError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Extract an attribute value by qualified key.
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn get_attr_i32(e: &BytesStart, key: &[u8]) -> Option<i32> {
    get_attr(e, key).and_then(|s| s.parse().ok())
}

fn get_attr_u32(e: &BytesStart, key: &[u8]) -> Option<u32> {
    get_attr(e, key).and_then(|s| s.parse().ok())
}

/// On/off property: absent `w:val` means on.
fn toggle(e: &BytesStart) -> bool {
    !matches!(
        get_attr(e, b"w:val").as_deref(),
        Some("0" | "false" | "off")
    )
}

/// Six-digit hex color, or `None` for `auto` and malformed values.
fn rgb_color(e: &BytesStart) -> Option<String> {
    let val = get_attr(e, b"w:val")?;
    (val.len() == 6 && val.chars().all(|c| c.is_ascii_hexdigit())).then(|| val.to_ascii_uppercase())
}

/// Walks `word/document.xml` and collects body-level content.
#[derive(Default)]
struct BodyWalker {
    in_body: bool,
    table_depth: usize,
    para_depth: usize,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    in_sect: bool,
    pending_geometry: PageGeometry,
    geometry: Option<PageGeometry>,
    paragraph: Option<Paragraph>,
    run: Option<Run>,
    paragraphs: Vec<Paragraph>,
}

impl BodyWalker {
    /// Inside a body-level paragraph and not inside a nested one.
    fn at_top_paragraph(&self) -> bool {
        self.paragraph.is_some() && self.para_depth == 1
    }

    fn in_run(&self) -> bool {
        self.run.is_some() && self.para_depth == 1
    }

    fn on_start(&mut self, e: &BytesStart, empty: bool) {
        match e.name().as_ref() {
            b"w:body" => self.in_body = !empty,
            b"w:tbl" if !empty => self.table_depth += 1,
            b"w:p" => {
                let body_level = self.in_body && self.table_depth == 0 && self.para_depth == 0;
                if empty {
                    if body_level {
                        self.paragraphs.push(Paragraph::default());
                    }
                } else {
                    if body_level {
                        self.paragraph = Some(Paragraph::default());
                    }
                    self.para_depth += 1;
                }
            }
            b"w:pPr" if !empty && self.at_top_paragraph() && self.run.is_none() => {
                self.in_ppr = true;
            }
            b"w:sectPr" => {
                let eligible = self.in_body
                    && self.table_depth == 0
                    && self.para_depth <= 1
                    && self.geometry.is_none();
                if eligible {
                    if empty {
                        self.geometry = Some(PageGeometry::default());
                    } else {
                        self.in_sect = true;
                        self.pending_geometry = PageGeometry::default();
                    }
                }
            }
            b"w:pgSz" if self.in_sect => {
                self.pending_geometry.width = get_attr_u32(e, b"w:w");
                self.pending_geometry.height = get_attr_u32(e, b"w:h");
            }
            b"w:pgMar" if self.in_sect => {
                let g = &mut self.pending_geometry;
                g.top = get_attr_i32(e, b"w:top");
                g.right = get_attr_i32(e, b"w:right");
                g.bottom = get_attr_i32(e, b"w:bottom");
                g.left = get_attr_i32(e, b"w:left");
            }
            b"w:r" if !empty && self.at_top_paragraph() && !self.in_ppr => {
                self.run = Some(Run::default());
            }
            b"w:rPr" if !empty && self.in_run() => self.in_rpr = true,
            b"w:t" if !empty && self.in_run() && !self.in_rpr => self.in_text = true,
            b"w:tab" if self.in_run() && !self.in_rpr => self.push_text("\t"),
            b"w:cr" if self.in_run() && !self.in_rpr => self.push_text("\n"),
            b"w:br" if self.in_run() && !self.in_rpr => {
                // Page and column breaks would defeat the one-page section layout.
                if matches!(get_attr(e, b"w:type").as_deref(), None | Some("textWrapping")) {
                    self.push_text("\n");
                }
            }
            _ if self.in_ppr && !self.in_sect => self.on_paragraph_property(e),
            _ if self.in_rpr => self.on_run_property(e),
            _ => {}
        }
    }

    fn on_paragraph_property(&mut self, e: &BytesStart) {
        let Some(paragraph) = self.paragraph.as_mut() else {
            return;
        };
        let format = &mut paragraph.format;
        match e.name().as_ref() {
            b"w:pStyle" => format.style = get_attr(e, b"w:val"),
            b"w:jc" => format.alignment = get_attr(e, b"w:val"),
            b"w:ind" => {
                format.indent = Indentation {
                    left: get_attr_i32(e, b"w:left").or_else(|| get_attr_i32(e, b"w:start")),
                    right: get_attr_i32(e, b"w:right").or_else(|| get_attr_i32(e, b"w:end")),
                    first_line: get_attr_i32(e, b"w:firstLine"),
                    hanging: get_attr_i32(e, b"w:hanging"),
                };
            }
            b"w:spacing" => {
                format.space_before = get_attr_u32(e, b"w:before");
                format.space_after = get_attr_u32(e, b"w:after");
            }
            _ => {}
        }
    }

    fn on_run_property(&mut self, e: &BytesStart) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let format = &mut run.format;
        match e.name().as_ref() {
            b"w:b" => format.bold = Some(toggle(e)),
            b"w:i" => format.italic = Some(toggle(e)),
            b"w:u" => {
                format.underline = Some(get_attr(e, b"w:val").unwrap_or_else(|| "single".to_string()));
            }
            b"w:rFonts" => {
                format.font = get_attr(e, b"w:ascii").or_else(|| get_attr(e, b"w:hAnsi"));
            }
            b"w:sz" => format.size = get_attr_u32(e, b"w:val"),
            b"w:color" => format.color = rgb_color(e),
            _ => {}
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        match name {
            b"w:body" => self.in_body = false,
            b"w:tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            b"w:p" => {
                self.para_depth = self.para_depth.saturating_sub(1);
                if self.para_depth == 0 {
                    if let Some(paragraph) = self.paragraph.take() {
                        self.paragraphs.push(paragraph);
                    }
                }
            }
            b"w:pPr" if self.para_depth == 1 => self.in_ppr = false,
            b"w:sectPr" if self.in_sect => {
                self.in_sect = false;
                self.geometry = Some(std::mem::take(&mut self.pending_geometry));
            }
            b"w:r" if self.in_run() => {
                if let (Some(run), Some(paragraph)) = (self.run.take(), self.paragraph.as_mut()) {
                    paragraph.runs.push(run);
                }
                self.in_rpr = false;
                self.in_text = false;
            }
            b"w:rPr" if self.in_run() => self.in_rpr = false,
            b"w:t" if self.in_run() => self.in_text = false,
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.run.as_mut() {
            run.text.push_str(text);
        }
    }
}

/// Parse `word/document.xml` into first-section geometry and body paragraphs.
fn parse_document_xml(xml: &str) -> Result<(PageGeometry, Vec<Paragraph>), BackendError> {
    let mut reader = Reader::from_str(xml);
    let mut walker = BodyWalker::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) => walker.on_start(&e, false),
            Event::Empty(e) => walker.on_start(&e, true),
            Event::End(e) => walker.on_end(e.name().as_ref()),
            Event::Text(t) if walker.in_text && walker.in_run() => {
                let text = t.unescape()?;
                walker.push_text(&text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok((walker.geometry.unwrap_or_default(), walker.paragraphs))
}

/// Parse `word/styles.xml`, keeping each `w:style` element verbatim.
fn parse_styles_xml(xml: &str) -> Result<StyleSheet, BackendError> {
    let mut reader = Reader::from_str(xml);
    let mut sheet = StyleSheet::default();
    // (byte offset of `<w:style`, styleId, basedOn)
    let mut open: Option<(usize, String, Option<String>)> = None;

    loop {
        let start = reader.buffer_position();
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"w:styles" => {
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    if key.starts_with("xmlns") || key == "mc:Ignorable" {
                        let value = String::from_utf8_lossy(&attr.value).into_owned();
                        sheet.namespaces.push((key, value));
                    }
                }
            }
            Event::Start(e) if e.name().as_ref() == b"w:style" => {
                let id = get_attr(&e, b"w:styleId").unwrap_or_default();
                open = Some((start, id, None));
            }
            Event::Empty(e) if e.name().as_ref() == b"w:style" => {
                if let Some(id) = get_attr(&e, b"w:styleId") {
                    sheet.styles.push(StyleDefinition {
                        id,
                        based_on: None,
                        xml: xml[start..reader.buffer_position()].to_string(),
                    });
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"w:basedOn" => {
                if let Some(style) = open.as_mut() {
                    style.2 = get_attr(&e, b"w:val");
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:style" => {
                if let Some((begin, id, based_on)) = open.take() {
                    if !id.is_empty() {
                        sheet.styles.push(StyleDefinition {
                            id,
                            based_on,
                            xml: xml[begin..reader.buffer_position()].to_string(),
                        });
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    fn body(inner: &str) -> String {
        format!(r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="{W_NS}"><w:body>{inner}</w:body></w:document>"#)
    }

    #[test]
    fn reads_paragraph_and_run_formatting() {
        let xml = body(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/><w:jc w:val="center"/><w:ind w:left="720" w:right="360" w:firstLine="240"/><w:spacing w:before="120" w:after="200"/><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:rPr><w:b/><w:i w:val="0"/><w:u w:val="double"/><w:rFonts w:ascii="Arial" w:hAnsi="Arial"/><w:sz w:val="28"/><w:color w:val="ff0000"/></w:rPr><w:t xml:space="preserve">Hello &amp; </w:t></w:r><w:r><w:t>world</w:t></w:r></w:p>"#,
        );
        let (_, paragraphs) = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs.len(), 1);
        let p = &paragraphs[0];
        assert_eq!(p.format.style.as_deref(), Some("Title"));
        assert_eq!(p.format.alignment.as_deref(), Some("center"));
        assert_eq!(p.format.indent.left, Some(720));
        assert_eq!(p.format.indent.right, Some(360));
        assert_eq!(p.format.indent.first_line, Some(240));
        assert_eq!(p.format.space_before, Some(120));
        assert_eq!(p.format.space_after, Some(200));
        assert_eq!(p.runs.len(), 2);
        let f = &p.runs[0].format;
        assert_eq!(f.bold, Some(true));
        assert_eq!(f.italic, Some(false));
        assert_eq!(f.underline.as_deref(), Some("double"));
        assert_eq!(f.font.as_deref(), Some("Arial"));
        assert_eq!(f.size, Some(28));
        assert_eq!(f.color.as_deref(), Some("FF0000"));
        assert_eq!(p.text(), "Hello & world");
        assert_eq!(p.runs[1].format, RunFormat::default());
    }

    #[test]
    fn auto_color_is_dropped() {
        let xml = body(r#"<w:p><w:r><w:rPr><w:color w:val="auto"/></w:rPr><w:t>x</w:t></w:r></w:p>"#);
        let (_, paragraphs) = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs[0].runs[0].format.color, None);
    }

    #[test]
    fn tabs_and_breaks_become_control_chars() {
        let xml = body(
            r#"<w:p><w:r><w:t>a</w:t><w:tab/><w:t>b</w:t><w:br/><w:t>c</w:t><w:br w:type="page"/></w:r></w:p>"#,
        );
        let (_, paragraphs) = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs[0].text(), "a\tb\nc");
    }

    #[test]
    fn table_paragraphs_are_not_body_level() {
        let xml = body(
            r#"<w:p><w:r><w:t>one</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p/><w:p><w:r><w:t>two</w:t></w:r></w:p>"#,
        );
        let (_, paragraphs) = parse_document_xml(&xml).unwrap();
        let texts: Vec<String> = paragraphs.iter().map(Paragraph::text).collect();
        assert_eq!(texts, vec!["one", "", "two"]);
    }

    #[test]
    fn hyperlink_runs_belong_to_paragraph() {
        let xml = body(
            r#"<w:p><w:r><w:t>see </w:t></w:r><w:hyperlink r:id="rId5" xmlns:r="r"><w:r><w:t>site</w:t></w:r></w:hyperlink></w:p>"#,
        );
        let (_, paragraphs) = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs[0].text(), "see site");
    }

    #[test]
    fn first_section_geometry_wins() {
        let xml = body(
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="11906" w:h="16838"/><w:pgMar w:top="1000" w:right="900" w:bottom="1100" w:left="800"/></w:sectPr></w:pPr></w:p><w:p/><w:sectPr><w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440"/></w:sectPr>"#,
        );
        let (geometry, paragraphs) = parse_document_xml(&xml).unwrap();
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(
            geometry,
            PageGeometry {
                width: Some(11906),
                height: Some(16838),
                top: Some(1000),
                right: Some(900),
                bottom: Some(1100),
                left: Some(800),
            }
        );
    }

    #[test]
    fn styles_keep_markup_and_lineage() {
        let xml = format!(
            r#"<?xml version="1.0"?><w:styles xmlns:w="{W_NS}" xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" mc:Ignorable="w14"><w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Loop"><w:basedOn w:val="Loop"/></w:style></w:styles>"#
        );
        let sheet = parse_styles_xml(&xml).unwrap();
        assert_eq!(sheet.styles.len(), 3);
        assert!(sheet.namespaces.iter().any(|(k, _)| k == "xmlns:w14"));
        assert!(sheet.namespaces.iter().any(|(k, v)| k == "mc:Ignorable" && v == "w14"));

        let heading = sheet.get("Heading1").unwrap();
        assert_eq!(heading.based_on.as_deref(), Some("Normal"));
        assert!(heading.xml.starts_with("<w:style "));
        assert!(heading.xml.ends_with("</w:style>"));

        let ids: Vec<&str> = sheet.lineage("Heading1").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["Heading1", "Normal"]);
        assert_eq!(sheet.lineage("Loop").len(), 1);
        assert!(sheet.lineage("Missing").is_empty());
    }

    #[test]
    fn not_a_zip_is_package_error() {
        let err = WordDocument::from_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, BackendError::Package(_)));
    }
}
