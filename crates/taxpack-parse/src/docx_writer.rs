//! Envelope document builder.
//!
//! [`EnvelopeDocument`] accumulates formatted paragraphs copied from
//! [`WordDocument`] sources, separated by page breaks, and serializes them as
//! a minimal `.docx` package with a single section.

use std::fmt::Write as _;
use std::io::{Cursor, Write as _};
use std::path::Path;

use quick_xml::escape::escape;
use taxpack_core::PipelineOptions;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::docx::{PageGeometry, Paragraph, Run, StyleDefinition, WordDocument};
use crate::error::BackendError;
use crate::write::{WriteMode, write_atomically};

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Header, footer and gutter distances written with every section.
const HEADER_FOOTER_DISTANCE: i32 = 720;

/// How much of a source document is copied and how it is aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyPolicy {
    /// Copy at most this many body-level paragraphs.
    pub max_paragraphs: usize,
    /// Right-align copied paragraphs whose index is greater than this.
    pub right_align_from: Option<usize>,
}

impl From<&PipelineOptions> for CopyPolicy {
    fn from(options: &PipelineOptions) -> Self {
        Self {
            max_paragraphs: options.max_paragraphs,
            right_align_from: options.right_align_from,
        }
    }
}

/// A body element of the envelope document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// A copied paragraph.
    Paragraph(Paragraph),
    /// An explicit page break paragraph.
    PageBreak,
}

/// A single-section DOCX under construction.
#[derive(Debug, Clone)]
pub struct EnvelopeDocument {
    geometry: PageGeometry,
    blocks: Vec<Block>,
    styles: Vec<StyleDefinition>,
    namespaces: Vec<(String, String)>,
}

impl Default for EnvelopeDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvelopeDocument {
    /// An empty document with US Letter geometry.
    pub fn new() -> Self {
        Self {
            geometry: PageGeometry::letter(),
            blocks: Vec::new(),
            styles: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    /// Current section geometry.
    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Body blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Copied paragraphs, excluding page breaks.
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            Block::PageBreak => None,
        })
    }

    /// Ids of the style definitions carried into the document.
    pub fn style_ids(&self) -> impl Iterator<Item = &str> {
        self.styles.iter().map(|s| s.id.as_str())
    }

    /// Returns true if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Copy one source document's content.
    ///
    /// The source's first-section geometry overrides the current one, field
    /// by field. Up to `policy.max_paragraphs` paragraphs are appended with
    /// their spacing forced to zero, and the paragraph styles they reference
    /// are carried over with their `basedOn` ancestors. Returns the number of
    /// paragraphs copied.
    pub fn copy_content(&mut self, source: &WordDocument, policy: &CopyPolicy) -> usize {
        self.apply_geometry(&source.geometry);

        let mut copied = 0;
        for (index, paragraph) in source.paragraphs.iter().take(policy.max_paragraphs).enumerate() {
            let mut paragraph = paragraph.clone();
            paragraph.format.space_before = Some(0);
            paragraph.format.space_after = Some(0);
            if policy.right_align_from.is_some_and(|from| index > from) {
                paragraph.format.alignment = Some("right".to_string());
            }

            if let Some(style_id) = paragraph.format.style.as_deref() {
                self.adopt_style(source, style_id);
            }
            self.blocks.push(Block::Paragraph(paragraph));
            copied += 1;
        }
        copied
    }

    /// Append an explicit page break.
    pub fn add_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    fn apply_geometry(&mut self, source: &PageGeometry) {
        let g = &mut self.geometry;
        g.width = source.width.or(g.width);
        g.height = source.height.or(g.height);
        g.top = source.top.or(g.top);
        g.right = source.right.or(g.right);
        g.bottom = source.bottom.or(g.bottom);
        g.left = source.left.or(g.left);
    }

    fn adopt_style(&mut self, source: &WordDocument, style_id: &str) {
        for style in source.styles.lineage(style_id) {
            if self.styles.iter().any(|s| s.id == style.id) {
                continue;
            }
            self.styles.push(style.clone());
        }
        for (key, value) in &source.styles.namespaces {
            if !self.namespaces.iter().any(|(k, _)| k == key) {
                self.namespaces.push((key.clone(), value.clone()));
            }
        }
    }

    /// Serialize the document as a `.docx` package.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Package`] if the archive cannot be written.
    pub fn to_bytes(&self) -> Result<Vec<u8>, BackendError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts: [(&str, String); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES_XML.to_string()),
            ("_rels/.rels", PACKAGE_RELS_XML.to_string()),
            ("word/document.xml", self.document_xml()),
            ("word/styles.xml", self.styles_xml()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.to_string()),
        ];
        for (name, xml) in &parts {
            zip.start_file(*name, options)?;
            zip.write_all(xml.as_bytes())?;
        }

        Ok(zip.finish()?.into_inner())
    }

    /// Serialize and write the package to `path` atomically, replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> Result<(), BackendError> {
        let bytes = self.to_bytes()?;
        write_atomically(path, &bytes, WriteMode::Replace)
    }

    fn document_xml(&self) -> String {
        let mut xml = String::with_capacity(4096);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>"#);
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => write_paragraph(&mut xml, p),
                Block::PageBreak => xml.push_str(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#),
            }
        }
        write_section(&mut xml, &self.geometry);
        xml.push_str("</w:body></w:document>");
        xml
    }

    fn styles_xml(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        let _ = write!(xml, r#"<w:styles xmlns:w="{W_NS}""#);
        for (key, value) in &self.namespaces {
            if key == "xmlns:w" {
                continue;
            }
            let _ = write!(xml, r#" {key}="{}""#, escape(value.as_str()));
        }
        xml.push('>');
        for style in &self.styles {
            xml.push_str(&style.xml);
        }
        xml.push_str("</w:styles>");
        xml
    }
}

fn write_section(xml: &mut String, geometry: &PageGeometry) {
    let letter = PageGeometry::letter();
    let _ = write!(
        xml,
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"/><w:pgMar w:top="{}" w:right="{}" w:bottom="{}" w:left="{}" w:header="{h}" w:footer="{h}" w:gutter="0"/></w:sectPr>"#,
        geometry.width.or(letter.width).unwrap_or_default(),
        geometry.height.or(letter.height).unwrap_or_default(),
        geometry.top.or(letter.top).unwrap_or_default(),
        geometry.right.or(letter.right).unwrap_or_default(),
        geometry.bottom.or(letter.bottom).unwrap_or_default(),
        geometry.left.or(letter.left).unwrap_or_default(),
        h = HEADER_FOOTER_DISTANCE,
    );
}

fn write_paragraph(xml: &mut String, paragraph: &Paragraph) {
    let format = &paragraph.format;
    xml.push_str("<w:p><w:pPr>");
    if let Some(style) = &format.style {
        let _ = write!(xml, r#"<w:pStyle w:val="{}"/>"#, escape(style.as_str()));
    }
    xml.push_str("<w:spacing");
    if let Some(before) = format.space_before {
        let _ = write!(xml, r#" w:before="{before}""#);
    }
    if let Some(after) = format.space_after {
        let _ = write!(xml, r#" w:after="{after}""#);
    }
    xml.push_str("/>");
    if !format.indent.is_empty() {
        xml.push_str("<w:ind");
        let ind = &format.indent;
        for (attr, value) in [
            ("w:left", ind.left),
            ("w:right", ind.right),
            ("w:firstLine", ind.first_line),
            ("w:hanging", ind.hanging),
        ] {
            if let Some(v) = value {
                let _ = write!(xml, r#" {attr}="{v}""#);
            }
        }
        xml.push_str("/>");
    }
    if let Some(jc) = &format.alignment {
        let _ = write!(xml, r#"<w:jc w:val="{}"/>"#, escape(jc.as_str()));
    }
    xml.push_str("</w:pPr>");
    for run in &paragraph.runs {
        write_run(xml, run);
    }
    xml.push_str("</w:p>");
}

fn write_run(xml: &mut String, run: &Run) {
    let format = &run.format;
    xml.push_str("<w:r><w:rPr>");
    if let Some(font) = &format.font {
        let font = escape(font.as_str());
        let _ = write!(
            xml,
            r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}"/>"#
        );
    }
    if let Some(bold) = format.bold {
        xml.push_str(if bold { "<w:b/>" } else { r#"<w:b w:val="0"/>"# });
    }
    if let Some(italic) = format.italic {
        xml.push_str(if italic { "<w:i/>" } else { r#"<w:i w:val="0"/>"# });
    }
    if let Some(color) = &format.color {
        let _ = write!(xml, r#"<w:color w:val="{}"/>"#, escape(color.as_str()));
    }
    if let Some(size) = format.size {
        let _ = write!(xml, r#"<w:sz w:val="{size}"/>"#);
    }
    if let Some(underline) = &format.underline {
        let _ = write!(xml, r#"<w:u w:val="{}"/>"#, escape(underline.as_str()));
    }
    xml.push_str("</w:rPr>");

    let mut pending = String::new();
    for c in run.text.chars() {
        match c {
            '\t' | '\n' | '\r' => {
                flush_text(xml, &mut pending);
                xml.push_str(if c == '\t' { "<w:tab/>" } else { "<w:br/>" });
            }
            _ => pending.push(c),
        }
    }
    flush_text(xml, &mut pending);
    xml.push_str("</w:r>");
}

fn flush_text(xml: &mut String, pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let _ = write!(
        xml,
        r#"<w:t xml:space="preserve">{}</w:t>"#,
        escape(pending.as_str())
    );
    pending.clear();
}
