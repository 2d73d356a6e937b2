//! Shared fixtures for the stage integration tests.
//!
//! PDFs are built with lopdf (one Helvetica text line per page) and DOCX
//! packages are zipped by hand, all inside temporary directories.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::{Object, Stream, dictionary};
use taxpack::WorkingDirectorySet;
use taxpack_parse::{DocumentBackend, LopdfBackend};

// ─── PDF fixtures ───────────────────────────────────────────────────────────

/// A PDF with one page per entry of `texts`.
pub fn pdf_bytes(texts: &[&str]) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for text in texts {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "Contents" => Object::Reference(content_id),
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => texts.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// Write a PDF with one page per text, creating parent folders.
pub fn write_pdf(path: &Path, texts: &[&str]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, pdf_bytes(texts)).unwrap();
}

/// Write bytes that are not a PDF under a PDF name.
pub fn write_corrupt(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"%PDF-1.5\nthis is not a pdf").unwrap();
}

/// Text of every page of the PDF at `path`, trimmed.
pub fn page_texts(path: &Path) -> Vec<String> {
    let doc = LopdfBackend::open_file(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()));
    LopdfBackend::page_texts(&doc)
        .into_iter()
        .map(|t| t.trim().to_string())
        .collect()
}

/// A state filing: two cover pages, the name page, then `rest`.
pub fn state_filing_texts<'a>(name_line: &'a str, rest: &[&'a str]) -> Vec<&'a str> {
    let mut texts = vec!["cover", name_line];
    texts.extend_from_slice(rest);
    texts
}

// ─── DOCX fixtures ──────────────────────────────────────────────────────────

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// A DOCX whose body holds one spaced paragraph per entry of `paragraphs`,
/// all using the `Address` style, on a Letter page with 720 margins.
pub fn docx_bytes(paragraphs: &[&str]) -> Vec<u8> {
    docx_bytes_with_page(paragraphs, (12240, 15840), 720)
}

/// Like [`docx_bytes`], with the page size and a uniform margin in twips.
pub fn docx_bytes_with_page(paragraphs: &[&str], size: (u32, u32), margin: i32) -> Vec<u8> {
    let (width, height) = size;
    let mut body = String::new();
    for text in paragraphs {
        body.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Address"/><w:spacing w:before="240" w:after="240"/><w:jc w:val="left"/></w:pPr><w:r><w:rPr><w:b/><w:rFonts w:ascii="Courier New" w:hAnsi="Courier New"/><w:sz w:val="22"/></w:rPr><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#
        ));
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}"><w:body>{body}<w:sectPr><w:pgSz w:w="{width}" w:h="{height}"/><w:pgMar w:top="{margin}" w:right="{margin}" w:bottom="{margin}" w:left="{margin}"/></w:sectPr></w:body></w:document>"#
    );
    let styles = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:styles xmlns:w="{W_NS}"><w:style w:type="paragraph" w:styleId="Normal"><w:name w:val="Normal"/></w:style><w:style w:type="paragraph" w:styleId="Address"><w:name w:val="Address"/><w:basedOn w:val="Normal"/></w:style></w:styles>"#
    );

    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.start_file("word/styles.xml", options).unwrap();
    zip.write_all(styles.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Write a DOCX, creating parent folders.
pub fn write_docx(path: &Path, paragraphs: &[&str]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, docx_bytes(paragraphs)).unwrap();
}

// ─── Layout ─────────────────────────────────────────────────────────────────

/// A fresh working directory set under a temporary root.
pub fn workspace() -> (tempfile::TempDir, WorkingDirectorySet) {
    let root = tempfile::tempdir().unwrap();
    let dirs = WorkingDirectorySet::from_root(root.path());
    std::fs::create_dir_all(&dirs.company).unwrap();
    std::fs::create_dir_all(&dirs.w2).unwrap();
    (root, dirs)
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}

/// Path of the single file in `dir`.
pub fn only_file(dir: &Path) -> PathBuf {
    let names = file_names(dir);
    assert_eq!(names.len(), 1, "expected one file in {}: {names:?}", dir.display());
    dir.join(&names[0])
}
