//! lopdf-based PDF backend.
//!
//! Implements [`DocumentBackend`] using the [lopdf](https://crates.io/crates/lopdf)
//! crate, and provides [`PageAssembler`] for splicing pages from one or more
//! source documents into a new document.

use lopdf::{Object, ObjectId, dictionary};

use crate::backend::DocumentBackend;
use crate::error::BackendError;

/// Page attributes that may be inherited from the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A parsed PDF document backed by lopdf.
#[derive(Clone)]
pub struct LopdfDocument {
    /// The underlying lopdf document.
    inner: lopdf::Document,
    /// Cached ordered list of page ObjectIds (indexed by 0-based page number).
    page_ids: Vec<ObjectId>,
}

impl LopdfDocument {
    /// Wrap an already loaded lopdf document.
    ///
    /// Attributes inherited from the page tree are copied onto each page, so
    /// text extraction sees resources declared inline on a `/Pages` node and
    /// pages can later be moved out of their tree.
    pub fn from_document(mut inner: lopdf::Document) -> Self {
        // get_pages returns BTreeMap<u32, ObjectId> keyed by 1-based page number
        let page_ids: Vec<ObjectId> = inner.get_pages().into_values().collect();
        for &page_id in &page_ids {
            if let Err(_e) = flatten_inherited(&mut inner, page_id) {
                #[cfg(feature = "tracing")]
                tracing::debug!(?page_id, error = %_e, "page attributes left inherited");
            }
        }
        Self { inner, page_ids }
    }

    /// Access the underlying lopdf document.
    pub fn inner(&self) -> &lopdf::Document {
        &self.inner
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }
}

impl std::fmt::Debug for LopdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LopdfDocument")
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

/// A reference to a single page within a [`LopdfDocument`].
#[derive(Debug, Clone, Copy)]
pub struct LopdfPage {
    /// The lopdf object ID for this page.
    pub object_id: ObjectId,
    /// The 0-based page index.
    pub index: usize,
}

/// The lopdf-based PDF backend.
pub struct LopdfBackend;

/// Look up a key on a page's ancestors in the page tree (via /Parent).
///
/// The page's own dictionary is not consulted. Returns `None` if no ancestor
/// carries the key.
fn resolve_inherited(
    doc: &lopdf::Document,
    page_id: ObjectId,
    key: &[u8],
) -> Result<Option<Object>, BackendError> {
    let mut current_id = page_id;
    loop {
        let dict = doc
            .get_object(current_id)
            .and_then(|o| o.as_dict())
            .map_err(|e| BackendError::Parse(format!("failed to get page tree node: {e}")))?;

        if current_id != page_id {
            if let Ok(value) = dict.get(key) {
                return Ok(Some(value.clone()));
            }
        }

        match dict.get(b"Parent") {
            Ok(parent_obj) => {
                current_id = parent_obj
                    .as_reference()
                    .map_err(|e| BackendError::Parse(format!("invalid /Parent reference: {e}")))?;
            }
            Err(_) => return Ok(None),
        }
    }
}

/// Copy every inheritable attribute the page lacks from its ancestors.
fn flatten_inherited(doc: &mut lopdf::Document, page_id: ObjectId) -> Result<(), BackendError> {
    let mut inherited = Vec::new();
    for key in INHERITABLE_KEYS {
        let own = doc
            .get_object(page_id)
            .and_then(|o| o.as_dict())
            .map(|d| d.has(key))
            .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
        if !own {
            if let Some(value) = resolve_inherited(doc, page_id, key)? {
                inherited.push((key, value));
            }
        }
    }
    if inherited.is_empty() {
        return Ok(());
    }
    let dict = doc
        .get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
    for (key, value) in inherited {
        dict.set(key.to_vec(), value);
    }
    Ok(())
}

impl DocumentBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = LopdfPage;
    type Error = BackendError;

    fn open(bytes: &[u8]) -> Result<Self::Document, Self::Error> {
        let inner = lopdf::Document::load_mem(bytes)
            .map_err(|e| BackendError::Parse(format!("failed to parse PDF: {e}")))?;

        if inner.is_encrypted() {
            return Err(BackendError::Parse(
                "PDF is encrypted and cannot be read".to_string(),
            ));
        }

        Ok(LopdfDocument::from_document(inner))
    }

    fn page_count(doc: &Self::Document) -> usize {
        doc.page_ids.len()
    }

    fn get_page(doc: &Self::Document, index: usize) -> Result<Self::Page, Self::Error> {
        let object_id = *doc
            .page_ids
            .get(index)
            .ok_or(BackendError::PageOutOfRange {
                index,
                count: doc.page_ids.len(),
            })?;
        Ok(LopdfPage { object_id, index })
    }

    fn page_text(doc: &Self::Document, page: &Self::Page) -> String {
        let page_number = (page.index + 1) as u32;
        match doc.inner.extract_text(&[page_number]) {
            Ok(text) => text,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(page = page.index, error = %_e, "text extraction failed");
                String::new()
            }
        }
    }
}

/// Builds a new PDF from pages of existing documents.
///
/// Pages are copied by object reference: content streams and resources are
/// moved over unchanged, only page-tree links are rewritten. Pages keep the
/// order in which they were appended.
///
/// ```ignore
/// let mut out = PageAssembler::new();
/// out.append_from(&filing, 2)?;
/// out.append_pages(&w2, &[matched_page])?;
/// let bytes = out.to_bytes()?;
/// ```
pub struct PageAssembler {
    doc: lopdf::Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl Default for PageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PageAssembler {
    /// Start an empty document.
    pub fn new() -> Self {
        let mut doc = lopdf::Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append the given pages of `source`, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::PageOutOfRange`] if any index is out of range,
    /// in which case nothing is appended.
    pub fn append_pages(
        &mut self,
        source: &LopdfDocument,
        indices: &[usize],
    ) -> Result<(), BackendError> {
        if indices.is_empty() {
            return Ok(());
        }
        let count = source.page_ids.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= count) {
            return Err(BackendError::PageOutOfRange { index, count });
        }

        // Inherited attributes were flattened on load, so the source page
        // tree can be dropped.
        let mut src = source.inner.clone();
        src.renumber_objects_with(self.doc.max_id + 1);
        let renumbered: Vec<ObjectId> = src.get_pages().into_values().collect();

        for &i in indices {
            let page_id = renumbered[i];
            let dict = src
                .get_object_mut(page_id)
                .and_then(|o| o.as_dict_mut())
                .map_err(|e| BackendError::Parse(format!("failed to get page dictionary: {e}")))?;
            dict.set("Parent", Object::Reference(self.pages_id));
            self.kids.push(page_id);
        }

        self.doc.max_id = self.doc.max_id.max(src.max_id);
        self.doc.objects.extend(src.objects);
        Ok(())
    }

    /// Append every page of `source` from `start` onward.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`append_pages`](Self::append_pages).
    pub fn append_from(&mut self, source: &LopdfDocument, start: usize) -> Result<(), BackendError> {
        let indices: Vec<usize> = (start..source.page_count()).collect();
        self.append_pages(source, &indices)
    }

    /// Close the page tree and return the finished document.
    pub fn finish(mut self) -> lopdf::Document {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(self.pages_id),
        });
        self.doc.trailer.set("Root", Object::Reference(catalog_id));
        self.doc.prune_objects();
        self.doc.renumber_objects();
        self.doc
    }

    /// Serialize the finished document.
    ///
    /// # Errors
    ///
    /// Returns an error if lopdf fails to serialize the document.
    pub fn to_bytes(self) -> Result<Vec<u8>, BackendError> {
        let mut doc = self.finish();
        let mut buf = Vec::new();
        doc.save_to(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Stream;

    /// Create a PDF with one page per text, pages inheriting MediaBox and
    /// Resources from the page tree.
    fn create_pdf(texts: &[&str]) -> Vec<u8> {
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
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => texts.len() as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ],
                "Resources" => dictionary! {
                    "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                },
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

    fn texts_of(bytes: &[u8]) -> Vec<String> {
        let doc = LopdfBackend::open(bytes).unwrap();
        LopdfBackend::page_texts(&doc)
    }

    #[test]
    fn open_counts_pages() {
        let doc = LopdfBackend::open(&create_pdf(&["a", "b", "c"])).unwrap();
        assert_eq!(LopdfBackend::page_count(&doc), 3);
    }

    #[test]
    fn open_invalid_bytes_returns_error() {
        let result = LopdfBackend::open(b"not a pdf");
        assert!(matches!(result, Err(BackendError::Parse(_))));
    }

    #[test]
    fn get_page_out_of_range() {
        let doc = LopdfBackend::open(&create_pdf(&["a"])).unwrap();
        let err = LopdfBackend::get_page(&doc, 3).unwrap_err();
        assert!(matches!(err, BackendError::PageOutOfRange { index: 3, count: 1 }));
    }

    #[test]
    fn page_text_reads_content() {
        let texts = texts_of(&create_pdf(&["Prepared for: Jane Doe", "second"]));
        assert!(texts[0].contains("Prepared for: Jane Doe"));
        assert!(texts[1].contains("second"));
    }

    #[test]
    fn inline_resources_on_page_tree_are_inherited() {
        let doc = LopdfBackend::open(&create_pdf(&["for: Jane Doe"])).unwrap();
        let page_id = doc.page_ids[0];
        let dict = doc.inner().get_dictionary(page_id).unwrap();
        assert!(dict.get(b"Resources").unwrap().as_dict().is_ok());
        let text = LopdfBackend::page_text(&doc, &LopdfBackend::get_page(&doc, 0).unwrap());
        assert!(text.contains("Jane Doe"), "got {text:?}");
    }

    #[test]
    fn assembler_strips_leading_pages() {
        let src = LopdfBackend::open(&create_pdf(&["p0", "p1", "p2", "p3"])).unwrap();
        let mut out = PageAssembler::new();
        out.append_from(&src, 2).unwrap();
        assert_eq!(out.page_count(), 2);

        let texts = texts_of(&out.to_bytes().unwrap());
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("p2"));
        assert!(texts[1].contains("p3"));
    }

    #[test]
    fn assembler_splices_documents_in_append_order() {
        let a = LopdfBackend::open(&create_pdf(&["a0", "a1", "a2"])).unwrap();
        let b = LopdfBackend::open(&create_pdf(&["b0", "b1"])).unwrap();
        let mut out = PageAssembler::new();
        out.append_from(&a, 2).unwrap();
        out.append_pages(&b, &[1]).unwrap();
        out.append_pages(&a, &[0]).unwrap();

        let texts = texts_of(&out.to_bytes().unwrap());
        assert_eq!(texts.len(), 3);
        assert!(texts[0].contains("a2"));
        assert!(texts[1].contains("b1"));
        assert!(texts[2].contains("a0"));
    }

    #[test]
    fn assembler_flattens_inherited_attributes() {
        let src = LopdfBackend::open(&create_pdf(&["x", "y"])).unwrap();
        let mut out = PageAssembler::new();
        out.append_pages(&src, &[1]).unwrap();
        let doc = LopdfDocument::from_document(out.finish());
        let page_id = doc.page_ids[0];
        let dict = doc.inner().get_dictionary(page_id).unwrap();
        assert!(dict.has(b"MediaBox"));
        assert!(dict.has(b"Resources"));
    }

    #[test]
    fn assembler_rejects_out_of_range_without_appending() {
        let src = LopdfBackend::open(&create_pdf(&["x"])).unwrap();
        let mut out = PageAssembler::new();
        assert!(out.append_pages(&src, &[0, 4]).is_err());
        assert_eq!(out.page_count(), 0);
    }

    #[test]
    fn assembler_empty_document_is_valid() {
        let bytes = PageAssembler::new().to_bytes().unwrap();
        let doc = LopdfBackend::open(&bytes).unwrap();
        assert_eq!(LopdfBackend::page_count(&doc), 0);
    }
}
