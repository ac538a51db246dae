use image::{ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

mod edit;
pub mod text;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use edit::{DrawTextOptions, EditableDocument, FontHandle, RgbColor, StandardFont};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Intrinsic page size in points, taken from the page's MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };

    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self { width_pt, height_pt }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: u32,
    pub scale: f32,
}

impl Default for RenderRequest {
    fn default() -> Self {
        Self { page_index: 0, scale: 1.0 }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("malformed document: {0}")]
    Malformed(String),
}

/// Read-only access to a loaded document: page geometry and rasters.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        let doc = load_document(bytes)?;
        let sizes: Vec<PageSize> =
            doc.get_pages().into_values().map(|page_id| page_size_of(&doc, page_id)).collect();

        if sizes.is_empty() {
            return Err(PdfEngineError::Malformed("document has no pages".to_owned()));
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        log::debug!("opened document {} with {} page(s)", handle.raw(), page_sizes.len());
        self.docs.insert(handle, DocumentRecord { page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    /// Produces a page-sized raster at the requested scale.
    ///
    /// lopdf cannot rasterise page content, so the raster is a white sheet
    /// with a light border; overlays are composed on top of it.
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
    ) -> Result<RgbaImage, PdfEngineError> {
        let page_size = self.page_size(handle, request.page_index)?;
        let scale = if request.scale.is_finite() && request.scale > 0.0 { request.scale } else { 1.0 };

        let width = (page_size.width_pt * scale).round().max(1.0) as u32;
        let height = (page_size.height_pt * scale).round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, Rgba([220, 220, 220, 255]));
                image.put_pixel(x, height - 1, Rgba([220, 220, 220, 255]));
            }
            for y in 0..height {
                image.put_pixel(0, y, Rgba([220, 220, 220, 255]));
                image.put_pixel(width - 1, y, Rgba([220, 220, 220, 255]));
            }
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

/// Parses `bytes`, refusing documents whose trailer declares encryption.
pub(crate) fn load_document(bytes: &[u8]) -> Result<Document, PdfEngineError> {
    let doc = Document::load_mem(bytes)?;
    if doc.trailer.has(b"Encrypt") {
        return Err(PdfEngineError::EncryptedUnsupported);
    }
    Ok(doc)
}

/// Resolves a page's MediaBox, walking up the page tree for inherited values.
pub(crate) fn page_size_of(doc: &Document, page_id: ObjectId) -> PageSize {
    let mut current = Some(page_id);
    while let Some(id) = current {
        let Ok(dict) = doc.get_dictionary(id) else {
            break;
        };
        if let Some(size) = media_box(doc, dict) {
            return size;
        }
        current = dict.get(b"Parent").and_then(|parent| parent.as_reference()).ok();
    }
    PageSize::LETTER
}

fn media_box(doc: &Document, dict: &Dictionary) -> Option<PageSize> {
    let raw = dict.get(b"MediaBox").ok()?;
    let resolved = match raw {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let array = resolved.as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let x0 = number(&array[0])?;
    let y0 = number(&array[1])?;
    let x1 = number(&array[2])?;
    let y1 = number(&array[3])?;
    Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(fixtures::single_page()))
            .expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 1);
    }

    #[test]
    fn reads_page_sizes_from_media_box() {
        let bytes = fixtures::blank_pdf(&[PageSize::LETTER, PageSize::new(595.0, 842.0)]);
        let mut engine = LopdfEngine::new();
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("open should succeed");

        assert_eq!(engine.page_size(handle, 0).expect("page 0"), PageSize::LETTER);
        assert_eq!(engine.page_size(handle, 1).expect("page 1"), PageSize::new(595.0, 842.0));

        let err = engine.page_size(handle, 2).expect_err("page 2 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 2, page_count: 2 }));
    }

    #[test]
    fn render_page_matches_page_size_times_scale() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(fixtures::single_page()))
            .expect("open should succeed");

        let image = engine
            .render_page(handle, RenderRequest { page_index: 0, scale: 1.5 })
            .expect("page should render");

        assert_eq!(image.width(), 918);
        assert_eq!(image.height(), 1188);
    }

    #[test]
    fn rejects_garbage_bytes() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"not a pdf at all".to_vec()))
            .expect_err("garbage should not parse");

        assert!(matches!(err, PdfEngineError::Parse(_)));
    }

    #[test]
    fn rejects_documents_with_encrypt_trailer() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(fixtures::encrypted()))
            .expect_err("encrypted documents are refused");

        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn encrypt_bytes_inside_content_do_not_trigger_rejection() {
        let mut doc = fixtures::document(&[PageSize::LETTER]);
        doc.add_object(lopdf::Stream::new(lopdf::Dictionary::new(), b"(/Encrypt) Tj".to_vec()));
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("document should serialise");
        assert!(bytes.windows(8).any(|window| window == b"/Encrypt"));

        let mut engine = LopdfEngine::new();
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("plain document opens");
        assert_eq!(engine.page_count(handle).expect("count"), 1);
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }
}
