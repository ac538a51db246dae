//! Flattening export: replays every annotation as a draw instruction against
//! the original document bytes.

use crate::annotation::{Annotation, AnnotationKind, Color, CHECK_GLYPH, LINE_HEIGHT_FACTOR};
use crate::coords::page_to_pdf;
use pdf_engine::{
    DrawTextOptions, EditableDocument, FontHandle, PdfEngineError, RgbColor, StandardFont,
};

/// Prefix of exported file names unless configured otherwise.
pub const DEFAULT_OUTPUT_PREFIX: &str = "edited_";

/// Checkmark fill; `Color::DARK_GREEN` rounds to 128/255, the PDF gets 0.5 exactly.
const CHECK_FILL: RgbColor = RgbColor::new(0.0, 0.5, 0.0);

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to load original document: {0}")]
    Load(#[source] PdfEngineError),
    #[error("failed to embed font {font}: {source}")]
    EmbedFont {
        font: &'static str,
        #[source]
        source: PdfEngineError,
    },
    #[error("failed to draw annotation on page {page}: {source}")]
    Draw {
        page: u32,
        #[source]
        source: PdfEngineError,
    },
    #[error("failed to serialise document: {0}")]
    Save(#[source] PdfEngineError),
}

/// Produces the flattened document.
///
/// Annotations are drawn in the given order, each on its own page by 1-based
/// number. Annotations pointing past the last page are skipped.
pub fn export_annotations<'a>(
    original: &[u8],
    annotations: impl IntoIterator<Item = &'a Annotation>,
) -> Result<Vec<u8>, ExportError> {
    let mut doc = EditableDocument::load(original).map_err(ExportError::Load)?;
    let helvetica = embed(&mut doc, StandardFont::Helvetica)?;
    let dingbats = embed(&mut doc, StandardFont::ZapfDingbats)?;

    let page_count = doc.page_count();
    let mut drawn = 0usize;
    for annotation in annotations {
        let page = annotation.page();
        if page == 0 || page > page_count {
            log::debug!(
                "skipping annotation {} on page {page}: document has {page_count} pages",
                annotation.id()
            );
            continue;
        }

        let index = page - 1;
        let page_height = doc
            .page_size(index)
            .map_err(|source| ExportError::Draw { page, source })?
            .height_pt;
        let origin = page_to_pdf(annotation.position(), page_height, annotation.element_height());

        let (text, options) = match annotation.kind() {
            AnnotationKind::Text { content, font_size, width } => (
                content.as_str(),
                DrawTextOptions {
                    x: origin.x,
                    y: origin.y,
                    font: helvetica,
                    size: *font_size,
                    color: fill(Color::BLACK),
                    max_width: Some(*width),
                    line_height: Some(font_size * LINE_HEIGHT_FACTOR),
                },
            ),
            AnnotationKind::Checkmark { size } => (
                CHECK_GLYPH,
                DrawTextOptions {
                    x: origin.x,
                    y: origin.y,
                    font: dingbats,
                    size: *size,
                    color: CHECK_FILL,
                    max_width: None,
                    line_height: None,
                },
            ),
        };

        log::debug!(
            "drawing {:?} {} at pdf ({}, {})",
            annotation.variant(),
            annotation.id(),
            origin.x,
            origin.y
        );
        doc.draw_text(index, text, &options)
            .map_err(|source| ExportError::Draw { page, source })?;
        drawn += 1;
    }

    let bytes = doc.save().map_err(ExportError::Save)?;
    log::info!("exported {drawn} annotations ({} bytes)", bytes.len());
    Ok(bytes)
}

/// Name of the exported file for an input called `name`.
pub fn output_file_name(prefix: &str, name: &str) -> String {
    format!("{prefix}{name}")
}

fn embed(doc: &mut EditableDocument, font: StandardFont) -> Result<FontHandle, ExportError> {
    doc.embed_font(font)
        .map_err(|source| ExportError::EmbedFont { font: font.base_font(), source })
}

fn fill(color: Color) -> RgbColor {
    let (r, g, b) = color.to_normalized();
    RgbColor::new(r, g, b)
}
