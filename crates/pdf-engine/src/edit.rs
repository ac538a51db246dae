//! In-place document mutation: font embedding, text drawing and serialisation.

use crate::text;
use crate::{load_document, page_size_of, PageSize, PdfEngineError};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::{BTreeMap, HashSet};

/// One of the base-14 fonts every PDF reader provides without embedding
/// glyph data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    ZapfDingbats,
}

impl StandardFont {
    pub fn base_font(self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::ZapfDingbats => "ZapfDingbats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontHandle {
    font: StandardFont,
    object_id: ObjectId,
    slot: usize,
}

impl FontHandle {
    pub fn font(&self) -> StandardFont {
        self.font
    }

    /// Name under which the font is registered in page resources.
    pub fn resource_name(&self) -> String {
        format!("AnnF{}", self.slot + 1)
    }
}

/// Fill colour with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RgbColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RgbColor {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawTextOptions {
    /// Baseline origin of the first line in PDF space.
    pub x: f32,
    pub y: f32,
    pub font: FontHandle,
    pub size: f32,
    pub color: RgbColor,
    /// Wrap width; `None` only breaks on explicit newlines.
    pub max_width: Option<f32>,
    /// Distance between baselines; defaults to the font size.
    pub line_height: Option<f32>,
}

/// A loaded document that accepts draw instructions and serialises back to
/// bytes. Draws are buffered per page and flushed on [`EditableDocument::save`].
pub struct EditableDocument {
    doc: Document,
    pages: Vec<ObjectId>,
    fonts: Vec<FontHandle>,
    installed: HashSet<(usize, usize)>,
    pending: BTreeMap<usize, Vec<Operation>>,
}

impl EditableDocument {
    pub fn load(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        let doc = load_document(bytes)?;
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        Ok(Self {
            doc,
            pages,
            fonts: Vec::new(),
            installed: HashSet::new(),
            pending: BTreeMap::new(),
        })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn page_size(&self, page_index: u32) -> Result<PageSize, PdfEngineError> {
        let page_id = self.page_id(page_index)?;
        Ok(page_size_of(&self.doc, page_id))
    }

    /// Adds a font dictionary for `font`; embedding the same font twice
    /// returns the existing handle.
    pub fn embed_font(&mut self, font: StandardFont) -> Result<FontHandle, PdfEngineError> {
        if let Some(existing) = self.fonts.iter().find(|handle| handle.font == font) {
            return Ok(*existing);
        }

        let mut dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
        };
        if font == StandardFont::Helvetica {
            dict.set("Encoding", "WinAnsiEncoding");
        }

        let object_id = self.doc.add_object(dict);
        let handle = FontHandle { font, object_id, slot: self.fonts.len() };
        self.fonts.push(handle);
        log::debug!("embedded {} as {}", font.base_font(), handle.resource_name());

        Ok(handle)
    }

    pub fn draw_text(
        &mut self,
        page_index: u32,
        text: &str,
        options: &DrawTextOptions,
    ) -> Result<(), PdfEngineError> {
        let page_id = self.page_id(page_index)?;
        let font = options.font;

        let lines = match options.max_width {
            Some(max_width) => text::wrap_text(font.font, text, options.size, max_width),
            None => text.lines().map(str::to_owned).collect(),
        };
        if lines.iter().all(|line| line.is_empty()) {
            return Ok(());
        }

        self.install_font(page_index as usize, page_id, font)?;

        let line_height = options.line_height.unwrap_or(options.size);
        let color = options.color;
        let mut ops = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "rg",
                vec![Object::Real(color.r), Object::Real(color.g), Object::Real(color.b)],
            ),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(font.resource_name().into_bytes()), Object::Real(options.size)],
            ),
            Operation::new("TL", vec![Object::Real(line_height)]),
            Operation::new(
                "Tm",
                vec![
                    Object::Integer(1),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(1),
                    Object::Real(options.x),
                    Object::Real(options.y),
                ],
            ),
        ];

        for (index, line) in lines.iter().enumerate() {
            if index > 0 {
                ops.push(Operation::new("T*", vec![]));
            }
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(text::encode(font.font, line), StringFormat::Literal)],
            ));
        }

        ops.push(Operation::new("ET", vec![]));
        ops.push(Operation::new("Q", vec![]));

        self.pending.entry(page_index as usize).or_default().extend(ops);
        Ok(())
    }

    /// Flushes buffered draws into each page's content and serialises the
    /// document. Existing page content is isolated in its own graphics state
    /// so new draws are placed in default user space.
    pub fn save(mut self) -> Result<Vec<u8>, PdfEngineError> {
        let pending = std::mem::take(&mut self.pending);

        for (page_index, operations) in pending {
            let page_id = self.pages[page_index];
            let encoded = Content { operations }.encode()?;

            let mut contents = vec![Object::Reference(
                self.doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec())),
            )];
            contents.extend(self.existing_contents(page_id)?);

            let mut tail = b"Q\n".to_vec();
            tail.extend(encoded);
            contents.push(Object::Reference(self.doc.add_object(Stream::new(dictionary! {}, tail))));

            self.page_dict_mut(page_id)?.set("Contents", Object::Array(contents));
        }

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }

    fn page_id(&self, page_index: u32) -> Result<ObjectId, PdfEngineError> {
        self.pages.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: self.pages.len() as u32,
        })
    }

    fn page_dict_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary, PdfEngineError> {
        Ok(self.doc.get_object_mut(page_id).and_then(Object::as_dict_mut)?)
    }

    fn existing_contents(&self, page_id: ObjectId) -> Result<Vec<Object>, PdfEngineError> {
        let page = self.doc.get_dictionary(page_id)?;
        let contents = match page.get(b"Contents") {
            Ok(Object::Reference(id)) => match self.doc.get_object(*id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => vec![Object::Reference(*id)],
            },
            Ok(Object::Array(items)) => items.clone(),
            Ok(_) => {
                return Err(PdfEngineError::Malformed("unexpected page /Contents object".to_owned()))
            }
            Err(_) => Vec::new(),
        };
        Ok(contents)
    }

    /// Registers `font` in the page's own resource dictionary. Inherited
    /// resources are copied onto the page first so existing names still
    /// resolve.
    fn install_font(
        &mut self,
        page_index: usize,
        page_id: ObjectId,
        font: FontHandle,
    ) -> Result<(), PdfEngineError> {
        if !self.installed.insert((page_index, font.slot)) {
            return Ok(());
        }

        let mut resources = self.inherited_resources(page_id)?;
        let mut fonts = match resources.get(b"Font") {
            Ok(Object::Reference(id)) => self.doc.get_dictionary(*id)?.clone(),
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        fonts.set(font.resource_name(), Object::Reference(font.object_id));
        resources.set("Font", Object::Dictionary(fonts));

        self.page_dict_mut(page_id)?.set("Resources", Object::Dictionary(resources));
        Ok(())
    }

    fn inherited_resources(&self, page_id: ObjectId) -> Result<Dictionary, PdfEngineError> {
        let mut current = Some(page_id);
        while let Some(id) = current {
            let dict = self.doc.get_dictionary(id)?;
            match dict.get(b"Resources") {
                Ok(Object::Reference(resources_id)) => {
                    return Ok(self.doc.get_dictionary(*resources_id)?.clone())
                }
                Ok(Object::Dictionary(resources)) => return Ok(resources.clone()),
                _ => {}
            }
            current = dict.get(b"Parent").and_then(|parent| parent.as_reference()).ok();
        }
        Ok(Dictionary::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn text_options(font: FontHandle, x: f32, y: f32) -> DrawTextOptions {
        DrawTextOptions {
            x,
            y,
            font,
            size: 12.0,
            color: RgbColor::new(0.0, 0.0, 0.0),
            max_width: Some(100.0),
            line_height: Some(14.4),
        }
    }

    fn page_operations(bytes: &[u8], page_number: u32) -> Vec<Operation> {
        let doc = Document::load_mem(bytes).expect("saved output should parse");
        let page_id = doc.get_pages()[&page_number];
        let content = doc.get_page_content(page_id).expect("page content");
        Content::decode(&content).expect("content should decode").operations
    }

    #[test]
    fn embedding_same_font_twice_reuses_handle() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let first = doc.embed_font(StandardFont::Helvetica).expect("embed");
        let second = doc.embed_font(StandardFont::Helvetica).expect("embed again");
        let dingbats = doc.embed_font(StandardFont::ZapfDingbats).expect("embed dingbats");

        assert_eq!(first, second);
        assert_ne!(first.resource_name(), dingbats.resource_name());
    }

    #[test]
    fn draw_text_appends_positioned_text_after_original_content() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let font = doc.embed_font(StandardFont::Helvetica).expect("embed");
        doc.draw_text(0, "Hello", &text_options(font, 50.0, 730.0)).expect("draw");
        let bytes = doc.save().expect("save");

        let ops = page_operations(&bytes, 1);
        let first = ops.first().expect("content should not be empty");
        assert_eq!(first.operator, "q");

        let tm = ops.iter().rev().find(|op| op.operator == "Tm").expect("Tm operator");
        assert_eq!(crate::number(&tm.operands[4]), Some(50.0));
        assert_eq!(crate::number(&tm.operands[5]), Some(730.0));

        let shown: Vec<&Operation> = ops.iter().filter(|op| op.operator == "Tj").collect();
        let last = shown.last().expect("Tj operator");
        assert!(matches!(&last.operands[0], Object::String(bytes, _) if bytes.as_slice() == b"Hello"));
    }

    #[test]
    fn long_text_wraps_into_multiple_lines() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let font = doc.embed_font(StandardFont::Helvetica).expect("embed");
        doc.draw_text(0, "one two three four", &DrawTextOptions {
            max_width: Some(50.0),
            ..text_options(font, 10.0, 10.0)
        })
        .expect("draw");
        let bytes = doc.save().expect("save");

        let ops = page_operations(&bytes, 1);
        let next_lines = ops.iter().filter(|op| op.operator == "T*").count();
        assert_eq!(next_lines, 2);
    }

    #[test]
    fn font_is_registered_in_page_resources() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let font = doc.embed_font(StandardFont::ZapfDingbats).expect("embed");
        doc.draw_text(0, "\u{2713}", &text_options(font, 0.0, 0.0)).expect("draw");
        let bytes = doc.save().expect("save");

        let saved = Document::load_mem(&bytes).expect("parse");
        let page_id = saved.get_pages()[&1];
        let page = saved.get_dictionary(page_id).expect("page dict");
        let resources = page.get(b"Resources").and_then(Object::as_dict).expect("resources");
        let fonts = resources.get(b"Font").and_then(Object::as_dict).expect("font dict");

        assert!(fonts.has(font.resource_name().as_bytes()));
        assert!(fonts.has(b"F1"), "inherited fixture font must survive");
    }

    #[test]
    fn empty_text_draws_nothing() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let font = doc.embed_font(StandardFont::Helvetica).expect("embed");
        doc.draw_text(0, "", &text_options(font, 0.0, 0.0)).expect("draw");
        let bytes = doc.save().expect("save");

        let ops = page_operations(&bytes, 1);
        assert!(ops.iter().all(|op| op.operator != "Tm"));
    }

    #[test]
    fn encrypted_documents_are_not_editable() {
        let err = EditableDocument::load(&fixtures::encrypted()).err().expect("must be refused");
        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn drawing_on_missing_page_is_an_error() {
        let mut doc = EditableDocument::load(&fixtures::single_page()).expect("load");
        let font = doc.embed_font(StandardFont::Helvetica).expect("embed");
        let err = doc.draw_text(3, "x", &text_options(font, 0.0, 0.0)).expect_err("no page 4");

        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 3, page_count: 1 }));
    }
}
