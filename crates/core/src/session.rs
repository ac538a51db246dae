//! Editor session: the single owner of the loaded document, navigation,
//! tool state and annotations.

use crate::annotation::{AnnotationId, AnnotationStore, ToolDefaults};
use crate::coords::{screen_to_page, InvalidScale, Scale, ScreenPoint};
use crate::export::{export_annotations, output_file_name, ExportError};
use crate::interaction::{generate_handles, HandleType, InteractionController, Tool};
use crate::overlay::{build_overlay, compose_overlay, Overlay};
use crate::settings::EditorSettings;
use pdf_engine::{
    DocumentHandle, LopdfEngine, OpenSource, PageSize, PdfEngine, PdfEngineError, RenderRequest,
    RgbaImage,
};

pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{name} is not a PDF (type {mime})")]
    InvalidInputFile { name: String, mime: String },
    #[error("failed to load {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: PdfEngineError,
    },
    #[error("no document loaded")]
    NoDocument,
    #[error(transparent)]
    InvalidScale(#[from] InvalidScale),
    #[error("font size {size} is not one of {allowed:?}")]
    UnsupportedFontSize { size: f32, allowed: Vec<f32> },
    #[error("export failed: {0}")]
    Export(#[from] ExportError),
    #[error("render failed: {0}")]
    Render(#[source] PdfEngineError),
}

/// A file picked by the user.
#[derive(Debug, Clone)]
pub struct FileInput {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileInput {
    pub fn pdf(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime: PDF_MIME.to_owned(), bytes }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
struct LoadedDocument {
    name: String,
    bytes: Vec<u8>,
    handle: DocumentHandle,
    page_count: u32,
}

/// What a pointer position lands on, topmost first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    Handle(AnnotationId, HandleType),
    Annotation(AnnotationId),
    Canvas,
}

pub struct EditorSession<E: PdfEngine = LopdfEngine> {
    engine: E,
    settings: EditorSettings,
    document: Option<LoadedDocument>,
    current_page: u32,
    scale: Scale,
    font_size: f32,
    store: AnnotationStore,
    controller: InteractionController,
}

impl EditorSession<LopdfEngine> {
    pub fn new(settings: EditorSettings) -> Result<Self, SessionError> {
        Self::with_engine(LopdfEngine::new(), settings)
    }
}

impl<E: PdfEngine> EditorSession<E> {
    pub fn with_engine(engine: E, settings: EditorSettings) -> Result<Self, SessionError> {
        let scale = Scale::new(settings.default_scale)?;
        let font_size = settings.default_font_size;

        Ok(Self {
            engine,
            settings,
            document: None,
            current_page: 1,
            scale,
            font_size,
            store: AnnotationStore::new(),
            controller: InteractionController::new(),
        })
    }

    /// Loads `file`, replacing the current document.
    ///
    /// On any failure the previous document and its annotations stay as
    /// they were.
    pub fn open(&mut self, file: FileInput) -> Result<(), SessionError> {
        if file.mime != PDF_MIME {
            log::warn!("rejected {} with type {}", file.name, file.mime);
            return Err(SessionError::InvalidInputFile { name: file.name, mime: file.mime });
        }

        let FileInput { name, bytes, .. } = file;
        let opened = self
            .engine
            .open(OpenSource::Bytes(bytes.clone()))
            .and_then(|handle| Ok((handle, self.engine.page_count(handle)?)));
        let (handle, page_count) = match opened {
            Ok(opened) => opened,
            Err(source) => {
                log::error!("failed to load {name}: {source}");
                return Err(SessionError::Load { name, source });
            }
        };

        if let Some(previous) = self.document.take() {
            if let Err(err) = self.engine.close(previous.handle) {
                log::warn!("failed to close {}: {err}", previous.name);
            }
        }

        log::info!("loaded {name} ({page_count} pages)");
        self.document = Some(LoadedDocument { name, bytes, handle, page_count });
        self.current_page = 1;
        self.store.clear();
        self.controller.reset();
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.document.as_ref().map(|doc| doc.name.as_str())
    }

    /// Zero when nothing is loaded.
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |doc| doc.page_count)
    }

    /// 1-based.
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn page_size(&self, page: u32) -> Result<PageSize, SessionError> {
        let doc = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        self.engine.page_size(doc.handle, page.saturating_sub(1)).map_err(SessionError::Render)
    }

    pub fn next_page(&mut self) {
        self.go_to_page(self.current_page.saturating_add(1));
    }

    pub fn previous_page(&mut self) {
        self.go_to_page(self.current_page.saturating_sub(1));
    }

    /// Clamped to the document's page range.
    pub fn go_to_page(&mut self, page: u32) {
        let target = page.clamp(1, self.page_count().max(1));
        if target != self.current_page {
            self.controller.blur(&mut self.store);
            self.controller.pointer_up();
            log::debug!("page {} -> {target}", self.current_page);
        }
        self.current_page = target;
    }

    pub fn tool(&self) -> Tool {
        self.controller.tool()
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.controller.set_tool(&mut self.store, tool);
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Font size for text placed from now on.
    pub fn set_font_size(&mut self, size: f32) -> Result<(), SessionError> {
        if !self.settings.font_sizes.contains(&size) {
            return Err(SessionError::UnsupportedFontSize {
                size,
                allowed: self.settings.font_sizes.clone(),
            });
        }
        self.font_size = size;
        Ok(())
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) -> Result<(), SessionError> {
        self.scale = Scale::new(scale)?;
        Ok(())
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn annotations(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.controller.selected()
    }

    /// Resolves what lies under `point` on the current page.
    ///
    /// Handles of the selected annotation sit above every annotation body.
    pub fn target_at(&self, point: ScreenPoint) -> PointerTarget {
        if let Some(selected) = self.selected_on_current_page() {
            let handle = generate_handles(&self.store, selected, self.scale)
                .into_iter()
                .find(|handle| handle.hit_test(point));
            if let Some(handle) = handle {
                return PointerTarget::Handle(selected, handle.handle_type);
            }
        }

        match self.store.hit_test(self.current_page, screen_to_page(point, self.scale)) {
            Some(id) => PointerTarget::Annotation(id),
            None => PointerTarget::Canvas,
        }
    }

    pub fn pointer_down(&mut self, point: ScreenPoint) {
        if !self.is_loaded() {
            return;
        }
        match self.target_at(point) {
            PointerTarget::Handle(_, HandleType::Delete) | PointerTarget::Canvas => {}
            PointerTarget::Handle(id, handle) => {
                self.controller.pointer_down_on_handle(&self.store, id, handle, point)
            }
            PointerTarget::Annotation(id) => {
                self.controller.pointer_down_on_annotation(&mut self.store, id, point)
            }
        }
    }

    pub fn pointer_move(&mut self, point: ScreenPoint) {
        self.controller.pointer_move(&mut self.store, point, self.scale);
    }

    pub fn pointer_up(&mut self) {
        self.controller.pointer_up();
    }

    /// Full click. Creates on empty canvas, activates the delete control,
    /// and otherwise selects what was clicked.
    pub fn click(&mut self, point: ScreenPoint) -> Option<AnnotationId> {
        if !self.is_loaded() {
            return None;
        }
        match self.target_at(point) {
            PointerTarget::Canvas => {
                let defaults = self.tool_defaults();
                self.controller.canvas_click(
                    &mut self.store,
                    self.current_page,
                    point,
                    self.scale,
                    &defaults,
                )
            }
            PointerTarget::Handle(id, HandleType::Delete) => {
                self.controller.delete(&mut self.store, id);
                None
            }
            PointerTarget::Handle(..) => None,
            PointerTarget::Annotation(id) => {
                self.controller.pointer_down_on_annotation(&mut self.store, id, point);
                self.controller.pointer_up();
                None
            }
        }
    }

    pub fn double_click(&mut self, point: ScreenPoint) -> bool {
        match self.target_at(point) {
            PointerTarget::Annotation(id) => self.controller.double_click(&mut self.store, id),
            _ => false,
        }
    }

    pub fn input_text(&mut self, text: &str) {
        self.controller.input_text(&mut self.store, text);
    }

    pub fn blur(&mut self) {
        self.controller.blur(&mut self.store);
    }

    pub fn delete(&mut self, id: AnnotationId) {
        self.controller.delete(&mut self.store, id);
    }

    pub fn delete_selected(&mut self) -> bool {
        let Some(id) = self.controller.selected() else {
            return false;
        };
        self.controller.delete(&mut self.store, id);
        true
    }

    pub fn overlay(&self) -> Overlay {
        build_overlay(&self.store, &self.controller, self.current_page, self.scale)
    }

    /// Page raster at the current scale with the annotation overlay on top.
    pub fn render_current_page(&self) -> Result<RgbaImage, SessionError> {
        let doc = self.document.as_ref().ok_or(SessionError::NoDocument)?;
        let request =
            RenderRequest { page_index: self.current_page - 1, scale: self.scale.get() };
        let mut image = self.engine.render_page(doc.handle, request).map_err(SessionError::Render)?;
        compose_overlay(&mut image, &self.overlay());
        Ok(image)
    }

    /// Flattens every annotation into a copy of the original file.
    ///
    /// The store is left untouched whether or not the export succeeds.
    /// Takes `&mut self` so no edit or second export can overlap it.
    pub fn export(&mut self) -> Result<ExportedFile, SessionError> {
        let doc = self.document.as_ref().ok_or(SessionError::NoDocument)?;

        match export_annotations(&doc.bytes, self.store.iter()) {
            Ok(bytes) => {
                let name = output_file_name(&self.settings.output_prefix, &doc.name);
                log::info!("exported {name}");
                Ok(ExportedFile { name, bytes })
            }
            Err(err) => {
                log::error!("export of {} failed: {err}", doc.name);
                Err(err.into())
            }
        }
    }

    fn tool_defaults(&self) -> ToolDefaults {
        ToolDefaults { font_size: self.font_size }
    }

    fn selected_on_current_page(&self) -> Option<AnnotationId> {
        self.controller.selected().filter(|id| {
            self.store.get(*id).is_some_and(|annotation| annotation.page() == self.current_page)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::AnnotationKind;
    use crate::coords::PagePoint;
    use pdf_engine::fixtures;

    fn session() -> EditorSession {
        EditorSession::new(EditorSettings::default()).expect("default settings are valid")
    }

    fn loaded(pages: usize) -> EditorSession {
        let mut session = session();
        let sizes = vec![PageSize::LETTER; pages];
        session
            .open(FileInput::pdf("form.pdf", fixtures::blank_pdf(&sizes)))
            .expect("fixture loads");
        session
    }

    #[test]
    fn open_rejects_non_pdf_mime() {
        let mut session = session();
        let err = session
            .open(FileInput {
                name: "notes.txt".to_owned(),
                mime: "text/plain".to_owned(),
                bytes: b"hello".to_vec(),
            })
            .expect_err("must reject");

        assert!(matches!(err, SessionError::InvalidInputFile { .. }));
        assert!(!session.is_loaded());
    }

    #[test]
    fn failed_load_keeps_previous_document_and_annotations() {
        let mut session = loaded(2);
        session.set_tool(Tool::PlaceCheckmark);
        session.click(ScreenPoint::new(150.0, 150.0));
        session.next_page();

        let err = session
            .open(FileInput::pdf("broken.pdf", b"%PDF-1.4 garbage".to_vec()))
            .expect_err("must fail");

        assert!(matches!(err, SessionError::Load { .. }));
        assert_eq!(session.file_name(), Some("form.pdf"));
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.current_page(), 2);
    }

    #[test]
    fn successful_load_resets_state() {
        let mut session = loaded(3);
        session.set_tool(Tool::PlaceCheckmark);
        session.click(ScreenPoint::new(150.0, 150.0));
        session.go_to_page(3);

        session
            .open(FileInput::pdf("other.pdf", fixtures::single_page()))
            .expect("second load");

        assert_eq!(session.file_name(), Some("other.pdf"));
        assert_eq!(session.page_count(), 1);
        assert_eq!(session.current_page(), 1);
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = loaded(3);
        session.previous_page();
        assert_eq!(session.current_page(), 1);

        session.next_page();
        session.next_page();
        session.next_page();
        assert_eq!(session.current_page(), 3);

        session.go_to_page(0);
        assert_eq!(session.current_page(), 1);
        session.go_to_page(99);
        assert_eq!(session.current_page(), 3);
    }

    #[test]
    fn font_size_must_be_offered() {
        let mut session = loaded(1);
        assert!(session.set_font_size(24.0).is_ok());
        assert!(matches!(
            session.set_font_size(13.0),
            Err(SessionError::UnsupportedFontSize { size, .. }) if size == 13.0
        ));
        assert_eq!(session.font_size(), 24.0);
    }

    #[test]
    fn scale_is_validated() {
        let mut session = loaded(1);
        assert!(matches!(session.set_scale(0.0), Err(SessionError::InvalidScale(_))));
        assert_eq!(session.scale().get(), 1.5);
        session.set_scale(2.0).expect("valid");
        assert_eq!(session.scale().get(), 2.0);
    }

    #[test]
    fn clicks_create_on_the_current_page_with_current_font_size() {
        let mut session = loaded(2);
        session.next_page();
        session.set_font_size(24.0).expect("offered size");
        session.set_tool(Tool::PlaceText);

        let id = session.click(ScreenPoint::new(75.0, 93.0)).expect("created");

        let annotation = session.annotations().get(id).expect("exists");
        assert_eq!(annotation.page(), 2);
        assert_eq!(annotation.position(), PagePoint::new(50.0, 50.0));
        assert!(matches!(annotation.kind(), AnnotationKind::Text { font_size, .. } if *font_size == 24.0));
    }

    #[test]
    fn config_file_cannot_resize_placed_annotations() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "version": 1, "settings": { "checkmark_size": 30.0, "text_width": 300.0 } }"#,
        )
        .expect("write settings");
        let settings = crate::settings::load_file(&path).expect("settings load");

        let mut session = EditorSession::new(settings).expect("valid settings");
        session.open(FileInput::pdf("form.pdf", fixtures::single_page())).expect("fixture loads");
        session.set_scale(1.0).expect("valid");

        session.set_tool(Tool::PlaceCheckmark);
        let check = session.click(ScreenPoint::new(100.0, 100.0)).expect("created");
        let check = session.annotations().get(check).expect("exists");
        assert_eq!(check.position(), PagePoint::new(90.0, 90.0));
        assert_eq!(check.kind(), &AnnotationKind::Checkmark { size: 20.0 });

        session.set_tool(Tool::PlaceText);
        let text = session.click(ScreenPoint::new(300.0, 300.0)).expect("created");
        let text = session.annotations().get(text).expect("exists");
        assert!(matches!(text.kind(), AnnotationKind::Text { width, .. } if *width == 100.0));
    }

    #[test]
    fn clicking_an_annotation_selects_instead_of_creating() {
        let mut session = loaded(1);
        session.set_tool(Tool::PlaceCheckmark);
        let id = session.click(ScreenPoint::new(150.0, 150.0)).expect("created");

        assert_eq!(session.click(ScreenPoint::new(150.0, 150.0)), None);
        assert_eq!(session.annotations().len(), 1);
        assert_eq!(session.selected(), Some(id));
    }

    #[test]
    fn drag_then_resize_through_pointer_events() {
        let mut session = loaded(1);
        session.set_scale(1.0).expect("valid");
        session.set_tool(Tool::PlaceText);
        let id = session.click(ScreenPoint::new(100.0, 106.0)).expect("created");
        session.input_text("Drag me");
        session.set_tool(Tool::Select);

        session.pointer_down(ScreenPoint::new(110.0, 105.0));
        session.pointer_move(ScreenPoint::new(130.0, 125.0));
        session.pointer_up();
        assert_eq!(session.annotations().get(id).expect("exists").position(), PagePoint::new(120.0, 120.0));

        // right handle sits halfway down the right edge
        session.pointer_down(ScreenPoint::new(220.0, 127.2));
        session.pointer_move(ScreenPoint::new(250.0, 127.2));
        session.pointer_up();
        assert!(matches!(
            session.annotations().get(id).expect("exists").kind(),
            AnnotationKind::Text { width, .. } if (*width - 130.0).abs() < 1e-3
        ));
    }

    #[test]
    fn delete_control_removes_the_selected_annotation() {
        let mut session = loaded(1);
        session.set_scale(1.0).expect("valid");
        session.set_tool(Tool::PlaceText);
        session.click(ScreenPoint::new(100.0, 106.0)).expect("created");
        session.input_text("bye");

        session.click(ScreenPoint::new(200.0, 100.0));

        assert!(session.annotations().is_empty());
        assert_eq!(session.selected(), None);
    }

    #[test]
    fn delete_selected_without_selection_is_a_no_op() {
        let mut session = loaded(1);
        assert!(!session.delete_selected());
    }

    #[test]
    fn changing_page_blurs_empty_text() {
        let mut session = loaded(2);
        session.set_tool(Tool::PlaceText);
        session.click(ScreenPoint::new(100.0, 100.0)).expect("created");

        session.next_page();

        assert!(session.annotations().is_empty());
    }

    #[test]
    fn render_has_scaled_page_dimensions() {
        let session = loaded(1);
        let image = session.render_current_page().expect("render");
        assert_eq!(image.dimensions(), (918, 1188));
    }

    #[test]
    fn render_without_document_fails() {
        assert!(matches!(session().render_current_page(), Err(SessionError::NoDocument)));
    }

    #[test]
    fn export_names_file_and_keeps_store() {
        let mut session = loaded(1);
        session.set_tool(Tool::PlaceCheckmark);
        session.click(ScreenPoint::new(150.0, 150.0));

        let exported = session.export().expect("export");

        assert_eq!(exported.name, "edited_form.pdf");
        assert!(exported.bytes.starts_with(b"%PDF"));
        assert_eq!(session.annotations().len(), 1);

        let again = session.export().expect("second export");
        assert_eq!(again.name, exported.name);
    }

    #[test]
    fn export_without_document_fails() {
        assert!(matches!(session().export(), Err(SessionError::NoDocument)));
    }
}
