//! Annotation data model and the session-wide annotation store
//!
//! All positions are stored in page space (points, top-left origin, y down).
//! Records keep their creation order; that order is also the export order.

use crate::coords::{PagePoint, PageRect};
use pdf_engine::text::wrap_text;
use pdf_engine::StandardFont;

/// Unique identifier for an annotation
///
/// Assigned once at creation and never reused within a session.
pub type AnnotationId = uuid::Uuid;

/// Narrowest a text box may become, in points.
pub const MIN_TEXT_WIDTH: f32 = 20.0;

/// Width given to a freshly placed text box, in points.
pub const DEFAULT_TEXT_WIDTH: f32 = 100.0;

/// Side length of the checkmark glyph, in points.
pub const CHECKMARK_SIZE: f32 = 20.0;

/// Baseline-to-baseline distance as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// The glyph drawn for every checkmark.
pub const CHECK_GLYPH: &str = "\u{2713}";

/// RGBA color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Convert to normalized RGB values (0.0 to 1.0)
    pub fn to_normalized(&self) -> (f32, f32, f32) {
        (self.r as f32 / 255.0, self.g as f32 / 255.0, self.b as f32 / 255.0)
    }
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    /// Checkmark fill; exported as `rgb(0, 0.5, 0)`.
    pub const DARK_GREEN: Color = Color::rgb(0, 128, 0);
    pub const SELECTION_BLUE: Color = Color::rgb(59, 130, 246);
}

/// Which kind of annotation a placement creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationVariant {
    Text,
    Checkmark,
}

/// Variant-specific payload of an annotation
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationKind {
    /// Free text wrapped to `width`
    Text { content: String, font_size: f32, width: f32 },

    /// The fixed check glyph
    Checkmark { size: f32 },
}

/// Defaults applied when an annotation is placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolDefaults {
    /// Current global font size for new text boxes
    pub font_size: f32,
}

impl Default for ToolDefaults {
    fn default() -> Self {
        Self { font_size: 12.0 }
    }
}

/// A user-placed overlay on one page
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    id: AnnotationId,

    /// 1-based page number, fixed at creation
    page: u32,

    /// Top-left corner in page space
    position: PagePoint,

    kind: AnnotationKind,
}

impl Annotation {
    pub fn id(&self) -> AnnotationId {
        self.id
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn position(&self) -> PagePoint {
        self.position
    }

    pub fn kind(&self) -> &AnnotationKind {
        &self.kind
    }

    pub fn variant(&self) -> AnnotationVariant {
        match self.kind {
            AnnotationKind::Text { .. } => AnnotationVariant::Text,
            AnnotationKind::Checkmark { .. } => AnnotationVariant::Checkmark,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, AnnotationKind::Text { .. })
    }

    /// Height used when anchoring the element on a baseline.
    pub fn element_height(&self) -> f32 {
        match self.kind {
            AnnotationKind::Text { font_size, .. } => font_size,
            AnnotationKind::Checkmark { size } => size,
        }
    }

    /// Wrapped lines of a text annotation; empty for checkmarks.
    pub fn lines(&self) -> Vec<String> {
        match &self.kind {
            AnnotationKind::Text { content, font_size, width } => {
                wrap_text(StandardFont::Helvetica, content, *font_size, *width)
            }
            AnnotationKind::Checkmark { .. } => Vec::new(),
        }
    }

    /// Occupied area in page space.
    ///
    /// Text boxes are as tall as their wrapped lines (at least one line).
    pub fn bounds(&self) -> PageRect {
        let (width, height) = match &self.kind {
            AnnotationKind::Text { font_size, width, .. } => {
                let lines = self.lines().len().max(1) as f32;
                (*width, lines * font_size * LINE_HEIGHT_FACTOR)
            }
            AnnotationKind::Checkmark { size } => (*size, *size),
        };
        PageRect { x: self.position.x, y: self.position.y, width, height }
    }

    /// True when a text annotation holds nothing but whitespace.
    pub fn is_blank_text(&self) -> bool {
        match &self.kind {
            AnnotationKind::Text { content, .. } => content.trim().is_empty(),
            AnnotationKind::Checkmark { .. } => false,
        }
    }
}

/// Partial update merged into an existing annotation
///
/// Fields that do not apply to the target's variant are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub content: Option<String>,
    pub width: Option<f32>,
    pub font_size: Option<f32>,
}

impl AnnotationPatch {
    pub fn position(point: PagePoint) -> Self {
        Self { x: Some(point.x), y: Some(point.y), ..Self::default() }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn width(width: f32) -> Self {
        Self { width: Some(width), ..Self::default() }
    }

    pub fn with_x(mut self, x: f32) -> Self {
        self.x = Some(x);
        self
    }

    fn apply(self, annotation: &mut Annotation) {
        if let Some(x) = self.x {
            annotation.position.x = x;
        }
        if let Some(y) = self.y {
            annotation.position.y = y;
        }

        match &mut annotation.kind {
            AnnotationKind::Text { content, font_size, width } => {
                if let Some(new_content) = self.content {
                    *content = new_content;
                }
                if let Some(new_size) = self.font_size.filter(|size| *size > 0.0) {
                    *font_size = new_size;
                }
                if let Some(new_width) = self.width {
                    *width = new_width.max(MIN_TEXT_WIDTH);
                }
            }
            AnnotationKind::Checkmark { .. } => {}
        }
    }
}

/// Ordered collection of every annotation in the session
///
/// All operations are total: unknown ids are ignored rather than reported.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a new annotation with its click point as reference.
    ///
    /// Text is shifted up by half the font size so the click lands near the
    /// middle of the first line; a checkmark is centred on the click.
    pub fn add(
        &mut self,
        page: u32,
        click: PagePoint,
        variant: AnnotationVariant,
        defaults: &ToolDefaults,
    ) -> AnnotationId {
        let (position, kind) = match variant {
            AnnotationVariant::Text => (
                click.offset(0.0, -defaults.font_size / 2.0),
                AnnotationKind::Text {
                    content: String::new(),
                    font_size: defaults.font_size,
                    width: DEFAULT_TEXT_WIDTH,
                },
            ),
            AnnotationVariant::Checkmark => {
                let half = CHECKMARK_SIZE / 2.0;
                (click.offset(-half, -half), AnnotationKind::Checkmark { size: CHECKMARK_SIZE })
            }
        };

        let id = AnnotationId::new_v4();
        self.annotations.push(Annotation { id, page, position, kind });
        log::debug!("added {variant:?} annotation {id} on page {page} at {position:?}");
        id
    }

    pub fn update(&mut self, id: AnnotationId, patch: AnnotationPatch) {
        if let Some(annotation) = self.get_mut(id) {
            patch.apply(annotation);
        }
    }

    pub fn delete(&mut self, id: AnnotationId) -> Option<Annotation> {
        let index = self.annotations.iter().position(|annotation| annotation.id == id)?;
        log::debug!("deleted annotation {id}");
        Some(self.annotations.remove(index))
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|annotation| annotation.id == id)
    }

    fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|annotation| annotation.id == id)
    }

    /// Annotations on `page` in creation order.
    pub fn list_for_page(&self, page: u32) -> Vec<&Annotation> {
        self.annotations.iter().filter(|annotation| annotation.page == page).collect()
    }

    /// Every annotation in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }

    /// Topmost annotation on `page` whose bounds contain `point`.
    ///
    /// Later annotations are drawn above earlier ones, so the search runs
    /// from the most recently created.
    pub fn hit_test(&self, page: u32, point: PagePoint) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .filter(|annotation| annotation.page == page)
            .find(|annotation| annotation.bounds().contains(point))
            .map(Annotation::id)
    }
}
