//! Coordinate spaces and the conversions between them
//!
//! Three spaces are in play:
//! - screen space: pixels on the rendered page, page space × scale
//! - page space: points from the page's top-left corner, y grows downward
//! - PDF space: points from the page's bottom-left corner, y grows upward
//!
//! Annotations are stored in page space. Screen space only exists while the
//! page is displayed; PDF space only at export.

use serde::{Deserialize, Serialize};

/// Pixel position on the rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position in page space (points, top-left origin, y down).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PagePoint {
    pub x: f32,
    pub y: f32,
}

impl PagePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }
}

/// Position in PDF space (points, bottom-left origin, y up).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfPoint {
    pub x: f32,
    pub y: f32,
}

/// Axis-aligned rectangle in page space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PageRect {
    pub fn contains(&self, point: PagePoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Zoom factor between page space and screen space.
///
/// Always positive and finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Scale(f32);

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("invalid scale {0}: must be a positive finite number")]
pub struct InvalidScale(pub f32);

impl Scale {
    pub const ONE: Scale = Scale(1.0);

    pub fn new(value: f32) -> Result<Self, InvalidScale> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(InvalidScale(value))
        }
    }

    pub fn get(self) -> f32 {
        self.0
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::ONE
    }
}

impl TryFrom<f32> for Scale {
    type Error = InvalidScale;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Scale::new(value)
    }
}

pub fn screen_to_page(point: ScreenPoint, scale: Scale) -> PagePoint {
    PagePoint { x: point.x / scale.0, y: point.y / scale.0 }
}

pub fn page_to_screen(point: PagePoint, scale: Scale) -> ScreenPoint {
    ScreenPoint { x: point.x * scale.0, y: point.y * scale.0 }
}

/// Converts a pointer movement in pixels into the matching page-space delta.
pub fn screen_delta_to_page(from: ScreenPoint, to: ScreenPoint, scale: Scale) -> (f32, f32) {
    ((to.x - from.x) / scale.0, (to.y - from.y) / scale.0)
}

/// Maps a page-space top-left corner to the PDF-space drawing origin.
///
/// Text and glyphs are anchored on their baseline, so the element's own
/// height is subtracted to keep its visual top edge where it was on screen.
pub fn page_to_pdf(point: PagePoint, page_height: f32, element_height: f32) -> PdfPoint {
    PdfPoint { x: point.x, y: page_height - point.y - element_height }
}

/// Inverse of [`page_to_pdf`] for the same page and element heights.
pub fn pdf_to_page(point: PdfPoint, page_height: f32, element_height: f32) -> PagePoint {
    PagePoint { x: point.x, y: page_height - point.y - element_height }
}
