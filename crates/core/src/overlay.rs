//! On-screen overlay: annotations of one page laid out in screen space and
//! composed onto the page raster.
//!
//! Without a glyph rasteriser, text lines are drawn as filled bars matching
//! their measured width; checkmarks as a two-stroke tick.

use crate::annotation::{AnnotationId, AnnotationKind, AnnotationStore, Color, LINE_HEIGHT_FACTOR};
use crate::coords::{page_to_screen, PagePoint, Scale};
use crate::interaction::{generate_handles, HandleType, InteractionController};
use image::Rgba;
use pdf_engine::text::text_width;
use pdf_engine::{RgbaImage, StandardFont};

const HANDLE_SIZE: f32 = 8.0;
const DASH: u32 = 4;
const TEXT_INK: Color = Color::rgb(40, 40, 40);
const PLACEHOLDER_INK: Color = Color::rgb(200, 200, 200);
const DELETE_RED: Color = Color::rgb(220, 38, 38);

/// Axis-aligned rectangle in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    /// One rect per wrapped line, sized to the measured text
    Text { lines: Vec<ScreenRect>, empty: bool },
    Checkmark,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub annotation_id: AnnotationId,
    pub bounds: ScreenRect,
    pub shape: OverlayShape,
    pub selected: bool,
    pub editing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayHandle {
    pub handle_type: HandleType,
    pub bounds: ScreenRect,
}

/// Everything drawn above the page raster.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub items: Vec<OverlayItem>,
    pub handles: Vec<OverlayHandle>,
}

/// Lays out the annotations of `page` at `scale`, in creation order.
pub fn build_overlay(
    store: &AnnotationStore,
    controller: &InteractionController,
    page: u32,
    scale: Scale,
) -> Overlay {
    let s = scale.get();
    let mut overlay = Overlay::default();

    for annotation in store.list_for_page(page) {
        let page_bounds = annotation.bounds();
        let origin = page_to_screen(PagePoint::new(page_bounds.x, page_bounds.y), scale);
        let bounds = ScreenRect {
            x: origin.x,
            y: origin.y,
            width: page_bounds.width * s,
            height: page_bounds.height * s,
        };

        let shape = match annotation.kind() {
            AnnotationKind::Text { font_size, content, .. } => {
                let line_height = font_size * LINE_HEIGHT_FACTOR * s;
                let lines = annotation
                    .lines()
                    .iter()
                    .enumerate()
                    .filter(|(_, line)| !line.is_empty())
                    .map(|(index, line)| ScreenRect {
                        x: origin.x,
                        y: origin.y + index as f32 * line_height,
                        width: text_width(StandardFont::Helvetica, line, *font_size)
                            .min(page_bounds.width)
                            * s,
                        height: font_size * s,
                    })
                    .collect();
                OverlayShape::Text { lines, empty: content.is_empty() }
            }
            AnnotationKind::Checkmark { .. } => OverlayShape::Checkmark,
        };

        overlay.items.push(OverlayItem {
            annotation_id: annotation.id(),
            bounds,
            shape,
            selected: controller.selected() == Some(annotation.id()),
            editing: controller.editing() == Some(annotation.id()),
        });
    }

    let selected_here = controller
        .selected()
        .filter(|id| store.get(*id).is_some_and(|annotation| annotation.page() == page));
    if let Some(id) = selected_here {
        let half = HANDLE_SIZE / 2.0;
        overlay.handles = generate_handles(store, id, scale)
            .into_iter()
            .map(|handle| OverlayHandle {
                handle_type: handle.handle_type,
                bounds: ScreenRect {
                    x: handle.position.x - half,
                    y: handle.position.y - half,
                    width: HANDLE_SIZE,
                    height: HANDLE_SIZE,
                },
            })
            .collect();
    }

    overlay
}

/// Draws `overlay` onto `image` in place.
pub fn compose_overlay(image: &mut RgbaImage, overlay: &Overlay) {
    for item in &overlay.items {
        match &item.shape {
            OverlayShape::Text { lines, empty } => {
                if *empty {
                    outline(image, item.bounds, PLACEHOLDER_INK, 1);
                }
                for line in lines {
                    fill(image, *line, TEXT_INK);
                }
            }
            OverlayShape::Checkmark => tick(image, item.bounds, Color::DARK_GREEN),
        }

        if item.selected || item.editing {
            outline(image, inflate(item.bounds, 2.0), Color::SELECTION_BLUE, DASH);
        }
    }

    for handle in &overlay.handles {
        let color = match handle.handle_type {
            HandleType::Delete => DELETE_RED,
            HandleType::ResizeLeft | HandleType::ResizeRight => Color::SELECTION_BLUE,
        };
        fill(image, handle.bounds, color);
    }
}

fn inflate(rect: ScreenRect, by: f32) -> ScreenRect {
    ScreenRect {
        x: rect.x - by,
        y: rect.y - by,
        width: rect.width + 2.0 * by,
        height: rect.height + 2.0 * by,
    }
}

fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, color.a])
}

fn put(image: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

fn fill(image: &mut RgbaImage, rect: ScreenRect, color: Color) {
    let color = rgba(color);
    let (x0, y0) = (rect.x.round() as i64, rect.y.round() as i64);
    let (x1, y1) = ((rect.x + rect.width).round() as i64, (rect.y + rect.height).round() as i64);
    for y in y0..y1 {
        for x in x0..x1 {
            put(image, x, y, color);
        }
    }
}

/// Rectangle outline; `dash` > 1 skips every other run of that many pixels.
fn outline(image: &mut RgbaImage, rect: ScreenRect, color: Color, dash: u32) {
    let color = rgba(color);
    let (x0, y0) = (rect.x.round() as i64, rect.y.round() as i64);
    let (x1, y1) = ((rect.x + rect.width).round() as i64, (rect.y + rect.height).round() as i64);
    let on = |step: i64| dash <= 1 || (step / dash as i64) % 2 == 0;

    for x in x0..=x1 {
        if on(x - x0) {
            put(image, x, y0, color);
            put(image, x, y1, color);
        }
    }
    for y in y0..=y1 {
        if on(y - y0) {
            put(image, x0, y, color);
            put(image, x1, y, color);
        }
    }
}

fn tick(image: &mut RgbaImage, rect: ScreenRect, color: Color) {
    let at = |fx: f32, fy: f32| (rect.x + rect.width * fx, rect.y + rect.height * fy);
    let thickness = (rect.width / 10.0).max(1.0);
    line(image, at(0.15, 0.55), at(0.4, 0.8), thickness, color);
    line(image, at(0.4, 0.8), at(0.85, 0.2), thickness, color);
}

fn line(image: &mut RgbaImage, from: (f32, f32), to: (f32, f32), thickness: f32, color: Color) {
    let color = rgba(color);
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i64;
    let radius = (thickness / 2.0).round() as i64;

    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let (cx, cy) = ((from.0 + dx * t).round() as i64, (from.1 + dy * t).round() as i64);
        for oy in -radius..=radius {
            for ox in -radius..=radius {
                put(image, cx + ox, cy + oy, color);
            }
        }
    }
}
