//! Pointer interaction: tools, selection, drag/resize captures and text editing
//!
//! The controller owns all transient interaction state. Persistent changes go
//! through the [`AnnotationStore`] update entry points, so width clamping and
//! variant checks apply to drags exactly as they do to any other mutation.

use crate::annotation::{
    AnnotationId, AnnotationKind, AnnotationPatch, AnnotationStore, AnnotationVariant,
    ToolDefaults,
};
use crate::coords::{
    page_to_screen, screen_delta_to_page, screen_to_page, PagePoint, Scale, ScreenPoint,
};
use serde::{Deserialize, Serialize};

/// Hit radius of handles, in screen pixels.
pub const HANDLE_HIT_RADIUS: f32 = 6.0;

/// Active creation/interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Pick, drag and resize existing annotations; never creates
    #[default]
    Select,
    #[serde(alias = "text")]
    PlaceText,
    #[serde(alias = "checkmark")]
    PlaceCheckmark,
}

impl Tool {
    /// Variant created by a canvas click with this tool.
    pub fn placement(self) -> Option<AnnotationVariant> {
        match self {
            Tool::Select => None,
            Tool::PlaceText => Some(AnnotationVariant::Text),
            Tool::PlaceCheckmark => Some(AnnotationVariant::Checkmark),
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::PlaceText => "Text",
            Tool::PlaceCheckmark => "Checkmark",
        }
    }
}

/// Type of manipulation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    /// Left edge of a text box: moves x and width together
    ResizeLeft,
    /// Right edge of a text box: changes width only
    ResizeRight,
    /// Delete control at the top-right corner
    Delete,
}

/// Manipulation handle with position and type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManipulationHandle {
    pub handle_type: HandleType,

    /// Centre of the handle in screen coordinates
    pub position: ScreenPoint,

    pub annotation_id: AnnotationId,
}

impl ManipulationHandle {
    /// Check if a point hits this handle
    pub fn hit_test(&self, point: ScreenPoint) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        (dx * dx + dy * dy).sqrt() <= HANDLE_HIT_RADIUS
    }
}

/// Handles shown for a selected annotation
///
/// Every annotation gets a delete control; text boxes additionally get
/// left/right resize handles halfway down their edges.
pub fn generate_handles(
    store: &AnnotationStore,
    id: AnnotationId,
    scale: Scale,
) -> Vec<ManipulationHandle> {
    let Some(annotation) = store.get(id) else {
        return Vec::new();
    };
    let bounds = annotation.bounds();
    let at = |x: f32, y: f32| page_to_screen(PagePoint::new(x, y), scale);
    let handle = |handle_type, position| ManipulationHandle {
        handle_type,
        position,
        annotation_id: id,
    };

    let mut handles = Vec::with_capacity(3);
    if annotation.is_text() {
        let middle = bounds.y + bounds.height / 2.0;
        handles.push(handle(HandleType::ResizeLeft, at(bounds.x, middle)));
        handles.push(handle(HandleType::ResizeRight, at(bounds.x + bounds.width, middle)));
    }
    handles.push(handle(HandleType::Delete, at(bounds.x + bounds.width, bounds.y)));
    handles
}

/// What an active drag capture changes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeLeft,
    ResizeRight,
}

/// Active drag capture
///
/// Exists from pointer-down until pointer-up; every move is computed from the
/// values recorded at capture start, so intermediate updates never accumulate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub annotation_id: AnnotationId,
    pub kind: DragKind,
    pub pointer_start: ScreenPoint,
    pub initial_position: PagePoint,
    pub initial_width: f32,
}

impl DragSession {
    /// Update to apply for the pointer now at `pointer`.
    pub fn patch_for(&self, pointer: ScreenPoint, scale: Scale) -> AnnotationPatch {
        let (dx, dy) = screen_delta_to_page(self.pointer_start, pointer, scale);
        match self.kind {
            DragKind::Move => AnnotationPatch::position(self.initial_position.offset(dx, dy)),
            DragKind::ResizeRight => AnnotationPatch::width(self.initial_width + dx),
            DragKind::ResizeLeft => AnnotationPatch::width(self.initial_width - dx)
                .with_x(self.initial_position.x + dx),
        }
    }
}

/// Interprets pointer and keyboard events against the current tool
#[derive(Debug, Default)]
pub struct InteractionController {
    tool: Tool,
    selected: Option<AnnotationId>,
    editing: Option<AnnotationId>,
    drag: Option<DragSession>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn editing(&self) -> Option<AnnotationId> {
        self.editing
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Switch tools. An open text edit loses focus first.
    pub fn set_tool(&mut self, store: &mut AnnotationStore, tool: Tool) {
        if tool != self.tool {
            self.blur(store);
            log::debug!("tool changed to {}", tool.display_name());
        }
        self.tool = tool;
    }

    /// Drop all transient state, e.g. when a new document is loaded.
    pub fn reset(&mut self) {
        self.selected = None;
        self.editing = None;
        self.drag = None;
    }

    /// Click on the page background (not on an annotation).
    ///
    /// With a placing tool this creates an annotation at the click and
    /// returns its id. New text is selected and opened for editing; a new
    /// checkmark leaves nothing selected. With the select tool the click only
    /// clears the selection.
    pub fn canvas_click(
        &mut self,
        store: &mut AnnotationStore,
        page: u32,
        pointer: ScreenPoint,
        scale: Scale,
        defaults: &ToolDefaults,
    ) -> Option<AnnotationId> {
        let Some(variant) = self.tool.placement() else {
            self.select(store, None);
            return None;
        };

        self.select(store, None);
        let id = store.add(page, screen_to_page(pointer, scale), variant, defaults);
        if variant == AnnotationVariant::Text {
            self.selected = Some(id);
            self.editing = Some(id);
        }
        Some(id)
    }

    /// Pointer pressed on an annotation's body.
    ///
    /// Always selects it; with the select tool a move capture starts too.
    pub fn pointer_down_on_annotation(
        &mut self,
        store: &mut AnnotationStore,
        id: AnnotationId,
        pointer: ScreenPoint,
    ) {
        let Some(position) = store.get(id).map(|annotation| annotation.position()) else {
            return;
        };

        self.select(store, Some(id));
        if self.tool != Tool::Select {
            return;
        }

        self.drag = Some(DragSession {
            annotation_id: id,
            kind: DragKind::Move,
            pointer_start: pointer,
            initial_position: position,
            initial_width: 0.0,
        });
    }

    /// Pointer pressed on a resize handle of a text annotation.
    pub fn pointer_down_on_handle(
        &mut self,
        store: &AnnotationStore,
        id: AnnotationId,
        handle: HandleType,
        pointer: ScreenPoint,
    ) {
        let kind = match handle {
            HandleType::ResizeLeft => DragKind::ResizeLeft,
            HandleType::ResizeRight => DragKind::ResizeRight,
            HandleType::Delete => return,
        };
        let Some(annotation) = store.get(id) else {
            return;
        };
        let AnnotationKind::Text { width, .. } = annotation.kind() else {
            return;
        };

        self.drag = Some(DragSession {
            annotation_id: id,
            kind,
            pointer_start: pointer,
            initial_position: annotation.position(),
            initial_width: *width,
        });
    }

    /// Pointer moved; applies the active capture, if any.
    pub fn pointer_move(&mut self, store: &mut AnnotationStore, pointer: ScreenPoint, scale: Scale) {
        if let Some(drag) = self.drag {
            store.update(drag.annotation_id, drag.patch_for(pointer, scale));
        }
    }

    /// Pointer released; ends any capture.
    pub fn pointer_up(&mut self) {
        self.drag = None;
    }

    /// Double-click on an annotation. Text annotations open for editing.
    pub fn double_click(&mut self, store: &mut AnnotationStore, id: AnnotationId) -> bool {
        let is_text = store.get(id).is_some_and(|annotation| annotation.is_text());
        if !is_text {
            return false;
        }
        self.select(store, Some(id));
        self.editing = Some(id);
        true
    }

    /// Replace the content of the annotation being edited.
    pub fn input_text(&mut self, store: &mut AnnotationStore, text: &str) {
        if let Some(id) = self.editing {
            store.update(id, AnnotationPatch::content(text));
        }
    }

    /// The text input lost focus. Leaves edit mode and discards the
    /// annotation when its content is blank.
    pub fn blur(&mut self, store: &mut AnnotationStore) {
        let Some(id) = self.editing.take() else {
            return;
        };

        if store.get(id).is_some_and(|annotation| annotation.is_blank_text()) {
            log::debug!("discarding blank text annotation {id}");
            self.delete(store, id);
        }
    }

    /// Delete control activated.
    pub fn delete(&mut self, store: &mut AnnotationStore, id: AnnotationId) {
        store.delete(id);
        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        if self.drag.is_some_and(|drag| drag.annotation_id == id) {
            self.drag = None;
        }
    }

    fn select(&mut self, store: &mut AnnotationStore, id: Option<AnnotationId>) {
        if self.editing.is_some() && self.editing != id {
            self.blur(store);
        }
        self.selected = id.filter(|id| store.get(*id).is_some());
    }
}
