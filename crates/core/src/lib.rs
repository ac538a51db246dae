//! PDF Annotator Core Library
//!
//! Coordinate model, annotation store and interaction state machine for the
//! annotator, plus overlay composition and flattening export.

pub mod annotation;
pub mod coords;
pub mod export;
pub mod interaction;
pub mod overlay;
pub mod session;
pub mod settings;

pub use annotation::{
    Annotation, AnnotationId, AnnotationKind, AnnotationPatch, AnnotationStore, AnnotationVariant,
    Color, ToolDefaults,
};
pub use coords::{InvalidScale, PagePoint, PdfPoint, Scale, ScreenPoint};
pub use export::{export_annotations, output_file_name, ExportError};
pub use interaction::{
    generate_handles, DragKind, DragSession, HandleType, InteractionController, ManipulationHandle,
    Tool,
};
pub use overlay::{build_overlay, compose_overlay, Overlay, OverlayItem, OverlayShape, ScreenRect};
pub use session::{EditorSession, ExportedFile, FileInput, PointerTarget, SessionError, PDF_MIME};
pub use settings::{EditorSettings, SettingsError, SettingsStore};
