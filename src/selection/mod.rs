//! Capturing code selections from the viewer and holding the attached context.
//!
//! Data flows leaf first: [`geometry`] measures a range, [`capture`] applies the
//! gesture guards and builds a [`CapturedSelection`], and [`attachment`] decides
//! whether it becomes pending or attached.

pub mod attachment;
pub mod capture;
pub mod geometry;

pub use attachment::{
    AttachedContext, AttachmentPhase, AttachmentState, IngestOutcome, MenuPosition,
    DEFAULT_MAX_SELECTION_CHARS, FALLBACK_MENU_POSITION,
};
pub use capture::{
    CaptureOutcome, CapturedSelection, InteractionMode, NativeSelection, SelectionCapture,
    SelectionSource, ViewerEvent,
};
pub use geometry::{resolve, AnchorRect, NodeId, ResolvedGeometry, SelectionRange, TextContainer};
