//! Code-selection context and streamed fragment reconciliation.
//!
//! A selection made in the code viewer is measured ([`selection::geometry`]),
//! captured ([`selection::capture`]) and attached ([`selection::attachment`]).
//! On submit the [`app::App`] controller injects the attached code into the
//! outgoing messages and starts a generation through [`app::HostOps`]. The
//! generation streams cumulative snapshots that [`chat::reconcile`] folds into
//! the [`chat::MessageHistory`], one assistant message per generation.
//!
//! ## Provider bootstrap
//!
//! - `FRAGMENTS_PROVIDER=mock` (default) streams a scripted fragment locally.
//! - `FRAGMENTS_PROVIDER=http` talks to a fragments web backend at
//!   `FRAGMENTS_API_BASE_URL` (default `http://localhost:3000`).
//!
//! The remaining `FRAGMENTS_*` variables are listed on [`config::EnvConfig`].

pub mod app;
pub mod chat;
pub mod config;
pub mod logging;
pub mod models;
pub mod persist;
pub mod providers;
pub mod runtime;
pub mod selection;
pub mod viewer;

pub use crate::app::{App, HostOps, Mode, RunId, Session, Tab};
pub use crate::chat::{ContentPart, Message, MessageHistory, MessagePatch, Role};
pub use crate::config::EnvConfig;
pub use crate::runtime::{GenerationRuntime, RuntimeEvent};
pub use crate::selection::{
    AttachedContext, AttachmentPhase, AttachmentState, CapturedSelection, InteractionMode,
    SelectionCapture, TextContainer,
};
pub use crate::viewer::StaticViewer;
