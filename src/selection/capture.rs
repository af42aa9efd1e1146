use generation_provider::SelectionMeta;

use super::geometry::{resolve, AnchorRect, NodeId, SelectionRange, TextContainer};

/// Snapshot of the platform's native text selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSelection {
    pub anchor_node: Option<NodeId>,
    pub focus_node: Option<NodeId>,
    /// First range of the selection; `None` when the selection holds no range.
    pub range: Option<SelectionRange>,
    /// Selected text as the platform renders it.
    pub text: String,
}

/// Access to the platform's native selection.
pub trait SelectionSource {
    fn current_selection(&self) -> Option<NativeSelection>;
    fn clear_selection(&mut self);
}

/// A selection captured from the viewer. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedSelection {
    /// Trimmed, non-empty selected text.
    pub code: String,
    pub meta: Option<SelectionMeta>,
    pub anchor_rect: Option<AnchorRect>,
}

/// Which gestures capture a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractionMode {
    /// Any release gesture captures.
    #[default]
    Auto,
    /// Only the context-menu gesture captures, replacing the platform menu.
    Menu,
}

/// Gesture delivered by the viewer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerEvent {
    PointerUp,
    KeyUp,
    TouchEnd,
    ContextMenu { x: f64, y: f64 },
}

impl ViewerEvent {
    fn is_release(&self) -> bool {
        matches!(self, Self::PointerUp | Self::KeyUp | Self::TouchEnd)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureOutcome {
    pub selection: Option<CapturedSelection>,
    /// The platform context menu must be suppressed for this gesture.
    pub prevent_default: bool,
}

/// Turns viewer gestures into captured selections.
#[derive(Debug, Clone, Default)]
pub struct SelectionCapture {
    mode: InteractionMode,
    observed_clear_signal: u64,
}

impl SelectionCapture {
    #[must_use]
    pub fn new(mode: InteractionMode) -> Self {
        Self {
            mode,
            observed_clear_signal: 0,
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: InteractionMode) {
        self.mode = mode;
    }

    pub fn handle_event(
        &self,
        event: ViewerEvent,
        container: &dyn TextContainer,
        source: &dyn SelectionSource,
    ) -> CaptureOutcome {
        let menu_point = match (self.mode, event) {
            (InteractionMode::Auto, event) if event.is_release() => None,
            (InteractionMode::Menu, ViewerEvent::ContextMenu { x, y }) => Some((x, y)),
            _ => return CaptureOutcome::default(),
        };

        let Some(selection) = source.current_selection() else {
            return CaptureOutcome::default();
        };

        let inside = |node: Option<NodeId>| node.is_some_and(|node| container.contains(node));
        if !inside(selection.anchor_node) || !inside(selection.focus_node) {
            return CaptureOutcome::default();
        }

        let Some(range) = selection.range.filter(|range| !range.is_collapsed()) else {
            return CaptureOutcome::default();
        };

        let prevent_default = menu_point.is_some();

        let trimmed = selection.text.trim();
        if trimmed.is_empty() {
            return CaptureOutcome {
                selection: None,
                prevent_default,
            };
        }

        let geometry = resolve(container, &range);
        let anchor_rect = match menu_point {
            Some((x, y)) => Some(AnchorRect::at_point(x, y)),
            None => geometry.rect,
        };

        tracing::debug!(
            chars = trimmed.chars().count(),
            mode = ?self.mode,
            "captured viewer selection"
        );

        CaptureOutcome {
            selection: Some(CapturedSelection {
                code: trimmed.to_string(),
                meta: (!geometry.meta.is_empty()).then_some(geometry.meta),
                anchor_rect,
            }),
            prevent_default,
        }
    }

    /// Clears the native selection when `signal` is nonzero and has changed
    /// since the last call. Returns whether the selection was cleared.
    pub fn sync_clear_signal(&mut self, signal: u64, source: &mut dyn SelectionSource) -> bool {
        if signal == 0 || signal == self.observed_clear_signal {
            return false;
        }

        self.observed_clear_signal = signal;
        source.clear_selection();
        true
    }
}
