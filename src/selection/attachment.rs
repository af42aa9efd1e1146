use generation_provider::SelectionMeta;

use super::capture::CapturedSelection;

pub const DEFAULT_MAX_SELECTION_CHARS: usize = 12_000;

/// Vertical gap between a selection's rectangle and its confirmation menu.
const MENU_OFFSET_Y: f64 = 8.0;

/// Where the confirmation menu opens when the selection carries no rectangle.
pub const FALLBACK_MENU_POSITION: MenuPosition = MenuPosition {
    left: 24.0,
    top: 120.0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuPosition {
    pub left: f64,
    pub top: f64,
}

/// Selection promoted to context for the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedContext {
    pub code: String,
    pub meta: Option<SelectionMeta>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPhase {
    Empty,
    Pending,
    Attached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Attached,
    Pending,
    Rejected,
    Ignored,
}

/// Single-slot attachment state with a pending proposal and an error overlay.
#[derive(Debug, Clone)]
pub struct AttachmentState {
    max_len: usize,
    auto_attach: bool,
    attached: Option<AttachedContext>,
    pending: Option<CapturedSelection>,
    menu_position: Option<MenuPosition>,
    error: Option<String>,
    clear_signal: u64,
}

impl Default for AttachmentState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SELECTION_CHARS, false)
    }
}

impl AttachmentState {
    #[must_use]
    pub fn new(max_len: usize, auto_attach: bool) -> Self {
        Self {
            max_len,
            auto_attach,
            attached: None,
            pending: None,
            menu_position: None,
            error: None,
            clear_signal: 0,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn auto_attach(&self) -> bool {
        self.auto_attach
    }

    pub fn set_auto_attach(&mut self, enabled: bool) {
        self.auto_attach = enabled;
    }

    pub fn attached(&self) -> Option<&AttachedContext> {
        self.attached.as_ref()
    }

    pub fn pending(&self) -> Option<&CapturedSelection> {
        self.pending.as_ref()
    }

    pub fn menu_position(&self) -> Option<MenuPosition> {
        self.menu_position
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Monotonic counter; each bump asks the viewer to clear its native selection.
    pub fn clear_signal(&self) -> u64 {
        self.clear_signal
    }

    /// A pending proposal takes precedence when both slots are filled.
    pub fn phase(&self) -> AttachmentPhase {
        if self.pending.is_some() {
            AttachmentPhase::Pending
        } else if self.attached.is_some() {
            AttachmentPhase::Attached
        } else {
            AttachmentPhase::Empty
        }
    }

    pub fn ingest(&mut self, selection: CapturedSelection) -> IngestOutcome {
        let code = selection.code.trim();
        if code.is_empty() {
            return IngestOutcome::Ignored;
        }

        let selection = CapturedSelection {
            code: code.to_string(),
            ..selection
        };

        if self.auto_attach {
            return self.attach(&selection);
        }

        self.menu_position = Some(
            selection
                .anchor_rect
                .map(|rect| MenuPosition {
                    left: rect.left,
                    top: rect.bottom + MENU_OFFSET_Y,
                })
                .unwrap_or(FALLBACK_MENU_POSITION),
        );
        self.error = None;
        self.pending = Some(selection);
        tracing::debug!("selection pending confirmation");
        IngestOutcome::Pending
    }

    /// Attaches the pending selection. A rejected selection stays pending.
    pub fn confirm(&mut self) -> IngestOutcome {
        match self.pending.clone() {
            Some(pending) => self.attach(&pending),
            None => IngestOutcome::Ignored,
        }
    }

    pub fn dismiss(&mut self) {
        self.pending = None;
        self.menu_position = None;
        self.error = None;
        self.clear_signal += 1;
    }

    pub fn clear(&mut self) {
        self.attached = None;
        self.pending = None;
        self.menu_position = None;
        self.error = None;
        self.clear_signal += 1;
    }

    fn attach(&mut self, selection: &CapturedSelection) -> IngestOutcome {
        let code = selection.code.trim();
        if code.is_empty() {
            return IngestOutcome::Ignored;
        }

        if code.chars().count() > self.max_len {
            tracing::info!(
                chars = code.chars().count(),
                max = self.max_len,
                "selection rejected"
            );
            self.error = Some(format!(
                "Selection too large (max {} chars)",
                format_thousands(self.max_len)
            ));
            return IngestOutcome::Rejected;
        }

        self.error = None;
        self.attached = Some(AttachedContext {
            code: code.to_string(),
            meta: selection.meta,
        });
        self.pending = None;
        self.menu_position = None;
        tracing::debug!(chars = code.chars().count(), "selection attached");
        IngestOutcome::Attached
    }
}

/// Renders `value` with comma thousands separators.
fn format_thousands(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
