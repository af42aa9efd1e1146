//! In-memory viewer over a fixed text with a monospace layout.

use crate::selection::{
    AnchorRect, NativeSelection, NodeId, SelectionRange, SelectionSource, TextContainer,
};

const ROOT_NODE: NodeId = 1;
const PADDING: f64 = 16.0;
const LINE_HEIGHT: f64 = 18.0;
const CHAR_WIDTH: f64 = 7.2;

#[derive(Debug, Clone, Default)]
pub struct StaticViewer {
    text: String,
    selection: Option<NativeSelection>,
}

impl StaticViewer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            selection: None,
        }
    }

    pub fn root_node(&self) -> NodeId {
        ROOT_NODE
    }

    /// Selects `range` (clamped to the text) as the native selection.
    pub fn select_range(&mut self, range: SelectionRange) {
        let total = self.text.chars().count();
        let start = range.start.min(total);
        let end = range.end.clamp(start, total);
        let text = self.text.chars().skip(start).take(end - start).collect();

        self.selection = Some(NativeSelection {
            anchor_node: Some(ROOT_NODE),
            focus_node: Some(ROOT_NODE),
            range: Some(SelectionRange::new(start, end)),
            text,
        });
    }

    /// Selects whole lines `first..=last` (1-based), without the trailing newline.
    /// Returns `None` when the lines are out of range.
    pub fn select_lines(&mut self, first: usize, last: usize) -> Option<SelectionRange> {
        if first == 0 || last < first {
            return None;
        }

        let mut line = 1usize;
        let mut start = None;
        let mut end = None;
        let mut offset = 0usize;

        for ch in self.text.chars() {
            if line == first && start.is_none() {
                start = Some(offset);
            }
            if ch == '\n' {
                if line == last {
                    end = Some(offset);
                    break;
                }
                line += 1;
            }
            offset += 1;
        }

        if line == first && start.is_none() {
            start = Some(offset);
        }
        let start = start?;
        let end = match end {
            Some(end) => end,
            None if line == last => offset,
            None => return None,
        };

        let range = SelectionRange::new(start, end);
        self.select_range(range);
        Some(range)
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let mut line = 0usize;
        let mut column = 0usize;
        for ch in self.text.chars().take(offset) {
            if ch == '\n' {
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        (line, column)
    }
}

impl TextContainer for StaticViewer {
    fn text(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn contains(&self, node: NodeId) -> bool {
        node == ROOT_NODE
    }

    fn bounding_box(&self, range: &SelectionRange) -> Option<AnchorRect> {
        let (start_line, start_column) = self.position(range.start);
        let (end_line, _) = self.position(range.end);

        Some(AnchorRect {
            left: PADDING + start_column as f64 * CHAR_WIDTH,
            top: PADDING + start_line as f64 * LINE_HEIGHT,
            bottom: PADDING + (end_line + 1) as f64 * LINE_HEIGHT,
        })
    }
}

impl SelectionSource for StaticViewer {
    fn current_selection(&self) -> Option<NativeSelection> {
        self.selection.clone()
    }

    fn clear_selection(&mut self) {
        self.selection = None;
    }
}
