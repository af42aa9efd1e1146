use generation_provider::SelectionMeta;

/// Opaque handle for a node rendered inside a viewer.
pub type NodeId = u64;

/// Character range inside a container's text, counted in Unicode scalar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub start: usize,
    pub end: usize,
}

impl SelectionRange {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.start >= self.end
    }
}

/// Screen rectangle of a range, in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorRect {
    pub left: f64,
    pub top: f64,
    pub bottom: f64,
}

impl AnchorRect {
    /// A zero-height rectangle at a cursor point.
    #[must_use]
    pub fn at_point(x: f64, y: f64) -> Self {
        Self {
            left: x,
            top: y,
            bottom: y,
        }
    }
}

/// Rendering surface that holds the viewer's text.
pub trait TextContainer {
    /// Full text of the container, or `None` while it is not mounted.
    fn text(&self) -> Option<&str>;

    /// Whether `node` is rendered inside this container.
    fn contains(&self, node: NodeId) -> bool;

    fn bounding_box(&self, range: &SelectionRange) -> Option<AnchorRect>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolvedGeometry {
    pub meta: SelectionMeta,
    pub rect: Option<AnchorRect>,
}

/// Measures `range` against the container text.
///
/// Offsets past the end of the text are clamped. An unmounted container or an
/// empty text yields empty metadata and no rectangle.
#[must_use]
pub fn resolve(container: &dyn TextContainer, range: &SelectionRange) -> ResolvedGeometry {
    let Some(text) = container.text().filter(|text| !text.is_empty()) else {
        return ResolvedGeometry::default();
    };

    let total = text.chars().count();
    let start = range.start.min(total);
    let end = range.end.clamp(start, total);

    let (start_line, start_col) = line_col(text, start);
    let (end_line, end_col) = line_col(text, end);

    ResolvedGeometry {
        meta: SelectionMeta {
            start_line: Some(start_line),
            end_line: Some(end_line),
            start_col: Some(start_col),
            end_col: Some(end_col),
        },
        rect: container.bounding_box(range),
    }
}

/// Line and column of the position right after the first `offset` characters.
///
/// The line is one more than the newlines before the position. The column is
/// the distance back to the nearest preceding newline, where the start of the
/// text counts as a newline at position -1.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let mut newlines = 0usize;
    let mut last_newline: Option<usize> = None;

    for (index, ch) in text.chars().take(offset).enumerate() {
        if ch == '\n' {
            newlines += 1;
            last_newline = Some(index);
        }
    }

    let column = match last_newline {
        Some(index) => offset - index,
        None => offset + 1,
    };

    (newlines + 1, column)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct Synthetic {
        text: Option<String>,
        rect: Option<AnchorRect>,
    }

    impl Synthetic {
        fn mounted(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                rect: Some(AnchorRect {
                    left: 10.0,
                    top: 20.0,
                    bottom: 34.0,
                }),
            }
        }
    }

    impl TextContainer for Synthetic {
        fn text(&self) -> Option<&str> {
            self.text.as_deref()
        }

        fn contains(&self, _node: NodeId) -> bool {
            true
        }

        fn bounding_box(&self, _range: &SelectionRange) -> Option<AnchorRect> {
            self.rect
        }
    }

    fn meta(start_line: usize, end_line: usize, start_col: usize, end_col: usize) -> SelectionMeta {
        SelectionMeta {
            start_line: Some(start_line),
            end_line: Some(end_line),
            start_col: Some(start_col),
            end_col: Some(end_col),
        }
    }

    #[test]
    fn middle_line_selection_reports_line_two() {
        let container = Synthetic::mounted("line1\nline2\nline3");
        let resolved = resolve(&container, &SelectionRange::new(6, 11));

        assert_eq!(resolved.meta, meta(2, 2, 1, 6));
        assert_eq!(resolved.rect, container.rect);
    }

    #[test]
    fn multi_line_selection_spans_lines() {
        let container = Synthetic::mounted("fn a() {\n    b();\n}\n");
        let resolved = resolve(&container, &SelectionRange::new(4, 16));

        assert_eq!(resolved.meta, meta(1, 2, 5, 8));
    }

    #[test]
    fn whole_container_selection_is_measured_the_same_way() {
        let container = Synthetic::mounted("ab\ncd");
        let resolved = resolve(&container, &SelectionRange::new(0, 5));

        assert_eq!(resolved.meta, meta(1, 2, 1, 3));
    }

    #[test]
    fn offsets_are_clamped_and_counted_in_chars() {
        let container = Synthetic::mounted("é\nü");
        let resolved = resolve(&container, &SelectionRange::new(2, 99));

        assert_eq!(resolved.meta, meta(2, 2, 1, 2));
    }

    #[test]
    fn start_line_never_exceeds_end_line() {
        let text = "a\nbb\n\nccc\nd";
        let container = Synthetic::mounted(text);
        let len = text.chars().count();
        for start in 0..=len {
            for end in start..=len {
                let resolved = resolve(&container, &SelectionRange::new(start, end));
                let start_line = resolved.meta.start_line.expect("start line");
                let end_line = resolved.meta.end_line.expect("end line");
                assert!(start_line >= 1);
                assert!(start_line <= end_line, "range {start}..{end}");
            }
        }
    }

    #[test]
    fn unmounted_or_empty_container_yields_nothing() {
        let unmounted = Synthetic {
            text: None,
            rect: None,
        };
        assert_eq!(
            resolve(&unmounted, &SelectionRange::new(0, 3)),
            ResolvedGeometry::default()
        );

        let empty = Synthetic::mounted("");
        let resolved = resolve(&empty, &SelectionRange::new(0, 0));
        assert!(resolved.meta.is_empty());
        assert_eq!(resolved.rect, None);
    }
}
