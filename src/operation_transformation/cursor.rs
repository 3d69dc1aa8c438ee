use serde::{Deserialize, Serialize};

use super::text_operation::{TextOperation, target_len};

/// A selected range of a document, in character offsets. `start` may be
/// greater than `end` for backwards selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    #[must_use]
    pub fn new(start: usize, end: usize) -> Self { Self { start, end } }

    #[must_use]
    pub fn is_collapsed(&self) -> bool { self.start == self.end }
}

/// A caret expressed as a zero-based line and a zero-based column counted in
/// characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    #[must_use]
    pub fn new(line: usize, column: usize) -> Self { Self { line, column } }

    /// Locates the character offset in `text`. Offsets past the end are
    /// clamped to the end of the text.
    #[must_use]
    pub fn from_offset(text: &str, offset: usize) -> Self {
        let mut position = Position::default();

        for character in text.chars().take(offset) {
            if character == '\n' {
                position.line += 1;
                position.column = 0;
            } else {
                position.column += 1;
            }
        }

        position
    }

    /// Character offset of the position in `text`. A column past the end of
    /// its line is clamped to the line end, a line past the last line to the
    /// end of the text.
    #[must_use]
    pub fn to_offset(&self, text: &str) -> usize {
        let mut offset = 0;

        for (index, line) in text.split('\n').enumerate() {
            let line_length = line.chars().count();

            if index == self.line {
                return offset + self.column.min(line_length);
            }

            offset += line_length + 1;
        }

        offset.saturating_sub(1)
    }
}

/// Moves a caret at `offset` through `operations` so it points at the same
/// character afterwards.
///
/// An author's own edit is already reflected in their caret, so it is
/// returned unchanged when `is_own_operation` is set. Otherwise inserts at or
/// before the caret push it right and deletes starting before it pull it
/// left by the part of the deleted range preceding it.
///
/// ```
/// use collab_ot::{TextOperation, transform_cursor};
///
/// let operations = [TextOperation::Insert("> ".to_owned()), TextOperation::Retain(5)];
///
/// assert_eq!(transform_cursor(3, &operations, false), 5);
/// assert_eq!(transform_cursor(3, &operations, true), 3);
/// ```
#[must_use]
pub fn transform_cursor(offset: usize, operations: &[TextOperation], is_own_operation: bool) -> usize {
    if is_own_operation {
        return offset;
    }

    let mut position = 0;
    let mut transformed = offset;

    for operation in operations {
        if position > offset {
            break;
        }

        match operation {
            TextOperation::Retain(count) => position = position.saturating_add(*count),
            TextOperation::Insert(text) => {
                transformed = transformed.saturating_add(text.chars().count());
            }
            TextOperation::Delete(count) => {
                if position < offset {
                    transformed -= (*count).min(offset - position);
                }
                position = position.saturating_add(*count);
            }
        }
    }

    target_len(operations).map_or(transformed, |length| transformed.min(length))
}

/// Same as `transform_cursor`, applied to both ends independently.
#[must_use]
pub fn transform_selection(
    selection: Selection,
    operations: &[TextOperation],
    is_own_operation: bool,
) -> Selection {
    Selection {
        start: transform_cursor(selection.start, operations, is_own_operation),
        end: transform_cursor(selection.end, operations, is_own_operation),
    }
}
