use super::text_operation::TextOperation;
use crate::{errors::OperationError, utils::string_builder::StringBuilder};

/// Applies the steps to `text` and returns the edited text.
///
/// The steps must consume the text exactly: running past its end yields
/// `OperationError::OutOfBounds` and stopping short yields
/// `OperationError::LengthMismatch`. Both mean the operation was computed
/// against another revision of the document, so nothing is clamped.
///
/// ```
/// use collab_ot::{TextOperation, apply_operations};
///
/// let edited = apply_operations(
///     "hello",
///     &[TextOperation::Retain(5), TextOperation::Insert(" world".to_owned())],
/// );
/// assert_eq!(edited.unwrap(), "hello world");
/// ```
pub fn apply_operations(text: &str, operations: &[TextOperation]) -> Result<String, OperationError> {
    let mut builder = StringBuilder::new(text);

    for operation in operations {
        match operation {
            TextOperation::Retain(count) => builder.retain(*count)?,
            TextOperation::Insert(inserted) => builder.insert(inserted),
            TextOperation::Delete(count) => builder.delete(*count)?,
        }
    }

    builder.build()
}
