use super::{operation_sequence::OperationSequence, text_operation::TextOperation};
use crate::{errors::OperationError, utils::string_builder::StringBuilder};

/// Returns the edit undoing `operations` once they have been applied to
/// `base_text`.
///
/// Deleted characters can't be recovered from the operations alone, they are
/// read back from `base_text`, which therefore has to be the exact text the
/// operations were applied to.
pub fn invert(
    operations: &[TextOperation],
    base_text: &str,
) -> Result<Vec<TextOperation>, OperationError> {
    let mut base = StringBuilder::new(base_text);
    let mut inverse = OperationSequence::with_capacity(operations.len());

    for operation in operations {
        match operation {
            TextOperation::Retain(count) => {
                base.retain(*count)?;
                inverse.retain(*count);
            }
            TextOperation::Insert(text) => {
                inverse.delete(text.chars().count());
            }
            TextOperation::Delete(count) => {
                inverse.insert(&base.take_deleted(*count)?);
            }
        }
    }

    base.build()?;

    Ok(inverse.into_operations())
}
