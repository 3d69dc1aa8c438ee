use super::{
    operation_sequence::OperationSequence,
    text_operation::{TextOperation, base_len, target_len},
    transform::remainder,
};
use crate::errors::OperationError;

/// Merges two consecutive edits into one with the same effect as applying
/// `first` and then `second`.
///
/// There is no concurrency between the two, so unlike `transform` no
/// tie-breaking is involved.
pub fn compose(
    first: &[TextOperation],
    second: &[TextOperation],
) -> Result<Vec<TextOperation>, OperationError> {
    let (first_target_length, second_base_length) = (target_len(first)?, base_len(second)?);
    if first_target_length != second_base_length {
        return Err(OperationError::IncompatibleCompose {
            first_target_length,
            second_base_length,
        });
    }

    let mut composed = OperationSequence::with_capacity(first.len() + second.len());

    let mut first_operations = first.iter().filter(|operation| !operation.is_empty()).cloned();
    let mut second_operations = second.iter().filter(|operation| !operation.is_empty()).cloned();

    let mut first_operation = first_operations.next();
    let mut second_operation = second_operations.next();

    loop {
        match (first_operation.take(), second_operation.take()) {
            (None, None) => break,

            // Deletions of the first edit happen before anything of the second.
            (Some(TextOperation::Delete(count)), other) => {
                composed.delete(count);
                first_operation = first_operations.next();
                second_operation = other;
            }

            (other, Some(TextOperation::Insert(text))) => {
                composed.insert(&text);
                second_operation = second_operations.next();
                first_operation = other;
            }

            (Some(TextOperation::Retain(first_count)), Some(TextOperation::Retain(second_count))) => {
                let shared = first_count.min(second_count);
                composed.retain(shared);

                first_operation = remainder(TextOperation::Retain, first_count - shared)
                    .or_else(|| first_operations.next());
                second_operation = remainder(TextOperation::Retain, second_count - shared)
                    .or_else(|| second_operations.next());
            }

            (Some(TextOperation::Insert(text)), Some(TextOperation::Delete(second_count))) => {
                let (deleted, kept) = split_at_char(&text, second_count);
                let deleted_length = deleted.chars().count();

                first_operation = if kept.is_empty() {
                    first_operations.next()
                } else {
                    Some(TextOperation::Insert(kept.to_owned()))
                };
                second_operation = remainder(TextOperation::Delete, second_count - deleted_length)
                    .or_else(|| second_operations.next());
            }

            (Some(TextOperation::Insert(text)), Some(TextOperation::Retain(second_count))) => {
                let (retained, kept) = split_at_char(&text, second_count);
                let retained_length = retained.chars().count();
                composed.insert(retained);

                first_operation = if kept.is_empty() {
                    first_operations.next()
                } else {
                    Some(TextOperation::Insert(kept.to_owned()))
                };
                second_operation = remainder(TextOperation::Retain, second_count - retained_length)
                    .or_else(|| second_operations.next());
            }

            (Some(TextOperation::Retain(first_count)), Some(TextOperation::Delete(second_count))) => {
                let shared = first_count.min(second_count);
                composed.delete(shared);

                first_operation = remainder(TextOperation::Retain, first_count - shared)
                    .or_else(|| first_operations.next());
                second_operation = remainder(TextOperation::Delete, second_count - shared)
                    .or_else(|| second_operations.next());
            }

            (Some(_), None) | (None, Some(_)) => {
                return Err(OperationError::IncompatibleCompose {
                    first_target_length,
                    second_base_length,
                });
            }
        }
    }

    Ok(composed.into_operations())
}

/// Folds a list of consecutive edits into a single one.
pub fn compose_all<'a, I>(operations: I) -> Result<Option<Vec<TextOperation>>, OperationError>
where
    I: IntoIterator<Item = &'a [TextOperation]>,
{
    operations.into_iter().try_fold(None::<Vec<TextOperation>>, |composed, next| {
        Ok(Some(match composed {
            None => next.to_vec(),
            Some(previous) => compose(&previous, next)?,
        }))
    })
}

fn split_at_char(text: &str, count: usize) -> (&str, &str) {
    let index = text
        .char_indices()
        .nth(count)
        .map_or(text.len(), |(index, _)| index);

    text.split_at(index)
}
