use super::{
    operation_sequence::OperationSequence,
    text_operation::{TextOperation, base_len},
};
use crate::{errors::OperationError, utils::side::Side};

/// Transforms two concurrent edits of the same document against each other.
///
/// Returns `(left', right')` such that applying `left` then `right'` gives
/// the same text as applying `right` then `left'`. When both sides insert at
/// the same position, the side named by `priority` keeps its text first.
///
/// ```
/// use collab_ot::{Side, TextOperation, apply_operations, transform};
///
/// let left = vec![TextOperation::Retain(5), TextOperation::Insert(" world".to_owned())];
/// let right = vec![TextOperation::Retain(5), TextOperation::Insert("!".to_owned())];
///
/// let (left_prime, right_prime) = transform(&left, &right, Side::Left).unwrap();
///
/// let on_left = apply_operations(&apply_operations("hello", &left).unwrap(), &right_prime);
/// let on_right = apply_operations(&apply_operations("hello", &right).unwrap(), &left_prime);
/// assert_eq!(on_left.unwrap(), "hello world!");
/// assert_eq!(on_right.unwrap(), "hello world!");
/// ```
pub fn transform(
    left: &[TextOperation],
    right: &[TextOperation],
    priority: Side,
) -> Result<(Vec<TextOperation>, Vec<TextOperation>), OperationError> {
    let (left_base_length, right_base_length) = (base_len(left)?, base_len(right)?);
    if left_base_length != right_base_length {
        return Err(OperationError::IncompatibleTransform {
            left: left_base_length,
            right: right_base_length,
        });
    }

    let mut left_prime = OperationSequence::with_capacity(left.len() + right.len());
    let mut right_prime = OperationSequence::with_capacity(left.len() + right.len());

    let mut left_operations = left.iter().filter(|operation| !operation.is_empty()).cloned();
    let mut right_operations = right.iter().filter(|operation| !operation.is_empty()).cloned();

    let mut left_operation = left_operations.next();
    let mut right_operation = right_operations.next();

    loop {
        match (left_operation.take(), right_operation.take()) {
            (None, None) => break,

            (Some(TextOperation::Insert(left_text)), Some(TextOperation::Insert(right_text))) => {
                if priority == Side::Left {
                    right_prime.retain(left_text.chars().count());
                    left_prime.insert(&left_text);
                    left_operation = left_operations.next();
                    right_operation = Some(TextOperation::Insert(right_text));
                } else {
                    left_prime.retain(right_text.chars().count());
                    right_prime.insert(&right_text);
                    right_operation = right_operations.next();
                    left_operation = Some(TextOperation::Insert(left_text));
                }
            }

            (Some(TextOperation::Insert(text)), other) => {
                right_prime.retain(text.chars().count());
                left_prime.insert(&text);
                left_operation = left_operations.next();
                right_operation = other;
            }

            (other, Some(TextOperation::Insert(text))) => {
                left_prime.retain(text.chars().count());
                right_prime.insert(&text);
                right_operation = right_operations.next();
                left_operation = other;
            }

            (Some(TextOperation::Retain(left_count)), Some(TextOperation::Retain(right_count))) => {
                let shared = left_count.min(right_count);
                left_prime.retain(shared);
                right_prime.retain(shared);

                left_operation = remainder(TextOperation::Retain, left_count - shared)
                    .or_else(|| left_operations.next());
                right_operation = remainder(TextOperation::Retain, right_count - shared)
                    .or_else(|| right_operations.next());
            }

            // Both sides removed the same characters: nothing is left to do for either.
            (Some(TextOperation::Delete(left_count)), Some(TextOperation::Delete(right_count))) => {
                let shared = left_count.min(right_count);

                left_operation = remainder(TextOperation::Delete, left_count - shared)
                    .or_else(|| left_operations.next());
                right_operation = remainder(TextOperation::Delete, right_count - shared)
                    .or_else(|| right_operations.next());
            }

            (Some(TextOperation::Delete(left_count)), Some(TextOperation::Retain(right_count))) => {
                let shared = left_count.min(right_count);
                left_prime.delete(shared);

                left_operation = remainder(TextOperation::Delete, left_count - shared)
                    .or_else(|| left_operations.next());
                right_operation = remainder(TextOperation::Retain, right_count - shared)
                    .or_else(|| right_operations.next());
            }

            (Some(TextOperation::Retain(left_count)), Some(TextOperation::Delete(right_count))) => {
                let shared = left_count.min(right_count);
                right_prime.delete(shared);

                left_operation = remainder(TextOperation::Retain, left_count - shared)
                    .or_else(|| left_operations.next());
                right_operation = remainder(TextOperation::Delete, right_count - shared)
                    .or_else(|| right_operations.next());
            }

            // Unreachable with equal base lengths, kept as an error instead of a panic.
            (Some(_), None) | (None, Some(_)) => {
                return Err(OperationError::IncompatibleTransform {
                    left: left_base_length,
                    right: right_base_length,
                });
            }
        }
    }

    Ok((left_prime.into_operations(), right_prime.into_operations()))
}

pub(super) fn remainder(
    create: impl Fn(usize) -> TextOperation,
    count: usize,
) -> Option<TextOperation> {
    (count > 0).then(|| create(count))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;
    use crate::operation_transformation::apply::apply_operations;

    fn insert(text: &str) -> TextOperation { TextOperation::Insert(text.to_owned()) }

    fn assert_converges(
        document: &str,
        left: &[TextOperation],
        right: &[TextOperation],
        priority: Side,
    ) -> String {
        let (left_prime, right_prime) = transform(left, right, priority).unwrap();

        let left_then_right =
            apply_operations(&apply_operations(document, left).unwrap(), &right_prime).unwrap();
        let right_then_left =
            apply_operations(&apply_operations(document, right).unwrap(), &left_prime).unwrap();

        assert_eq!(left_then_right, right_then_left);
        left_then_right
    }

    #[test]
    fn test_concurrent_inserts_at_the_same_position() {
        let left = [TextOperation::Retain(5), insert(" world")];
        let right = [TextOperation::Retain(5), insert("!")];

        assert_eq!(
            assert_converges("hello", &left, &right, Side::Left),
            "hello world!"
        );
        assert_eq!(
            assert_converges("hello", &left, &right, Side::Right),
            "hello! world"
        );
    }

    #[test]
    fn test_same_delete_on_both_sides() {
        let delete_cd = [
            TextOperation::Retain(2),
            TextOperation::Delete(2),
            TextOperation::Retain(2),
        ];

        let (left_prime, right_prime) = transform(&delete_cd, &delete_cd, Side::Left).unwrap();

        assert_eq!(left_prime, vec![TextOperation::Retain(4)]);
        assert_eq!(right_prime, vec![TextOperation::Retain(4)]);
        assert_eq!(
            assert_converges("abcdef", &delete_cd, &delete_cd, Side::Left),
            "abef"
        );
    }

    #[test]
    fn test_insert_inside_a_concurrently_deleted_range_survives() {
        let left = [TextOperation::Retain(1), TextOperation::Delete(4)];
        let right = [TextOperation::Retain(3), insert("X"), TextOperation::Retain(2)];

        assert_eq!(assert_converges("abcde", &left, &right, Side::Left), "aX");
    }

    #[test_case(Side::Left ; "left wins ties")]
    #[test_case(Side::Right ; "right wins ties")]
    fn test_swapping_arguments_gives_the_same_document(priority: Side) {
        let left = [TextOperation::Retain(2), insert("left"), TextOperation::Retain(2)];
        let right = [TextOperation::Retain(2), insert("right"), TextOperation::Delete(2)];

        let forward = assert_converges("abcd", &left, &right, priority);
        let swapped = assert_converges("abcd", &right, &left, priority.opposite());

        assert_eq!(forward, swapped);
    }

    #[test]
    fn test_overlapping_deletes() {
        let left = [TextOperation::Delete(4), TextOperation::Retain(2)];
        let right = [TextOperation::Retain(2), TextOperation::Delete(4)];

        assert_eq!(assert_converges("abcdef", &left, &right, Side::Left), "");
    }

    #[test]
    fn test_different_base_lengths_are_rejected() {
        assert_eq!(
            transform(
                &[TextOperation::Retain(3)],
                &[TextOperation::Retain(4)],
                Side::Left
            ),
            Err(OperationError::IncompatibleTransform { left: 3, right: 4 })
        );
    }

    #[test]
    fn test_overflowing_lengths_are_rejected() {
        let huge = [TextOperation::Retain(usize::MAX), TextOperation::Retain(1)];

        assert_eq!(
            transform(&huge, &[TextOperation::Retain(1)], Side::Left),
            Err(OperationError::LengthOverflow)
        );
    }
}
