use std::time::{Duration, Instant};

use super::{
    operation::Operation, operation_sequence::OperationSequence, text_operation::TextOperation,
};
use crate::utils::myers_diff::{DiffRun, myers_diff};

/// Upper bound on the time spent looking for a minimal edit script. Past it
/// the diff is still correct, only coarser.
const DIFF_TIMEOUT: Duration = Duration::from_millis(100);

/// Diffs two full snapshots of a document into the steps turning `old_text`
/// into `new_text`.
#[must_use]
pub fn diff_operations(old_text: &str, new_text: &str) -> Vec<TextOperation> {
    let old = old_text.chars().collect::<Vec<_>>();
    let new = new_text.chars().collect::<Vec<_>>();

    let runs = myers_diff(&old, &new, Instant::now().checked_add(DIFF_TIMEOUT));

    let mut operations = OperationSequence::with_capacity(runs.len());
    for run in runs {
        match run {
            DiffRun::Equal(length) => operations.retain(length),
            DiffRun::Delete(length) => operations.delete(length),
            DiffRun::Insert(range) => operations.insert(&new[range].iter().collect::<String>()),
        };
    }

    operations.into_operations()
}

/// Builds the `Operation` an author sends after editing `old_text` into
/// `new_text` on top of `revision`.
///
/// ```
/// use collab_ot::{apply_operations, create_operations_from_diff};
///
/// let operation = create_operations_from_diff("hello", "help!", "alice", "notes.md", 3);
///
/// assert_eq!(operation.revision, 3);
/// assert_eq!(apply_operations("hello", &operation.operations).unwrap(), "help!");
/// ```
#[must_use]
pub fn create_operations_from_diff(
    old_text: &str,
    new_text: &str,
    author_id: &str,
    file_id: &str,
    revision: u64,
) -> Operation {
    Operation::new(
        author_id,
        file_id,
        revision,
        diff_operations(old_text, new_text),
    )
}
