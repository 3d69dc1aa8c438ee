use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    apply::apply_operations,
    compose::compose,
    invert::invert,
    operation_sequence::normalize,
    text_operation::{self, TextOperation},
    transform::transform,
};
use crate::{errors::OperationError, utils::side::Side};

/// An author's edit of one file, anchored to the document revision it was
/// computed against.
///
/// Values are never edited in place; transforming, composing or rebasing
/// returns a new `Operation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: Uuid,
    pub author_id: String,
    pub file_id: String,

    /// The base revision.
    pub revision: u64,
    pub operations: Vec<TextOperation>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Operation {
    #[must_use]
    pub fn new(
        author_id: impl Into<String>,
        file_id: impl Into<String>,
        revision: u64,
        operations: Vec<TextOperation>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id: author_id.into(),
            file_id: file_id.into(),
            revision,
            operations: normalize(operations),
            timestamp: Utc::now(),
        }
    }

    pub fn apply(&self, text: &str) -> Result<String, OperationError> {
        apply_operations(text, &self.operations)
    }

    pub fn base_len(&self) -> Result<usize, OperationError> {
        text_operation::base_len(&self.operations)
    }

    pub fn target_len(&self) -> Result<usize, OperationError> {
        text_operation::target_len(&self.operations)
    }

    #[must_use]
    pub fn is_noop(&self) -> bool { text_operation::is_noop(&self.operations) }

    /// Which side wins insert ties when `self` is transformed as the left
    /// operand against `other`.
    ///
    /// The operation whose `(author_id, id)` sorts first goes first, so the
    /// outcome doesn't depend on which replica does the transforming or in
    /// which argument order.
    #[must_use]
    pub fn priority_against(&self, other: &Operation) -> Side {
        if (&self.author_id, self.id) <= (&other.author_id, other.id) {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// Transforms two concurrent operations, see
    /// [`transform`](crate::transform).
    ///
    /// Metadata is kept as is on both results, callers rebase them onto the
    /// revision they end up being applied to.
    pub fn transform(&self, other: &Operation) -> Result<(Operation, Operation), OperationError> {
        let (left, right) = transform(
            &self.operations,
            &other.operations,
            self.priority_against(other),
        )?;

        Ok((self.with_operations(left), other.with_operations(right)))
    }

    /// Merges `next`, which has to directly follow `self`, into one
    /// operation. The result keeps the identity and base revision of `self`.
    pub fn compose(&self, next: &Operation) -> Result<Operation, OperationError> {
        Ok(Operation {
            timestamp: next.timestamp,
            ..self.with_operations(compose(&self.operations, &next.operations)?)
        })
    }

    /// The operation undoing `self`, based on the revision `self` produces.
    pub fn invert(&self, base_text: &str) -> Result<Operation, OperationError> {
        Ok(Operation::new(
            self.author_id.clone(),
            self.file_id.clone(),
            self.revision + 1,
            invert(&self.operations, base_text)?,
        ))
    }

    #[must_use]
    pub fn with_operations(&self, operations: Vec<TextOperation>) -> Operation {
        Operation {
            id: self.id,
            author_id: self.author_id.clone(),
            file_id: self.file_id.clone(),
            revision: self.revision,
            operations,
            timestamp: self.timestamp,
        }
    }

    #[must_use]
    pub fn rebased(&self, revision: u64) -> Operation {
        Operation {
            revision,
            ..self.clone()
        }
    }
}
