use core::fmt::{Debug, Display};

use serde::{
    Deserialize, Serialize,
    de::{self, Deserializer, Visitor},
    ser::Serializer,
};

use crate::errors::OperationError;

/// A single step of an edit, walking the document from its start.
///
/// Counts are in characters (Unicode scalar values), never in bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum TextOperation {
    /// Skip `count` characters unchanged.
    Retain(usize),

    /// Insert the text at the current position.
    Insert(String),

    /// Remove `count` characters starting at the current position.
    Delete(usize),
}

impl TextOperation {
    /// Number of characters the step spans: retained, inserted or deleted.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            TextOperation::Retain(count) | TextOperation::Delete(count) => *count,
            TextOperation::Insert(text) => text.chars().count(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            TextOperation::Retain(count) | TextOperation::Delete(count) => *count == 0,
            TextOperation::Insert(text) => text.is_empty(),
        }
    }
}

/// Length of the document the operations can be applied to.
///
/// Counts arriving over the wire are untrusted, so a total that does not fit
/// in `usize` is reported as `OperationError::LengthOverflow`.
pub fn base_len(operations: &[TextOperation]) -> Result<usize, OperationError> {
    checked_total(operations.iter().map(|operation| match operation {
        TextOperation::Retain(count) | TextOperation::Delete(count) => *count,
        TextOperation::Insert(_) => 0,
    }))
}

/// Length of the document after applying the operations.
pub fn target_len(operations: &[TextOperation]) -> Result<usize, OperationError> {
    checked_total(operations.iter().map(|operation| match operation {
        TextOperation::Retain(count) => *count,
        TextOperation::Insert(text) => text.chars().count(),
        TextOperation::Delete(_) => 0,
    }))
}

fn checked_total(mut counts: impl Iterator<Item = usize>) -> Result<usize, OperationError> {
    counts
        .try_fold(0_usize, usize::checked_add)
        .ok_or(OperationError::LengthOverflow)
}

/// True when applying the operations leaves any document unchanged.
#[must_use]
pub fn is_noop(operations: &[TextOperation]) -> bool {
    operations.iter().all(|operation| {
        matches!(operation, TextOperation::Retain(_)) || operation.is_empty()
    })
}

impl Display for TextOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TextOperation::Retain(count) => write!(f, "<retain {count}>"),
            TextOperation::Insert(text) => write!(f, "<insert '{}'>", text.replace('\n', "\\n")),
            TextOperation::Delete(count) => write!(f, "<delete {count}>"),
        }
    }
}

impl Debug for TextOperation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result { write!(f, "{self}") }
}

impl Serialize for TextOperation {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // neat idea from https://github.com/spebern/operational-transform-rs/blob/9faa17f0a2b282ac2e09dbb2d29fdaf2ae0bbb4a/operational-transform/src/serde.rs#L14
        match self {
            TextOperation::Retain(count) => serializer.serialize_u64(*count as u64),
            TextOperation::Insert(text) => serializer.serialize_str(text),
            TextOperation::Delete(count) => {
                serializer.serialize_i64(-(i64::try_from(*count).unwrap_or(i64::MAX)))
            }
        }
    }
}

impl<'de> Deserialize<'de> for TextOperation {
    fn deserialize<D>(deserializer: D) -> Result<TextOperation, D::Error>
    where
        D: Deserializer<'de>,
    {
        use std::fmt;

        struct TextOperationVisitor;

        impl Visitor<'_> for TextOperationVisitor {
            type Value = TextOperation;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str(
                    "a positive integer (retain), a negative integer (delete) or a string (insert)",
                )
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                usize::try_from(value)
                    .map(TextOperation::Retain)
                    .map_err(|_| E::custom(format!("retain count {value} is too large")))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let count = usize::try_from(value.unsigned_abs())
                    .map_err(|_| E::custom(format!("count {value} is too large")))?;

                if value >= 0 {
                    Ok(TextOperation::Retain(count))
                } else {
                    Ok(TextOperation::Delete(count))
                }
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(TextOperation::Insert(value.to_owned()))
            }
        }

        deserializer.deserialize_any(TextOperationVisitor)
    }
}
