use thiserror::Error;

use crate::protocol::MessageType;

/// Structural errors raised while applying or combining operations.
///
/// All of them mean that an operation was computed against a different
/// document than the one it is being used with, so the caller must not try
/// to repair the result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// The operation references a range that exceeds the text length
    #[error(
        "Invalid operation: attempting to access {requested} characters starting at position \
         {position}, but the text only has {available} characters remaining"
    )]
    OutOfBounds {
        /// The position where the step starts
        position: usize,
        /// The number of characters requested
        requested: usize,
        /// The number of characters available from the position
        available: usize,
    },

    /// The operation stops before the end of the text
    #[error(
        "Invalid operation: it only covers {consumed} characters of a text with {expected} \
         characters"
    )]
    LengthMismatch { expected: usize, consumed: usize },

    #[error(
        "Cannot transform operations with different base lengths: {left} and {right} characters"
    )]
    IncompatibleTransform { left: usize, right: usize },

    #[error(
        "Cannot compose operations: the first one produces {first_target_length} characters but \
         the second one expects {second_base_length}"
    )]
    IncompatibleCompose {
        first_target_length: usize,
        second_base_length: usize,
    },

    #[error("Invalid operation: its lengths add up to more than a document can hold")]
    LengthOverflow,
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unexpected message type `{0}` in this direction")]
    UnexpectedType(MessageType),
}
