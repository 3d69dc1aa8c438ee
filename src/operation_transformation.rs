mod apply;
mod compose;
mod cursor;
mod diff;
mod invert;
mod operation;
mod operation_sequence;
mod text_operation;
mod transform;

pub use apply::apply_operations;
pub use compose::{compose, compose_all};
pub use cursor::{Position, Selection, transform_cursor, transform_selection};
pub use diff::{create_operations_from_diff, diff_operations};
pub use invert::invert;
pub use operation::Operation;
pub use operation_sequence::{OperationSequence, normalize};
pub use text_operation::{TextOperation, base_len, is_noop, target_len};
pub use transform::transform;
