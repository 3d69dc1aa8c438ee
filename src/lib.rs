mod errors;
mod operation_transformation;
pub mod protocol;
mod utils;

pub use errors::{OperationError, ProtocolError};
pub use operation_transformation::{
    Operation, OperationSequence, Position, Selection, TextOperation, apply_operations, base_len,
    compose, compose_all, create_operations_from_diff, diff_operations, invert, is_noop,
    normalize, target_len, transform, transform_cursor, transform_selection,
};
pub use utils::{color::user_color, side::Side};
