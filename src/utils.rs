pub mod color;
pub mod common_affix;
pub mod myers_diff;
pub mod side;
pub mod string_builder;
