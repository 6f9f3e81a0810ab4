//! Lowering typed formulas into backend expressions
//!
//! - `compiler` - bottom-up compilation of typed trees, aggregate scoping
//! - `field` - preparing and unwrapping the stored expression of a formula field

pub mod compiler;
pub mod field;

pub use compiler::QueryCompiler;
pub use field::{prepare_field_expression, reference_expression};
