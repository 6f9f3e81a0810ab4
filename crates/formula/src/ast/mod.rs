//! Formula abstract syntax tree

pub mod expression;
pub mod literal;

pub use expression::{Expression, ExpressionKind, FieldReference, FunctionCall, ReferenceBinding};
