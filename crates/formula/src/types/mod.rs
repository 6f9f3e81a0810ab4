//! The formula data model: types, values, backend expressions and schemas.

pub mod coercion;
pub mod context;
pub mod data_type;
pub mod evaluator;
pub mod expression;
pub mod metadata;
pub mod row;
pub mod schema;
pub mod value;

// Re-export key types
pub use context::DispatchContext;
pub use data_type::{ExpressionType, InvalidKind, InvalidType, TypeKind, TypeTag, ValidType};
pub use expression::{AggregateFunction, CastTarget, QueryExpression, ScalarFunction};
pub use metadata::PersistedType;
pub use row::Row;
pub use schema::{Field, FieldKind, Schema, Table};
pub use value::Value;
