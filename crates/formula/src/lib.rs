//! A typed formula compiler for computed fields
//!
//! This crate turns formula trees into backend query expressions:
//! - Every node is typed bottom-up against a pluggable function registry
//! - Semantic problems are carried as `Invalid` types instead of failing
//! - Lookups through link fields compile to scoped aggregate subqueries
//! - Compiled output is deterministic for a given dispatch context

mod config;
mod engine;
mod error;

pub mod ast;
pub mod functions;
pub mod planning;
pub mod semantic;
pub mod types;

#[cfg(test)]
mod test_utils;

pub use ast::{Expression, ExpressionKind};
pub use config::FormulaConfig;
pub use engine::{CompiledFormula, FieldMetadata, FormulaEngine, FormulaOutcome};
pub use error::{Error, Result};
pub use functions::{Function, FunctionRegistry, FunctionRegistryBuilder, FunctionSignature};
pub use types::evaluator::evaluate;
pub use types::{
    DispatchContext, ExpressionType, PersistedType, QueryExpression, Row, Schema, TypeTag,
    ValidType, Value,
};
