//! Stored field expressions
//!
//! A formula field stores its typed expression with two rewrites applied:
//! a many root is collapsed into one array per row, and the whole tree is
//! guarded by `error_to_null`. When another formula references the field
//! the guard is stripped again, so it only ever sits at the outermost node.

use crate::ast::Expression;
use crate::config::FormulaConfig;
use crate::error::Result;
use crate::functions::FunctionRegistry;

/// Rewrite a typed expression into the form stored for a formula field.
///
/// Invalid and untyped expressions are returned as they are. Preparing an
/// already prepared expression changes nothing.
pub fn prepare_field_expression(
    expr: Expression,
    registry: &FunctionRegistry,
    config: &FormulaConfig,
) -> Result<Expression> {
    let Some(valid) = expr.valid_type().cloned() else {
        return Ok(expr);
    };
    let expr = if expr.many() {
        valid.collapse_many(expr, registry, config)?
    } else {
        expr
    };

    if !config.wrap_field_errors || expr.is_wrapper_call() {
        return Ok(expr);
    }
    match expr.valid_type().cloned() {
        Some(valid) => valid.wrap_at_field_level(expr, registry, config),
        None => Ok(expr),
    }
}

/// The expression another formula inlines when it references a stored field
pub fn reference_expression(stored: Expression) -> Expression {
    match stored.valid_type().cloned() {
        Some(valid) => valid.unwrap_at_field_level(stored),
        None => stored,
    }
}
