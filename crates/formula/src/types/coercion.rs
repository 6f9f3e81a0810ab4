//! Per-type rewrites of typed formula trees
//!
//! These transforms build new typed nodes around an existing one: replacing
//! nulls before null-rejecting functions, collapsing many values into an
//! array, and adding or removing the field-level error guard.

use super::data_type::{TypeTag, ValidType};
use crate::ast::Expression;
use crate::config::FormulaConfig;
use crate::error::Result;
use crate::functions::{FunctionRegistry, type_call};

impl ValidType {
    /// Typed literal standing in for an empty value, when the type has one
    pub fn placeholder_empty_literal(&self, config: &FormulaConfig) -> Result<Option<Expression>> {
        let literal = match self.tag() {
            TypeTag::Text => {
                Expression::string_literal("", config)?.with_valid_type(ValidType::text())?
            }
            TypeTag::Number => Expression::integer_literal(0).with_valid_type(ValidType::number(0))?,
            TypeTag::Boolean => {
                Expression::boolean_literal(false).with_valid_type(ValidType::boolean())?
            }
            TypeTag::Date | TypeTag::Duration | TypeTag::Array => return Ok(None),
        };
        Ok(Some(literal))
    }

    /// Replace null with the type's empty placeholder. Types without a
    /// placeholder are returned unchanged.
    pub fn try_coerce_to_not_null(
        &self,
        expr: Expression,
        registry: &FunctionRegistry,
        config: &FormulaConfig,
    ) -> Result<Expression> {
        match self.placeholder_empty_literal(config)? {
            Some(placeholder) => {
                type_call(registry, config, registry.require("coalesce")?, vec![expr, placeholder])
            }
            None => Ok(expr),
        }
    }

    /// Collapse a many expression into one array per host row
    pub fn collapse_many(
        &self,
        expr: Expression,
        registry: &FunctionRegistry,
        config: &FormulaConfig,
    ) -> Result<Expression> {
        match self.tag() {
            TypeTag::Array => self.collapse_array_of_many(expr, registry, config),
            _ => type_call(registry, config, registry.require("array_agg")?, vec![expr]),
        }
    }

    /// Collapse many arrays into one flat array instead of an array of arrays
    pub fn collapse_array_of_many(
        &self,
        expr: Expression,
        registry: &FunctionRegistry,
        config: &FormulaConfig,
    ) -> Result<Expression> {
        type_call(
            registry,
            config,
            registry.require("array_agg_no_nesting")?,
            vec![expr],
        )
    }

    /// Guard the defining expression of a stored field so runtime errors
    /// become null
    pub fn wrap_at_field_level(
        &self,
        expr: Expression,
        registry: &FunctionRegistry,
        config: &FormulaConfig,
    ) -> Result<Expression> {
        type_call(registry, config, registry.require("error_to_null")?, vec![expr])
    }

    /// Strip a wrapper call from the outermost node of a stored field
    /// expression. Nested wrappers are left alone.
    pub fn unwrap_at_field_level(&self, expr: Expression) -> Expression {
        if !expr.is_wrapper_call() {
            return expr;
        }
        match (expr.args().first(), expr.expression_type()) {
            (Some(inner), Some(wrapper_type)) => inner.retyped(wrapper_type.clone()),
            _ => expr,
        }
    }
}
