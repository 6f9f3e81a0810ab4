//! Typing pass
//!
//! Single post-order walk assigning an [`ExpressionType`] to every node.
//! Semantic problems never abort the walk: the offending node is typed
//! `Invalid` and its parents propagate that value.

use super::provider::FieldTypeProvider;
use crate::ast::{Expression, ExpressionKind, FieldReference, FunctionCall, ReferenceBinding};
use crate::config::FormulaConfig;
use crate::error::Result;
use crate::functions::{FunctionRegistry, type_call};
use crate::planning::reference_expression;
use crate::types::data_type::{ExpressionType, InvalidKind, ValidType};

/// Types formula trees against one table's fields
pub struct TypingPass<'a> {
    registry: &'a FunctionRegistry,
    provider: &'a dyn FieldTypeProvider,
    config: &'a FormulaConfig,
}

impl<'a> TypingPass<'a> {
    pub fn new(
        registry: &'a FunctionRegistry,
        provider: &'a dyn FieldTypeProvider,
        config: &'a FormulaConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            config,
        }
    }

    /// Type `expr` and all of its children. Already typed subtrees are
    /// kept as they are.
    pub fn type_expression(&self, expr: Expression) -> Result<Expression> {
        if expr.is_typed() {
            return Ok(expr);
        }

        match expr.into_kind() {
            ExpressionKind::StringLiteral(value) => {
                Expression::string_literal(value, self.config)?.with_valid_type(ValidType::text())
            }
            ExpressionKind::IntegerLiteral(value) => {
                Expression::integer_literal(value).with_valid_type(ValidType::number(0))
            }
            ExpressionKind::DecimalLiteral(value) => Expression::decimal_literal(value)
                .with_valid_type(ValidType::number(value.scale())),
            ExpressionKind::BooleanLiteral(value) => {
                Expression::boolean_literal(value).with_valid_type(ValidType::boolean())
            }
            ExpressionKind::FieldReference(reference) => self.type_reference(reference),
            ExpressionKind::FunctionCall(call) => self.type_function_call(call),
        }
    }

    fn type_reference(&self, reference: FieldReference) -> Result<Expression> {
        let FieldReference {
            name, target_field, ..
        } = reference;

        let resolved = match self.provider.resolve_field(&name, target_field.as_deref()) {
            Ok(resolved) => resolved,
            Err(unresolved) => {
                tracing::debug!(field = %name, error = %unresolved, "unresolved field reference");
                return Expression::reference(FieldReference {
                    name,
                    target_field,
                    binding: None,
                })
                .with_invalid_type(InvalidKind::UnresolvedFieldReference, unresolved.to_string());
            }
        };

        if let Some(lookup) = resolved.lookup {
            return Expression::reference(FieldReference {
                name,
                target_field: Some(lookup.target_field),
                binding: Some(ReferenceBinding::Lookup {
                    link: resolved.column,
                    column: lookup.target_column,
                }),
            })
            .with_type(resolved.expression_type);
        }

        if let Some(stored) = resolved.formula {
            let inlined = reference_expression(stored);
            let expression_type = inlined
                .expression_type()
                .cloned()
                .unwrap_or(resolved.expression_type);
            return Expression::reference(FieldReference {
                name,
                target_field: None,
                binding: Some(ReferenceBinding::Inline(Box::new(inlined))),
            })
            .with_type(expression_type);
        }

        Expression::reference(FieldReference {
            name,
            target_field: None,
            binding: Some(ReferenceBinding::Column(resolved.column)),
        })
        .with_type(resolved.expression_type)
    }

    fn type_function_call(&self, call: FunctionCall) -> Result<Expression> {
        let FunctionCall { function, args } = call;
        let args = args
            .into_iter()
            .map(|arg| self.type_expression(arg))
            .collect::<Result<Vec<_>>>()?;
        let args_valid = args.iter().all(Expression::is_valid);
        let name = function.name();

        let typed = type_call(self.registry, self.config, function, args)?;
        if args_valid
            && let Some(ExpressionType::Invalid(invalid)) = typed.expression_type()
        {
            tracing::debug!(function = name, error = %invalid.error, "function call typed as invalid");
        }
        Ok(typed)
    }
}
