//! Query compiler
//!
//! Lowers a fully typed formula tree into a [`QueryExpression`]. Children
//! are compiled first and handed to the function's codegen callback. After
//! an aggregate call is lowered, every aggregate it produced is wrapped into
//! its own correlated subquery: the scope records which links to join
//! through and gets an alias derived from the node's position in the tree.

use super::field::prepare_field_expression;
use crate::ast::{Expression, ExpressionKind, ReferenceBinding};
use crate::config::FormulaConfig;
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::{ExpressionType, ValidType};
use crate::types::expression::{AggregateExpression, CastTarget, QueryExpression, SubqueryScope};

/// Compiles typed formula trees for one dispatch context
pub struct QueryCompiler<'a> {
    registry: &'a FunctionRegistry,
    config: &'a FormulaConfig,
    context: &'a DispatchContext<'a>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        registry: &'a FunctionRegistry,
        config: &'a FormulaConfig,
        context: &'a DispatchContext<'a>,
    ) -> Self {
        Self {
            registry,
            config,
            context,
        }
    }

    /// Compile a typed expression. A many root is collapsed into one array
    /// per host row first.
    pub fn compile(&self, expr: &Expression) -> Result<QueryExpression> {
        let valid = require_valid(expr)?;
        let mut path = Vec::new();
        if expr.many() {
            let collapsed = valid
                .clone()
                .collapse_many(expr.clone(), self.registry, self.config)?;
            return self.compile_node(&collapsed, &mut path);
        }
        self.compile_node(expr, &mut path)
    }

    /// Compile the defining expression of a formula field.
    ///
    /// The expression is prepared for storage (collapsed and guarded) if it
    /// is not already, and number results are cast to their declared
    /// decimal places.
    pub fn compile_field(&self, expr: &Expression) -> Result<QueryExpression> {
        let prepared = prepare_field_expression(expr.clone(), self.registry, self.config)?;
        let query = self.compile(&prepared)?;
        match prepared.valid_type().and_then(ValidType::decimal_places) {
            Some(places) => Ok(QueryExpression::Cast(
                Box::new(query),
                CastTarget::Decimal { places },
            )),
            None => Ok(query),
        }
    }

    fn compile_node(&self, expr: &Expression, path: &mut Vec<usize>) -> Result<QueryExpression> {
        require_valid(expr)?;

        match expr.kind() {
            ExpressionKind::StringLiteral(value) => Ok(QueryExpression::Value(Value::text(value))),
            ExpressionKind::IntegerLiteral(value) => Ok(QueryExpression::Value(Value::Integer(*value))),
            ExpressionKind::DecimalLiteral(value) => {
                Ok(QueryExpression::Value(Value::Decimal(*value)))
            }
            ExpressionKind::BooleanLiteral(value) => {
                Ok(QueryExpression::Value(Value::Boolean(*value)))
            }
            ExpressionKind::FieldReference(reference) => match &reference.binding {
                Some(ReferenceBinding::Column(column)) => Ok(QueryExpression::column(column)),
                Some(ReferenceBinding::Lookup { link, column }) => {
                    Ok(QueryExpression::LinkedColumn {
                        link: link.clone(),
                        column: column.clone(),
                    })
                }
                Some(ReferenceBinding::Inline(inlined)) => {
                    path.push(0);
                    let compiled = self.compile_node(inlined, path);
                    path.pop();
                    compiled
                }
                None => Err(Error::Untyped(expr.to_string())),
            },
            ExpressionKind::FunctionCall(call) => {
                let mut args = Vec::with_capacity(call.args.len());
                for (index, arg) in call.args.iter().enumerate() {
                    path.push(index);
                    let compiled = self.compile_node(arg, path);
                    path.pop();
                    args.push(compiled?);
                }

                let mut query = call.function.to_query(args, expr, self.context)?;
                if expr.requires_aggregate_wrapper() {
                    let mut scoped = 0;
                    self.scope_aggregates(&mut query, path, &mut scoped);
                }
                Ok(query)
            }
        }
    }

    /// Wrap every unscoped aggregate in `query` into its subquery. Already
    /// scoped aggregates are left alone along with everything below them.
    fn scope_aggregates(&self, query: &mut QueryExpression, path: &[usize], scoped: &mut usize) {
        match query {
            QueryExpression::Aggregate(agg) if agg.scope.is_none() => {
                let alias_path: Vec<usize> = path.iter().copied().chain([*scoped]).collect();
                *scoped += 1;
                self.scope_aggregate(agg, &alias_path);
            }
            QueryExpression::Aggregate(_) => {}
            other => {
                for child in other.children_mut() {
                    self.scope_aggregates(child, path, scoped);
                }
            }
        }
    }

    fn scope_aggregate(&self, agg: &mut AggregateExpression, alias_path: &[usize]) {
        // Filtered rows are dropped from the subquery, wherever the filter sits
        let mut conditions = Vec::new();
        hoist_filters(&mut agg.argument, &mut conditions);
        agg.filter = agg
            .filter
            .take()
            .into_iter()
            .chain(conditions)
            .reduce(|all, condition| QueryExpression::And(Box::new(all), Box::new(condition)));

        let mut links = agg.argument.linked_fields();
        if let Some(filter) = &agg.filter {
            links.extend(filter.linked_fields());
        }
        let alias = self.context.subquery_alias(alias_path);

        tracing::trace!(
            function = %agg.function,
            alias = %alias,
            links = ?links,
            "scoped aggregate subquery"
        );
        agg.scope = Some(SubqueryScope {
            links: links.into_iter().collect(),
            alias,
        });
    }
}

/// Replace each `Filtered` under `query` by its value, collecting the
/// conditions. Aggregates below keep their own filters.
fn hoist_filters(query: &mut QueryExpression, conditions: &mut Vec<QueryExpression>) {
    match query {
        QueryExpression::Aggregate(_) => {}
        QueryExpression::Filtered { .. } => {
            let filtered = std::mem::replace(query, QueryExpression::Value(Value::Null));
            if let QueryExpression::Filtered { value, condition } = filtered {
                conditions.push(*condition);
                *query = *value;
            }
            hoist_filters(query, conditions);
        }
        other => {
            for child in other.children_mut() {
                hoist_filters(child, conditions);
            }
        }
    }
}

fn require_valid(expr: &Expression) -> Result<&ValidType> {
    match expr.expression_type() {
        Some(ExpressionType::Valid(valid)) => Ok(valid),
        Some(ExpressionType::Invalid(invalid)) => {
            Err(Error::InvalidExpression(invalid.error.clone()))
        }
        None => Err(Error::Untyped(expr.to_string())),
    }
}
