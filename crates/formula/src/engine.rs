//! Formula engine
//!
//! Ties the passes together for the two things callers do with a formula:
//! type it against a table, and compile it for a dispatch context. Field
//! formulas additionally go through field-level preparation and report the
//! metadata storage keeps next to the field.

use crate::ast::Expression;
use crate::config::FormulaConfig;
use crate::error::{Error, Result};
use crate::functions::FunctionRegistry;
use crate::planning::{QueryCompiler, prepare_field_expression};
use crate::semantic::{FieldTypeProvider, TypingPass};
use crate::types::context::DispatchContext;
use crate::types::data_type::{ExpressionType, TypeTag};
use crate::types::expression::QueryExpression;
use crate::types::metadata::PersistedType;

/// What storage records about a formula field besides its expression
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    /// `None` when the formula is invalid
    pub type_tag: Option<TypeTag>,
    pub nullable: bool,
    /// The value depends on data only known once the row exists
    pub requires_refresh_after_insert: bool,
    /// The value drifts with the clock and must be recomputed periodically
    pub needs_periodic_update: bool,
    pub persisted: PersistedType,
}

impl FieldMetadata {
    /// Metadata of a typed field expression
    pub fn from_expression(expr: &Expression) -> Result<Self> {
        let expression_type = expr
            .expression_type()
            .ok_or_else(|| Error::Untyped(expr.to_string()))?;
        let requires_refresh_after_insert = expr.any_node(&|node| {
            node.valid_type()
                .is_some_and(|valid| valid.requires_refresh_after_insert)
        });
        let needs_periodic_update = expr.any_node(&|node| {
            node.function()
                .is_some_and(|function| function.signature().needs_periodic_update)
        });

        Ok(Self {
            type_tag: expression_type.tag(),
            nullable: expression_type.nullable(),
            requires_refresh_after_insert,
            needs_periodic_update,
            persisted: expression_type.to_persisted(),
        })
    }
}

/// A compiled field formula
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    /// The typed expression to store as the field's definition
    pub expression: Expression,
    pub query: QueryExpression,
    pub metadata: FieldMetadata,
}

/// Result of turning a field formula into something storage can use
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaOutcome {
    Compiled(CompiledFormula),
    /// The formula is stored but every value of the field is an error
    Invalid {
        error: String,
        metadata: FieldMetadata,
    },
}

/// Types and compiles formulas against a function registry
pub struct FormulaEngine<'r> {
    registry: &'r FunctionRegistry,
    config: FormulaConfig,
}

impl FormulaEngine<'static> {
    /// Engine over the process-wide registry
    pub fn new(config: FormulaConfig) -> Self {
        Self {
            registry: FunctionRegistry::global(),
            config,
        }
    }
}

impl<'r> FormulaEngine<'r> {
    pub fn with_registry(registry: &'r FunctionRegistry, config: FormulaConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &'r FunctionRegistry {
        self.registry
    }

    pub fn config(&self) -> &FormulaConfig {
        &self.config
    }

    /// Run the typing pass only
    pub fn type_expression(
        &self,
        expr: Expression,
        provider: &dyn FieldTypeProvider,
    ) -> Result<Expression> {
        TypingPass::new(self.registry, provider, &self.config).type_expression(expr)
    }

    /// Type a formula and prepare it to be stored as a field definition
    pub fn type_field_expression(
        &self,
        expr: Expression,
        provider: &dyn FieldTypeProvider,
    ) -> Result<Expression> {
        let typed = self.type_expression(expr, provider)?;
        prepare_field_expression(typed, self.registry, &self.config)
    }

    /// Compile a typed expression. Fails on untyped or invalid trees.
    pub fn compile_expression(
        &self,
        typed: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        QueryCompiler::new(self.registry, &self.config, context).compile(typed)
    }

    /// Compile a typed field expression along with its field metadata
    pub fn compile_field(
        &self,
        typed: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<CompiledFormula> {
        let expression = prepare_field_expression(typed.clone(), self.registry, &self.config)?;
        let query = QueryCompiler::new(self.registry, &self.config, context)
            .compile_field(&expression)?;
        let metadata = FieldMetadata::from_expression(&expression)?;
        tracing::debug!(
            table = context.table(),
            type_tag = ?metadata.type_tag,
            "compiled field formula"
        );
        Ok(CompiledFormula {
            expression,
            query,
            metadata,
        })
    }

    /// Type and compile a field formula. Semantic problems give
    /// [`FormulaOutcome::Invalid`] rather than an error.
    pub fn formula(
        &self,
        expr: Expression,
        provider: &dyn FieldTypeProvider,
        context: &DispatchContext<'_>,
    ) -> Result<FormulaOutcome> {
        let typed = self.type_field_expression(expr, provider)?;
        if let Some(ExpressionType::Invalid(invalid)) = typed.expression_type() {
            tracing::debug!(
                table = context.table(),
                error = %invalid.error,
                "field formula is invalid"
            );
            return Ok(FormulaOutcome::Invalid {
                error: invalid.error.clone(),
                metadata: FieldMetadata::from_expression(&typed)?,
            });
        }
        self.compile_field(&typed, context)
            .map(FormulaOutcome::Compiled)
    }

    /// The expression inlined when another formula references a stored field
    pub fn reference_expression(&self, stored: Expression) -> Expression {
        crate::planning::reference_expression(stored)
    }
}
