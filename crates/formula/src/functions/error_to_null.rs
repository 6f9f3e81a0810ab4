//! ERROR_TO_NULL function - the field-level error guard
//!
//! A wrapper: stored field expressions carry it at their root, and it is
//! stripped again when the field is referenced from another formula.

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::expression::QueryExpression;

pub struct ErrorToNullFunction;

impl Function for ErrorToNullFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("error_to_null", 1).wrapper();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let result = call.arg_type(0).clone().with_nullable(true);
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("error_to_null", args)?;
        Ok(QueryExpression::ErrorToNull(Box::new(arg)))
    }
}

/// Register the ERROR_TO_NULL function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ErrorToNullFunction));
}
