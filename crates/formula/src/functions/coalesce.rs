//! COALESCE function - returns first non-NULL value

use super::{
    ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, same_tag_as,
};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct CoalesceFunction;

impl Function for CoalesceFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::new("coalesce", 2, None);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Any,
            _ => ArgChecker::DependsOn(same_tag_as::<0>),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        // Null only when every argument can be
        let nullable = call.arg_types().iter().all(|t| t.nullable);
        let result = match call.arg_type(0).decimal_places() {
            Some(_) => ValidType::number(call.max_decimal_places()),
            None => call.arg_type(0).clone(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Coalesce(args))
    }
}

/// Register the COALESCE function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(CoalesceFunction));
}
