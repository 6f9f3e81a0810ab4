//! != operator

use super::equal::comparable_checker;
use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct NotEqualFunction;

impl Function for NotEqualFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature =
            FunctionSignature::exact("not_equal", 2).operator("!=");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        comparable_checker(index)
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::boolean().with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary("not_equal", args, QueryExpression::NotEqual)
    }
}

/// Register the != operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(NotEqualFunction));
}
