//! / operator - always yields a decimal, fails at runtime on a zero divisor

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct DivideFunction;

impl Function for DivideFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("divide", 2).operator("/");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Number, TypeTag::Duration]),
            _ => ArgChecker::DependsOn(|_, types| {
                types
                    .first()
                    .map(|lhs| lhs.dividable_types().to_vec())
                    .unwrap_or_default()
            }),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let result = match call.arg_type(0).tag() {
            TypeTag::Duration => ValidType::duration(),
            _ => ValidType::number(call.config().number_max_decimal_places),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary("divide", args, QueryExpression::Divide)
    }
}

/// Register the / operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(DivideFunction));
}
