//! + operator - adds numbers and durations, shifts dates, joins text

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct AddFunction;

impl Function for AddFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("add", 2).operator("+");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[
                TypeTag::Text,
                TypeTag::Number,
                TypeTag::Date,
                TypeTag::Duration,
            ]),
            _ => ArgChecker::DependsOn(|_, types| {
                types
                    .first()
                    .map(|lhs| lhs.addable_types().to_vec())
                    .unwrap_or_default()
            }),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let (lhs, rhs) = (call.arg_type(0).clone(), call.arg_type(1).clone());

        let result = match (lhs.tag(), rhs.tag()) {
            (TypeTag::Text, _) => {
                let args = call.args().to_vec();
                return call.type_as("concat", args);
            }
            (TypeTag::Number, _) => ValidType::number(call.max_decimal_places()),
            (TypeTag::Date, _) => lhs,
            (TypeTag::Duration, TypeTag::Date) => rhs,
            _ => ValidType::duration(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        binary("add", args, QueryExpression::Add)
    }
}

/// Register the + operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(AddFunction));
}
