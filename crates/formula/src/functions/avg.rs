//! AVG aggregate - mean over linked rows, ignoring nulls

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct AvgFunction;

impl Function for AvgFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("avg", 1).aggregate();
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number, TypeTag::Duration])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let result = match call.arg_type(0).tag() {
            TypeTag::Duration => ValidType::duration(),
            _ => ValidType::number(call.config().number_max_decimal_places),
        };
        call.with_valid_type(result.with_nullable(true))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("avg", args)?;
        Ok(QueryExpression::aggregate(AggregateFunction::Avg, arg))
    }
}

/// Register the AVG aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(AvgFunction));
}
