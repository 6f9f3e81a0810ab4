//! SUM aggregate - total over linked rows, zero when there are none

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args, typed_arg};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::TypeTag;
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct SumFunction;

impl Function for SumFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("sum", 1).aggregate();
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number, TypeTag::Duration])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let result = call.arg_type(0).clone().with_nullable(false);
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("sum", args)?;
        let zero = match typed_arg(node, 0)?.tag() {
            TypeTag::Duration => Value::Duration(0),
            _ => Value::Integer(0),
        };
        Ok(QueryExpression::Coalesce(vec![
            QueryExpression::aggregate(AggregateFunction::Sum, arg),
            QueryExpression::Value(zero),
        ]))
    }
}

/// Register the SUM aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(SumFunction));
}
