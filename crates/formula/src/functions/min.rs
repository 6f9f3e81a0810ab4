//! MIN aggregate - smallest value over linked rows

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::TypeTag;
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct MinFunction;

impl Function for MinFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("min", 1).aggregate();
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number, TypeTag::Text, TypeTag::Date, TypeTag::Duration])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        // Null when nothing is linked
        let result = call.arg_type(0).clone().with_nullable(true);
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("min", args)?;
        Ok(QueryExpression::aggregate(AggregateFunction::Min, arg))
    }
}

/// Register the MIN aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(MinFunction));
}
