//! COUNT aggregate - number of non-null values over linked rows

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct CountFunction;

impl Function for CountFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("count", 1).aggregate();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::number(0))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("count", args)?;
        Ok(QueryExpression::aggregate(AggregateFunction::Count, arg))
    }
}

/// Register the COUNT aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(CountFunction));
}
