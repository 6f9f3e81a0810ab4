//! TODAY function - the current date, pinned per compilation

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct TodayFunction;

impl Function for TodayFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("today", 0).periodic();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::date(false))
    }

    fn to_query(
        &self,
        _args: Vec<QueryExpression>,
        _node: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Value(Value::Date(
            context.current_instant().date_naive(),
        )))
    }
}

/// Register the TODAY function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(TodayFunction));
}
