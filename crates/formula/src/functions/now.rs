//! NOW function - the current instant, pinned per compilation

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct NowFunction;

impl Function for NowFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("now", 0).periodic();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::date(true))
    }

    fn to_query(
        &self,
        _args: Vec<QueryExpression>,
        _node: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Value(Value::Timestamp(
            context.current_instant(),
        )))
    }
}

/// Register the NOW function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(NowFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{compile, eval, instant};
    use crate::types::expression::QueryExpression;
    use crate::types::Value;

    #[test]
    fn test_now_is_pinned_to_context() {
        assert_eq!(
            compile("now()"),
            QueryExpression::Value(Value::Timestamp(instant()))
        );
        assert_eq!(eval("now() - field('started') > field('estimate')"), Value::Boolean(true));
    }
}
