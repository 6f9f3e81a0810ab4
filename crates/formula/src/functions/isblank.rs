//! ISBLANK function - whether a value is empty for its type

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args, typed_arg};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct IsBlankFunction;

impl Function for IsBlankFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("isblank", 1);
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::boolean())
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("isblank", args)?;
        Ok(typed_arg(node, 0)?.is_blank(arg))
    }
}

/// Register the ISBLANK function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(IsBlankFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;

    #[test]
    fn test_blank_per_type() {
        assert_eq!(eval("isblank(field('notes'))"), Value::Boolean(true));
        assert_eq!(eval("isblank('')"), Value::Boolean(true));
        assert_eq!(eval("isblank(field('name'))"), Value::Boolean(false));
        // Zero is a value
        assert_eq!(eval("isblank(0)"), Value::Boolean(false));
        assert_eq!(eval("isblank(field('due'))"), Value::Boolean(false));
    }
}
