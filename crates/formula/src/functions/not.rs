//! NOT function

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct NotFunction;

impl Function for NotFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("not", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Boolean])
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
        let [arg] = exact_args::<1>("not", args)?;
        Ok(QueryExpression::Not(Box::new(arg)))
    }
}

/// Register the NOT function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(NotFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;

    #[test]
    fn test_not() {
        assert_eq!(eval("not(field('done'))"), Value::Boolean(false));
        assert_eq!(eval("or(not(field('done')), true)"), Value::Boolean(true));
    }
}
