//! UPPER function - converts text to uppercase

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct UpperFunction;

impl Function for UpperFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("upper", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::text().with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Upper, args))
    }
}

/// Register the UPPER function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(UpperFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;

    #[test]
    fn test_upper() {
        assert_eq!(eval("upper(field('name'))"), Value::text("APOLLO"));
        assert_eq!(eval("upper(field('notes'))"), Value::Null);
        assert!(typed("upper(field('notes'))").valid_type().unwrap().nullable);
    }

    #[test]
    fn test_upper_rejects_numbers() {
        assert_eq!(
            typed("upper(1)").expression_type().unwrap().error(),
            Some(
                "argument number 1 given to function upper was of type number but the only usable type for this argument is text"
            )
        );
    }
}
