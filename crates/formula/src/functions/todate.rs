//! TODATE function - parses text with a date pattern, null when it does not match

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct ToDateFunction;

impl Function for ToDateFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("todate", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::date(false).with_nullable(true))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::ParseDate, args))
    }
}

/// Register the TODATE function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ToDateFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;
    use chrono::NaiveDate;

    #[test]
    fn test_todate() {
        assert_eq!(
            eval("todate('24/12/2023', 'DD/MM/YYYY')"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 12, 24).unwrap())
        );
        assert_eq!(eval("todate('yesterday', 'YYYY-MM-DD')"), Value::Null);
    }
}
