//! MAX aggregate - largest value over linked rows

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::TypeTag;
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct MaxFunction;

impl Function for MaxFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("max", 1).aggregate();
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
        let [arg] = exact_args::<1>("max", args)?;
        Ok(QueryExpression::aggregate(AggregateFunction::Max, arg))
    }
}

/// Register the MAX aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(MaxFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::eval;
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_min_and_max() {
        assert_eq!(eval("max(lookup('tasks', 'hours'))"), Value::Decimal(Decimal::new(40, 1)));
        assert_eq!(eval("min(lookup('tasks', 'hours'))"), Value::Decimal(Decimal::new(25, 1)));
        assert_eq!(eval("min(lookup('tasks', 'title'))"), Value::text("Build"));
    }
}
