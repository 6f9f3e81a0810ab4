//! ARRAY_AGG aggregates - collect linked values into one array

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct ArrayAggFunction;

impl Function for ArrayAggFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("array_agg", 1).aggregate();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let result = ValidType::array(call.arg_type(0).clone());
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("array_agg", args)?;
        Ok(QueryExpression::aggregate(AggregateFunction::ArrayAgg, arg))
    }
}

/// Collects arrays into one flat array instead of an array of arrays
pub struct ArrayAggNoNestingFunction;

impl Function for ArrayAggNoNestingFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature =
            FunctionSignature::exact("array_agg_no_nesting", 1).aggregate();
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Array])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let result = call.arg_type(0).clone().with_nullable(false);
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("array_agg_no_nesting", args)?;
        Ok(QueryExpression::aggregate(
            AggregateFunction::ArrayAggNoNesting,
            arg,
        ))
    }
}

/// Register the ARRAY_AGG aggregates
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ArrayAggFunction));
    builder.register(Box::new(ArrayAggNoNestingFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::data_type::{TypeTag, ValidType};
    use crate::types::Value;

    #[test]
    fn test_array_agg() {
        let expr = typed("array_agg(lookup('tasks', 'title'))");
        assert_eq!(expr.valid_type(), Some(&ValidType::array(ValidType::text())));
        assert_eq!(
            eval("array_agg(lookup('tasks', 'title'))"),
            Value::Array(vec![
                Value::text("Design"),
                Value::text("Build"),
                Value::text("Test"),
            ])
        );
    }

    #[test]
    fn test_no_nesting_flattens() {
        let expr = typed("array_agg_no_nesting(lookup('tasks', 'labels'))");
        assert_eq!(expr.valid_type().unwrap().tag(), TypeTag::Array);
        assert_eq!(
            eval("array_agg_no_nesting(lookup('tasks', 'labels'))"),
            Value::Array(vec![
                Value::text("ui"),
                Value::text("ux"),
                Value::text("backend"),
            ])
        );
    }
}
