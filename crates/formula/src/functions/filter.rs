//! FILTER function - keeps the linked values whose condition holds
//!
//! Not an aggregate: the result is still one value per linked row, and the
//! aggregate it ends up in applies the condition as its filter.

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{InvalidKind, TypeTag};
use crate::types::expression::QueryExpression;

pub struct FilterFunction;

impl Function for FilterFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("filter", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Any,
            _ => ArgChecker::Only(&[TypeTag::Boolean]),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        if !call.args()[0].many() {
            return call.with_invalid_type(
                InvalidKind::Other,
                "the first argument given to the function filter must be a lookup or link field",
            );
        }
        let result = call.arg_type(0).clone().with_nullable(true);
        call.with_valid_type(result)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [value, condition] = exact_args::<2>("filter", args)?;
        Ok(QueryExpression::Filtered {
            value: Box::new(value),
            condition: Box::new(condition),
        })
    }
}

/// Register the FILTER function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(FilterFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{compile, eval, typed};
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_filter_stays_many() {
        let expr = typed("filter(lookup('tasks', 'hours'), lookup('tasks', 'done'))");
        assert!(expr.many());
        assert!(!typed("filter(field('price'), true)").is_valid());
    }

    #[test]
    fn test_filter_becomes_aggregate_filter() {
        let query = compile("sum(filter(lookup('tasks', 'hours'), lookup('tasks', 'done')))");
        assert!(query.to_string().contains("FILTER (WHERE field_20.field_104)"));
        assert_eq!(
            eval("sum(filter(lookup('tasks', 'hours'), lookup('tasks', 'done')))"),
            Value::Decimal(Decimal::new(25, 1))
        );
        assert_eq!(
            eval("count(filter(lookup('tasks', 'title'), lookup('tasks', 'done')))"),
            Value::Integer(2)
        );
    }
}
