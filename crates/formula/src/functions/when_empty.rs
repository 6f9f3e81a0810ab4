//! WHEN_EMPTY function - a fallback for blank values

use super::{
    ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args,
    same_tag_as, typed_arg,
};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;

pub struct WhenEmptyFunction;

impl Function for WhenEmptyFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("when_empty", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Any,
            _ => ArgChecker::DependsOn(same_tag_as::<0>),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.arg_type(1).nullable;
        let result = match call.arg_type(0).decimal_places() {
            Some(_) => ValidType::number(call.max_decimal_places()),
            None => call.arg_type(0).clone(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [value, fallback] = exact_args::<2>("when_empty", args)?;
        let blank = typed_arg(node, 0)?.is_blank(value.clone());
        Ok(QueryExpression::Case {
            when_clauses: vec![(blank, fallback)],
            else_clause: Some(Box::new(value)),
        })
    }
}

/// Register the WHEN_EMPTY function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(WhenEmptyFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;

    #[test]
    fn test_when_empty() {
        assert_eq!(eval("when_empty(field('notes'), 'none')"), Value::text("none"));
        assert_eq!(eval("when_empty(field('name'), 'none')"), Value::text("Apollo"));
        assert!(!typed("when_empty(field('notes'), 'none')").valid_type().unwrap().nullable);
        assert!(!typed("when_empty(field('notes'), 1)").is_valid());
    }
}
