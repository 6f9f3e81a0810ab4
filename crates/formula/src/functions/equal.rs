//! = operator

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, binary};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

/// Checker shared by `=` and `!=`
pub(super) fn comparable_checker(index: usize) -> ArgChecker {
    match index {
        0 => ArgChecker::Only(&TypeTag::SCALARS),
        _ => ArgChecker::DependsOn(|_, types| {
            types
                .first()
                .map(|lhs| lhs.comparable_types().to_vec())
                .unwrap_or_default()
        }),
    }
}

pub struct EqualFunction;

impl Function for EqualFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("equal", 2).operator("=");
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        comparable_checker(index)
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
        binary("equal", args, QueryExpression::Equal)
    }
}

/// Register the = operator
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(EqualFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::Value;

    #[test]
    fn test_equal() {
        assert_eq!(eval("field('name') = 'Apollo'"), Value::Boolean(true));
        assert_eq!(eval("field('quantity') = 3.0"), Value::Boolean(true));
        assert_eq!(eval("field('notes') = 'x'"), Value::Null);
    }

    #[test]
    fn test_mixed_types_rejected() {
        let expr = typed("field('name') = 1");
        assert_eq!(
            expr.expression_type().unwrap().error(),
            Some(
                "argument number 2 given to operator = was of type number but the only usable type for this argument is text"
            )
        );
    }
}
