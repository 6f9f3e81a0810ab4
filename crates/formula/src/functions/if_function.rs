//! IF function - picks one of two values of the same type

use super::{
    ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args,
    same_tag_as,
};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::QueryExpression;

pub struct IfFunction;

impl Function for IfFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("if", 3);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Boolean]),
            1 => ArgChecker::Any,
            _ => ArgChecker::DependsOn(same_tag_as::<1>),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let (then, otherwise) = (call.arg_type(1), call.arg_type(2));
        let nullable = then.nullable || otherwise.nullable;
        let result = match then.decimal_places().zip(otherwise.decimal_places()) {
            Some((a, b)) => ValidType::number(a.max(b)),
            None => then.clone(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [condition, then, otherwise] = exact_args::<3>("if", args)?;
        Ok(QueryExpression::Case {
            when_clauses: vec![(condition, then)],
            else_clause: Some(Box::new(otherwise)),
        })
    }
}

/// Register the IF function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(IfFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::data_type::ValidType;
    use crate::types::Value;

    #[test]
    fn test_if_branches() {
        assert_eq!(eval("if(field('done'), 'yes', 'no')"), Value::text("yes"));
        assert_eq!(eval("if(field('quantity') > 5, 1, 2)"), Value::Integer(2));
    }

    #[test]
    fn test_if_types() {
        let expr = typed("if(true, 1, field('price'))");
        assert_eq!(expr.valid_type(), Some(&ValidType::number(2).with_nullable(true)));

        let expr = typed("if(true, 1, 'a')");
        assert_eq!(
            expr.expression_type().unwrap().error(),
            Some(
                "argument number 3 given to function if was of type text but the only usable type for this argument is number"
            )
        );
    }
}
