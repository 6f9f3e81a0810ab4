//! CONCAT function - joins its arguments as text

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct ConcatFunction;

impl Function for ConcatFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature =
            FunctionSignature::new("concat", 1, None).coerce_nullable_args();
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        if call.arg_types().iter().all(|t| t.tag() == TypeTag::Text) {
            return call.with_valid_type(ValidType::text());
        }

        // Convert the other arguments and type the call again
        let args = call
            .args()
            .iter()
            .map(|arg| match arg.valid_type() {
                Some(valid) if valid.tag() == TypeTag::Text => Ok(arg.clone()),
                _ => call.type_as("totext", vec![arg.clone()]),
            })
            .collect::<Result<Vec<_>>>()?;
        call.type_as("concat", args)
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Concat, args))
    }
}

/// Register the CONCAT function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ConcatFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::data_type::ValidType;
    use crate::types::Value;

    #[test]
    fn test_nullable_text_is_coalesced() {
        let expr = typed("concat(field('name'), field('notes'))");
        assert_eq!(
            expr.to_string(),
            "concat(field('name'), coalesce(field('notes'), ''))"
        );
        assert_eq!(expr.valid_type(), Some(&ValidType::text()));
        assert_eq!(
            eval("concat(field('name'), field('notes'))"),
            Value::text("Apollo")
        );
    }

    #[test]
    fn test_other_types_are_converted() {
        let expr = typed("concat('qty: ', field('quantity'))");
        assert_eq!(expr.to_string(), "concat('qty: ', totext(field('quantity')))");
        assert_eq!(eval("concat('qty: ', field('quantity'))"), Value::text("qty: 3"));
        assert_eq!(eval("concat(field('price'), '$')"), Value::text("12.50$"));
    }
}
