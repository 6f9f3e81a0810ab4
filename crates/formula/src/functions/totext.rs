//! TOTEXT function - renders any value the way its field displays it

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args, typed_arg};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeKind, ValidType};
use crate::types::expression::{CastTarget, QueryExpression, ScalarFunction};

pub struct ToTextFunction;

impl Function for ToTextFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("totext", 1);
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::text().with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [arg] = exact_args::<1>("totext", args)?;
        let query = match &typed_arg(node, 0)?.kind {
            TypeKind::Number { decimal_places } => QueryExpression::Cast(
                Box::new(QueryExpression::Cast(
                    Box::new(arg),
                    CastTarget::Decimal {
                        places: *decimal_places,
                    },
                )),
                CastTarget::Text,
            ),
            TypeKind::Date {
                include_time,
                date_format,
                time_format,
            } => {
                let pattern = if *include_time {
                    format!("{} {}", date_format.pattern(), time_format.pattern())
                } else {
                    date_format.pattern().to_string()
                };
                QueryExpression::Function(
                    ScalarFunction::FormatDate,
                    vec![arg, QueryExpression::Value(Value::Text(pattern))],
                )
            }
            TypeKind::Text => arg,
            _ => QueryExpression::Cast(Box::new(arg), CastTarget::Text),
        };
        Ok(query)
    }
}

/// Register the TOTEXT function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(ToTextFunction));
}
