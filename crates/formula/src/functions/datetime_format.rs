//! DATETIME_FORMAT function - renders a date with a pattern

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct DatetimeFormatFunction;

impl Function for DatetimeFormatFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("datetime_format", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Date]),
            _ => ArgChecker::Only(&[TypeTag::Text]),
        }
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
        Ok(QueryExpression::Function(ScalarFunction::FormatDate, args))
    }
}

/// Register the DATETIME_FORMAT function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(DatetimeFormatFunction));
}
