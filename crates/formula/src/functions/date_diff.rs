//! DATE_DIFF function - whole units between two dates

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct DateDiffFunction;

impl Function for DateDiffFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("date_diff", 3);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Text]),
            _ => ArgChecker::Only(&[TypeTag::Date]),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        // Unknown units give null
        call.with_valid_type(ValidType::number(0).with_nullable(true))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::DateDiff, args))
    }
}

/// Register the DATE_DIFF function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(DateDiffFunction));
}
