//! FLOOR function - largest whole number not above the input

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct FloorFunction;

impl Function for FloorFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("floor", 1);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        call.with_valid_type(ValidType::number(0).with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Floor, args))
    }
}

/// Register the FLOOR function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(FloorFunction));
}
