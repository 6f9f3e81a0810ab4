//! LEAST function - smallest non-null argument

use super::{
    ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, same_tag_as,
};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct LeastFunction;

impl Function for LeastFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::new("least", 2, None);
        &SIGNATURE
    }

    fn arg_checker(&self, index: usize) -> ArgChecker {
        match index {
            0 => ArgChecker::Only(&[TypeTag::Number, TypeTag::Text, TypeTag::Date, TypeTag::Duration]),
            _ => ArgChecker::DependsOn(same_tag_as::<0>),
        }
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        // Null arguments are skipped, so only all-null gives null
        let nullable = call.arg_types().iter().all(|t| t.nullable);
        let result = match call.arg_type(0).tag() {
            TypeTag::Number => ValidType::number(call.max_decimal_places()),
            _ => call.arg_type(0).clone(),
        };
        call.with_valid_type(result.with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(QueryExpression::Function(ScalarFunction::Least, args))
    }
}

/// Register the LEAST function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(LeastFunction));
}
