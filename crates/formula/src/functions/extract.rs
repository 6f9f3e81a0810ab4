//! Date part functions: year, month, day, hour, minute, second

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::expression::{DatePart, QueryExpression, ScalarFunction};

pub struct ExtractFunction {
    signature: FunctionSignature,
    part: DatePart,
}

impl ExtractFunction {
    fn new(name: &'static str, part: DatePart) -> Self {
        Self {
            signature: FunctionSignature::exact(name, 1),
            part,
        }
    }
}

impl Function for ExtractFunction {
    fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Date])
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
        Ok(QueryExpression::Function(
            ScalarFunction::Extract(self.part),
            args,
        ))
    }
}

/// Register the date part functions
pub fn register(builder: &mut FunctionRegistryBuilder) {
    for (name, part) in [
        ("year", DatePart::Year),
        ("month", DatePart::Month),
        ("day", DatePart::Day),
        ("hour", DatePart::Hour),
        ("minute", DatePart::Minute),
        ("second", DatePart::Second),
    ] {
        builder.register(Box::new(ExtractFunction::new(name, part)));
    }
}
