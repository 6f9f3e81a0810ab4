//! JOIN aggregate - concatenates linked texts with a separator

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall, exact_args};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::context::DispatchContext;
use crate::types::data_type::{InvalidKind, TypeTag, ValidType};
use crate::types::expression::{AggregateFunction, QueryExpression};

pub struct JoinFunction;

impl Function for JoinFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("join", 2).aggregate();
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Text])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        if call.args()[1].many() {
            return call.with_invalid_type(
                InvalidKind::Other,
                "the separator given to the function join must be the same for every linked row",
            );
        }
        call.with_valid_type(ValidType::text().with_nullable(true))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        _node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [values, separator] = exact_args::<2>("join", args)?;
        Ok(QueryExpression::aggregate(
            AggregateFunction::Join(Box::new(separator)),
            values,
        ))
    }
}

/// Register the JOIN aggregate
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(JoinFunction));
}
