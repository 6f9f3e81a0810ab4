//! ROW_ID function - the id of the row, known only once it is inserted

use super::{Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::Expression;
use crate::error::Result;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::expression::QueryExpression;
use crate::types::row::Row;

pub struct RowIdFunction;

impl Function for RowIdFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("row_id", 0);
        &SIGNATURE
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        call.with_valid_type(ValidType::number(0).with_requires_refresh_after_insert(true))
    }

    fn to_query(
        &self,
        _args: Vec<QueryExpression>,
        _node: &Expression,
        context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        Ok(match context.row() {
            Some(row) => QueryExpression::Value(Value::Integer(row.id)),
            None => QueryExpression::column(Row::ID_COLUMN),
        })
    }
}

/// Register the ROW_ID function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(RowIdFunction));
}
