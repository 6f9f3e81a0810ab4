//! ROUND function - rounds half away from zero to a number of places

use super::{ArgChecker, Function, FunctionRegistryBuilder, FunctionSignature, TypingCall};
use crate::ast::{Expression, ExpressionKind};
use crate::error::{Error, Result};
use crate::types::context::DispatchContext;
use crate::types::data_type::{TypeTag, ValidType};
use crate::types::Value;
use crate::types::expression::{QueryExpression, ScalarFunction};

pub struct RoundFunction;

impl Function for RoundFunction {
    fn signature(&self) -> &FunctionSignature {
        static SIGNATURE: FunctionSignature = FunctionSignature::exact("round", 2);
        &SIGNATURE
    }

    fn arg_checker(&self, _index: usize) -> ArgChecker {
        ArgChecker::Only(&[TypeTag::Number])
    }

    fn type_function(&self, call: TypingCall<'_>) -> Result<Expression> {
        let nullable = call.any_nullable();
        let max_places = call.config().number_max_decimal_places;
        // Places are only known up front when given as a literal
        let places = match call.args()[1].kind() {
            ExpressionKind::IntegerLiteral(places) => (*places).clamp(0, max_places as i64) as u32,
            _ => max_places,
        };
        call.with_valid_type(ValidType::number(places).with_nullable(nullable))
    }

    fn to_query(
        &self,
        args: Vec<QueryExpression>,
        node: &Expression,
        _context: &DispatchContext<'_>,
    ) -> Result<QueryExpression> {
        let [number, places]: [QueryExpression; 2] = args
            .try_into()
            .map_err(|_| Error::ExecutionError("round expects two arguments".into()))?;
        let typed_places = node
            .valid_type()
            .and_then(ValidType::decimal_places)
            .map_or(0, i64::from);
        let typed_places = QueryExpression::Value(Value::Integer(typed_places));

        // Runtime places are held to the range the result was typed with
        let places = match node.args().get(1).map(Expression::kind) {
            Some(ExpressionKind::IntegerLiteral(_)) => typed_places,
            _ => QueryExpression::Function(
                ScalarFunction::Least,
                vec![
                    QueryExpression::Function(
                        ScalarFunction::Greatest,
                        vec![places, QueryExpression::Value(Value::Integer(0))],
                    ),
                    typed_places,
                ],
            ),
        };
        Ok(QueryExpression::Function(ScalarFunction::Round, vec![number, places]))
    }
}

/// Register the ROUND function
pub fn register(builder: &mut FunctionRegistryBuilder) {
    builder.register(Box::new(RoundFunction));
}

#[cfg(test)]
mod tests {
    use crate::test_utils::{eval, typed};
    use crate::types::data_type::ValidType;
    use crate::types::Value;
    use rust_decimal::Decimal;

    #[test]
    fn test_round_places() {
        assert_eq!(typed("round(1.2345, 2)").valid_type(), Some(&ValidType::number(2)));
        assert_eq!(typed("round(1.2345, 9)").valid_type(), Some(&ValidType::number(5)));
        assert_eq!(
            typed("round(1.2345, field('quantity'))").valid_type(),
            Some(&ValidType::number(5))
        );
    }

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(eval("round(2.5, 0)"), Value::Decimal(Decimal::from(3)));
        assert_eq!(eval("round(0 - 2.5, 0)"), Value::Decimal(Decimal::from(-3)));
        assert_eq!(eval("round(field('price'), 1)").to_string(), "12.5");
    }

    #[test]
    fn test_runtime_places_stay_within_typed_places() {
        // quantity is 3 in the fixture row, the cap is 5
        assert_eq!(
            eval("round(1.23456789, field('quantity') * 4)").to_string(),
            "1.23457"
        );
        assert_eq!(eval("round(2.5, 0 - field('quantity'))"), Value::Decimal(Decimal::from(3)));
        assert_eq!(eval("round(1.23456789, 0 - 2)").to_string(), "1");
        assert_eq!(
            crate::test_utils::compile("round(1.5, 9)").to_string(),
            "ROUND(1.5, 5)"
        );
    }
}
