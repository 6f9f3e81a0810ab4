//! Compilation: determinism, field preparation, references to formula fields

mod common;

use common::{call, field, int, lookup, project_row, setup_test};
use proven_formula::types::{AggregateFunction, CastTarget};
use proven_formula::{
    DispatchContext, ExpressionKind, FormulaConfig, PersistedType, QueryExpression, Value,
    evaluate,
};
use rust_decimal::Decimal;

fn hours_report() -> proven_formula::Expression {
    call(
        "add",
        vec![
            call("sum", vec![lookup("tasks", "hours")]),
            call(
                "count",
                vec![call(
                    "filter",
                    vec![lookup("tasks", "title"), lookup("tasks", "done")],
                )],
            ),
        ],
    )
}

#[test]
fn test_compiling_twice_is_identical() {
    let ctx = setup_test();
    let typed = ctx.typed(hours_report());
    let first = ctx.engine.compile_expression(&typed, &ctx.context()).unwrap();
    let second = ctx.engine.compile_expression(&typed, &ctx.context()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn test_aliases_depend_on_context() {
    let ctx = setup_test();
    let typed = ctx.typed(hours_report());
    let query = ctx.engine.compile_expression(&typed, &ctx.context()).unwrap();
    let aliases = query.subquery_aliases();
    assert_eq!(aliases.len(), 2);
    assert_ne!(aliases[0], aliases[1]);

    let other_table = DispatchContext::new("archive", ctx.instant);
    let moved = ctx.engine.compile_expression(&typed, &other_table).unwrap();
    assert_ne!(moved.subquery_aliases(), aliases);
}

#[test]
fn test_filter_becomes_aggregate_clause() {
    let ctx = setup_test();
    let query = ctx.compile(hours_report());
    let text = query.to_string();
    assert!(text.contains("COUNT(field_20.field_101) FILTER (WHERE field_20.field_104)"), "{}", text);
    assert_eq!(evaluate(&query, &project_row()).unwrap(), Value::Decimal(Decimal::new(75, 1)));
}

#[test]
fn test_number_field_is_cast_to_its_places() {
    let ctx = setup_test();
    let compiled = ctx.compile_field(call("multiply", vec![field("price"), field("quantity")]));
    let QueryExpression::Cast(inner, CastTarget::Decimal { places }) = &compiled.query else {
        panic!("expected a cast, got {}", compiled.query);
    };
    assert_eq!(*places, 2);
    assert!(matches!(inner.as_ref(), QueryExpression::ErrorToNull(_)));
    assert_eq!(
        evaluate(&compiled.query, &project_row()).unwrap().to_string(),
        "37.50"
    );
}

#[test]
fn test_field_errors_surface_when_guard_is_disabled() {
    let ctx = common::TestContext::with_config(
        FormulaConfig::for_testing().with_wrap_field_errors(false),
    );
    let compiled = ctx.compile_field(call("divide", vec![int(1), int(0)]));
    assert!(!compiled.expression.is_wrapper_call());
    assert!(evaluate(&compiled.query, &project_row()).is_err());
}

#[test]
fn test_metadata_round_trips_through_storage() {
    let ctx = setup_test();
    for expr in [
        call("multiply", vec![field("price"), field("quantity")]),
        call("upper", vec![lookup("tasks", "title")]),
        call("now", vec![]),
        call("sum", vec![field("name")]),
    ] {
        let typed = ctx.typed(expr);
        let expression_type = typed.expression_type().unwrap();
        let json = expression_type.to_persisted().to_json().unwrap();
        let restored = PersistedType::from_json(&json)
            .unwrap()
            .to_expression_type()
            .unwrap();
        if expression_type.is_valid() {
            assert_eq!(&restored, expression_type, "{}", json);
        } else {
            assert_eq!(restored.error(), expression_type.error());
        }
    }
}

#[test]
fn test_formula_reference_drops_outer_guard_only() {
    let mut ctx = setup_test();
    ctx.add_formula(
        30,
        "safe_ratio",
        call(
            "add",
            vec![
                call("error_to_null", vec![call("divide", vec![field("price"), field("divisor")])]),
                int(1),
            ],
        ),
    );

    let stored = &ctx.schema.table("projects").unwrap().get_field("safe_ratio").unwrap().kind;
    let proven_formula::types::FieldKind::Formula { expression } = stored else {
        panic!("expected a formula field");
    };
    assert!(expression.is_wrapper_call());

    let referenced = ctx.typed(call("multiply", vec![field("safe_ratio"), int(2)]));
    let ExpressionKind::FieldReference(reference) = referenced.args()[0].kind() else {
        panic!("expected a reference");
    };
    let Some(proven_formula::ast::ReferenceBinding::Inline(inlined)) = &reference.binding else {
        panic!("expected an inlined formula");
    };
    assert!(!inlined.is_wrapper_call());
    assert_eq!(
        inlined.to_string(),
        "(error_to_null((field('price') / field('divisor'))) + 1)"
    );
    assert_eq!(
        ctx.engine.reference_expression(expression.clone()).to_string(),
        inlined.to_string()
    );

    let zero = project_row().with_value("field_6", Value::Integer(0));
    assert_eq!(
        ctx.eval(call("multiply", vec![field("safe_ratio"), int(2)]), &zero),
        Value::Null
    );
}

#[test]
fn test_collapse_uses_flat_arrays_for_array_lookups() {
    let ctx = setup_test();
    let query = ctx.compile(lookup("tasks", "labels"));
    let QueryExpression::Aggregate(agg) = &query else {
        panic!("expected an aggregate, got {}", query);
    };
    assert_eq!(agg.function, AggregateFunction::ArrayAggNoNesting);
}

#[test]
fn test_filter_under_scalar_calls_drops_rows() {
    let ctx = setup_test();
    let done_titles = || {
        call(
            "filter",
            vec![lookup("tasks", "title"), lookup("tasks", "done")],
        )
    };

    assert_eq!(
        ctx.eval(call("upper", vec![done_titles()]), &project_row()),
        Value::Array(vec![Value::text("DESIGN")])
    );
    assert_eq!(
        ctx.eval(
            call("count", vec![call("isblank", vec![done_titles()])]),
            &project_row()
        ),
        Value::Integer(1)
    );

    let done_hours = call(
        "filter",
        vec![lookup("tasks", "hours"), lookup("tasks", "done")],
    );
    assert_eq!(
        ctx.eval(
            call("sum", vec![call("add", vec![done_hours, int(1)])]),
            &project_row()
        ),
        Value::Decimal(Decimal::new(35, 1))
    );
}
