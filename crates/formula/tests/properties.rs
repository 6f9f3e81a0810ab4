//! Property tests for flag propagation and field-level wrapper elision

mod common;

use common::{call, field, int, lookup, setup_test};
use proptest::prelude::*;
use proven_formula::{Expression, QueryExpression};

/// Shape of a numeric formula over a host-row field and a lookup
#[derive(Clone, Debug)]
enum Shape {
    Int(i64),
    Price,
    Hours,
    Add(Box<Shape>, Box<Shape>),
    Multiply(Box<Shape>, Box<Shape>),
    Abs(Box<Shape>),
    Sum(Box<Shape>),
}

impl Shape {
    fn build(&self) -> Expression {
        match self {
            Shape::Int(value) => int(*value),
            Shape::Price => field("price"),
            Shape::Hours => lookup("tasks", "hours"),
            Shape::Add(lhs, rhs) => call("add", vec![lhs.build(), rhs.build()]),
            Shape::Multiply(lhs, rhs) => call("multiply", vec![lhs.build(), rhs.build()]),
            Shape::Abs(inner) => call("abs", vec![inner.build()]),
            Shape::Sum(inner) => call("sum", vec![inner.build()]),
        }
    }

    fn many(&self) -> bool {
        match self {
            Shape::Int(_) | Shape::Price | Shape::Sum(_) => false,
            Shape::Hours => true,
            Shape::Add(lhs, rhs) | Shape::Multiply(lhs, rhs) => lhs.many() || rhs.many(),
            Shape::Abs(inner) => inner.many(),
        }
    }

    fn valid(&self) -> bool {
        match self {
            Shape::Int(_) | Shape::Price | Shape::Hours => true,
            Shape::Add(lhs, rhs) | Shape::Multiply(lhs, rhs) => lhs.valid() && rhs.valid(),
            Shape::Abs(inner) => inner.valid(),
            Shape::Sum(inner) => inner.valid() && inner.many(),
        }
    }
}

fn shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        (-100i64..100).prop_map(Shape::Int),
        Just(Shape::Price),
        Just(Shape::Hours),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(l, r)| Shape::Add(Box::new(l), Box::new(r))),
            (inner.clone(), inner.clone())
                .prop_map(|(l, r)| Shape::Multiply(Box::new(l), Box::new(r))),
            inner.clone().prop_map(|i| Shape::Abs(Box::new(i))),
            inner.prop_map(|i| Shape::Sum(Box::new(i))),
        ]
    })
}

fn unscoped_aggregates(query: &QueryExpression) -> usize {
    let own = match query {
        QueryExpression::Aggregate(agg) if agg.scope.is_none() => 1,
        _ => 0,
    };
    own + query
        .children()
        .into_iter()
        .map(unscoped_aggregates)
        .sum::<usize>()
}

proptest! {
    #[test]
    fn test_many_follows_lookups_until_aggregated(shape in shape()) {
        let ctx = setup_test();
        let typed = ctx.typed(shape.build());
        prop_assert_eq!(typed.is_valid(), shape.valid());
        if shape.valid() {
            prop_assert_eq!(typed.many(), shape.many());
        }
    }

    #[test]
    fn test_valid_trees_compile_with_scoped_aggregates(shape in shape()) {
        prop_assume!(shape.valid());
        let ctx = setup_test();
        let typed = ctx.typed(shape.build());
        let query = ctx.engine.compile_expression(&typed, &ctx.context()).unwrap();
        prop_assert_eq!(unscoped_aggregates(&query), 0);
        prop_assert!(query.linked_fields().is_empty());
    }

    #[test]
    fn test_field_guard_is_elided_on_reference(shape in shape()) {
        prop_assume!(shape.valid() && !shape.many());
        let ctx = setup_test();
        let provider = ctx.schema.provider("projects").unwrap();
        let typed = ctx.engine.type_expression(shape.build(), &provider).unwrap();
        let stored = ctx.engine.type_field_expression(shape.build(), &provider).unwrap();
        prop_assert!(stored.is_wrapper_call());

        let referenced = ctx.engine.reference_expression(stored.clone());
        prop_assert_eq!(referenced.to_string(), typed.to_string());
        prop_assert_eq!(
            referenced.valid_type().map(|t| t.tag()),
            typed.valid_type().map(|t| t.tag())
        );

        // Guarding a stored expression again changes nothing
        let restored = ctx.engine.type_field_expression(stored.clone(), &provider).unwrap();
        prop_assert_eq!(restored, stored);
    }
}
