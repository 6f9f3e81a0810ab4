//! Common test utilities for formula integration tests
#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use proven_formula::types::schema::{Field, FieldKind, Table};
use proven_formula::{
    CompiledFormula, DispatchContext, Expression, FormulaConfig, FormulaEngine, FunctionRegistry,
    QueryExpression, Row, Schema, ValidType, Value, evaluate,
};
use rust_decimal::Decimal;

/// Test context holding the engine, a projects/tasks schema and a pinned clock
pub struct TestContext {
    pub engine: FormulaEngine<'static>,
    pub schema: Schema,
    pub instant: DateTime<Utc>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(FormulaConfig::for_testing())
    }

    pub fn with_config(config: FormulaConfig) -> Self {
        Self {
            engine: FormulaEngine::new(config),
            schema: schema(),
            instant: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    pub fn context(&self) -> DispatchContext<'static> {
        DispatchContext::new("projects", self.instant)
    }

    /// Type an expression against the projects table
    pub fn typed(&self, expr: Expression) -> Expression {
        let provider = self.schema.provider("projects").unwrap();
        self.engine.type_expression(expr, &provider).unwrap()
    }

    pub fn compile(&self, expr: Expression) -> QueryExpression {
        let typed = self.typed(expr);
        self.engine.compile_expression(&typed, &self.context()).unwrap()
    }

    pub fn compile_field(&self, expr: Expression) -> CompiledFormula {
        let typed = self.typed(expr);
        self.engine.compile_field(&typed, &self.context()).unwrap()
    }

    /// Store a formula field on the projects table
    pub fn add_formula(&mut self, id: u64, name: &str, expr: Expression) {
        let provider = self.schema.provider("projects").unwrap();
        let stored = self.engine.type_field_expression(expr, &provider).unwrap();
        self.schema
            .table_mut("projects")
            .unwrap()
            .add_field(Field::new(id, name, FieldKind::Formula { expression: stored }))
            .unwrap();
    }

    /// Move a projects field to the trash
    pub fn trash_field(&mut self, name: &str) {
        let table = self.schema.table_mut("projects").unwrap();
        let field = table.get_field(name).cloned().unwrap().trashed();
        table.set_field(field);
    }

    /// Error message of an expression expected to type as invalid
    pub fn invalid_message(&self, expr: Expression) -> String {
        let typed = self.typed(expr);
        typed
            .expression_type()
            .and_then(|t| t.error())
            .unwrap_or_else(|| panic!("{} should be invalid", typed))
            .to_string()
    }

    /// Compile as a field definition and run it against `row`
    pub fn eval_field(&self, expr: Expression, row: &Row) -> Value {
        let compiled = self.compile_field(expr);
        evaluate(&compiled.query, row).unwrap()
    }

    pub fn eval(&self, expr: Expression, row: &Row) -> Value {
        evaluate(&self.compile(expr), row).unwrap()
    }
}

pub fn setup_test() -> TestContext {
    TestContext::new()
}

/// Projects (fields 1-20) linked to tasks (fields 101-104)
pub fn schema() -> Schema {
    let value = |id, name: &str, valid: ValidType| Field::new(id, name, FieldKind::Value(valid));
    let tasks = [
        value(101, "title", ValidType::text()).primary(),
        value(102, "hours", ValidType::number(1).with_nullable(true)),
        value(103, "labels", ValidType::array(ValidType::text())),
        value(104, "done", ValidType::boolean()),
    ]
    .into_iter()
    .try_fold(Table::new("tasks"), Table::with_field)
    .unwrap();
    let projects = [
        value(1, "name", ValidType::text()).primary(),
        value(2, "notes", ValidType::text().with_nullable(true)),
        value(3, "price", ValidType::number(2).with_nullable(true)),
        value(4, "quantity", ValidType::number(0)),
        value(5, "started", ValidType::date(true)),
        value(6, "divisor", ValidType::number(0).with_nullable(true)),
        Field::new(
            20,
            "tasks",
            FieldKind::Link {
                table: "tasks".into(),
            },
        ),
    ]
    .into_iter()
    .try_fold(Table::new("projects"), Table::with_field)
    .unwrap();
    Schema::new().with_table(tasks).with_table(projects)
}

pub fn task(id: i64, title: &str, hours: Option<Decimal>, done: bool) -> Row {
    Row::new(id)
        .with_value("field_101", Value::text(title))
        .with_value("field_102", hours.map_or(Value::Null, Value::Decimal))
        .with_value("field_103", Value::Array(vec![]))
        .with_value("field_104", Value::Boolean(done))
}

/// Project 7 with two tasks
pub fn project_row() -> Row {
    Row::new(7)
        .with_value("field_1", Value::text("Apollo"))
        .with_value("field_2", Value::Null)
        .with_value("field_3", Value::Decimal(Decimal::new(1250, 2)))
        .with_value("field_4", Value::Integer(3))
        .with_value(
            "field_5",
            Value::Timestamp(
                NaiveDate::from_ymd_opt(2024, 4, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap()
                    .and_utc(),
            ),
        )
        .with_value("field_6", Value::Integer(2))
        .with_links(
            "field_20",
            vec![
                task(11, "Design", Some(Decimal::new(25, 1)), true),
                task(12, "Build", Some(Decimal::new(40, 1)), false),
            ],
        )
}

// Expression builders

pub fn call(name: &str, args: Vec<Expression>) -> Expression {
    FunctionRegistry::global().call(name, args).unwrap()
}

pub fn int(value: i64) -> Expression {
    Expression::integer_literal(value)
}

pub fn dec(token: &str) -> Expression {
    Expression::parse_decimal_literal(token).unwrap()
}

pub fn text(value: &str) -> Expression {
    Expression::string_literal(value, &FormulaConfig::for_testing()).unwrap()
}

pub fn boolean(value: bool) -> Expression {
    Expression::boolean_literal(value)
}

pub fn field(name: &str) -> Expression {
    Expression::field(name)
}

pub fn lookup(link: &str, target: &str) -> Expression {
    Expression::lookup(link, target)
}
