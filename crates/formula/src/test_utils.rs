//! Test helpers: a small formula reader and a shared project/task fixture

use crate::ast::{Expression, ExpressionKind};
use crate::ast::literal::parse_string_token;
use crate::config::FormulaConfig;
use crate::functions::FunctionRegistry;
use crate::planning::{QueryCompiler, prepare_field_expression};
use crate::semantic::TypingPass;
use crate::types::Value;
use crate::types::context::DispatchContext;
use crate::types::data_type::ValidType;
use crate::types::evaluator::evaluate;
use crate::types::expression::QueryExpression;
use crate::types::row::Row;
use crate::types::schema::{Field, FieldKind, Schema, Table};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

/// Read a formula written the usual way, e.g. `sum(lookup('tasks', 'hours')) * 2`.
/// Comparison binds loosest, then `+ -`, then `* /`.
pub fn parse(text: &str) -> Expression {
    let mut reader = Reader {
        chars: text.chars().collect(),
        pos: 0,
    };
    let expr = reader.comparison();
    reader.skip_whitespace();
    assert_eq!(reader.pos, reader.chars.len(), "trailing input in {}", text);
    expr
}

struct Reader {
    chars: Vec<char>,
    pos: usize,
}

impl Reader {
    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        let end = self.pos + token.chars().count();
        let matches = end <= self.chars.len()
            && self.chars[self.pos..end].iter().copied().eq(token.chars());
        if matches {
            self.pos = end;
        }
        matches
    }

    fn expect(&mut self, token: &str) {
        assert!(self.eat(token), "expected {} at {}", token, self.pos);
    }

    fn call(name: &str, args: Vec<Expression>) -> Expression {
        FunctionRegistry::global().call(name, args).unwrap()
    }

    fn comparison(&mut self) -> Expression {
        let lhs = self.additive();
        let operators = [
            ("<=", "less_than_or_equal"),
            (">=", "greater_than_or_equal"),
            ("!=", "not_equal"),
            ("=", "equal"),
            ("<", "less_than"),
            (">", "greater_than"),
        ];
        for (symbol, name) in operators {
            if self.eat(symbol) {
                let rhs = self.additive();
                return Self::call(name, vec![lhs, rhs]);
            }
        }
        lhs
    }

    fn additive(&mut self) -> Expression {
        let mut lhs = self.multiplicative();
        loop {
            let name = if self.eat("+") {
                "add"
            } else if self.eat("-") {
                "minus"
            } else {
                return lhs;
            };
            let rhs = self.multiplicative();
            lhs = Self::call(name, vec![lhs, rhs]);
        }
    }

    fn multiplicative(&mut self) -> Expression {
        let mut lhs = self.primary();
        loop {
            let name = if self.eat("*") {
                "multiply"
            } else if self.eat("/") {
                "divide"
            } else {
                return lhs;
            };
            let rhs = self.primary();
            lhs = Self::call(name, vec![lhs, rhs]);
        }
    }

    fn primary(&mut self) -> Expression {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let inner = self.comparison();
                self.expect(")");
                inner
            }
            Some('\'' | '"') => {
                let value = self.string();
                Expression::string_literal(value, &FormulaConfig::for_testing()).unwrap()
            }
            Some(c) if c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.identifier_or_call(),
            other => panic!("unexpected {:?} at {}", other, self.pos),
        }
    }

    fn string(&mut self) -> String {
        let start = self.pos;
        let quote = self.chars[start];
        let mut end = start + 1;
        while end < self.chars.len() && self.chars[end] != quote {
            if self.chars[end] == '\\' {
                end += 1;
            }
            end += 1;
        }
        self.pos = end + 1;
        let token: String = self.chars[start..self.pos].iter().collect();
        parse_string_token(&token).unwrap()
    }

    fn number(&mut self) -> Expression {
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_ascii_digit() || *c == '.')
        {
            self.pos += 1;
        }
        let token: String = self.chars[start..self.pos].iter().collect();
        if token.contains('.') {
            Expression::parse_decimal_literal(&token).unwrap()
        } else {
            Expression::parse_integer_literal(&token).unwrap()
        }
    }

    fn identifier_or_call(&mut self) -> Expression {
        let start = self.pos;
        while self
            .chars
            .get(self.pos)
            .is_some_and(|c| c.is_alphanumeric() || *c == '_')
        {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if let Ok(literal) = Expression::parse_boolean_literal(&name) {
            return literal;
        }

        self.expect("(");
        let mut args = Vec::new();
        if !self.eat(")") {
            loop {
                args.push(self.comparison());
                if self.eat(")") {
                    break;
                }
                self.expect(",");
            }
        }

        if name == "field" || name == "lookup" {
            let names: Vec<String> = args
                .iter()
                .map(|arg| match arg.kind() {
                    ExpressionKind::StringLiteral(value) => value.clone(),
                    other => panic!("{} expects field names, got {:?}", name, other),
                })
                .collect();
            return match names.as_slice() {
                [field] => Expression::field(field.as_str()),
                [link, target] => Expression::lookup(link.as_str(), target.as_str()),
                _ => panic!("{} given {} arguments", name, names.len()),
            };
        }
        Self::call(&name, args)
    }
}

/// Projects linked to tasks. Column names follow `field_{id}`.
pub fn schema() -> Schema {
    let value = |id, name: &str, valid: ValidType| Field::new(id, name, FieldKind::Value(valid));
    let tasks = [
        value(101, "title", ValidType::text()).primary(),
        value(102, "hours", ValidType::number(1).with_nullable(true)),
        value(103, "labels", ValidType::array(ValidType::text())),
        value(104, "done", ValidType::boolean()),
        value(105, "due", ValidType::date(true).with_nullable(true)),
    ]
    .into_iter()
    .try_fold(Table::new("tasks"), Table::with_field)
    .unwrap();

    let projects = [
        value(1, "name", ValidType::text()).primary(),
        value(2, "notes", ValidType::text().with_nullable(true)),
        value(3, "price", ValidType::number(2).with_nullable(true)),
        value(4, "quantity", ValidType::number(0)),
        value(5, "done", ValidType::boolean()),
        value(6, "due", ValidType::date(false).with_nullable(true)),
        value(7, "started", ValidType::date(true)),
        value(8, "archived", ValidType::text()).trashed(),
        value(10, "estimate", ValidType::duration().with_nullable(true)),
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

    let mut schema = Schema::new().with_table(tasks).with_table(projects);

    // Stored formula: price * quantity, typed and guarded the way storage keeps it
    let config = FormulaConfig::for_testing();
    let registry = FunctionRegistry::global();
    let stored = {
        let provider = schema.provider("projects").unwrap();
        let typed = TypingPass::new(registry, &provider, &config)
            .type_expression(parse("field('price') * field('quantity')"))
            .unwrap();
        prepare_field_expression(typed, registry, &config).unwrap()
    };
    schema
        .table_mut("projects")
        .unwrap()
        .add_field(Field::new(9, "total", FieldKind::Formula { expression: stored }))
        .unwrap();
    schema
}

/// Type a formula against the projects table
pub fn typed(text: &str) -> Expression {
    let schema = schema();
    let provider = schema.provider("projects").unwrap();
    let config = FormulaConfig::for_testing();
    TypingPass::new(FunctionRegistry::global(), &provider, &config)
        .type_expression(parse(text))
        .unwrap()
}

pub fn typed_field(name: &str) -> Expression {
    typed(&format!("field('{}')", name))
}

/// The pinned clock reading: 2024-05-01 12:00 UTC
pub fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn context() -> DispatchContext<'static> {
    DispatchContext::new("projects", instant())
}

pub fn compile(text: &str) -> QueryExpression {
    let context = context();
    let config = FormulaConfig::for_testing();
    QueryCompiler::new(FunctionRegistry::global(), &config, &context)
        .compile(&typed(text))
        .unwrap()
}

/// Compile as a field definition: collapsed, guarded and cast
pub fn compile_field(text: &str) -> QueryExpression {
    let context = context();
    let config = FormulaConfig::for_testing();
    QueryCompiler::new(FunctionRegistry::global(), &config, &context)
        .compile_field(&typed(text))
        .unwrap()
}

fn timestamp(y: i32, m: u32, d: u32, h: u32, min: u32) -> Value {
    Value::Timestamp(Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap())
}

fn task(id: i64, title: &str, hours: Option<Decimal>, labels: &[&str], done: bool) -> Row {
    Row::new(id)
        .with_value("field_101", Value::text(title))
        .with_value("field_102", hours.map_or(Value::Null, Value::Decimal))
        .with_value(
            "field_103",
            Value::Array(labels.iter().map(|l| Value::text(*l)).collect()),
        )
        .with_value("field_104", Value::Boolean(done))
        .with_value("field_105", Value::Null)
}

/// Project 1 with three tasks
pub fn project_row() -> Row {
    let tasks = vec![
        task(11, "Design", Some(Decimal::new(25, 1)), &["ui", "ux"], true)
            .with_value("field_105", timestamp(2024, 5, 2, 10, 0)),
        task(12, "Build", Some(Decimal::new(40, 1)), &["backend"], false),
        task(13, "Test", None, &[], true),
    ];
    Row::new(1)
        .with_value("field_1", Value::text("Apollo"))
        .with_value("field_2", Value::Null)
        .with_value("field_3", Value::Decimal(Decimal::new(1250, 2)))
        .with_value("field_4", Value::Integer(3))
        .with_value("field_5", Value::Boolean(true))
        .with_value(
            "field_6",
            Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
        )
        .with_value("field_7", timestamp(2024, 1, 15, 8, 30))
        .with_value("field_8", Value::text("old"))
        .with_value("field_10", Value::Duration(5400))
        .with_links("field_20", tasks)
}

/// Compile and run a formula against the project row
pub fn eval(text: &str) -> Value {
    evaluate(&compile(text), &project_row()).unwrap()
}

/// Like [`eval`], compiled as a field definition
pub fn eval_field(text: &str) -> Value {
    evaluate(&compile_field(text), &project_row()).unwrap()
}
