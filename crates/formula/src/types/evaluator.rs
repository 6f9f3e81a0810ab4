//! Reference evaluator for query expressions
//!
//! Executes a [`QueryExpression`] against an in-memory [`Row`] with the
//! semantics the storage engine gives compiled formulas: SQL null
//! propagation, aggregates over linked rows and error suppression through
//! `ErrorToNull`.

use super::expression::{AggregateFunction, CastTarget, DatePart, QueryExpression, ScalarFunction};
use super::row::Row;
use super::value::Value;
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use std::cmp::Ordering;
use std::str::FromStr;

/// Evaluate `expr` for the host row `row`
pub fn evaluate(expr: &QueryExpression, row: &Row) -> Result<Value> {
    Scope {
        row,
        linked: Vec::new(),
    }
    .eval(expr)
}

/// The host row plus the linked rows bound while aggregating
struct Scope<'r> {
    row: &'r Row,
    linked: Vec<(&'r str, &'r Row)>,
}

impl<'r> Scope<'r> {
    fn eval(&self, expr: &'r QueryExpression) -> Result<Value> {
        use QueryExpression as Q;
        match expr {
            Q::Value(value) => Ok(value.clone()),
            Q::Column(column) => self
                .row
                .get(column)
                .cloned()
                .ok_or_else(|| Error::ExecutionError(format!("column not found: {}", column))),
            Q::LinkedColumn { link, column } => {
                let (_, linked) = self
                    .linked
                    .iter()
                    .find(|(bound, _)| *bound == link.as_str())
                    .ok_or_else(|| {
                        Error::ExecutionError(format!(
                            "{}.{} read outside of an aggregate over {}",
                            link, column, link
                        ))
                    })?;
                linked.get(column).cloned().ok_or_else(|| {
                    Error::ExecutionError(format!("column not found: {}.{}", link, column))
                })
            }

            Q::Add(l, r) => add(&self.eval(l)?, &self.eval(r)?),
            Q::Subtract(l, r) => subtract(&self.eval(l)?, &self.eval(r)?),
            Q::Multiply(l, r) => multiply(&self.eval(l)?, &self.eval(r)?),
            Q::Divide(l, r) => divide(&self.eval(l)?, &self.eval(r)?),

            Q::Equal(l, r) => self.compare_with(l, r, |o| o == Ordering::Equal),
            Q::NotEqual(l, r) => self.compare_with(l, r, |o| o != Ordering::Equal),
            Q::GreaterThan(l, r) => self.compare_with(l, r, |o| o == Ordering::Greater),
            Q::GreaterThanOrEqual(l, r) => self.compare_with(l, r, |o| o != Ordering::Less),
            Q::LessThan(l, r) => self.compare_with(l, r, |o| o == Ordering::Less),
            Q::LessThanOrEqual(l, r) => self.compare_with(l, r, |o| o != Ordering::Greater),

            Q::And(l, r) => match (as_bool(self.eval(l)?)?, as_bool(self.eval(r)?)?) {
                (Some(false), _) | (_, Some(false)) => Ok(Value::Boolean(false)),
                (Some(true), Some(true)) => Ok(Value::Boolean(true)),
                _ => Ok(Value::Null),
            },
            Q::Or(l, r) => match (as_bool(self.eval(l)?)?, as_bool(self.eval(r)?)?) {
                (Some(true), _) | (_, Some(true)) => Ok(Value::Boolean(true)),
                (Some(false), Some(false)) => Ok(Value::Boolean(false)),
                _ => Ok(Value::Null),
            },
            Q::Not(e) => Ok(as_bool(self.eval(e)?)?.map_or(Value::Null, |b| Value::Boolean(!b))),

            Q::IsNull(e) => Ok(Value::Boolean(self.eval(e)?.is_null())),
            Q::Coalesce(args) => {
                for arg in args {
                    let value = self.eval(arg)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Ok(Value::Null)
            }
            Q::Case {
                when_clauses,
                else_clause,
            } => {
                for (when, then) in when_clauses {
                    if as_bool(self.eval(when)?)? == Some(true) {
                        return self.eval(then);
                    }
                }
                match else_clause {
                    Some(else_clause) => self.eval(else_clause),
                    None => Ok(Value::Null),
                }
            }
            Q::Cast(e, target) => cast(self.eval(e)?, *target),
            Q::Function(function, args) => {
                let values = args
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Result<Vec<_>>>()?;
                scalar(*function, values)
            }

            Q::ErrorToNull(e) => Ok(self.eval(e).unwrap_or(Value::Null)),
            Q::Filtered { value, condition } => {
                if as_bool(self.eval(condition)?)? == Some(true) {
                    self.eval(value)
                } else {
                    Ok(Value::Null)
                }
            }
            Q::Aggregate(agg) => {
                let scope = agg.scope.as_ref().ok_or_else(|| {
                    Error::ExecutionError(format!("aggregate {} has no subquery scope", agg.function))
                })?;

                let mut values = Vec::new();
                for bindings in self.link_combinations(&scope.links) {
                    let inner = Scope {
                        row: self.row,
                        linked: bindings,
                    };
                    if let Some(filter) = &agg.filter
                        && as_bool(inner.eval(filter)?)? != Some(true)
                    {
                        continue;
                    }
                    values.push(inner.eval(&agg.argument)?);
                }
                self.aggregate(&agg.function, values)
            }
        }
    }

    fn compare_with(
        &self,
        l: &'r QueryExpression,
        r: &'r QueryExpression,
        f: impl Fn(Ordering) -> bool,
    ) -> Result<Value> {
        let (l, r) = (self.eval(l)?, self.eval(r)?);
        if l.is_null() || r.is_null() {
            return Ok(Value::Null);
        }
        Ok(Value::Boolean(f(compare(&l, &r)?)))
    }

    /// Every combination of linked rows across `links` (a join)
    fn link_combinations(&self, links: &'r [String]) -> Vec<Vec<(&'r str, &'r Row)>> {
        let mut combinations: Vec<Vec<(&'r str, &'r Row)>> = vec![Vec::new()];
        for link in links {
            let rows = self.row.linked(link);
            combinations = combinations
                .into_iter()
                .flat_map(|bound| {
                    rows.iter().map(move |row| {
                        let mut next = bound.clone();
                        next.push((link.as_str(), row));
                        next
                    })
                })
                .collect();
        }
        combinations
    }

    fn aggregate(&self, function: &'r AggregateFunction, values: Vec<Value>) -> Result<Value> {
        let present: Vec<Value> = values.iter().filter(|v| !v.is_null()).cloned().collect();
        match function {
            AggregateFunction::Sum => Ok(total(&present)?.unwrap_or(Value::Integer(0))),
            AggregateFunction::Count => Ok(Value::Integer(present.len() as i64)),
            AggregateFunction::Avg => match total(&present)? {
                Some(total) => divide(&total, &Value::Integer(present.len() as i64)),
                None => Ok(Value::Null),
            },
            AggregateFunction::Min | AggregateFunction::Max => {
                let wanted = if matches!(function, AggregateFunction::Min) {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
                let mut best: Option<Value> = None;
                for value in present {
                    best = match best {
                        Some(current) if compare(&value, &current)? != wanted => Some(current),
                        _ => Some(value),
                    };
                }
                Ok(best.unwrap_or(Value::Null))
            }
            AggregateFunction::Join(separator) => {
                if present.is_empty() {
                    return Ok(Value::Null);
                }
                let separator = self.eval(separator)?.to_string();
                let parts: Vec<String> = present.iter().map(Value::to_string).collect();
                Ok(Value::Text(parts.join(&separator)))
            }
            AggregateFunction::ArrayAgg => Ok(Value::Array(values)),
            AggregateFunction::ArrayAggNoNesting => {
                let mut flat = Vec::new();
                for value in values {
                    match value {
                        Value::Array(items) => flat.extend(items),
                        other => flat.push(other),
                    }
                }
                Ok(Value::Array(flat))
            }
        }
    }
}

/// Sum of non-null values, `None` when there are none
fn total(values: &[Value]) -> Result<Option<Value>> {
    let Some((first, rest)) = values.split_first() else {
        return Ok(None);
    };
    rest.iter()
        .try_fold(first.clone(), |total, value| add(&total, value))
        .map(Some)
}

fn as_bool(value: Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(b)),
        other => Err(mismatch("boolean", &other)),
    }
}

fn mismatch(expected: &str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected: expected.into(),
        found: found.type_name().into(),
    }
}

fn overflow(op: &str) -> Error {
    Error::ExecutionError(format!("numeric overflow in {}", op))
}

/// Numbers stay integers while both sides are integers
fn numeric(
    l: &Value,
    r: &Value,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    dec_op: fn(Decimal, Decimal) -> Option<Decimal>,
) -> Option<Result<Value>> {
    match (l, r) {
        (Value::Integer(a), Value::Integer(b)) => {
            Some(int_op(*a, *b).map(Value::Integer).ok_or_else(|| overflow(op)))
        }
        _ => match (l.as_decimal(), r.as_decimal()) {
            (Some(a), Some(b)) => Some(dec_op(a, b).map(Value::Decimal).ok_or_else(|| overflow(op))),
            _ => None,
        },
    }
}

fn shift(ts: DateTime<Utc>, seconds: i64) -> Result<Value> {
    ts.checked_add_signed(Duration::seconds(seconds))
        .map(Value::Timestamp)
        .ok_or_else(|| overflow("date arithmetic"))
}

pub(crate) fn add(l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if let Some(result) = numeric(l, r, "addition", i64::checked_add, Decimal::checked_add) {
        return result;
    }
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => Ok(Value::Text(format!("{}{}", a, b))),
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_add(*b)
            .map(Value::Duration)
            .ok_or_else(|| overflow("addition")),
        (date @ (Value::Date(_) | Value::Timestamp(_)), Value::Duration(seconds))
        | (Value::Duration(seconds), date @ (Value::Date(_) | Value::Timestamp(_))) => {
            let ts = date.as_timestamp().ok_or_else(|| mismatch("date", date))?;
            shift(ts, *seconds)
        }
        _ => Err(Error::TypeMismatch {
            expected: l.type_name().into(),
            found: r.type_name().into(),
        }),
    }
}

pub(crate) fn subtract(l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if let Some(result) = numeric(l, r, "subtraction", i64::checked_sub, Decimal::checked_sub) {
        return result;
    }
    match (l, r) {
        (Value::Duration(a), Value::Duration(b)) => a
            .checked_sub(*b)
            .map(Value::Duration)
            .ok_or_else(|| overflow("subtraction")),
        (Value::Date(_) | Value::Timestamp(_), Value::Duration(seconds)) => {
            let ts = l.as_timestamp().ok_or_else(|| mismatch("date", l))?;
            shift(ts, -seconds)
        }
        (Value::Date(_) | Value::Timestamp(_), Value::Date(_) | Value::Timestamp(_)) => {
            match (l.as_timestamp(), r.as_timestamp()) {
                (Some(a), Some(b)) => Ok(Value::Duration((a - b).num_seconds())),
                _ => Err(mismatch("date", r)),
            }
        }
        _ => Err(Error::TypeMismatch {
            expected: l.type_name().into(),
            found: r.type_name().into(),
        }),
    }
}

fn scale_duration(seconds: i64, factor: Decimal, op: &str) -> Result<Value> {
    let scaled = Decimal::from(seconds)
        .checked_mul(factor)
        .ok_or_else(|| overflow(op))?;
    scaled
        .round()
        .to_i64()
        .map(Value::Duration)
        .ok_or_else(|| overflow(op))
}

pub(crate) fn multiply(l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    if let Some(result) = numeric(l, r, "multiplication", i64::checked_mul, Decimal::checked_mul) {
        return result;
    }
    match (l, r.as_decimal()) {
        (Value::Duration(seconds), Some(factor)) => scale_duration(*seconds, factor, "multiplication"),
        _ => Err(Error::TypeMismatch {
            expected: l.type_name().into(),
            found: r.type_name().into(),
        }),
    }
}

pub(crate) fn divide(l: &Value, r: &Value) -> Result<Value> {
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    let divisor = r.as_decimal().ok_or_else(|| mismatch("number", r))?;
    if divisor.is_zero() {
        return Err(Error::DivisionByZero);
    }
    match l {
        Value::Duration(seconds) => {
            let factor = Decimal::ONE
                .checked_div(divisor)
                .ok_or_else(|| overflow("division"))?;
            scale_duration(*seconds, factor, "division")
        }
        _ => {
            let dividend = l.as_decimal().ok_or_else(|| mismatch("number", l))?;
            dividend
                .checked_div(divisor)
                .map(|q| Value::Decimal(q.normalize()))
                .ok_or_else(|| overflow("division"))
        }
    }
}

pub(crate) fn compare(l: &Value, r: &Value) -> Result<Ordering> {
    if let (Some(a), Some(b)) = (l.as_decimal(), r.as_decimal()) {
        return Ok(a.cmp(&b));
    }
    if let (Some(a), Some(b)) = (l.as_timestamp(), r.as_timestamp()) {
        return Ok(a.cmp(&b));
    }
    match (l, r) {
        (Value::Text(a), Value::Text(b)) => Ok(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(a.cmp(b)),
        (Value::Duration(a), Value::Duration(b)) => Ok(a.cmp(b)),
        _ => Err(Error::TypeMismatch {
            expected: l.type_name().into(),
            found: r.type_name().into(),
        }),
    }
}

fn cast(value: Value, target: CastTarget) -> Result<Value> {
    match (value, target) {
        (Value::Null, _) => Ok(Value::Null),
        (value, CastTarget::Text) => Ok(Value::Text(value.to_string())),
        (Value::Text(text), CastTarget::Decimal { places }) => Decimal::from_str(text.trim())
            .map(|d| Value::Decimal(round_to(d, places)))
            .map_err(|e| Error::ExecutionError(format!("cannot cast '{}' to number: {}", text, e))),
        (value, CastTarget::Decimal { places }) => value
            .as_decimal()
            .map(|d| Value::Decimal(round_to(d, places)))
            .ok_or_else(|| mismatch("number", &value)),
    }
}

/// Round half away from zero, padding to exactly `places` decimals
fn round_to(value: Decimal, places: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(places);
    rounded
}

fn text_arg(value: &Value) -> Result<&str> {
    value.as_str().ok_or_else(|| mismatch("text", value))
}

fn number_arg(value: &Value) -> Result<Decimal> {
    value.as_decimal().ok_or_else(|| mismatch("number", value))
}

fn timestamp_arg(value: &Value) -> Result<DateTime<Utc>> {
    value.as_timestamp().ok_or_else(|| mismatch("date", value))
}

/// Integer results stay integers, everything else becomes a decimal
fn number_value(value: Decimal) -> Value {
    if value.scale() == 0
        && let Some(i) = value.to_i64()
    {
        return Value::Integer(i);
    }
    Value::Decimal(value)
}

fn scalar(function: ScalarFunction, args: Vec<Value>) -> Result<Value> {
    use ScalarFunction as F;

    // Concat and the null-skipping functions handle nulls themselves
    match function {
        F::Concat => {
            let parts: Vec<String> = args
                .iter()
                .filter(|v| !v.is_null())
                .map(Value::to_string)
                .collect();
            return Ok(Value::Text(parts.concat()));
        }
        F::Greatest | F::Least => {
            let wanted = if function == F::Greatest {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            let mut best: Option<Value> = None;
            for value in args.into_iter().filter(|v| !v.is_null()) {
                best = match best {
                    Some(current) if compare(&value, &current)? != wanted => Some(current),
                    _ => Some(value),
                };
            }
            return Ok(best.unwrap_or(Value::Null));
        }
        _ => {}
    }

    if args.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }

    let arg = |index: usize| -> Result<&Value> {
        args.get(index).ok_or_else(|| {
            Error::ExecutionError(format!("{} is missing argument {}", function, index + 1))
        })
    };

    match function {
        F::Upper => Ok(Value::Text(text_arg(arg(0)?)?.to_uppercase())),
        F::Lower => Ok(Value::Text(text_arg(arg(0)?)?.to_lowercase())),
        F::Trim => Ok(Value::Text(text_arg(arg(0)?)?.trim().to_string())),
        F::Length => Ok(Value::Integer(text_arg(arg(0)?)?.chars().count() as i64)),
        F::Replace => Ok(Value::Text(
            text_arg(arg(0)?)?.replace(text_arg(arg(1)?)?, text_arg(arg(2)?)?),
        )),
        F::Contains => {
            let needle = text_arg(arg(1)?)?;
            let found = match arg(0)? {
                Value::Array(items) => items
                    .iter()
                    .any(|item| item.as_str().is_some_and(|text| text.contains(needle))),
                haystack => text_arg(haystack)?.contains(needle),
            };
            Ok(Value::Boolean(found))
        }
        F::ToNumber => match arg(0)? {
            Value::Text(text) => Ok(Decimal::from_str(text.trim())
                .map(Value::Decimal)
                .unwrap_or(Value::Null)),
            other => number_arg(other).map(Value::Decimal),
        },
        F::Abs => Ok(number_value(number_arg(arg(0)?)?.abs())),
        F::Ceil => Ok(number_value(number_arg(arg(0)?)?.ceil().normalize())),
        F::Floor => Ok(number_value(number_arg(arg(0)?)?.floor().normalize())),
        F::Round => {
            let places = number_arg(arg(1)?)?.to_u32().unwrap_or(0);
            Ok(Value::Decimal(round_to(number_arg(arg(0)?)?, places)))
        }
        F::Sqrt => {
            let value = number_arg(arg(0)?)?;
            if value.is_sign_negative() && !value.is_zero() {
                return Err(Error::ExecutionError(format!(
                    "cannot take the square root of {}",
                    value
                )));
            }
            value
                .to_f64()
                .map(f64::sqrt)
                .and_then(Decimal::from_f64)
                .map(Value::Decimal)
                .ok_or_else(|| overflow("square root"))
        }
        F::FormatDate => {
            let ts = timestamp_arg(arg(0)?)?;
            let pattern = to_chrono_pattern(text_arg(arg(1)?)?);
            Ok(Value::Text(ts.format(&pattern).to_string()))
        }
        F::ParseDate => {
            let pattern = to_chrono_pattern(text_arg(arg(1)?)?);
            Ok(NaiveDate::parse_from_str(text_arg(arg(0)?)?.trim(), &pattern)
                .map(Value::Date)
                .unwrap_or(Value::Null))
        }
        F::Extract(part) => {
            let ts = timestamp_arg(arg(0)?)?;
            let component = match part {
                DatePart::Year => ts.year() as i64,
                DatePart::Month => ts.month() as i64,
                DatePart::Day => ts.day() as i64,
                DatePart::Hour => ts.hour() as i64,
                DatePart::Minute => ts.minute() as i64,
                DatePart::Second => ts.second() as i64,
            };
            Ok(Value::Integer(component))
        }
        F::DateDiff => {
            let unit = text_arg(arg(0)?)?.to_lowercase();
            let start = timestamp_arg(arg(1)?)?;
            let end = timestamp_arg(arg(2)?)?;
            Ok(date_diff(&unit, start, end).map_or(Value::Null, Value::Integer))
        }
        F::ArrayLength => match arg(0)? {
            Value::Array(items) => Ok(Value::Integer(items.len() as i64)),
            other => Err(mismatch("array", other)),
        },
        F::Concat | F::Greatest | F::Least => Ok(Value::Null),
    }
}

/// Whole `unit`s from `start` to `end`, truncated toward zero
fn date_diff(unit: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<i64> {
    let seconds = (end - start).num_seconds();
    let per_unit = match unit {
        "second" | "seconds" | "ss" | "s" => 1,
        "minute" | "minutes" | "mi" | "n" => 60,
        "hour" | "hours" | "hh" => 3_600,
        "day" | "days" | "dd" | "d" => 86_400,
        "week" | "weeks" | "wk" | "ww" => 604_800,
        "month" | "months" | "mm" | "m" => return Some(months_between(start, end)),
        "year" | "years" | "yy" | "yyyy" => return Some(months_between(start, end) / 12),
        _ => return None,
    };
    Some(seconds / per_unit)
}

fn months_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let mut months = (end.year() as i64 - start.year() as i64) * 12
        + (end.month() as i64 - start.month() as i64);
    // Within the month, compare day and time of day
    let start_rest = (start.day(), start.num_seconds_from_midnight());
    let end_rest = (end.day(), end.num_seconds_from_midnight());
    if months > 0 && end_rest < start_rest {
        months -= 1;
    } else if months < 0 && end_rest > start_rest {
        months += 1;
    }
    months
}

/// Translate a `to_char` style pattern into a chrono format string
pub(crate) fn to_chrono_pattern(pattern: &str) -> String {
    const TOKENS: [(&str, &str); 10] = [
        ("YYYY", "%Y"),
        ("HH24", "%H"),
        ("HH12", "%I"),
        ("MON", "%b"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("MI", "%M"),
        ("SS", "%S"),
        ("AM", "%p"),
    ];
    let mut out = String::new();
    let mut rest = pattern;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            if c == '%' {
                out.push_str("%%");
            } else {
                out.push(c);
            }
        }
        rest = chars.as_str();
    }
    out
}
