//! Literal tokens
//!
//! Helpers that turn literal values into formula tokens and back. String
//! tokens are single quoted with backslash escapes; double quotes are
//! accepted on input.

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Quote a string as a formula token
pub fn quote_string(value: &str) -> String {
    let mut token = String::with_capacity(value.len() + 2);
    token.push('\'');
    for c in value.chars() {
        match c {
            '\'' => token.push_str("\\'"),
            '\\' => token.push_str("\\\\"),
            other => token.push(other),
        }
    }
    token.push('\'');
    token
}

/// Parse a quoted string token back into its value
pub fn parse_string_token(token: &str) -> Result<String> {
    let mut chars = token.chars();
    let quote = match chars.next() {
        Some(q @ ('\'' | '"')) => q,
        _ => {
            return Err(Error::InvalidLiteral(format!(
                "string literal must be quoted: {}",
                token
            )));
        }
    };

    let mut value = String::new();
    let mut closed = false;
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => value.push(escaped),
                None => break,
            },
            c if c == quote => {
                closed = true;
                break;
            }
            other => value.push(other),
        }
    }

    if !closed || chars.next().is_some() {
        return Err(Error::InvalidLiteral(format!(
            "malformed string literal: {}",
            token
        )));
    }
    Ok(value)
}

/// Parse an integer token
pub fn parse_integer_token(token: &str) -> Result<i64> {
    token
        .trim()
        .parse::<i64>()
        .map_err(|e| Error::InvalidLiteral(format!("not an integer '{}': {}", token, e)))
}

/// Parse a decimal token; it must carry a fractional part
pub fn parse_decimal_token(token: &str) -> Result<Decimal> {
    let trimmed = token.trim();
    if !trimmed.contains('.') {
        return Err(Error::InvalidLiteral(format!(
            "decimal literal needs a fractional part: {}",
            token
        )));
    }
    Decimal::from_str(trimmed)
        .map_err(|e| Error::InvalidLiteral(format!("not a decimal '{}': {}", token, e)))
}

/// Parse a boolean token
pub fn parse_boolean_token(token: &str) -> Result<bool> {
    match token.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(Error::InvalidLiteral(format!("not a boolean: {}", token))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_round_trip() {
        for value in ["", "plain", "it's", r"back\slash", "mixed 'quotes' \\ here"] {
            assert_eq!(parse_string_token(&quote_string(value)).unwrap(), value);
        }
    }

    #[test]
    fn test_double_quoted_input() {
        assert_eq!(parse_string_token(r#""say \"hi\"""#).unwrap(), r#"say "hi""#);
    }

    #[test]
    fn test_malformed_strings() {
        assert!(matches!(
            parse_string_token("unquoted"),
            Err(Error::InvalidLiteral(_))
        ));
        assert!(parse_string_token("'open").is_err());
        assert!(parse_string_token("'a' trailing").is_err());
    }

    #[test]
    fn test_numeric_tokens() {
        assert_eq!(parse_integer_token("42").unwrap(), 42);
        assert!(parse_integer_token("4.2").is_err());
        assert_eq!(parse_decimal_token("1.50").unwrap().scale(), 2);
        assert!(parse_decimal_token("150").is_err());
        assert!(parse_decimal_token("1.5.0").is_err());
        assert!(parse_boolean_token("TRUE").unwrap());
        assert!(parse_boolean_token("yes").is_err());
    }
}
