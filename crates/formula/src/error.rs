//! Error types for the formula engine
//!
//! These are hard failures only. Semantic problems found while typing a
//! formula (bad arity, bad argument types, unresolved fields) are carried
//! as `ExpressionType::Invalid` on the offending node instead.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // Schema errors
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Field already exists: {0}")]
    DuplicateField(String),

    // Construction errors
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),

    #[error("Expression has already been typed")]
    AlreadyTyped,

    #[error("Expression has not been typed: {0}")]
    Untyped(String),

    // Compilation errors
    #[error("Cannot compile an invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    // Registry errors
    #[error("Function already registered: {0}")]
    DuplicateFunction(String),

    #[error("A function registry has already been installed")]
    RegistryAlreadyInstalled,

    // Metadata errors
    #[error("Invalid persisted type: {0}")]
    InvalidPersistedType(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Evaluation errors
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
