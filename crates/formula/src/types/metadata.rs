//! Persisted type metadata
//!
//! Storage keeps a flat record of a field's formula type next to the field
//! so the type can be rebuilt without running the typing pass again.

use super::data_type::{
    DateFormat, DurationFormat, ExpressionType, InvalidKind, InvalidType, TimeFormat, TypeKind,
    TypeTag, ValidType,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const INVALID: &str = "invalid";

/// Flat, serializable form of an [`ExpressionType`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersistedType {
    pub formula_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub requires_refresh_after_insert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_decimal_places: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_include_time: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time_format: Option<TimeFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_format: Option<DurationFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array_formula_type: Option<Box<PersistedType>>,
}

impl PersistedType {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rebuild the type this record describes
    pub fn to_expression_type(&self) -> Result<ExpressionType> {
        if self.formula_type == INVALID {
            return Ok(ExpressionType::Invalid(InvalidType {
                kind: InvalidKind::Other,
                error: self.error.clone().unwrap_or_default(),
            }));
        }
        self.to_valid_type().map(ExpressionType::Valid)
    }

    fn to_valid_type(&self) -> Result<ValidType> {
        let tag = TypeTag::from_name(&self.formula_type).ok_or_else(|| {
            Error::InvalidPersistedType(format!("unknown formula type {}", self.formula_type))
        })?;
        let missing = |field: &str| {
            Error::InvalidPersistedType(format!(
                "{} type is missing {}",
                self.formula_type, field
            ))
        };

        let kind = match tag {
            TypeTag::Text => TypeKind::Text,
            TypeTag::Boolean => TypeKind::Boolean,
            TypeTag::Number => TypeKind::Number {
                decimal_places: self
                    .number_decimal_places
                    .ok_or_else(|| missing("number_decimal_places"))?,
            },
            TypeTag::Date => TypeKind::Date {
                include_time: self
                    .date_include_time
                    .ok_or_else(|| missing("date_include_time"))?,
                date_format: self.date_format.unwrap_or_default(),
                time_format: self.date_time_format.unwrap_or_default(),
            },
            TypeTag::Duration => TypeKind::Duration {
                format: self.duration_format.unwrap_or_default(),
            },
            TypeTag::Array => {
                let sub_type = self
                    .array_formula_type
                    .as_ref()
                    .ok_or_else(|| missing("array_formula_type"))?;
                TypeKind::Array(Box::new(sub_type.to_valid_type()?))
            }
        };

        Ok(ValidType {
            kind,
            nullable: self.nullable,
            requires_refresh_after_insert: self.requires_refresh_after_insert,
        })
    }
}

impl ExpressionType {
    pub fn to_persisted(&self) -> PersistedType {
        match self {
            ExpressionType::Invalid(invalid) => PersistedType {
                formula_type: INVALID.to_string(),
                error: Some(invalid.error.clone()),
                ..Default::default()
            },
            ExpressionType::Valid(valid) => valid.to_persisted(),
        }
    }

    /// Field names a persisted record of this type carries
    pub fn all_fields(&self) -> Vec<&'static str> {
        match self {
            ExpressionType::Invalid(_) => vec!["formula_type", "error"],
            ExpressionType::Valid(valid) => valid.all_fields(),
        }
    }
}

impl ValidType {
    pub fn to_persisted(&self) -> PersistedType {
        let mut persisted = PersistedType {
            formula_type: self.tag().as_str().to_string(),
            nullable: self.nullable,
            requires_refresh_after_insert: self.requires_refresh_after_insert,
            ..Default::default()
        };
        match &self.kind {
            TypeKind::Text | TypeKind::Boolean => {}
            TypeKind::Number { decimal_places } => {
                persisted.number_decimal_places = Some(*decimal_places);
            }
            TypeKind::Date {
                include_time,
                date_format,
                time_format,
            } => {
                persisted.date_include_time = Some(*include_time);
                persisted.date_format = Some(*date_format);
                persisted.date_time_format = Some(*time_format);
            }
            TypeKind::Duration { format } => persisted.duration_format = Some(*format),
            TypeKind::Array(sub_type) => {
                persisted.array_formula_type = Some(Box::new(sub_type.to_persisted()));
            }
        }
        persisted
    }

    pub fn all_fields(&self) -> Vec<&'static str> {
        let mut fields = vec!["formula_type", "nullable", "requires_refresh_after_insert"];
        match self.tag() {
            TypeTag::Text | TypeTag::Boolean => {}
            TypeTag::Number => fields.push("number_decimal_places"),
            TypeTag::Date => {
                fields.extend(["date_include_time", "date_format", "date_time_format"]);
            }
            TypeTag::Duration => fields.push("duration_format"),
            TypeTag::Array => fields.push("array_formula_type"),
        }
        fields
    }
}
