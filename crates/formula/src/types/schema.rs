//! In-memory table schemas
//!
//! A small catalogue of tables and fields implementing
//! [`FieldTypeProvider`]. Embedders with their own metadata store implement
//! the trait directly; this one backs tests and simple setups.

use super::data_type::{ExpressionType, InvalidKind, ValidType};
use crate::ast::Expression;
use crate::error::{Error, Result};
use crate::semantic::provider::{FieldTypeProvider, LookupTarget, ResolvedField, UnresolvedField};
use std::collections::HashMap;

/// What a field stores
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// A plain stored value
    Value(ValidType),
    /// Links each row to rows of another table
    Link { table: String },
    /// A computed field with its stored, typed field expression
    Formula { expression: Expression },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub name: String,
    /// Backend column name
    pub column: String,
    pub kind: FieldKind,
    /// The primary field is what a plain reference to a link field looks up
    pub primary: bool,
    pub trashed: bool,
}

impl Field {
    /// Field stored in column `field_{id}`
    pub fn new(id: u64, name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: format!("field_{}", id),
            kind,
            primary: false,
            trashed: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn trashed(mut self) -> Self {
        self.trashed = true;
        self
    }

    /// Type of the value this field holds for one row
    pub fn expression_type(&self, schema: &Schema) -> ExpressionType {
        match &self.kind {
            FieldKind::Value(valid) => ExpressionType::Valid(valid.clone()),
            FieldKind::Formula { expression } => match expression.expression_type() {
                Some(expression_type) => expression_type.clone(),
                None => ExpressionType::invalid(
                    InvalidKind::Other,
                    format!("the formula of field {} has not been typed", self.name),
                ),
            },
            FieldKind::Link { table } => {
                let primary = schema
                    .table(table)
                    .and_then(Table::primary_field)
                    .map(|primary| primary.expression_type(schema));
                match primary {
                    Some(ExpressionType::Valid(valid)) => {
                        ExpressionType::Valid(ValidType::array(valid).with_nullable(false))
                    }
                    Some(invalid) => invalid,
                    None => ExpressionType::invalid(
                        InvalidKind::UnresolvedFieldReference,
                        format!("the table linked by {} has no primary field", self.name),
                    ),
                }
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub name: String,
    pub fields: Vec<Field>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: Field) -> Result<Self> {
        self.add_field(field)?;
        Ok(self)
    }

    pub fn add_field(&mut self, field: Field) -> Result<()> {
        if self.fields.iter().any(|f| f.name == field.name) {
            return Err(Error::DuplicateField(field.name));
        }
        self.fields.push(field);
        Ok(())
    }

    /// Replace (or add) a field of the same name
    pub fn set_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn primary_field(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.primary && !f.trashed)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    tables: HashMap<String, Table>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    pub fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Field type provider for formulas of `table`
    pub fn provider<'a>(&'a self, table: &str) -> Result<TableProvider<'a>> {
        let table = self
            .table(table)
            .ok_or_else(|| Error::TableNotFound(table.to_string()))?;
        Ok(TableProvider {
            schema: self,
            table,
        })
    }
}

/// Resolves field references of one table
pub struct TableProvider<'a> {
    schema: &'a Schema,
    table: &'a Table,
}

impl TableProvider<'_> {
    fn live_field<'t>(
        &self,
        table: &'t Table,
        name: &str,
    ) -> std::result::Result<&'t Field, UnresolvedField> {
        match table.get_field(name) {
            Some(field) if field.trashed => Err(UnresolvedField::Trashed(name.to_string())),
            Some(field) => Ok(field),
            None => Err(UnresolvedField::Missing(name.to_string())),
        }
    }

    fn resolve_lookup(
        &self,
        link: &Field,
        target: &str,
    ) -> std::result::Result<ResolvedField, UnresolvedField> {
        let missing_target = || UnresolvedField::MissingTarget {
            link: link.name.clone(),
            target: target.to_string(),
        };
        let FieldKind::Link { table } = &link.kind else {
            return Err(UnresolvedField::NotALink(link.name.clone()));
        };
        let linked_table = self.schema.table(table).ok_or_else(missing_target)?;
        let target_field = self
            .live_field(linked_table, target)
            .map_err(|_| missing_target())?;

        Ok(ResolvedField {
            expression_type: target_field.expression_type(self.schema),
            column: link.column.clone(),
            lookup: Some(LookupTarget {
                target_field: target_field.name.clone(),
                target_column: target_field.column.clone(),
            }),
            formula: None,
        })
    }
}

impl FieldTypeProvider for TableProvider<'_> {
    fn resolve_field(
        &self,
        name: &str,
        target_field: Option<&str>,
    ) -> std::result::Result<ResolvedField, UnresolvedField> {
        let field = self.live_field(self.table, name)?;

        if let Some(target) = target_field {
            return self.resolve_lookup(field, target);
        }

        match &field.kind {
            FieldKind::Value(valid) => Ok(ResolvedField::column(
                field.column.clone(),
                ExpressionType::Valid(valid.clone()),
            )),
            FieldKind::Formula { expression } => Ok(ResolvedField {
                expression_type: field.expression_type(self.schema),
                column: field.column.clone(),
                lookup: None,
                formula: Some(expression.clone()),
            }),
            FieldKind::Link { table } => {
                let primary = self
                    .schema
                    .table(table)
                    .and_then(Table::primary_field)
                    .ok_or_else(|| UnresolvedField::MissingTarget {
                        link: field.name.clone(),
                        target: "primary field".to_string(),
                    })?;
                self.resolve_lookup(field, &primary.name)
            }
        }
    }
}
