//! Records: rows bound to a table schema.
//!
//! A [`Record`] always holds exactly one cell per schema field, in schema
//! order. Cells start as NULL; writes type-check against the field's
//! recorded tag.

use sql_bridge_common::{ClientError, ErrorContext, Result};

use crate::schema::{FieldSchema, TableSchema, TableSchemaRef};
use crate::value::{FieldKind, FieldValue};

/// Borrowed view of one cell together with its field schema.
#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    schema: &'a FieldSchema,
    value: &'a FieldValue,
}

impl<'a> Field<'a> {
    pub fn name(&self) -> &'a str {
        &self.schema.name
    }

    pub fn schema(&self) -> &'a FieldSchema {
        self.schema
    }

    pub fn value(&self) -> &'a FieldValue {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }
}

/// A row aligned to a table schema.
#[derive(Debug, Clone)]
pub struct Record {
    schema: TableSchemaRef,
    values: Vec<FieldValue>,
}

impl Record {
    /// Creates a record with every cell NULL.
    pub fn new(schema: TableSchemaRef) -> Self {
        let values = vec![FieldValue::Null; schema.field_count()];
        Record { schema, values }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn schema_ref(&self) -> &TableSchemaRef {
        &self.schema
    }

    pub fn field_count(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Writes a cell by field name.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when the field does not exist, `TypeMismatch` when
    /// the value's tag does not match the field's recorded native type.
    /// NULL is accepted for every field; `Unit`-tagged fields accept any
    /// value.
    pub fn set(&mut self, field_name: &str, value: impl Into<FieldValue>) -> Result<&mut Self> {
        let index = self.schema.field_position(field_name).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Field not found: {field_name}"),
            )
        })?;
        let value = value.into();
        let field = self.schema.field(index);
        if !value.is_null() && field.kind != FieldKind::Unit && value.kind() != field.kind {
            return Err(ErrorContext::new(
                ClientError::TypeMismatch,
                format!(
                    "Type mismatch: field {} expects {} but got {}",
                    field_name,
                    field.kind.name(),
                    value.kind().name()
                ),
            ));
        }
        self.values[index] = value;
        Ok(self)
    }

    /// Cell value by field name.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` with "field not found" on a miss.
    pub fn value(&self, field_name: &str) -> Result<&FieldValue> {
        let index = self.schema.field_position(field_name).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Field not found: {field_name}"),
            )
        })?;
        Ok(&self.values[index])
    }

    /// Field view by position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range; callers must check `len` first.
    pub fn at(&self, index: usize) -> Field<'_> {
        Field {
            schema: self.schema.field(index),
            value: &self.values[index],
        }
    }

    pub fn field(&self, field_name: &str) -> Result<Field<'_>> {
        let index = self.schema.field_position(field_name).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Field not found: {field_name}"),
            )
        })?;
        Ok(self.at(index))
    }

    /// Iterates fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = Field<'_>> {
        (0..self.values.len()).map(|i| self.at(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableSchema;

    fn users() -> TableSchemaRef {
        TableSchema::new("users")
            .add_field::<i32>("id", "INTEGER")
            .add_field::<String>("name", "VARCHAR(255)")
            .add_field::<bool>("active", "BOOLEAN")
            .into_ref()
    }

    #[test]
    fn test_new_record_is_all_null() {
        let record = Record::new(users());
        assert_eq!(record.len(), 3);
        assert!(record.iter().all(|f| f.is_null()));
    }

    #[test]
    fn test_record_aligns_to_schema() {
        let schema = users();
        let record = Record::new(schema.clone());
        assert_eq!(record.len(), schema.field_count());
        for i in 0..record.len() {
            assert_eq!(record.at(i).schema(), schema.field(i));
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut record = Record::new(users());
        record.set("id", 7).unwrap();
        record.set("name", "Alice").unwrap();
        assert_eq!(record.value("id").unwrap(), &FieldValue::I32(7));
        assert_eq!(record.value("name").unwrap(), &FieldValue::Text("Alice".into()));
        assert!(record.value("active").unwrap().is_null());
    }

    #[test]
    fn test_set_type_checks() {
        let mut record = Record::new(users());
        let err = record.set("id", "not a number").unwrap_err();
        assert!(err.message.contains("Type mismatch"));
        // NULL is accepted regardless of the field type
        record.set("id", FieldValue::Null).unwrap();
    }

    #[test]
    fn test_missing_field_errors() {
        let mut record = Record::new(users());
        assert!(record.set("nope", 1).is_err());
        assert!(record.value("nope").is_err());
        assert!(record.field("nope").is_err());
    }

    #[test]
    fn test_iteration_order() {
        let mut record = Record::new(users());
        record.set("id", 1).unwrap();
        let names: Vec<_> = record.iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, ["id", "name", "active"]);
    }

    #[test]
    #[should_panic]
    fn test_at_out_of_range_panics() {
        let record = Record::new(users());
        let _ = record.at(99);
    }
}
