//! Table and field schemas.
//!
//! A [`TableSchema`] is built once at application start with the chaining
//! modifiers below, then frozen behind a [`TableSchemaRef`] and shared across
//! threads. Field order is stable; the name index and the field list always
//! agree; clones are deep.

use std::collections::HashMap;
use std::sync::Arc;

use crate::value::{FieldKind, SqlType};

/// Reference-counted handle to an immutable table schema.
pub type TableSchemaRef = Arc<TableSchema>;

/// Schema of a single column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    /// Database-side type string, e.g. `"VARCHAR(255)"`, `"INTEGER"`.
    pub db_type: String,
    /// Native type tag checked at column materialization.
    pub kind: FieldKind,
    pub is_nullable: bool,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    pub is_indexed: bool,
    pub foreign_table: String,
    pub foreign_column: String,
    pub default_value: String,
    pub max_length: usize,
}

impl FieldSchema {
    fn new(name: String, db_type: String, kind: FieldKind) -> Self {
        FieldSchema {
            name,
            db_type,
            kind,
            is_nullable: true,
            is_primary_key: false,
            is_foreign_key: false,
            is_unique: false,
            is_indexed: false,
            foreign_table: String::new(),
            foreign_column: String::new(),
            default_value: String::new(),
            max_length: 0,
        }
    }
}

/// Named table with an ordered field list and a name index.
///
/// Modifier methods look the field up by name; a miss is a no-op — declare
/// fields first, modify after.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    table_name: String,
    fields: Vec<FieldSchema>,
    field_index: HashMap<String, usize>,
}

impl TableSchema {
    pub fn new(table_name: impl Into<String>) -> Self {
        TableSchema {
            table_name: table_name.into(),
            fields: Vec::new(),
            field_index: HashMap::new(),
        }
    }

    /// Shared handle to a schema carrying only a table name. Used for
    /// joins and from-clauses referencing tables declared elsewhere.
    pub fn make_ref(table_name: impl Into<String>) -> TableSchemaRef {
        Arc::new(TableSchema::new(table_name))
    }

    pub fn add_field<T: SqlType>(self, name: impl Into<String>, db_type: impl Into<String>) -> Self {
        self.add_field_with_kind(name, db_type, T::KIND)
    }

    /// Adds a field with a runtime-specified type tag.
    pub fn add_field_with_kind(
        mut self,
        name: impl Into<String>,
        db_type: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        let field = FieldSchema::new(name.into(), db_type.into(), kind);
        self.field_index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        self
    }

    pub fn primary_key(mut self, field_name: &str) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.is_primary_key = true;
            field.is_nullable = false;
        }
        self
    }

    pub fn nullable(mut self, field_name: &str, is_nullable: bool) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.is_nullable = is_nullable;
        }
        self
    }

    pub fn foreign_key(mut self, field_name: &str, ref_table: &str, ref_column: &str) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.is_foreign_key = true;
            field.foreign_table = ref_table.to_string();
            field.foreign_column = ref_column.to_string();
        }
        self
    }

    pub fn unique(mut self, field_name: &str) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.is_unique = true;
        }
        self
    }

    pub fn indexed(mut self, field_name: &str) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.is_indexed = true;
        }
        self
    }

    pub fn default_value(mut self, field_name: &str, value: impl Into<String>) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.default_value = value.into();
        }
        self
    }

    pub fn max_length(mut self, field_name: &str, len: usize) -> Self {
        if let Some(field) = self.field_mut(field_name) {
            field.max_length = len;
        }
        self
    }

    /// Freezes the schema into a shareable handle.
    pub fn into_ref(self) -> TableSchemaRef {
        Arc::new(self)
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    /// Field schema by position.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn field(&self, index: usize) -> &FieldSchema {
        &self.fields[index]
    }

    pub fn field_schema(&self, name: &str) -> Option<&FieldSchema> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.field_index.get(name).copied()
    }

    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FieldSchema> {
        self.field_index.get(name).copied().map(|i| &mut self.fields[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableSchema {
        TableSchema::new("users")
            .add_field::<i32>("id", "INTEGER")
            .primary_key("id")
            .add_field::<String>("name", "VARCHAR(255)")
            .add_field::<String>("email", "VARCHAR(255)")
            .unique("email")
            .add_field::<i32>("age", "INTEGER")
            .nullable("age", true)
            .add_field::<bool>("active", "BOOLEAN")
            .indexed("active")
    }

    #[test]
    fn test_field_order_is_stable() {
        let schema = users();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "name", "email", "age", "active"]);
        assert_eq!(schema.field_count(), 5);
    }

    #[test]
    fn test_index_and_list_agree() {
        let schema = users();
        for (i, field) in schema.fields().iter().enumerate() {
            assert_eq!(schema.field_position(&field.name), Some(i));
            assert_eq!(schema.field(i).name, field.name);
        }
    }

    #[test]
    fn test_primary_key_clears_nullable() {
        let schema = users();
        let id = schema.field_schema("id").unwrap();
        assert!(id.is_primary_key);
        assert!(!id.is_nullable);
    }

    #[test]
    fn test_modifier_miss_is_noop() {
        let schema = users().primary_key("no_such_field");
        assert_eq!(schema.field_count(), 5);
        assert!(schema.field_schema("no_such_field").is_none());
    }

    #[test]
    fn test_foreign_key_metadata() {
        let schema = TableSchema::new("orders")
            .add_field::<i32>("user_id", "INTEGER")
            .foreign_key("user_id", "users", "id");
        let field = schema.field_schema("user_id").unwrap();
        assert!(field.is_foreign_key);
        assert_eq!(field.foreign_table, "users");
        assert_eq!(field.foreign_column, "id");
    }

    #[test]
    fn test_clone_is_deep() {
        let schema = users();
        let mut cloned = schema.clone();
        cloned = cloned.nullable("name", false);
        assert!(schema.field_schema("name").unwrap().is_nullable);
        assert!(!cloned.field_schema("name").unwrap().is_nullable);
    }

    #[test]
    fn test_field_kind_recorded() {
        let schema = users();
        assert_eq!(schema.field_schema("id").unwrap().kind, FieldKind::Int32);
        assert_eq!(schema.field_schema("name").unwrap().kind, FieldKind::Text);
        assert_eq!(schema.field_schema("active").unwrap().kind, FieldKind::Bool);
    }
}
