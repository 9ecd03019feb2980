//! Typed and dynamic column handles.
//!
//! A [`Column<T>`] binds a field of a [`TableSchema`] together with its
//! native type; materializing one checks the requested type against the
//! field's recorded tag. [`DynamicColumn`] is the untyped counterpart used
//! where no owning schema exists (CTE outputs, set-operation results).
//! The table qualifier is a shared string so subqueries can rename their
//! source without copying every column.

use std::marker::PhantomData;
use std::sync::Arc;

use sql_bridge_common::{ClientError, ErrorContext, Result};

use crate::schema::{FieldSchema, TableSchemaRef};
use crate::value::{FieldKind, SqlType};

/// Typed handle to a schema field.
#[derive(Debug)]
pub struct Column<T> {
    schema: TableSchemaRef,
    index: usize,
    table: Option<Arc<str>>,
    alias: Option<String>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Column {
            schema: self.schema.clone(),
            index: self.index,
            table: self.table.clone(),
            alias: self.alias.clone(),
            _kind: PhantomData,
        }
    }
}

impl<T: SqlType> Column<T> {
    pub(crate) fn new(schema: TableSchemaRef, index: usize) -> Self {
        Column {
            schema,
            index,
            table: None,
            alias: None,
            _kind: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.field(self.index).name
    }

    pub fn field_schema(&self) -> &FieldSchema {
        self.schema.field(self.index)
    }

    pub fn table(&self) -> Option<&Arc<str>> {
        self.table.as_ref()
    }

    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Copy of this handle with an output alias attached.
    pub fn alias(&self, alias: impl Into<String>) -> Self {
        let mut col = self.clone();
        col.alias = Some(alias.into());
        col
    }

    /// Copy of this handle qualified with a table (or subquery/CTE) name.
    pub fn qualified(&self, table: impl Into<Arc<str>>) -> Self {
        let mut col = self.clone();
        col.table = Some(table.into());
        col
    }

    /// Drops the compile-time type tag.
    pub fn as_dynamic(&self) -> DynamicColumn {
        DynamicColumn {
            name: self.name().to_string(),
            table: self.table.clone(),
            alias: self.alias.clone(),
        }
    }

    pub(crate) fn parts(&self) -> (TableSchemaRef, usize, Option<Arc<str>>, Option<String>) {
        (
            self.schema.clone(),
            self.index,
            self.table.clone(),
            self.alias.clone(),
        )
    }
}

/// Untyped column reference.
#[derive(Debug, Clone)]
pub struct DynamicColumn {
    pub(crate) name: String,
    pub(crate) table: Option<Arc<str>>,
    pub(crate) alias: Option<String>,
}

impl DynamicColumn {
    pub fn new(name: impl Into<String>) -> Self {
        DynamicColumn {
            name: name.into(),
            table: None,
            alias: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Qualifies the column with a table, subquery or CTE name.
    pub fn qualified(mut self, table: impl Into<Arc<str>>) -> Self {
        self.table = Some(table.into());
        self
    }
}

/// Free factory for a dynamic column.
pub fn dynamic(name: impl Into<String>) -> DynamicColumn {
    DynamicColumn::new(name)
}

/// The `*` selector, optionally qualified (`"table".*`).
#[derive(Debug, Clone, Default)]
pub struct AllColumns {
    pub(crate) table: Option<Arc<str>>,
}

impl AllColumns {
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }
}

/// `all()` expands to `*`; `all_of("t")` to `"t".*`.
pub fn all() -> AllColumns {
    AllColumns { table: None }
}

pub fn all_of(table: impl Into<Arc<str>>) -> AllColumns {
    AllColumns {
        table: Some(table.into()),
    }
}

/// Typed column factory over a shared schema.
///
/// # Errors
///
/// Fails with a `TypeMismatch` context naming both sides when `T` does not
/// match the field's recorded tag, and with `InvalidArgument` when the field
/// does not exist.
pub fn col<T: SqlType>(schema: &TableSchemaRef, name: &str) -> Result<Column<T>> {
    schema.column(name)
}

/// Column accessors on a shared table schema handle.
pub trait SchemaColumns {
    /// Typed column; checks the requested native type against the field tag.
    fn column<T: SqlType>(&self, name: &str) -> Result<Column<T>>;

    /// Untyped column; no tag check.
    fn dynamic_column(&self, name: &str) -> Result<DynamicColumn>;
}

impl SchemaColumns for TableSchemaRef {
    fn column<T: SqlType>(&self, name: &str) -> Result<Column<T>> {
        let index = self.field_position(name).ok_or_else(|| {
            ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Field not found: {} in table {}", name, self.table_name()),
            )
        })?;
        let field = self.field(index);
        if field.kind != FieldKind::Unit && field.kind != T::KIND {
            return Err(ErrorContext::new(
                ClientError::TypeMismatch,
                format!(
                    "Type mismatch: field {} expects {} but got {}",
                    name,
                    field.kind.name(),
                    T::KIND.name()
                ),
            ));
        }
        Ok(Column::new(self.clone(), index))
    }

    fn dynamic_column(&self, name: &str) -> Result<DynamicColumn> {
        if self.field_position(name).is_none() {
            return Err(ErrorContext::new(
                ClientError::InvalidArgument,
                format!("Field not found: {} in table {}", name, self.table_name()),
            ));
        }
        Ok(DynamicColumn::new(name))
    }
}
