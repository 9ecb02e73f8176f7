//! Schema-side descriptions of dataset columns and target tables.
//!
//! These types sit between the dataset (what the caller hands in) and the
//! database catalog (what actually exists): the type mapper produces
//! [`ColumnSpec`]s, the catalog reports [`TableColumn`]s, and the reconciler
//! diffs the two.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;

/// Canonical, dialect-neutral SQL types.
///
/// The type mapper only ever infers the untyped-length variants;
/// [`SqlType::Varchar`] exists for explicit caller overrides (MySQL needs a
/// definite length for text primary keys, for example).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// Boolean.
    Boolean,
    /// 64-bit integer.
    BigInt,
    /// Double-precision float.
    Double,
    /// Unbounded text.
    Text,
    /// Variable-length character string with an explicit limit.
    Varchar(usize),
    /// Naive (timezone-less) timestamp.
    Timestamp,
    /// Timezone-aware timestamp.
    TimestampTz,
    /// Binary data.
    Bytes,
    /// JSON data.
    Json,
}

/// A dataset column as the statement builder sees it: label, canonical type
/// and whether it belongs to the upsert key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column label.
    pub name: String,
    /// Canonical type (inferred, or the caller's override).
    pub sql_type: SqlType,
    /// Whether the column is a key level.
    pub key: bool,
}

impl ColumnSpec {
    /// Creates a non-key column spec.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            key: false,
        }
    }

    /// Marks the column as a key level.
    #[must_use]
    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }
}

/// A column as reported by the database catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    /// Column name.
    pub name: String,
    /// Type name as the catalog renders it (e.g. `VARCHAR(50)`).
    pub type_name: String,
    /// Whether the column is part of the table's primary key.
    pub primary_key: bool,
    /// Whether the column holds at least one non-null value.
    ///
    /// Defaults to `true` so a column is never considered alterable unless a
    /// probe proved it empty.
    pub has_data: bool,
}

impl TableColumn {
    /// Creates a column descriptor with safe defaults.
    #[must_use]
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            primary_key: false,
            has_data: true,
        }
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the has-data flag.
    #[must_use]
    pub fn with_data(mut self, has_data: bool) -> Self {
        self.has_data = has_data;
        self
    }
}

/// A table reference: optional schema/namespace plus table name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema (namespace) containing the table, if any.
    pub schema: Option<String>,
    /// Table name.
    pub name: String,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Creates a schema-qualified table reference.
    #[must_use]
    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Renders the quoted, dialect-correct qualified name.
    #[must_use]
    pub fn qualified(&self, dialect: Dialect) -> String {
        match &self.schema {
            Some(schema) => format!(
                "{}.{}",
                dialect.quote_identifier(schema),
                dialect.quote_identifier(&self.name)
            ),
            None => dialect.quote_identifier(&self.name),
        }
    }
}

/// Target table metadata, fetched once per operation through the catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetTable {
    /// Whether the table exists.
    pub exists: bool,
    /// Existing columns (empty if the table does not exist).
    pub columns: Vec<TableColumn>,
}

impl TargetTable {
    /// Metadata for a table that does not exist.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Metadata for an existing table.
    #[must_use]
    pub fn existing(columns: Vec<TableColumn>) -> Self {
        Self {
            exists: true,
            columns,
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}
