//! Structural reconciliation between a dataset and its target table.
//!
//! The reconciler diffs the dataset's implied schema against the (possibly
//! absent) target table and produces an ordered plan of structural actions.
//! It is pure: all catalog metadata is fetched beforehand and handed in.

use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::dialect::Dialect;
use crate::error::{Result, UpsertError};
use crate::schema::{ColumnSpec, TableRef, TargetTable};

/// Structural-change capability flags supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Create the schema/namespace if it does not exist.
    pub create_schema: bool,
    /// Create the table if it does not exist.
    pub create_table: bool,
    /// Add dataset columns missing from the table.
    pub add_missing_columns: bool,
    /// Widen the type of table columns that hold no data yet.
    pub adapt_empty_columns: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            create_schema: false,
            create_table: true,
            add_missing_columns: false,
            adapt_empty_columns: false,
        }
    }
}

/// A single structural action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconcileAction {
    /// Create a schema/namespace.
    CreateSchema {
        /// Schema name.
        schema: String,
    },
    /// Create the target table with the dataset's columns, keyed on the
    /// dataset's key levels.
    CreateTable {
        /// Target table.
        table: TableRef,
        /// All dataset columns, key levels first.
        columns: Vec<ColumnSpec>,
    },
    /// Add one dataset column missing from the table.
    AddColumn {
        /// Target table.
        table: TableRef,
        /// The column to add.
        column: ColumnSpec,
    },
    /// Change the type of a column that holds no data yet.
    AlterColumnType {
        /// Target table.
        table: TableRef,
        /// The column with its new type.
        column: ColumnSpec,
    },
}

impl ReconcileAction {
    /// Renders the action as one SQL statement for the given dialect.
    ///
    /// Where the dialect allows it the statement carries `IF NOT EXISTS`
    /// semantics, so re-running a plan after a partial failure does not fail
    /// merely because a prior attempt already created the structure.
    #[must_use]
    pub fn to_sql(&self, dialect: Dialect) -> String {
        match self {
            Self::CreateSchema { schema } => format!(
                "CREATE SCHEMA IF NOT EXISTS {}",
                dialect.quote_identifier(schema)
            ),
            Self::CreateTable { table, columns } => {
                let defs: Vec<String> = columns
                    .iter()
                    .map(|c| column_definition(c, dialect))
                    .collect();
                let key: Vec<String> = columns
                    .iter()
                    .filter(|c| c.key)
                    .map(|c| dialect.quote_identifier(&c.name))
                    .collect();
                format!(
                    "CREATE TABLE IF NOT EXISTS {} ({}, PRIMARY KEY ({}))",
                    table.qualified(dialect),
                    defs.join(", "),
                    key.join(", ")
                )
            }
            Self::AddColumn { table, column } => {
                let if_not_exists = match dialect {
                    Dialect::Postgres => "IF NOT EXISTS ",
                    Dialect::Mysql | Dialect::Sqlite => "",
                };
                format!(
                    "ALTER TABLE {} ADD COLUMN {}{} {}",
                    table.qualified(dialect),
                    if_not_exists,
                    dialect.quote_identifier(&column.name),
                    dialect.type_name(&column.sql_type)
                )
            }
            Self::AlterColumnType { table, column } => {
                let name = dialect.quote_identifier(&column.name);
                let type_name = dialect.type_name(&column.sql_type);
                match dialect {
                    // postgres needs an explicit cast of the stored values
                    Dialect::Postgres => format!(
                        "ALTER TABLE {} ALTER COLUMN {name} TYPE {type_name} USING {name}::{type_name}",
                        table.qualified(dialect)
                    ),
                    Dialect::Mysql => format!(
                        "ALTER TABLE {} MODIFY COLUMN {name} {type_name}",
                        table.qualified(dialect)
                    ),
                    Dialect::Sqlite => format!(
                        "ALTER TABLE {} ALTER COLUMN {name} TYPE {type_name}",
                        table.qualified(dialect)
                    ),
                }
            }
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::CreateSchema { schema } => format!("Create schema '{schema}'"),
            Self::CreateTable { table, .. } => format!("Create table '{}'", table.name),
            Self::AddColumn { table, column } => {
                format!("Add column '{}' to table '{}'", column.name, table.name)
            }
            Self::AlterColumnType { table, column } => format!(
                "Alter column '{}' in table '{}'",
                column.name, table.name
            ),
        }
    }
}

/// The ordered structural actions for one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPlan {
    /// Actions in execution order.
    pub actions: Vec<ReconcileAction>,
}

impl ReconciliationPlan {
    /// Whether there is nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

fn column_definition(column: &ColumnSpec, dialect: Dialect) -> String {
    let mut def = format!(
        "{} {}",
        dialect.quote_identifier(&column.name),
        dialect.type_name(&column.sql_type)
    );
    if column.key {
        def.push_str(" NOT NULL");
    }
    def
}

/// Strips length suffixes and case so catalog type names compare loosely,
/// e.g. `VARCHAR(50)` and `varchar` both normalize to `VARCHAR`.
fn normalize_type_name(name: &str) -> String {
    name.split('(').next().unwrap_or(name).trim().to_uppercase()
}

/// Diffs the dataset against the target table and plans structural actions.
///
/// `schema_present` is the pre-fetched answer to "does the schema exist"
/// (only consulted when schema creation is enabled). Plan order is fixed:
/// create-schema, create-table, add-columns, alter-column-types.
pub fn reconcile(
    dataset: &Dataset,
    columns: &[ColumnSpec],
    table: &TableRef,
    target: &TargetTable,
    schema_present: bool,
    options: &ReconcileOptions,
    dialect: Dialect,
) -> Result<ReconciliationPlan> {
    let mut actions = Vec::new();

    if options.create_schema {
        if let Some(schema) = &table.schema {
            if !dialect.supports_schemas() {
                return Err(UpsertError::NoSchemaSupport {
                    dialect: dialect.name(),
                });
            }
            if !schema_present {
                actions.push(ReconcileAction::CreateSchema {
                    schema: schema.clone(),
                });
            }
        }
    }

    if !target.exists {
        if options.create_table {
            actions.push(ReconcileAction::CreateTable {
                table: table.clone(),
                columns: columns.to_vec(),
            });
        }
        // nothing to diff against; a disabled create_table lets the
        // database's own "no such table" error surface at execution
        return Ok(ReconciliationPlan { actions });
    }

    if options.add_missing_columns {
        let missing: Vec<&ColumnSpec> = columns
            .iter()
            .filter(|c| target.column(&c.name).is_none())
            .collect();
        if let Some(key_column) = missing.iter().find(|c| c.key) {
            return Err(UpsertError::MissingKeyLevelInTable {
                column: key_column.name.clone(),
            });
        }
        for column in missing {
            actions.push(ReconcileAction::AddColumn {
                table: table.clone(),
                column: column.clone(),
            });
        }
    }

    if options.adapt_empty_columns {
        for column in columns {
            let Some(existing) = target.column(&column.name) else {
                continue;
            };
            // columns with data are never altered, regardless of flags
            if existing.has_data {
                continue;
            }
            let current = normalize_type_name(&existing.type_name);
            let wanted = normalize_type_name(&dialect.type_name(&column.sql_type));
            if current == wanted {
                continue;
            }
            // dialects without a JSON type store it as text; not a mismatch
            if (current == "JSON" || current == "JSONB") && wanted == "TEXT" {
                continue;
            }
            // nothing to gain from altering towards an all-null dataset column
            if !dataset.values_for(&column.name).any(|v| !v.is_null()) {
                continue;
            }
            if !dialect.supports_alter_column_type() {
                return Err(UpsertError::AlterColumnUnsupported {
                    dialect: dialect.name(),
                    column: column.name.clone(),
                });
            }
            actions.push(ReconcileAction::AlterColumnType {
                table: table.clone(),
                column: column.clone(),
            });
        }
    }

    Ok(ReconciliationPlan { actions })
}
