//! Dialect-specific parameterized upsert statements.
//!
//! One [`UpsertQuery`] is built per operation and reused across all of its
//! chunks; only the number of row groups changes between renderings. All
//! identifiers are quoted, all values are bound parameters.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::schema::TableRef;

/// What to do when an incoming row's key already exists in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictMode {
    /// Overwrite every non-key column of the existing row with the incoming
    /// values. Columns absent from the dataset are left untouched.
    Update,
    /// Leave the existing row unmodified.
    Ignore,
}

/// A prepared, reusable upsert statement for one operation.
#[derive(Debug, Clone)]
pub struct UpsertQuery {
    dialect: Dialect,
    insert_verb: &'static str,
    table: String,
    column_list: String,
    conflict_clause: String,
    params_per_row: usize,
}

impl UpsertQuery {
    /// Builds the statement skeleton for the given column layout and mode.
    ///
    /// `key` and `columns` must be the dataset's key levels and non-key
    /// columns, in row-layout order. A dataset with zero non-key columns
    /// still yields a valid statement in both modes: update degrades to a
    /// no-op assignment that rewrites the key to itself.
    #[must_use]
    pub fn new(
        dialect: Dialect,
        table: &TableRef,
        key: &[String],
        columns: &[String],
        mode: ConflictMode,
    ) -> Self {
        let quoted_key: Vec<String> = key.iter().map(|k| dialect.quote_identifier(k)).collect();
        let quoted_columns: Vec<String> = columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect();

        let mut all_columns = quoted_key.clone();
        all_columns.extend(quoted_columns.iter().cloned());

        // in update mode with no non-key columns, rewrite the key to itself
        let assignment_targets: &[String] = if quoted_columns.is_empty() {
            &quoted_key
        } else {
            &quoted_columns
        };

        let (insert_verb, conflict_clause) = match dialect {
            Dialect::Postgres | Dialect::Sqlite => {
                let target = quoted_key.join(", ");
                let clause = match mode {
                    ConflictMode::Ignore => format!(" ON CONFLICT ({target}) DO NOTHING"),
                    ConflictMode::Update => {
                        let assignments: Vec<String> = assignment_targets
                            .iter()
                            .map(|c| format!("{c} = EXCLUDED.{c}"))
                            .collect();
                        format!(
                            " ON CONFLICT ({target}) DO UPDATE SET {}",
                            assignments.join(", ")
                        )
                    }
                };
                ("INSERT INTO", clause)
            }
            Dialect::Mysql => match mode {
                ConflictMode::Ignore => ("INSERT IGNORE INTO", String::new()),
                ConflictMode::Update => {
                    let assignments: Vec<String> = assignment_targets
                        .iter()
                        .map(|c| format!("{c} = VALUES({c})"))
                        .collect();
                    (
                        "INSERT INTO",
                        format!(" ON DUPLICATE KEY UPDATE {}", assignments.join(", ")),
                    )
                }
            },
        };

        Self {
            dialect,
            insert_verb,
            table: table.qualified(dialect),
            column_list: all_columns.join(", "),
            conflict_clause,
            params_per_row: key.len() + columns.len(),
        }
    }

    /// Parameters bound per row (key levels + columns).
    #[must_use]
    pub fn params_per_row(&self) -> usize {
        self.params_per_row
    }

    /// Renders the statement for a chunk of `rows` rows.
    #[must_use]
    pub fn sql(&self, rows: usize) -> String {
        debug_assert!(rows > 0, "a chunk always carries at least one row");

        let mut sql = String::with_capacity(
            self.table.len() + self.column_list.len() + self.conflict_clause.len() + rows * 16,
        );
        sql.push_str(self.insert_verb);
        sql.push(' ');
        sql.push_str(&self.table);
        sql.push_str(" (");
        sql.push_str(&self.column_list);
        sql.push_str(") VALUES ");

        let mut position = 0;
        for row in 0..rows {
            if row > 0 {
                sql.push_str(", ");
            }
            sql.push('(');
            for slot in 0..self.params_per_row {
                if slot > 0 {
                    sql.push_str(", ");
                }
                position += 1;
                sql.push_str(&self.dialect.placeholder(position));
            }
            sql.push(')');
        }

        sql.push_str(&self.conflict_clause);
        sql
    }
}
