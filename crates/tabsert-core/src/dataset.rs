//! The tabular dataset model: ordered labels, key levels and rows.

use std::collections::HashMap;

use crate::error::{Result, UpsertError};
use crate::schema::SqlType;
use crate::value::SqlValue;

/// An ordered, keyed, in-memory dataset.
///
/// Rows are laid out key-levels-first: a row's first `key().len()` values
/// belong to the key levels, the rest to the columns, in declaration order.
/// The dataset is read-only once built; validation may return a filtered
/// copy for dialects that skip null-key rows.
#[derive(Debug, Clone)]
pub struct Dataset {
    key: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    overrides: HashMap<String, SqlType>,
}

impl Dataset {
    /// Starts building a dataset.
    #[must_use]
    pub fn builder() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Key level names, in order.
    #[must_use]
    pub fn key(&self) -> &[String] {
        &self.key
    }

    /// Non-key column names, in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All labels, key levels first.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.key.iter().chain(self.columns.iter()).map(String::as_str)
    }

    /// Number of labels (key levels + columns).
    #[must_use]
    pub fn width(&self) -> usize {
        self.key.len() + self.columns.len()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows, key values first within each row.
    #[must_use]
    pub fn rows(&self) -> &[Vec<SqlValue>] {
        &self.rows
    }

    /// The key tuple of a row.
    #[must_use]
    pub fn key_of<'a>(&self, row: &'a [SqlValue]) -> &'a [SqlValue] {
        &row[..self.key.len()]
    }

    /// Whether a label exists in the dataset.
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.label_index(label).is_some()
    }

    /// Position of a label within the row layout.
    #[must_use]
    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels().position(|l| l == label)
    }

    /// Iterates over one labeled column's values across all rows.
    pub fn values_for(&self, label: &str) -> impl Iterator<Item = &SqlValue> {
        let index = self.label_index(label);
        self.rows
            .iter()
            .filter_map(move |row| index.map(|i| &row[i]))
    }

    /// The caller's explicit type override for a label, if any.
    #[must_use]
    pub fn override_for(&self, label: &str) -> Option<&SqlType> {
        self.overrides.get(label)
    }

    /// Replaces the row set, keeping labels and overrides.
    pub(crate) fn with_rows(mut self, rows: Vec<Vec<SqlValue>>) -> Self {
        self.rows = rows;
        self
    }
}

/// Builder for [`Dataset`].
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    key: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    overrides: HashMap<String, SqlType>,
}

impl DatasetBuilder {
    /// Appends a key level.
    #[must_use]
    pub fn key_level(mut self, name: impl Into<String>) -> Self {
        self.key.push(name.into());
        self
    }

    /// Appends a non-key column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(name.into());
        self
    }

    /// Sets an explicit type override for a label.
    #[must_use]
    pub fn override_type(mut self, label: impl Into<String>, sql_type: SqlType) -> Self {
        self.overrides.insert(label.into(), sql_type);
        self
    }

    /// Appends a row; values are laid out key levels first, then columns.
    #[must_use]
    pub fn row(mut self, values: Vec<SqlValue>) -> Self {
        self.rows.push(values);
        self
    }

    /// Builds the dataset, rejecting rows whose width does not match the
    /// declared labels.
    pub fn build(self) -> Result<Dataset> {
        let expected = self.key.len() + self.columns.len();
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != expected {
                return Err(UpsertError::RowWidth {
                    row,
                    expected,
                    got: values.len(),
                });
            }
        }
        Ok(Dataset {
            key: self.key,
            columns: self.columns,
            rows: self.rows,
            overrides: self.overrides,
        })
    }
}
