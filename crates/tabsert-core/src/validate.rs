//! Dataset invariant checks, run before any SQL is built.
//!
//! All checks are fail-fast with zero database side effects. The one
//! exception to "fail" is MySQL's null-key handling: rows with a null key
//! value are filtered out with a warning, because MySQL's conflict detection
//! can never match them anyway.

use std::collections::HashSet;

use tracing::warn;

use crate::dataset::Dataset;
use crate::dialect::Dialect;
use crate::error::{Result, UpsertError};
use crate::value::{KeyView, SqlValue};

/// Validates the dataset's key and label invariants.
///
/// Returns the dataset, possibly with null-key rows filtered out (MySQL
/// only). On success the output is guaranteed to have named key levels,
/// unique labels and unique, non-null key tuples.
pub fn validate(dataset: Dataset, dialect: Dialect) -> Result<Dataset> {
    // 1. every key level is named
    if dataset.key().is_empty() {
        return Err(UpsertError::EmptyKey);
    }
    for (position, name) in dataset.key().iter().enumerate() {
        if name.trim().is_empty() {
            return Err(UpsertError::UnnamedKeyLevel { position });
        }
    }

    // 2. no label repeats across key levels and columns
    let mut seen = HashSet::new();
    let mut duplicates: Vec<String> = dataset
        .labels()
        .filter(|label| !seen.insert(*label))
        .map(String::from)
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        duplicates.dedup();
        return Err(UpsertError::DuplicateLabels { labels: duplicates });
    }

    // 3. key tuples are unique
    let key_len = dataset.key().len();
    {
        let mut seen = HashSet::with_capacity(dataset.len());
        let mut duplicates = Vec::new();
        for row in dataset.rows() {
            let key = KeyView(&row[..key_len]);
            if !seen.insert(key) {
                duplicates.push(key.to_string());
            }
        }
        if !duplicates.is_empty() {
            duplicates.sort();
            duplicates.dedup();
            return Err(UpsertError::DuplicateKeyValues { tuples: duplicates });
        }
    }

    // 4. key values are non-null
    if dialect.skips_null_key_rows() {
        let before = dataset.len();
        let rows: Vec<Vec<SqlValue>> = dataset
            .rows()
            .iter()
            .filter(|row| !row[..key_len].iter().any(SqlValue::is_null))
            .cloned()
            .collect();
        let dropped = before - rows.len();
        if dropped > 0 {
            warn!(
                dropped,
                dialect = dialect.name(),
                "skipping rows with null key values; a null key can never conflict on this dialect"
            );
        }
        Ok(dataset.with_rows(rows))
    } else {
        for (row_index, row) in dataset.rows().iter().enumerate() {
            if let Some(position) = row[..key_len].iter().position(SqlValue::is_null) {
                return Err(UpsertError::NullKeyValue {
                    level: dataset.key()[position].clone(),
                    row: row_index,
                });
            }
        }
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ToSqlValue;

    fn two_rows(keys: [SqlValue; 2]) -> Dataset {
        let [k1, k2] = keys;
        Dataset::builder()
            .key_level("id")
            .column("name")
            .row(vec![k1, "a".to_sql_value()])
            .row(vec![k2, "b".to_sql_value()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_valid_dataset_passes() {
        let ds = two_rows([1_i64.to_sql_value(), 2_i64.to_sql_value()]);
        let ds = validate(ds, Dialect::Postgres).unwrap();
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_unnamed_key_level() {
        let ds = Dataset::builder()
            .key_level("")
            .row(vec![1_i64.to_sql_value()])
            .build()
            .unwrap();
        assert!(matches!(
            validate(ds, Dialect::Sqlite),
            Err(UpsertError::UnnamedKeyLevel { position: 0 })
        ));
    }

    #[test]
    fn test_empty_key() {
        let ds = Dataset::builder().column("name").build().unwrap();
        assert!(matches!(
            validate(ds, Dialect::Sqlite),
            Err(UpsertError::EmptyKey)
        ));
    }

    #[test]
    fn test_duplicate_labels() {
        let ds = Dataset::builder()
            .key_level("id")
            .column("id")
            .build()
            .unwrap();
        match validate(ds, Dialect::Postgres) {
            Err(UpsertError::DuplicateLabels { labels }) => assert_eq!(labels, ["id"]),
            other => panic!("expected DuplicateLabels, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_key_values_identifies_tuple() {
        let ds = two_rows([7_i64.to_sql_value(), 7_i64.to_sql_value()]);
        match validate(ds, Dialect::Postgres) {
            Err(UpsertError::DuplicateKeyValues { tuples }) => {
                assert_eq!(tuples, ["(7)"]);
            }
            other => panic!("expected DuplicateKeyValues, got {other:?}"),
        }
    }

    #[test]
    fn test_null_key_rejected() {
        let ds = two_rows([SqlValue::Null, 2_i64.to_sql_value()]);
        assert!(matches!(
            validate(ds, Dialect::Postgres),
            Err(UpsertError::NullKeyValue { row: 0, .. })
        ));
    }

    #[test]
    fn test_null_key_filtered_for_mysql() {
        let ds = two_rows([SqlValue::Null, 2_i64.to_sql_value()]);
        let ds = validate(ds, Dialect::Mysql).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0][0], SqlValue::Int(2));
    }

    #[test]
    fn test_composite_key_uniqueness() {
        let ds = Dataset::builder()
            .key_level("a")
            .key_level("b")
            .row(vec![1_i64.to_sql_value(), 1_i64.to_sql_value()])
            .row(vec![1_i64.to_sql_value(), 2_i64.to_sql_value()])
            .build()
            .unwrap();
        assert!(validate(ds, Dialect::Sqlite).is_ok());
    }
}
