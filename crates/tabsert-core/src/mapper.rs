//! Canonical type inference over dataset columns.
//!
//! A pure fold over the value lattice: the narrowest canonical type that
//! losslessly represents every non-null value wins. Explicit caller
//! overrides beat inference unconditionally. The mapper never fails;
//! unclassifiable mixtures fall back to text.

use crate::dataset::Dataset;
use crate::schema::{ColumnSpec, SqlType};
use crate::value::SqlValue;

/// Infers a [`ColumnSpec`] for every label, key levels first.
#[must_use]
pub fn infer_columns(dataset: &Dataset) -> Vec<ColumnSpec> {
    let key_levels = dataset.key().len();
    dataset
        .labels()
        .enumerate()
        .map(|(index, label)| {
            let sql_type = dataset
                .override_for(label)
                .cloned()
                .unwrap_or_else(|| infer_type(dataset.rows().iter().map(move |row| &row[index])));
            ColumnSpec {
                name: label.to_string(),
                sql_type,
                key: index < key_levels,
            }
        })
        .collect()
}

/// Infers the canonical type of one column's values.
pub fn infer_type<'a>(values: impl Iterator<Item = &'a SqlValue>) -> SqlType {
    values
        .filter_map(natural_type)
        .reduce(widen)
        // all-null column: generic nullable fallback
        .unwrap_or(SqlType::Text)
}

fn natural_type(value: &SqlValue) -> Option<SqlType> {
    match value {
        SqlValue::Null => None,
        SqlValue::Bool(_) => Some(SqlType::Boolean),
        SqlValue::Int(_) => Some(SqlType::BigInt),
        SqlValue::Float(_) => Some(SqlType::Double),
        SqlValue::Text(_) => Some(SqlType::Text),
        SqlValue::Bytes(_) => Some(SqlType::Bytes),
        SqlValue::Timestamp(_) => Some(SqlType::Timestamp),
        SqlValue::TimestampTz(_) => Some(SqlType::TimestampTz),
        SqlValue::Json(_) => Some(SqlType::Json),
    }
}

fn widen(a: SqlType, b: SqlType) -> SqlType {
    match (a, b) {
        (a, b) if a == b => a,
        // integers widen losslessly into doubles
        (SqlType::BigInt, SqlType::Double) | (SqlType::Double, SqlType::BigInt) => SqlType::Double,
        // everything else (including naive/zoned timestamp mixtures) degrades
        // to text rather than silently merging incompatible storage forms
        _ => SqlType::Text,
    }
}
