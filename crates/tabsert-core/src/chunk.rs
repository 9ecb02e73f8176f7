//! Parameter-budget chunk planning.
//!
//! Each chunk is a contiguous range over the dataset's rows, sized so that
//! `rows * (columns + key_levels)` stays within the dialect's parameter
//! limit. Chunks preserve row order.

use std::ops::Range;

use tracing::warn;

use crate::dialect::Dialect;
use crate::error::{Result, UpsertError};

/// Recommends the largest chunksize the dialect can take for this layout.
///
/// Advisory only: `floor(parameter_limit / (columns + key_levels))`. Errors
/// with [`UpsertError::TooManyColumnsForUpsert`] when even one row per
/// statement would exceed the limit.
pub fn safe_chunksize(column_count: usize, key_levels: usize, dialect: Dialect) -> Result<usize> {
    let params_per_row = column_count + key_levels;
    let limit = dialect.parameter_limit();
    let maximum = limit / params_per_row.max(1);
    if params_per_row == 0 || maximum == 0 {
        return Err(UpsertError::TooManyColumnsForUpsert {
            params_per_row,
            limit,
            dialect: dialect.name(),
        });
    }
    Ok(maximum)
}

/// Partitions `row_count` rows into ordered, budget-respecting chunks.
///
/// With no requested chunksize, one chunk holds all rows, capped at the
/// dialect-safe maximum. A caller-requested chunksize above the safe maximum
/// is reduced to it with a warning, never silently.
pub fn plan(
    row_count: usize,
    column_count: usize,
    key_levels: usize,
    dialect: Dialect,
    requested: Option<usize>,
) -> Result<Vec<Range<usize>>> {
    let maximum = safe_chunksize(column_count, key_levels, dialect)?;

    let chunksize = match requested {
        None => maximum,
        Some(0) => return Err(UpsertError::InvalidChunksize),
        Some(rows) if rows > maximum => {
            warn!(
                requested = rows,
                reduced_to = maximum,
                dialect = dialect.name(),
                limit = dialect.parameter_limit(),
                "reducing chunksize to stay within the dialect's parameter limit"
            );
            maximum
        }
        Some(rows) => rows,
    };

    let mut chunks = Vec::with_capacity(row_count.div_ceil(chunksize.max(1)));
    let mut start = 0;
    while start < row_count {
        let end = usize::min(start + chunksize, row_count);
        chunks.push(start..end);
        start = end;
    }
    Ok(chunks)
}
