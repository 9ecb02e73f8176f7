//! Error types for upsert operations.

/// Boxed driver/database error.
///
/// Errors raised by the backing driver are passed through unwrapped so that
/// callers can downcast to the driver's own error type.
pub type BoxDynError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while planning or executing an upsert.
#[derive(Debug, thiserror::Error)]
pub enum UpsertError {
    /// The dataset defines no key levels at all.
    #[error("the dataset defines no key levels; at least one is required as the conflict target")]
    EmptyKey,

    /// A key level has no usable name.
    #[error("key level {position} has no name; every key level must be named")]
    UnnamedKeyLevel {
        /// Zero-based position of the offending key level.
        position: usize,
    },

    /// A name appears more than once across key levels and columns.
    #[error("duplicate labels across key levels and columns: {}", .labels.join(", "))]
    DuplicateLabels {
        /// The repeated labels.
        labels: Vec<String>,
    },

    /// The same key tuple appears in more than one row.
    #[error("duplicate key values: {}", .tuples.join("; "))]
    DuplicateKeyValues {
        /// Rendered offending key tuples.
        tuples: Vec<String>,
    },

    /// A key value is null on a dialect that rejects null conflict targets.
    #[error("null value in key level '{level}' at row {row}")]
    NullKeyValue {
        /// Name of the key level holding the null.
        level: String,
        /// Zero-based row index.
        row: usize,
    },

    /// A row's width does not match the dataset's label count.
    #[error("row {row} has {got} values but the dataset defines {expected} labels")]
    RowWidth {
        /// Zero-based row index.
        row: usize,
        /// Number of labels (key levels + columns).
        expected: usize,
        /// Number of values in the row.
        got: usize,
    },

    /// A column that would need to be added to the table is a key level.
    ///
    /// Adding a column that belongs to the conflict key is not a safe
    /// auto-migration; the table's key has to be changed manually.
    #[error("cannot add column '{column}': it is a key level missing from the table")]
    MissingKeyLevelInTable {
        /// The offending column name.
        column: String,
    },

    /// Schema creation was requested on a dialect without a schema system.
    #[error("the {dialect} dialect has no schema system")]
    NoSchemaSupport {
        /// Dialect name.
        dialect: &'static str,
    },

    /// Column type alteration was requested on a dialect that cannot do it.
    #[error("the {dialect} dialect cannot alter the type of column '{column}'")]
    AlterColumnUnsupported {
        /// Dialect name.
        dialect: &'static str,
        /// The column whose type would have changed.
        column: String,
    },

    /// Even a single-row statement would exceed the dialect's parameter limit.
    #[error(
        "{params_per_row} parameters per row exceed the {dialect} limit of {limit}; \
         no chunk size can satisfy it"
    )]
    TooManyColumnsForUpsert {
        /// Parameters bound per row (columns + key levels).
        params_per_row: usize,
        /// The dialect's maximum parameters per statement.
        limit: usize,
        /// Dialect name.
        dialect: &'static str,
    },

    /// The requested chunksize is not a positive number of rows.
    #[error("chunksize must be strictly above zero")]
    InvalidChunksize,

    /// Underlying driver/database error, passed through unwrapped.
    #[error("database error: {0}")]
    Database(#[source] BoxDynError),
}

/// Result type for upsert operations.
pub type Result<T> = std::result::Result<T, UpsertError>;
