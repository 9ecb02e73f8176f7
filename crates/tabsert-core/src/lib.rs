//! Dialect-aware upserts for tabular datasets.
//!
//! `tabsert-core` turns an in-memory tabular dataset (ordered rows keyed by
//! one or more named key levels) into dialect-correct parameterized
//! `INSERT ... ON CONFLICT` statements, optionally reconciling the target
//! table's structure first (creating the schema/table, adding missing
//! columns, widening empty-column types), and executes them in
//! parameter-budget-respecting chunks.
//!
//! # Architecture
//!
//! - **`dataset` / `value`**: the caller-supplied dataset and its cell
//!   values.
//! - **`mapper`**: infers a canonical SQL type per column.
//! - **`validate`**: enforces key/label invariants before any SQL exists.
//! - **`reconcile`**: diffs the dataset against the target table into a
//!   plan of structural actions.
//! - **`query`**: renders the dialect-specific upsert statement.
//! - **`chunk`**: splits rows into chunks that fit the dialect's parameter
//!   limit.
//! - **`executor`**: drives the whole operation over the `client` traits,
//!   which a backend crate (e.g. `tabsert-sqlite`) implements.
//!
//! # Example
//!
//! ```
//! use tabsert_core::prelude::*;
//!
//! let dataset = Dataset::builder()
//!     .key_level("profileid")
//!     .column("name")
//!     .row(vec![10_i64.to_sql_value(), "Albert".to_sql_value()])
//!     .row(vec![11_i64.to_sql_value(), "Toto".to_sql_value()])
//!     .build()?;
//!
//! let upsert = Upsert::new("example", ConflictMode::Update)
//!     .create_table(true);
//! // upsert.run(dataset, &mut client).await? against any SqlClient backend
//! # let _ = (dataset, upsert);
//! # Ok::<(), tabsert_core::error::UpsertError>(())
//! ```

pub mod chunk;
pub mod client;
pub mod dataset;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mapper;
pub mod query;
pub mod reconcile;
pub mod schema;
pub mod validate;
pub mod value;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::chunk::safe_chunksize;
    pub use crate::client::{ClientSource, SqlClient, Transactional};
    pub use crate::dataset::{Dataset, DatasetBuilder};
    pub use crate::dialect::Dialect;
    pub use crate::error::{Result, UpsertError};
    pub use crate::executor::{ChunkOutcome, Upsert};
    pub use crate::logging::init_logging;
    pub use crate::query::{ConflictMode, UpsertQuery};
    pub use crate::reconcile::{ReconcileAction, ReconcileOptions, ReconciliationPlan};
    pub use crate::schema::{ColumnSpec, SqlType, TableColumn, TableRef, TargetTable};
    pub use crate::value::{SqlValue, ToSqlValue};
}
