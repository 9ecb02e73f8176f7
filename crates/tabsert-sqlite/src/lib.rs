//! # tabsert-sqlite
//!
//! SQLite backend for `tabsert-core`, built on `sqlx`.
//!
//! Three entry points, matching the core's capability contract:
//!
//! - [`SqliteClient`]: a caller-owned connection; the executor uses it
//!   as-is and never touches its transaction state,
//! - [`SqlitePoolSource`]: a `ClientSource` over a [`sqlx::SqlitePool`],
//!   granting the executor one scoped connection and full transaction
//!   ownership per operation,
//! - [`PooledSqliteClient`]: the connection type the pool source produces.
//!
//! # How SQLite differs from the other dialects
//!
//! - **UPSERT**: `INSERT ... ON CONFLICT DO NOTHING / DO UPDATE SET`
//!   (since SQLite 3.24.0), with `EXCLUDED` for the incoming row.
//! - **No schema system**: schema-qualified operations are rejected by the
//!   core before this backend is ever asked.
//! - **Limited ALTER TABLE**: `ADD COLUMN` works, altering a column's type
//!   does not; the core refuses dtype adaptation on this dialect.
//! - **Parameter budget**: `SQLITE_MAX_VARIABLE_NUMBER` defaults to 32766
//!   (SQLite >= 3.32.0), which caps rows per chunk.
//! - **Type affinity**: declared types collapse to INTEGER / REAL / TEXT /
//!   BLOB; timestamps and JSON are stored as TEXT.
//!
//! # Example
//!
//! ```no_run
//! use tabsert_core::prelude::*;
//! use tabsert_sqlite::SqliteClient;
//!
//! # async fn demo() -> Result<()> {
//! let mut client = SqliteClient::connect("sqlite:data.db")
//!     .await
//!     .map_err(UpsertError::Database)?;
//!
//! let dataset = Dataset::builder()
//!     .key_level("profileid")
//!     .column("name")
//!     .row(vec![10_i64.to_sql_value(), "Albert".to_sql_value()])
//!     .build()?;
//!
//! Upsert::new("example", ConflictMode::Update)
//!     .run(dataset, &mut client)
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod client;

pub use client::{PooledSqliteClient, SqliteClient, SqlitePoolSource};
