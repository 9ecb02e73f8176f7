//! External collaborator interfaces: catalog, execution and transactions.
//!
//! The core never talks to a driver directly. Backends implement
//! [`SqlClient`] for "a usable connection", [`Transactional`] for
//! transaction control, and [`ClientSource`] for "something that can hand
//! out a scoped connection" (a pool, an engine). Which capability the caller
//! provides decides who owns the transaction (see the executor).

use async_trait::async_trait;

use crate::dialect::Dialect;
use crate::error::BoxDynError;
use crate::schema::{TableColumn, TableRef};
use crate::value::SqlValue;

/// A usable database connection: statement execution plus catalog
/// introspection.
///
/// All fallible methods return the driver's error boxed and unmodified.
#[async_trait]
pub trait SqlClient: Send {
    /// The SQL dialect this connection speaks.
    fn dialect(&self) -> Dialect;

    /// Executes one parameterized statement, returning the affected-row
    /// count.
    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BoxDynError>;

    /// Whether the table exists.
    async fn table_exists(&mut self, table: &TableRef) -> Result<bool, BoxDynError>;

    /// Whether the schema/namespace exists. Dialects without a schema system
    /// may always answer `false`; the core never asks them.
    async fn schema_exists(&mut self, schema: &str) -> Result<bool, BoxDynError>;

    /// The table's columns as the catalog reports them.
    async fn get_columns(&mut self, table: &TableRef) -> Result<Vec<TableColumn>, BoxDynError>;

    /// Whether the column holds at least one non-null value.
    async fn column_has_data(
        &mut self,
        table: &TableRef,
        column: &str,
    ) -> Result<bool, BoxDynError>;
}

/// Transaction control over a [`SqlClient`].
#[async_trait]
pub trait Transactional: SqlClient {
    /// Opens a transaction.
    async fn begin(&mut self) -> Result<(), BoxDynError>;

    /// Commits the open transaction.
    async fn commit(&mut self) -> Result<(), BoxDynError>;

    /// Rolls back the open transaction.
    async fn rollback(&mut self) -> Result<(), BoxDynError>;
}

/// Something that can hand out a scoped, transaction-capable connection,
/// such as a pool or an engine.
///
/// Handing the executor a `ClientSource` transfers full connection and
/// transaction lifecycle ownership to it for the duration of one operation.
#[async_trait]
pub trait ClientSource: Send + Sync {
    /// The connection type this source produces.
    type Client: Transactional + Send;

    /// Acquires one connection.
    async fn acquire(&self) -> Result<Self::Client, BoxDynError>;
}
