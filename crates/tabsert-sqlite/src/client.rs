//! Client trait implementations over sqlx's SQLite driver.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Connection, Row, Sqlite, SqliteConnection, SqlitePool};

use tabsert_core::client::{ClientSource, SqlClient, Transactional};
use tabsert_core::dialect::Dialect;
use tabsert_core::error::BoxDynError;
use tabsert_core::schema::{TableColumn, TableRef};
use tabsert_core::value::SqlValue;

/// Binds every parameter in order. Values are always bound, never rendered
/// into the SQL text.
fn bind_all<'q>(
    sql: &'q str,
    params: &[SqlValue],
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    let mut query = sqlx::query(sql);
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(Option::<i64>::None),
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Int(i) => query.bind(*i),
            SqlValue::Float(f) => query.bind(*f),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Bytes(b) => query.bind(b.clone()),
            SqlValue::Timestamp(t) => query.bind(*t),
            SqlValue::TimestampTz(t) => query.bind(*t),
            SqlValue::Json(j) => query.bind(j.clone()),
        };
    }
    query
}

async fn execute_on(
    conn: &mut SqliteConnection,
    sql: &str,
    params: &[SqlValue],
) -> Result<u64, BoxDynError> {
    let done = bind_all(sql, params).execute(conn).await?;
    Ok(done.rows_affected())
}

async fn table_exists_on(
    conn: &mut SqliteConnection,
    table: &TableRef,
) -> Result<bool, BoxDynError> {
    let row = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?")
        .bind(table.name.clone())
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

async fn get_columns_on(
    conn: &mut SqliteConnection,
    table: &TableRef,
) -> Result<Vec<TableColumn>, BoxDynError> {
    // PRAGMA arguments cannot be bound; the identifier is quoted instead
    let sql = format!(
        "PRAGMA table_info({})",
        Dialect::Sqlite.quote_identifier(&table.name)
    );
    let rows = sqlx::query(&sql).fetch_all(conn).await?;
    Ok(rows
        .iter()
        .map(|row| {
            let pk: i64 = row.get("pk");
            TableColumn {
                name: row.get("name"),
                type_name: row.get("type"),
                primary_key: pk > 0,
                has_data: true,
            }
        })
        .collect())
}

async fn column_has_data_on(
    conn: &mut SqliteConnection,
    table: &TableRef,
    column: &str,
) -> Result<bool, BoxDynError> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE {} IS NOT NULL LIMIT 1",
        table.qualified(Dialect::Sqlite),
        Dialect::Sqlite.quote_identifier(column)
    );
    let row = sqlx::query(&sql).fetch_optional(conn).await?;
    Ok(row.is_some())
}

/// A caller-owned SQLite connection.
///
/// The executor never touches its transaction state; `BEGIN`/`COMMIT` are
/// the caller's to issue (directly or through [`Transactional`]).
pub struct SqliteClient {
    conn: SqliteConnection,
}

impl SqliteClient {
    /// Opens a connection from a sqlx SQLite URL or filename
    /// (e.g. `sqlite:data.db`, `:memory:`).
    pub async fn connect(url: &str) -> Result<Self, BoxDynError> {
        Ok(Self {
            conn: SqliteConnection::connect(url).await?,
        })
    }

    /// Wraps an already-open connection.
    #[must_use]
    pub fn from_connection(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    /// Borrows the underlying connection, e.g. for reading data back.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    /// Returns the underlying connection.
    #[must_use]
    pub fn into_inner(self) -> SqliteConnection {
        self.conn
    }
}

#[async_trait]
impl SqlClient for SqliteClient {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BoxDynError> {
        execute_on(&mut self.conn, sql, params).await
    }

    async fn table_exists(&mut self, table: &TableRef) -> Result<bool, BoxDynError> {
        table_exists_on(&mut self.conn, table).await
    }

    async fn schema_exists(&mut self, _schema: &str) -> Result<bool, BoxDynError> {
        // SQLite has no schema system; the core refuses schema operations on
        // this dialect before asking.
        Ok(false)
    }

    async fn get_columns(&mut self, table: &TableRef) -> Result<Vec<TableColumn>, BoxDynError> {
        get_columns_on(&mut self.conn, table).await
    }

    async fn column_has_data(
        &mut self,
        table: &TableRef,
        column: &str,
    ) -> Result<bool, BoxDynError> {
        column_has_data_on(&mut self.conn, table, column).await
    }
}

#[async_trait]
impl Transactional for SqliteClient {
    async fn begin(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("BEGIN").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("COMMIT").execute(&mut self.conn).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("ROLLBACK").execute(&mut self.conn).await?;
        Ok(())
    }
}

/// A pooled SQLite connection, produced by [`SqlitePoolSource`].
pub struct PooledSqliteClient {
    conn: PoolConnection<Sqlite>,
}

impl PooledSqliteClient {
    /// Borrows the underlying connection.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

#[async_trait]
impl SqlClient for PooledSqliteClient {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64, BoxDynError> {
        execute_on(&mut self.conn, sql, params).await
    }

    async fn table_exists(&mut self, table: &TableRef) -> Result<bool, BoxDynError> {
        table_exists_on(&mut self.conn, table).await
    }

    async fn schema_exists(&mut self, _schema: &str) -> Result<bool, BoxDynError> {
        Ok(false)
    }

    async fn get_columns(&mut self, table: &TableRef) -> Result<Vec<TableColumn>, BoxDynError> {
        get_columns_on(&mut self.conn, table).await
    }

    async fn column_has_data(
        &mut self,
        table: &TableRef,
        column: &str,
    ) -> Result<bool, BoxDynError> {
        column_has_data_on(&mut self.conn, table, column).await
    }
}

#[async_trait]
impl Transactional for PooledSqliteClient {
    async fn begin(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("BEGIN").execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), BoxDynError> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        Ok(())
    }
}

/// A [`ClientSource`] over a sqlx [`SqlitePool`].
///
/// Handing this to the executor grants it one scoped connection and full
/// transaction ownership per operation.
#[derive(Clone)]
pub struct SqlitePoolSource {
    pool: SqlitePool,
}

impl SqlitePoolSource {
    /// Wraps a pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Borrows the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ClientSource for SqlitePoolSource {
    type Client = PooledSqliteClient;

    async fn acquire(&self) -> Result<Self::Client, BoxDynError> {
        Ok(PooledSqliteClient {
            conn: self.pool.acquire().await?,
        })
    }
}
