//! Upsert execution: structural reconciliation first, then ordered chunks.
//!
//! [`Upsert`] is the public entry point. One operation validates the
//! dataset, fetches the target table's metadata, plans structural actions
//! and chunks, and only then starts sending statements: strictly
//! sequentially, reconciliation before the first chunk, chunks in dataset
//! row order.
//!
//! Transaction ownership follows the entry point: `run`/`stream` use a
//! caller-owned connection as-is and never touch transaction state, while
//! `run_with`/`stream_with` acquire one connection from a [`ClientSource`],
//! open one transaction, and commit or roll back themselves.

use std::ops::Range;

use tracing::{debug, info};

use crate::chunk;
use crate::client::{ClientSource, SqlClient, Transactional};
use crate::dataset::Dataset;
use crate::error::{Result, UpsertError};
use crate::mapper::infer_columns;
use crate::query::{ConflictMode, UpsertQuery};
use crate::reconcile::{reconcile, ReconcileOptions, ReconciliationPlan};
use crate::schema::{TableRef, TargetTable};
use crate::validate::validate;
use crate::value::SqlValue;

/// Outcome of one executed chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Affected-row count reported by the driver.
    pub rows_affected: u64,
    /// Number of dataset rows bound into the chunk.
    pub rows_in_chunk: usize,
}

/// A configured upsert operation.
///
/// ```
/// use tabsert_core::prelude::*;
///
/// let upsert = Upsert::new("users", ConflictMode::Update)
///     .create_table(true)
///     .add_missing_columns(true)
///     .chunksize(5_000);
/// # let _ = upsert;
/// ```
#[derive(Debug, Clone)]
pub struct Upsert {
    table: TableRef,
    mode: ConflictMode,
    options: ReconcileOptions,
    chunksize: Option<usize>,
}

impl Upsert {
    /// Creates an operation targeting `table` with the given conflict mode.
    #[must_use]
    pub fn new(table: impl Into<String>, mode: ConflictMode) -> Self {
        Self {
            table: TableRef::new(table),
            mode,
            options: ReconcileOptions::default(),
            chunksize: None,
        }
    }

    /// Sets the schema/namespace containing the table.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.table.schema = Some(schema.into());
        self
    }

    /// Creates the schema if it does not exist (default off).
    #[must_use]
    pub fn create_schema(mut self, enabled: bool) -> Self {
        self.options.create_schema = enabled;
        self
    }

    /// Creates the table if it does not exist (default on).
    #[must_use]
    pub fn create_table(mut self, enabled: bool) -> Self {
        self.options.create_table = enabled;
        self
    }

    /// Adds dataset columns missing from the table (default off).
    #[must_use]
    pub fn add_missing_columns(mut self, enabled: bool) -> Self {
        self.options.add_missing_columns = enabled;
        self
    }

    /// Widens the type of empty table columns to match the dataset
    /// (default off). Columns holding data are never altered.
    #[must_use]
    pub fn adapt_empty_columns(mut self, enabled: bool) -> Self {
        self.options.adapt_empty_columns = enabled;
        self
    }

    /// Requests a chunksize in rows. Without one, the operation attempts a
    /// single chunk capped at the dialect's parameter budget.
    #[must_use]
    pub fn chunksize(mut self, rows: usize) -> Self {
        self.chunksize = Some(rows);
        self
    }

    /// Runs the operation on a caller-owned connection.
    ///
    /// No transaction is begun, committed or rolled back; transaction
    /// boundaries belong entirely to the caller.
    pub async fn run<C: SqlClient>(&self, dataset: Dataset, client: &mut C) -> Result<()> {
        let prepared = self.prepare(dataset, client).await?;
        apply_plan(&prepared.plan, client).await?;
        for range in prepared.ranges.iter().cloned() {
            send_chunk(client, &prepared.query, &prepared.dataset, range).await?;
        }
        Ok(())
    }

    /// Runs the operation with full connection and transaction ownership:
    /// acquires one client from the source, opens one transaction, commits
    /// on success and rolls back on any failure.
    pub async fn run_with<S: ClientSource>(&self, dataset: Dataset, source: &S) -> Result<()> {
        let mut client = source.acquire().await.map_err(UpsertError::Database)?;
        client.begin().await.map_err(UpsertError::Database)?;
        match self.run(dataset, &mut client).await {
            Ok(()) => client.commit().await.map_err(UpsertError::Database),
            Err(err) => {
                // the original failure is what the caller needs to see
                let _ = client.rollback().await;
                Err(err)
            }
        }
    }

    /// Like [`Upsert::run`], but hands back one [`ChunkOutcome`] per chunk.
    ///
    /// Structural actions are applied before this returns; the returned
    /// sequence is lazy, forward-only and single-pass: each call to
    /// [`ChunkOutcomes::next`] sends one chunk, so side effects are already
    /// applied when an outcome is produced.
    pub async fn stream<'c, C: SqlClient>(
        &self,
        dataset: Dataset,
        client: &'c mut C,
    ) -> Result<ChunkOutcomes<'c, C>> {
        let prepared = self.prepare(dataset, client).await?;
        apply_plan(&prepared.plan, client).await?;
        Ok(ChunkOutcomes {
            client,
            dataset: prepared.dataset,
            query: prepared.query,
            ranges: prepared.ranges.into_iter(),
        })
    }

    /// Like [`Upsert::run_with`], but hands back one [`ChunkOutcome`] per
    /// chunk. The transaction commits when the sequence is exhausted and
    /// rolls back on a mid-stream error; abandoning the sequence before
    /// exhaustion leaves the uncommitted transaction to the connection's
    /// drop behavior.
    pub async fn stream_with<S: ClientSource>(
        &self,
        dataset: Dataset,
        source: &S,
    ) -> Result<OwnedChunkOutcomes<S::Client>> {
        let mut client = source.acquire().await.map_err(UpsertError::Database)?;
        client.begin().await.map_err(UpsertError::Database)?;
        let prepared = match self.prepare(dataset, &mut client).await {
            Ok(prepared) => prepared,
            Err(err) => {
                let _ = client.rollback().await;
                return Err(err);
            }
        };
        if let Err(err) = apply_plan(&prepared.plan, &mut client).await {
            let _ = client.rollback().await;
            return Err(err);
        }
        Ok(OwnedChunkOutcomes {
            client,
            dataset: prepared.dataset,
            query: prepared.query,
            ranges: prepared.ranges.into_iter(),
            finished: false,
        })
    }

    /// Blocking form of [`Upsert::run`].
    pub fn run_blocking<C: SqlClient>(&self, dataset: Dataset, client: &mut C) -> Result<()> {
        futures::executor::block_on(self.run(dataset, client))
    }

    /// Blocking form of [`Upsert::run_with`].
    pub fn run_with_blocking<S: ClientSource>(&self, dataset: Dataset, source: &S) -> Result<()> {
        futures::executor::block_on(self.run_with(dataset, source))
    }

    /// Blocking form of [`Upsert::stream`]; the result implements
    /// [`Iterator`].
    pub fn stream_blocking<'c, C: SqlClient>(
        &self,
        dataset: Dataset,
        client: &'c mut C,
    ) -> Result<BlockingChunkOutcomes<'c, C>> {
        futures::executor::block_on(self.stream(dataset, client)).map(BlockingChunkOutcomes)
    }

    /// Validates, infers, introspects and plans. No statement is sent here,
    /// so every validation and capacity error fires with zero side effects.
    async fn prepare<C: SqlClient>(&self, dataset: Dataset, client: &mut C) -> Result<PreparedOp> {
        let dialect = client.dialect();

        // fail before touching the catalog when the dialect cannot comply
        if self.options.create_schema
            && self.table.schema.is_some()
            && !dialect.supports_schemas()
        {
            return Err(UpsertError::NoSchemaSupport {
                dialect: dialect.name(),
            });
        }

        let dataset = validate(dataset, dialect)?;
        let columns = infer_columns(&dataset);

        let exists = client
            .table_exists(&self.table)
            .await
            .map_err(UpsertError::Database)?;
        let target = if exists {
            let mut table_columns = client
                .get_columns(&self.table)
                .await
                .map_err(UpsertError::Database)?;
            if self.options.adapt_empty_columns {
                for column in &mut table_columns {
                    if dataset.has_label(&column.name) {
                        column.has_data = client
                            .column_has_data(&self.table, &column.name)
                            .await
                            .map_err(UpsertError::Database)?;
                    }
                }
            }
            TargetTable::existing(table_columns)
        } else {
            TargetTable::absent()
        };

        let schema_present = match (&self.table.schema, self.options.create_schema) {
            (Some(schema), true) => client
                .schema_exists(schema)
                .await
                .map_err(UpsertError::Database)?,
            _ => false,
        };

        let plan = reconcile(
            &dataset,
            &columns,
            &self.table,
            &target,
            schema_present,
            &self.options,
            dialect,
        )?;

        let query = UpsertQuery::new(
            dialect,
            &self.table,
            dataset.key(),
            dataset.columns(),
            self.mode,
        );
        let ranges = if dataset.is_empty() {
            Vec::new()
        } else {
            chunk::plan(
                dataset.len(),
                dataset.columns().len(),
                dataset.key().len(),
                dialect,
                self.chunksize,
            )?
        };

        Ok(PreparedOp {
            dataset,
            plan,
            query,
            ranges,
        })
    }
}

struct PreparedOp {
    dataset: Dataset,
    plan: ReconciliationPlan,
    query: UpsertQuery,
    ranges: Vec<Range<usize>>,
}

async fn apply_plan<C: SqlClient>(plan: &ReconciliationPlan, client: &mut C) -> Result<()> {
    let dialect = client.dialect();
    for action in &plan.actions {
        info!(action = %action.description(), "applying structural action");
        client
            .execute(&action.to_sql(dialect), &[])
            .await
            .map_err(UpsertError::Database)?;
    }
    Ok(())
}

async fn send_chunk<C: SqlClient>(
    client: &mut C,
    query: &UpsertQuery,
    dataset: &Dataset,
    range: Range<usize>,
) -> Result<ChunkOutcome> {
    let rows = &dataset.rows()[range];
    let mut params: Vec<SqlValue> = Vec::with_capacity(rows.len() * query.params_per_row());
    for row in rows {
        params.extend(row.iter().cloned());
    }
    let sql = query.sql(rows.len());
    debug!(rows = rows.len(), parameters = params.len(), "sending chunk");
    let rows_affected = client
        .execute(&sql, &params)
        .await
        .map_err(UpsertError::Database)?;
    Ok(ChunkOutcome {
        rows_affected,
        rows_in_chunk: rows.len(),
    })
}

/// Lazy per-chunk outcomes over a caller-owned connection.
///
/// Forward-only and single-pass: each [`ChunkOutcomes::next`] call sends one
/// chunk and cannot be replayed.
pub struct ChunkOutcomes<'c, C: SqlClient> {
    client: &'c mut C,
    dataset: Dataset,
    query: UpsertQuery,
    ranges: std::vec::IntoIter<Range<usize>>,
}

impl<C: SqlClient> ChunkOutcomes<'_, C> {
    /// Sends the next chunk and returns its outcome, or `None` when all
    /// chunks have been sent.
    pub async fn next(&mut self) -> Option<Result<ChunkOutcome>> {
        let range = self.ranges.next()?;
        Some(send_chunk(self.client, &self.query, &self.dataset, range).await)
    }

    /// Number of chunks not yet sent.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.ranges.len()
    }
}

/// Lazy per-chunk outcomes owning the connection and its transaction.
///
/// Commits when the sequence is exhausted; rolls back on a mid-stream error.
pub struct OwnedChunkOutcomes<C: Transactional> {
    client: C,
    dataset: Dataset,
    query: UpsertQuery,
    ranges: std::vec::IntoIter<Range<usize>>,
    finished: bool,
}

impl<C: Transactional> OwnedChunkOutcomes<C> {
    /// Sends the next chunk and returns its outcome. Returns `None` once
    /// all chunks are sent and the transaction has committed.
    pub async fn next(&mut self) -> Option<Result<ChunkOutcome>> {
        if self.finished {
            return None;
        }
        match self.ranges.next() {
            Some(range) => {
                match send_chunk(&mut self.client, &self.query, &self.dataset, range).await {
                    Ok(outcome) => Some(Ok(outcome)),
                    Err(err) => {
                        self.finished = true;
                        let _ = self.client.rollback().await;
                        Some(Err(err))
                    }
                }
            }
            None => {
                self.finished = true;
                match self.client.commit().await {
                    Ok(()) => None,
                    Err(err) => Some(Err(UpsertError::Database(err))),
                }
            }
        }
    }
}

/// Blocking, `Iterator`-shaped wrapper over [`ChunkOutcomes`].
pub struct BlockingChunkOutcomes<'c, C: SqlClient>(ChunkOutcomes<'c, C>);

impl<C: SqlClient> Iterator for BlockingChunkOutcomes<'_, C> {
    type Item = Result<ChunkOutcome>;

    fn next(&mut self) -> Option<Self::Item> {
        futures::executor::block_on(self.0.next())
    }
}
