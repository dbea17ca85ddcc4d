//! Arrow wire-format protocol (spec component C5's `Protocol`/`Query`/
//! `QueryResult` home). Mirrors `json.rs` exactly in shape — same
//! `BinaryQuery` request, same `Session`, same bind plumbing — the only
//! difference is the `accept_header` sent with the query request and what
//! `QueryResult::rows()` does with the response it gets back.

use std::{
    collections::BTreeMap,
    sync::Arc,
};

use async_stream::try_stream;
use futures_util::stream::BoxStream;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    SnowflakeError,
    auth::session::Session,
    connection::Connection,
    driver::{
        Protocol,
        arrow::batches::{ArrowBatches, BatchHandle},
        arrow::ipc::ArrowStream,
        base::{
            BinaryQueryBuilder,
            bindings::{BindMetadata, Bindings},
            response::RawQueryResponse,
        },
        chunks::{CancelOnDrop, MAX_CHUNK_DOWNLOAD_WORKERS, downloader::RowChunkDownloader},
        primitives::{
            cell::CellValue,
            column::Column,
            convert::arrow_decode::decode_arrow_cell,
            row::Row,
        },
        query::{DescribeResult, Query, QueryResult},
    },
    errors::ErrorKind,
    http::client::SnowflakeHttpClient,
    kind_error, this_errors,
};

#[derive(Clone)]
pub struct ArrowProtocol {}

impl Protocol for ArrowProtocol {
    type Query<'a, C>
        = ArrowQuery<'a, C>
    where
        C: SnowflakeHttpClient + 'a;
}

impl Default for ArrowProtocol {
    fn default() -> Self {
        Self {}
    }
}

pub struct ArrowQuery<'a, C: SnowflakeHttpClient> {
    session: &'a mut Session<C>,
    bindings: Bindings,
    query: String,
}

impl<'a, C: SnowflakeHttpClient> Query<'a, C> for ArrowQuery<'a, C> {
    type Result = ArrowQueryResult<C>;
    type Describe = ArrowDescribeResult;

    fn bind_row(&mut self, params: Vec<impl crate::driver::primitives::cell::ToCellValue>) {
        self.bindings.bind_row(params);
    }

    fn bind_row_named(
        &mut self,
        params: Vec<(
            impl ToString,
            impl crate::driver::primitives::cell::ToCellValue,
        )>,
    ) {
        self.bindings.bind_row_named(params);
    }

    fn new(query: impl ToString, session: &'a mut Session<C>) -> Self {
        Self {
            session,
            bindings: Bindings::new(),
            query: query.to_string(),
        }
    }

    async fn describe(mut self) -> Result<ArrowDescribeResult, SnowflakeError> {
        let query = this_errors!(
            "failed to build underlying binary query",
            BinaryQueryBuilder::default()
                .accept_header("application/snowflake")
                .sql_text(self.query)
                .is_describe_only(true)
                .bindings(self.bindings)
                .build()
        );

        let raw = query.run(&mut self.session).await?;

        let cols = raw
            .rowtype
            .clone()
            .into_iter()
            .map(Arc::new)
            .collect::<Vec<Arc<Column>>>();

        Ok(ArrowDescribeResult { columns: cols, raw })
    }

    async fn execute(mut self) -> Result<Self::Result, SnowflakeError> {
        let query = this_errors!(
            "failed to build underlying binary query",
            BinaryQueryBuilder::default()
                .accept_header("application/snowflake")
                .sql_text(self.query)
                .is_describe_only(false)
                .bindings(self.bindings)
                .build()
        );

        let raw = query.run(&mut self.session).await?;

        let cols = raw
            .rowtype
            .clone()
            .into_iter()
            .map(Arc::new)
            .collect::<Vec<Arc<Column>>>();

        Ok(ArrowQueryResult {
            conn: self.session.get_conn(),
            raw,
            cols,
        })
    }
}

pub struct ArrowQueryResult<C: SnowflakeHttpClient + Clone> {
    conn: Connection<C>,
    raw: RawQueryResponse,
    cols: Vec<Arc<Column>>,
}

impl<C: SnowflakeHttpClient + Clone> ArrowQueryResult<C> {
    /// `true` when the server answered with plain JSON despite the Arrow
    /// accept header — happens for e.g. zero-row results. `get_arrow_batches`/
    /// `get_arrow_stream` refuse to do anything in this case
    /// (`ErrNonArrowResponseInArrowBatches`, spec.md §4.5); `json_rows`
    /// keeps working regardless.
    fn is_non_arrow_response(&self) -> bool {
        self.raw.rowset.as_ref().is_some_and(|rows| !rows.is_empty())
    }

    /// Lazily-downloadable Arrow record batches for this result (mode a).
    pub fn get_arrow_batches(&self) -> Result<ArrowBatches<C>, SnowflakeError> {
        if self.is_non_arrow_response() {
            return Err(kind_error!(
                ErrorKind::ProtocolViolation,
                "server returned a JSON rowset for an arrow-mode query; use json_rows() instead"
            ));
        }

        ArrowBatches::from_response(&self.raw, &self.conn, self.cols.clone())
    }

    /// Raw Arrow IPC byte access, one batch at a time (mode b).
    pub fn get_arrow_stream(&self) -> Result<ArrowStream<C>, SnowflakeError> {
        if self.is_non_arrow_response() {
            return Err(kind_error!(
                ErrorKind::ProtocolViolation,
                "server returned a JSON rowset for an arrow-mode query; use json_rows() instead"
            ));
        }

        ArrowStream::from_response(&self.raw, &self.conn, self.cols.clone())
    }

    /// Decodes rows the same way `JsonQueryResult::rows()` does, via the
    /// JSON chunk grammar. Always usable, Arrow-shaped response or not —
    /// the fallback spec.md §4.5 keeps reachable alongside
    /// `ErrNonArrowResponseInArrowBatches`.
    pub fn json_rows(self) -> BoxStream<'static, Result<Row, SnowflakeError>> {
        let ArrowQueryResult { conn, raw, cols } = self;
        RowChunkDownloader::stream(raw, conn, cols)
    }
}

impl<C: SnowflakeHttpClient + Clone + 'static> QueryResult for ArrowQueryResult<C> {
    fn expected_result_length(&self) -> i64 {
        self.raw.total
    }

    fn columns(&self) -> Vec<Arc<Column>> {
        self.cols.clone()
    }

    fn rows(self) -> BoxStream<'static, Result<Row, SnowflakeError>> {
        if self.is_non_arrow_response() {
            return self.json_rows();
        }

        let opts = self.conn.get_opts();
        let parallelism = opts.download_chunks_in_parallel.max(1).min(MAX_CHUNK_DOWNLOAD_WORKERS);
        let preserve_order = opts.download_chunks_in_order;
        let cols = self.cols.clone();

        let batches = match ArrowBatches::from_response(&self.raw, &self.conn, self.cols.clone()) {
            Ok(batches) => batches,
            Err(e) => return Box::pin(futures_util::stream::once(async move { Err(e) })),
        };

        stream_arrow_rows(batches.batches, cols, parallelism, preserve_order)
    }

    fn is_dml(&self) -> bool {
        self.raw.is_dml()
    }

    fn is_dql(&self) -> bool {
        self.raw.is_dql()
    }

    fn rows_affected(&self) -> i64 {
        self.raw
            .stats
            .as_ref()
            .map(|x| {
                x.num_rows_updated + x.num_dml_duplicates + x.num_rows_deleted + x.num_rows_inserted
            })
            .unwrap_or(0)
    }

    fn rows_updated(&self) -> i64 {
        self.raw.stats.as_ref().map(|x| x.num_rows_updated).unwrap_or(0)
    }

    fn rows_deleted(&self) -> i64 {
        self.raw.stats.as_ref().map(|x| x.num_rows_deleted).unwrap_or(0)
    }

    fn rows_inserted(&self) -> i64 {
        self.raw.stats.as_ref().map(|x| x.num_rows_inserted).unwrap_or(0)
    }
}

/// Downloads every batch with bounded concurrency (same shape as
/// `RowChunkDownloader::stream`, just one Arrow record batch per slot
/// instead of one JSON chunk), decodes each row through
/// `convert::arrow_decode::decode_arrow_cell`, and yields `Row`s built
/// from already-decoded cells.
fn stream_arrow_rows<C: SnowflakeHttpClient + 'static>(
    handles: Vec<BatchHandle<C>>,
    cols: Vec<Arc<Column>>,
    parallelism: usize,
    preserve_order: bool,
) -> BoxStream<'static, Result<Row, SnowflakeError>> {
    let stream = try_stream! {
        if handles.is_empty() {
            return;
        }

        let total = handles.len();
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let cancel = CancellationToken::new();
        let _cancel_guard = CancelOnDrop(cancel.clone());
        let (tx, mut rx) = mpsc::channel::<(usize, Result<Vec<Vec<CellValue>>, SnowflakeError>)>(
            parallelism.max(1) * 2,
        );

        for handle in handles {
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let cols = cols.clone();
            let index = handle.index;

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };

                if cancel.is_cancelled() {
                    return;
                }

                let result = async {
                    let batch = handle.download_raw(&cancel).await?;
                    let mut rows = Vec::with_capacity(batch.num_rows());
                    for row_idx in 0..batch.num_rows() {
                        let mut cells = Vec::with_capacity(cols.len());
                        for (col_idx, col) in cols.iter().enumerate() {
                            let array = batch.column(col_idx);
                            cells.push(decode_arrow_cell(col, array.as_ref(), row_idx)?);
                        }
                        rows.push(cells);
                    }
                    Ok(rows)
                }
                .await;

                if result.is_err() {
                    cancel.cancel();
                }

                let _ = tx.send((index, result)).await;
            });
        }
        drop(tx);

        let mut cursor = 0i64;

        if preserve_order {
            let mut pending: BTreeMap<usize, Vec<Vec<CellValue>>> = BTreeMap::new();
            let mut next = 0usize;

            while next < total {
                if let Some(rows) = pending.remove(&next) {
                    for row in rows {
                        yield Row::new_from_cells(cols.clone(), row, cursor);
                        cursor += 1;
                    }
                    next += 1;
                    continue;
                }

                match rx.recv().await {
                    Some((index, Ok(rows))) if index == next => {
                        for row in rows {
                            yield Row::new_from_cells(cols.clone(), row, cursor);
                            cursor += 1;
                        }
                        next += 1;
                    }
                    Some((index, Ok(rows))) => {
                        pending.insert(index, rows);
                    }
                    Some((_, Err(e))) => Err(e)?,
                    None => break,
                }
            }
        } else {
            while let Some((_, result)) = rx.recv().await {
                let rows = result?;
                for row in rows {
                    yield Row::new_from_cells(cols.clone(), row, cursor);
                    cursor += 1;
                }
            }
        }
    };

    Box::pin(stream)
}

#[derive(Debug)]
pub struct ArrowDescribeResult {
    columns: Vec<Arc<Column>>,
    raw: RawQueryResponse,
}

impl DescribeResult for ArrowDescribeResult {
    fn columns(&self) -> Vec<Arc<Column>> {
        self.columns.clone()
    }

    fn bind_metadata(&self) -> Option<Vec<BindMetadata>> {
        self.raw.meta_data_of_binds.clone()
    }

    fn bind_count(&self) -> i32 {
        self.raw.number_of_binds
    }

    fn is_dml(&self) -> bool {
        self.raw.is_dml()
    }

    fn is_dql(&self) -> bool {
        self.raw.is_dql()
    }
}
