use std::sync::Arc;

use futures_util::stream::BoxStream;

use crate::{
    SnowflakeError,
    auth::session::Session,
    driver::{
        base::bindings::BindMetadata,
        primitives::{cell::ToCellValue, column::Column, row},
    },
    http::client::SnowflakeHttpClient,
};

pub trait Query<'a, C: SnowflakeHttpClient> {
    type Result: QueryResult;
    type Describe: DescribeResult;

    fn new(query: impl ToString, session: &'a mut Session<C>) -> Self;

    fn bind_row(&mut self, params: Vec<impl ToCellValue>);
    fn bind_row_named(&mut self, params: Vec<(impl ToString, impl ToCellValue)>);

    fn execute(self) -> impl Future<Output = Result<Self::Result, SnowflakeError>>;
    fn describe(self) -> impl Future<Output = Result<Self::Describe, SnowflakeError>>;
}

/// A decoded result set: either the row stream of a DQL statement or the
/// affected-row counters of a DML one. `rows()` on a DML result errors
/// rather than yielding an empty stream, matching spec.md's "no rows to
/// retrieve" boundary case.
pub trait QueryResult {
    fn expected_result_length(&self) -> i64;
    fn columns(&self) -> Vec<Arc<Column>>;

    fn rows(self) -> BoxStream<'static, Result<row::Row, SnowflakeError>>;

    /// Like `rows()`, but bounds client-side row buffering to roughly
    /// `buffer` rows by decoding and forwarding chunks row-at-a-time
    /// instead of a whole chunk at once. Protocols that have no cheaper
    /// way to do this than `rows()` can just not override it.
    fn rows_buffered(self, buffer: usize) -> BoxStream<'static, Result<row::Row, SnowflakeError>>
    where
        Self: Sized,
    {
        let _ = buffer;
        self.rows()
    }

    fn is_dml(&self) -> bool;
    fn is_dql(&self) -> bool;

    fn rows_affected(&self) -> i64;
    fn rows_updated(&self) -> i64;
    fn rows_deleted(&self) -> i64;
    fn rows_inserted(&self) -> i64;
}

/// Metadata for a [`Query`](`crate::driver::query::Query`) that was
/// `describe()`d instead of `execute()`d — the server plans the statement
/// (bind shape, result columns) without running it.
pub trait DescribeResult {
    fn columns(&self) -> Vec<Arc<Column>>;
    fn bind_metadata(&self) -> Option<Vec<BindMetadata>>;
    fn bind_count(&self) -> i32;

    fn is_dml(&self) -> bool;
    fn is_dql(&self) -> bool;
}
