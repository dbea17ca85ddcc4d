//! Arrow-batch loader, lazy mode (spec component C5, "mode a"): one
//! [`BatchHandle`] per record batch instead of one `Row` stream for the
//! whole result set. The first batch is the inline `rowSetBase64` payload
//! (decoded eagerly, same bytes the teacher's `response.rs::decode_base64`
//! produced); every remaining batch is a server chunk, downloaded only
//! when the caller actually asks for it.

use std::{io::Cursor, sync::Arc};

use arrow_array::RecordBatch;
use arrow_ipc::reader::StreamReader;
use base64::Engine;
use tokio_util::sync::CancellationToken;

use crate::{
    SnowflakeError,
    connection::Connection,
    driver::{
        base::response::{QueryResponseChunk, RawQueryResponse},
        chunks::fetcher::fetch_chunk,
        primitives::column::Column,
    },
    errors::ErrorKind,
    http::client::SnowflakeHttpClient,
    kind_error, this_errors,
};

use super::transform::{self, TransformOptions};

enum BatchSource<C: SnowflakeHttpClient> {
    Inline(Vec<u8>),
    Remote {
        chunk: QueryResponseChunk,
        conn: Connection<C>,
        chunk_headers: std::collections::HashMap<String, String>,
        qrmk: Option<String>,
    },
}

/// One record batch of an Arrow-mode result set. `declared_rows` is the
/// row count the server promised for this batch (`QueryResponseChunk::row_count`
/// for remote batches, the envelope's `returned` count for the inline one)
/// so a caller can size buffers before downloading anything.
pub struct BatchHandle<C: SnowflakeHttpClient> {
    pub index: usize,
    pub declared_rows: i64,
    source: BatchSource<C>,
    row_types: Vec<Arc<Column>>,
}

impl<C: SnowflakeHttpClient> BatchHandle<C> {
    /// Downloads (if remote) and decodes this batch's raw Arrow IPC bytes
    /// into a [`RecordBatch`], without the schema transform in
    /// [`transform::transform_batch`] — this is the shape
    /// `convert::arrow_decode::decode_arrow_cell` expects to read.
    pub(crate) async fn download_raw(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RecordBatch, SnowflakeError> {
        if cancel.is_cancelled() {
            return Err(kind_error!(
                ErrorKind::ContextCancel,
                "arrow batch download canceled"
            ));
        }

        let bytes = match &self.source {
            BatchSource::Inline(bytes) => bytes.clone(),
            BatchSource::Remote {
                chunk,
                conn,
                chunk_headers,
                qrmk,
            } => fetch_chunk(conn, chunk, chunk_headers, qrmk.as_deref()).await?,
        };

        let mut reader = this_errors!(
            ErrorKind::WireDecode,
            "failed to open arrow ipc stream for batch",
            StreamReader::try_new(Cursor::new(bytes), None)
        );

        let batch = reader.next().ok_or_else(|| {
            kind_error!(
                ErrorKind::ProtocolViolation,
                "arrow ipc stream for batch contained no record batches"
            )
        })?;

        Ok(this_errors!(
            ErrorKind::WireDecode,
            "malformed arrow ipc record batch",
            batch
        ))
    }

    /// Downloads this batch and applies the schema transform (spec.md
    /// §4.5) so the caller gets plain Arrow types instead of Snowflake's
    /// wire encoding of them.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        opts: &TransformOptions,
    ) -> Result<RecordBatch, SnowflakeError> {
        let raw = self.download_raw(cancel).await?;
        transform::transform_batch(&raw, &self.row_types, opts)
    }
}

/// Lazily-downloadable Arrow record batches for one result set (spec
/// component C5, mode a). `ErrNonArrowResponseInArrowBatches` (spec.md
/// §4.5) is enforced by the caller (`ArrowQueryResult::get_arrow_batches`)
/// before this is constructed — by the time `from_response` runs, the
/// response is known to actually be Arrow-shaped.
pub struct ArrowBatches<C: SnowflakeHttpClient> {
    pub batches: Vec<BatchHandle<C>>,
}

impl<C: SnowflakeHttpClient> ArrowBatches<C> {
    pub(crate) fn from_response(
        raw: &RawQueryResponse,
        conn: &Connection<C>,
        row_types: Vec<Arc<Column>>,
    ) -> Result<Self, SnowflakeError>
    where
        C: Clone,
    {
        let mut batches = Vec::with_capacity(raw.chunks.len() + 1);

        if let Some(encoded) = raw.rowset_base64.as_ref().filter(|s| !s.is_empty()) {
            let engine = base64::engine::GeneralPurpose::new(
                &base64::alphabet::STANDARD,
                base64::engine::general_purpose::PAD,
            );
            let bytes = this_errors!(
                ErrorKind::WireDecode,
                "failed to base64-decode inline arrow rowset",
                engine.decode(encoded)
            );

            batches.push(BatchHandle {
                index: 0,
                declared_rows: raw.returned,
                source: BatchSource::Inline(bytes),
                row_types: row_types.clone(),
            });
        }

        for (offset, chunk) in raw.chunks.iter().enumerate() {
            batches.push(BatchHandle {
                index: batches.len(),
                declared_rows: chunk.row_count,
                source: BatchSource::Remote {
                    chunk: chunk.clone(),
                    conn: conn.clone(),
                    chunk_headers: raw.chunk_headers.clone(),
                    qrmk: raw.qrmk.clone(),
                },
                row_types: row_types.clone(),
            });
            let _ = offset;
        }

        Ok(Self { batches })
    }
}
