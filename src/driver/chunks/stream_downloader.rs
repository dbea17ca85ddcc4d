//! Stream-mode chunk downloader (spec component C4): the throughput-first
//! sibling of [`super::downloader::RowChunkDownloader`]. Instead of
//! materializing each chunk's rows into one `Vec` before handing them on,
//! every chunk is decoded row-by-row (`ChunkGrammarDecoder::decode_stream`)
//! into its own bounded per-chunk channel — bounding client-side memory to
//! roughly `buffer` rows regardless of how many chunks are in flight,
//! rather than to `workers * one whole chunk`.
//!
//! Concurrency is a sliding window of at most `parallelism` chunks, not a
//! plain semaphore: only `parallelism` workers are ever spawned at once,
//! and the next chunk is admitted only after the consumer has fully
//! drained the oldest in-flight one. This guarantees the chunk the
//! consumer is currently waiting on is always among the running set — if
//! every chunk got a semaphore permit up front instead, a later chunk
//! could win its permit first, fill its own bounded channel well before
//! the consumer reaches it, and block on `send` *while still holding that
//! permit*, starving chunk 0's worker of a permit forever. The window
//! makes that circular wait impossible: nothing beyond the current window
//! can even start.
//!
//! Reachable from `QueryResult::rows_buffered(buffer)`.

use std::collections::VecDeque;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::{StreamExt, stream::BoxStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    SnowflakeError,
    connection::Connection,
    driver::{
        base::response::{QueryResponseChunk, RawQueryResponse},
        chunks::{CancelOnDrop, clamp_parallelism, fetcher::fetch_chunk, grammar::ChunkGrammarDecoder},
        primitives::{column::Column, row::Row},
    },
    errors::ErrorKind,
    http::client::SnowflakeHttpClient,
    kind_error,
};

struct ChunkSlot {
    index: usize,
    chunk: QueryResponseChunk,
}

type ChunkRowResult = Result<Vec<Option<String>>, SnowflakeError>;

/// Spawns the worker for one chunk slot and returns its row channel. Not a
/// method on a struct — it needs no state beyond its arguments, and the
/// caller (the sliding window below) is the only thing that ever calls it.
fn spawn_chunk_worker<C: SnowflakeHttpClient>(
    slot: ChunkSlot,
    conn: Connection<C>,
    chunk_headers: std::collections::HashMap<String, String>,
    qrmk: Option<String>,
    expected_cols: usize,
    cancel: CancellationToken,
    capacity: usize,
) -> mpsc::Receiver<ChunkRowResult> {
    let (tx, rx) = mpsc::channel::<ChunkRowResult>(capacity);

    tokio::spawn(async move {
        if cancel.is_cancelled() {
            return;
        }

        let body = match fetch_chunk(&conn, &slot.chunk, &chunk_headers, qrmk.as_deref()).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(chunk = slot.index, error = %e, "chunk fetch failed");
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        let decoder = ChunkGrammarDecoder::new(std::io::Cursor::new(body));
        let mut rows = std::pin::pin!(decoder.decode_stream(expected_cols));

        while let Some(result) = rows.next().await {
            if cancel.is_cancelled() {
                return;
            }

            let is_err = result.is_err();
            if tx.send(result).await.is_err() || is_err {
                return;
            }
        }
    });

    rx
}

pub(crate) struct StreamChunkDownloader;

impl StreamChunkDownloader {
    #[tracing::instrument(skip_all, fields(query_id = %raw.query_id, chunk_count = raw.chunks.len(), buffer))]
    pub(crate) fn stream<C: SnowflakeHttpClient>(
        raw: RawQueryResponse,
        conn: Connection<C>,
        cols: Vec<Arc<Column>>,
        buffer: usize,
    ) -> BoxStream<'static, Result<Row, SnowflakeError>> {
        let is_dml = raw.is_dml();
        let opts = conn.get_opts();
        let chunk_count = raw.chunks.len();
        let parallelism = clamp_parallelism(opts.download_chunks_in_parallel, chunk_count);
        let avg_rows_per_chunk = if chunk_count > 0 {
            ((raw.total.max(0) as usize) / chunk_count).max(1)
        } else {
            1
        };
        let row_buffer = buffer.max((parallelism * avg_rows_per_chunk) / 4).max(1024);

        let RawQueryResponse {
            rowset,
            chunk_headers,
            qrmk,
            chunks,
            ..
        } = raw;

        // Per-chunk channel capacity: small enough that `parallelism` of
        // them in flight still sums to roughly `row_buffer`, the overall
        // memory bound from spec.md §4.4.
        let per_chunk_capacity = (row_buffer / parallelism.max(1)).max(16);

        let stream = try_stream! {
            if is_dml {
                Err(kind_error!(ErrorKind::ProtocolViolation, "there are no rows to retrieve for a DML statement"))?;
                return;
            }

            let mut cursor = 0i64;
            let cancel = CancellationToken::new();
            // Dropping this stream mid-iteration cancels every still-running
            // chunk worker at its next suspension point.
            let _cancel_guard = CancelOnDrop(cancel.clone());

            if let Some(inline_rows) = rowset {
                if !inline_rows.is_empty() {
                    let bytes = serde_json::to_vec(&inline_rows)
                        .map_err(|e| kind_error!(ErrorKind::WireDecode, "failed to re-serialize inline rowset", e))?;
                    let mut decoder = ChunkGrammarDecoder::new(bytes.as_slice());
                    let decoded = decoder.decode_all(inline_rows.len(), cols.len())?;
                    for values in decoded {
                        yield Row::new_from_strings(cols.clone(), values, cursor);
                        cursor += 1;
                    }
                }
            }

            if chunks.is_empty() {
                return;
            }

            let mut pending_chunks: VecDeque<ChunkSlot> = chunks
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| ChunkSlot { index, chunk })
                .collect();

            // Sliding window: at most `parallelism` chunks in flight, and
            // the oldest in-flight chunk is always the one the consumer is
            // about to drain. `window` preserves chunk-index order because
            // chunks are admitted and drained strictly front-to-back.
            let mut window: VecDeque<(usize, mpsc::Receiver<ChunkRowResult>)> = VecDeque::with_capacity(parallelism);

            let admit = |slot: ChunkSlot, window: &mut VecDeque<(usize, mpsc::Receiver<ChunkRowResult>)>| {
                let index = slot.index;
                let rx = spawn_chunk_worker(
                    slot,
                    conn.clone(),
                    chunk_headers.clone(),
                    qrmk.clone(),
                    cols.len(),
                    cancel.clone(),
                    per_chunk_capacity,
                );
                window.push_back((index, rx));
            };

            for _ in 0..parallelism {
                if let Some(slot) = pending_chunks.pop_front() {
                    admit(slot, &mut window);
                }
            }

            while let Some((_index, mut rx)) = window.pop_front() {
                loop {
                    match rx.recv().await {
                        Some(Ok(values)) => {
                            yield Row::new_from_strings(cols.clone(), values, cursor);
                            cursor += 1;
                        }
                        Some(Err(e)) => {
                            cancel.cancel();
                            Err(e)?;
                            return;
                        }
                        None => break,
                    }
                }

                if let Some(slot) = pending_chunks.pop_front() {
                    admit(slot, &mut window);
                }
            }
        };

        Box::pin(stream)
    }
}
