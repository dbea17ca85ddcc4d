//! Row-mode chunk downloader (spec component C3): fetches every chunk of
//! a result set with bounded concurrency and yields fully decoded [`Row`]s.
//!
//! Grounded on `SnowflakeConnectionOpts::download_chunks_in_parallel` /
//! `download_chunks_in_order`, two fields the teacher already exposed on
//! its config struct but never read anywhere — `response.rs::stream_chunks`
//! walked `self.chunks` one at a time regardless of what they were set to.
//! This is where they finally get wired up.

use std::{collections::BTreeMap, sync::Arc};

use async_stream::try_stream;
use futures_util::stream::BoxStream;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;

use crate::{
    connection::Connection,
    driver::{
        base::response::{QueryResponseChunk, RawQueryResponse},
        chunks::{CancelOnDrop, clamp_parallelism, fetcher::fetch_chunk, grammar::ChunkGrammarDecoder},
        primitives::{column::Column, row::Row},
    },
    errors::ErrorKind,
    http::client::SnowflakeHttpClient,
    kind_error, SnowflakeError,
};

/// Per-slot lifecycle, traced via `tracing` rather than stored anywhere —
/// there's nothing downstream that needs to query past state, only to see
/// it go by in a log.
#[derive(Debug, Clone, Copy)]
enum SlotState {
    Scheduled,
    Downloading,
    Decoding,
    Ready,
    Failed,
}

struct ChunkSlot {
    index: usize,
    chunk: QueryResponseChunk,
}

pub(crate) struct RowChunkDownloader;

impl RowChunkDownloader {
    /// Streams every row of `raw`'s result set, decoding the inline
    /// `rowset` (if present) immediately and fanning the remaining
    /// `chunks` out across up to `MAX_CHUNK_DOWNLOAD_WORKERS` workers.
    #[tracing::instrument(skip_all, fields(query_id = %raw.query_id, chunk_count = raw.chunks.len()))]
    pub(crate) fn stream<C: SnowflakeHttpClient>(
        raw: RawQueryResponse,
        conn: Connection<C>,
        cols: Vec<Arc<Column>>,
    ) -> BoxStream<'static, Result<Row, SnowflakeError>> {
        let is_dml = raw.is_dml();
        let opts = conn.get_opts();
        let parallelism = clamp_parallelism(opts.download_chunks_in_parallel, raw.chunks.len());
        let preserve_order = opts.download_chunks_in_order;

        let RawQueryResponse {
            rowset,
            chunk_headers,
            qrmk,
            chunks,
            ..
        } = raw;

        let stream = try_stream! {
            if is_dml {
                Err(kind_error!(ErrorKind::ProtocolViolation, "there are no rows to retrieve for a DML statement"))?;
                return;
            }

            let mut cursor = 0i64;

            if let Some(inline_rows) = rowset {
                if !inline_rows.is_empty() {
                    let bytes = serde_json::to_vec(&inline_rows)
                        .map_err(|e| kind_error!(ErrorKind::WireDecode, "failed to re-serialize inline rowset", e))?;
                    let mut decoder = ChunkGrammarDecoder::new(bytes.as_slice());
                    let decoded = decoder.decode_all(inline_rows.len(), cols.len())?;
                    for row in decoded {
                        yield Row::new_from_strings(cols.clone(), row, cursor);
                        cursor += 1;
                    }
                }
            }

            if chunks.is_empty() {
                return;
            }

            let slots: Vec<ChunkSlot> = chunks
                .into_iter()
                .enumerate()
                .map(|(index, chunk)| ChunkSlot { index, chunk })
                .collect();
            let total = slots.len();

            let semaphore = Arc::new(Semaphore::new(parallelism));
            let cancel = CancellationToken::new();
            // Dropping this stream mid-iteration (the caller cancels) cancels
            // every worker spawned below at its next suspension point.
            let _cancel_guard = CancelOnDrop(cancel.clone());
            let (tx, mut rx) = mpsc::channel::<(usize, Result<Vec<Vec<Option<String>>>, SnowflakeError>)>(
                parallelism.max(1) * 2,
            );

            for slot in slots {
                let semaphore = semaphore.clone();
                let cancel = cancel.clone();
                let tx = tx.clone();
                let conn = conn.clone();
                let chunk_headers = chunk_headers.clone();
                let qrmk = qrmk.clone();
                let expected_cols = cols.len();

                tracing::trace!(chunk = slot.index, state = ?SlotState::Scheduled, "chunk slot scheduled");

                tokio::spawn(async move {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };

                    if cancel.is_cancelled() {
                        return;
                    }

                    tracing::trace!(chunk = slot.index, state = ?SlotState::Downloading, "downloading chunk");

                    let result = async {
                        let body = fetch_chunk(&conn, &slot.chunk, &chunk_headers, qrmk.as_deref()).await?;
                        tracing::trace!(chunk = slot.index, state = ?SlotState::Decoding, "decoding chunk");
                        let mut decoder = ChunkGrammarDecoder::new(body.as_slice());
                        decoder.decode_all(slot.chunk.row_count.max(0) as usize, expected_cols)
                    }
                    .await;

                    match &result {
                        Ok(_) => tracing::trace!(chunk = slot.index, state = ?SlotState::Ready, "chunk decoded"),
                        Err(_) => {
                            tracing::debug!(chunk = slot.index, state = ?SlotState::Failed, "chunk download/decode failed");
                            cancel.cancel();
                        }
                    }

                    let _ = tx.send((slot.index, result)).await;
                });
            }
            drop(tx);

            if preserve_order {
                let mut pending: BTreeMap<usize, Vec<Vec<Option<String>>>> = BTreeMap::new();
                let mut next = 0usize;

                while next < total {
                    if let Some(rows) = pending.remove(&next) {
                        for row in rows {
                            yield Row::new_from_strings(cols.clone(), row, cursor);
                            cursor += 1;
                        }
                        next += 1;
                        continue;
                    }

                    match rx.recv().await {
                        Some((index, Ok(rows))) if index == next => {
                            for row in rows {
                                yield Row::new_from_strings(cols.clone(), row, cursor);
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
                        yield Row::new_from_strings(cols.clone(), row, cursor);
                        cursor += 1;
                    }
                }
            }
        };

        Box::pin(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::chunks::MAX_CHUNK_DOWNLOAD_WORKERS;

    // These call the same `clamp_parallelism` that `RowChunkDownloader::stream`
    // (and `StreamChunkDownloader::stream`) actually use to size their
    // worker pool/window, rather than re-deriving the formula inline — a
    // regression in the real clamp shows up here.

    #[test]
    fn parallelism_is_clamped_to_chunk_count_and_worker_ceiling() {
        assert_eq!(clamp_parallelism(64, 3), 3);
    }

    #[test]
    fn parallelism_never_exceeds_worker_ceiling() {
        assert_eq!(clamp_parallelism(1000, 1000), MAX_CHUNK_DOWNLOAD_WORKERS);
    }

    #[test]
    fn parallelism_is_at_least_one_even_with_zero_chunks_or_request() {
        assert_eq!(clamp_parallelism(0, 0), 1);
        assert_eq!(clamp_parallelism(5, 0), 1);
    }
}
