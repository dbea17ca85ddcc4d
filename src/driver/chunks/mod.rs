pub(crate) mod downloader;
pub(crate) mod fetcher;
pub(crate) mod grammar;
pub(crate) mod stream_downloader;

use tokio_util::sync::CancellationToken;

/// Upper clamp on concurrent chunk-download workers, regardless of what a
/// caller requests via `download_chunks_in_parallel`. Spec's Open Question
/// on "is there an upper bound on worker count" is resolved here: yes, a
/// fixed ceiling, since Snowflake's own chunk URLs are backed by a shared
/// stage and unbounded fan-out just shifts the bottleneck to that stage.
pub(crate) const MAX_CHUNK_DOWNLOAD_WORKERS: usize = 16;

/// Clamps a caller-requested worker count to `[1, min(chunk_count,
/// MAX_CHUNK_DOWNLOAD_WORKERS)]`. Shared by C3 and C4 so both downloaders'
/// window/permit sizing and their tests observe the same formula.
pub(crate) fn clamp_parallelism(requested: usize, chunk_count: usize) -> usize {
    requested.max(1).min(chunk_count.max(1)).min(MAX_CHUNK_DOWNLOAD_WORKERS)
}

/// Cancels its token when dropped. Held by the `async_stream!` generator
/// itself, so dropping the returned `BoxStream` early (the caller stops
/// polling — our equivalent of a canceled context) propagates to every
/// `tokio::spawn`ed chunk worker, which checks `is_cancelled()` at each of
/// its suspension points and abandons its slot instead of running to
/// completion.
pub(crate) struct CancelOnDrop(pub(crate) CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}
