//! Arrow-batch loader (spec component C5): exposes raw Arrow IPC record
//! batches instead of decoding every cell through [`crate::driver::primitives::convert`].
//!
//! Generalizes the teacher's `response.rs::decode_base64` (which only
//! ever turned the inline `rowSetBase64` field into a byte blob for the
//! JSON path's benefit) into two modes: lazily-downloaded whole batches
//! (`batches::ArrowBatches`), and a raw-bytes passthrough for callers who
//! want to feed an Arrow IPC reader directly (`ipc::ArrowStream`).

pub mod batches;
pub mod ipc;
pub mod transform;

pub use batches::{ArrowBatches, BatchHandle};
pub use ipc::ArrowStream;
pub use transform::{ArrowTimestampUnit, TransformOptions};
