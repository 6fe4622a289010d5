//! # extractkit-pipeline
//!
//! Streams an extract from a [`ByteSource`] through a format decoder and a
//! batcher into a caller-supplied [`BatchProcessor`], with bounded
//! concurrency and backpressure.
//!
//! ## Architecture
//! ```text
//! ByteSource::open(url)
//!     │ ByteStream
//!     ▼
//! decode(format)          ── RecordStream (pull-driven)
//!     │
//!     ▼
//! batch(chunk_size)       ── BatchStream
//!     │
//!     ▼
//! Dispatcher(concurrency) ── ≤ N in-flight BatchProcessor::process calls
//!     │
//!     ▼
//! Result<RunSummary, PipelineError>   (first error wins)
//! ```
//!
//! [`ByteSource`]: extractkit_core::ByteSource
//! [`BatchProcessor`]: extractkit_core::BatchProcessor

pub mod batcher;
pub mod dispatcher;
pub mod orchestrator;
pub mod settlement;

pub use batcher::{batch, BatchStream};
pub use dispatcher::{dispatch, DispatchStats, Dispatcher};
pub use orchestrator::{run, ExtractPipeline};
pub use settlement::Settlement;
pub use tokio_util::sync::CancellationToken;
