//! # extractkit-core
//!
//! Core types and traits shared across all ExtractKit crates.
//! Every format decoder, source, and pipeline stage is built on top of the
//! interfaces defined here.
//!
//! ## Data model
//! ```text
//! ByteSource::open(url) ──► ByteStream (Bytes chunks)
//!                               │
//!                               ▼
//!                           Record  (CSV row or JSON value)
//!                               │
//!                               ▼
//!                           Batch   (≤ chunk_size records, ordered)
//!                               │
//!                               ▼
//!                     BatchProcessor::process(batch)
//! ```

pub mod config;
pub mod error;
pub mod processor;
pub mod record;
pub mod source;
pub mod summary;

pub use config::{CsvOptions, ExtractConfig, Format, DEFAULT_CHUNK_SIZE, DEFAULT_CONCURRENCY};
pub use error::{DecodeError, PipelineError, ProcessorError, ProcessorPanic, TransportError};
pub use processor::{processor_fn, BatchProcessor, FnProcessor};
pub use record::{Batch, Record, Row};
pub use source::{ByteSource, ByteStream, FileSource, MemorySource};
pub use summary::{millis, RunSummary};
