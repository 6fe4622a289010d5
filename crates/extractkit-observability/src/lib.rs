//! # extractkit-observability
//!
//! OpenTelemetry metrics and `tracing` setup for ExtractKit.
//!
//! ## Built-in metrics
//! - `extractkit.records_dispatched`: counter, tagged with format
//! - `extractkit.batches_dispatched`: counter, tagged with format
//! - `extractkit.runs_failed`: counter, tagged with error_kind
//! - `extractkit.run_duration_ms`: histogram
//!
//! ## Structured logging
//! Text or JSON logs on stderr, with levels configurable per component.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::PipelineMetrics;
pub use tracing_setup::{init_tracing, LogConfig};
