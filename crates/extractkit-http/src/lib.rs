//! # extractkit-http
//!
//! [`HttpSource`]: a [`ByteSource`](extractkit_core::ByteSource) that streams
//! extract bodies with `reqwest`.
//!
//! - Opening is retried with exponential backoff on connect failures,
//!   timeouts, 429 and 5xx responses.
//! - Other non-2xx responses fail immediately with `TransportError::Status`.
//! - The body is never buffered whole; a connection that breaks mid-body
//!   surfaces as `TransportError::Read` and is not retried.

pub mod retry;
pub mod source;

pub use retry::{RetryConfig, RetryPolicy};
pub use source::{HttpSource, HttpSourceConfig};
