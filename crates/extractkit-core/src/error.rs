//! Error types for the extract pipeline.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

/// Errors raised by a byte source while opening or reading a stream.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request failed before a response arrived (connection refused, DNS, etc.).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered with a non-success status code.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The stream broke after it was opened.
    #[error("Stream read failed after {bytes_read} bytes: {reason}")]
    Read { bytes_read: u64, reason: String },

    /// Opening the stream timed out.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// The source has nothing registered under this URL.
    #[error("No data found at '{url}'")]
    NotFound { url: String },

    /// The URL cannot be handled by this source.
    #[error("Unsupported URL '{url}': {reason}")]
    UnsupportedUrl { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns `true` if opening the stream again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Errors raised while decoding records out of a byte stream.
///
/// Every variant carries the absolute byte offset (from the start of the
/// stream) of the record or token that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unterminated quoted field in the record starting at byte {offset}")]
    UnterminatedQuote { offset: u64 },

    #[error("Invalid UTF-8 in the CSV record starting at byte {offset}")]
    InvalidUtf8 { offset: u64 },

    #[error("Row at byte {offset} has {found} fields, header has {expected}")]
    FieldCount {
        offset: u64,
        expected: usize,
        found: usize,
    },

    #[error("Invalid JSON at byte {offset}: {reason}")]
    InvalidJson { offset: u64, reason: String },

    #[error("Unexpected end of JSON input at byte {offset}")]
    UnexpectedEof { offset: u64 },
}

impl DecodeError {
    /// Byte offset where decoding failed.
    pub fn offset(&self) -> u64 {
        match self {
            Self::UnterminatedQuote { offset }
            | Self::InvalidUtf8 { offset }
            | Self::FieldCount { offset, .. }
            | Self::InvalidJson { offset, .. }
            | Self::UnexpectedEof { offset } => *offset,
        }
    }
}

/// An error returned by a caller-supplied [`BatchProcessor`](crate::BatchProcessor).
///
/// Wraps the caller's error without altering it: `Display` and `source()`
/// both delegate to the wrapped value.
pub struct ProcessorError {
    inner: Box<dyn StdError + Send + Sync + 'static>,
}

impl ProcessorError {
    /// Wrap any error (or a plain message) raised by a processor.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync + 'static>>) -> Self {
        Self { inner: err.into() }
    }

    /// Returns the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Unwrap into the caller's original error.
    pub fn into_inner(self) -> Box<dyn StdError + Send + Sync + 'static> {
        self.inner
    }
}

impl fmt::Debug for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.inner, f)
    }
}

impl fmt::Display for ProcessorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl StdError for ProcessorError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner.source()
    }
}

/// A processor invocation that panicked instead of returning.
#[derive(Debug, Clone, Error)]
#[error("processor panicked: {message}")]
pub struct ProcessorPanic {
    pub message: String,
}

impl ProcessorPanic {
    /// Build from the payload handed back by `catch_unwind`.
    pub fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self { message }
    }
}

/// The single terminal error of a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input was not supplied. No I/O was performed.
    #[error("Missing {field}")]
    MissingInput { field: &'static str },

    /// Invalid chunk size, concurrency, format token or CSV options.
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Propagated unchanged from the processor.
    #[error(transparent)]
    Processor(#[from] ProcessorError),

    /// The run's cancellation token fired before the source was exhausted.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Stable tag used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput { .. } => "missing_input",
            Self::Config { .. } => "config",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
            Self::Processor(_) => "processor",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns `true` if the run failed inside the caller's processor.
    pub fn is_processor(&self) -> bool {
        matches!(self, Self::Processor(_))
    }
}
