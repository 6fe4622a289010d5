//! `ByteSource` trait: abstraction over where extract bytes come from.
//!
//! A source turns a URL into a pinned async stream of `Bytes` chunks. The
//! pipeline owns the stream for the duration of a run and drops it as soon as
//! the run settles, which closes the underlying connection or file handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, Stream, StreamExt, TryStreamExt};
use tokio_util::io::ReaderStream;

use crate::error::TransportError;

/// A stream of raw chunks from a single source.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens byte streams for URLs.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Open `url` and return a stream over its body.
    async fn open(&self, url: &str) -> Result<ByteStream, TransportError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str;
}

// ─── MemorySource ─────────────────────────────────────────────────────────────

/// In-memory source serving registered payloads in fixed-size chunks.
///
/// Counts every `open` call, which makes it handy for asserting that
/// fail-fast paths never touch the source.
pub struct MemorySource {
    entries: HashMap<String, Bytes>,
    chunk_size: usize,
    opens: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            chunk_size: 8 * 1024,
            opens: AtomicUsize::new(0),
        }
    }

    /// Register a payload under `url`.
    pub fn with(mut self, url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        self.entries.insert(url.into(), body.into());
        self
    }

    /// Size of each emitted chunk (minimum 1).
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    /// Number of times `open` has been called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn open(&self, url: &str) -> Result<ByteStream, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let body = self
            .entries
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::NotFound { url: url.to_string() })?;

        let chunk_size = self.chunk_size;
        let chunks: Vec<Result<Bytes, TransportError>> = (0..body.len())
            .step_by(chunk_size)
            .map(|start| Ok(body.slice(start..(start + chunk_size).min(body.len()))))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ─── FileSource ───────────────────────────────────────────────────────────────

/// Reads `file://` URLs or plain filesystem paths.
pub struct FileSource {
    read_buffer: usize,
}

impl FileSource {
    pub fn new() -> Self {
        Self {
            read_buffer: 64 * 1024,
        }
    }

    /// Capacity of each read.
    pub fn read_buffer(mut self, n: usize) -> Self {
        self.read_buffer = n.max(1);
        self
    }

    fn resolve(url: &str) -> Result<PathBuf, TransportError> {
        if url.starts_with("file:") {
            let parsed = url::Url::parse(url).map_err(|e| TransportError::UnsupportedUrl {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            parsed
                .to_file_path()
                .map_err(|_| TransportError::UnsupportedUrl {
                    url: url.to_string(),
                    reason: "not a local file path".into(),
                })
        } else {
            Ok(PathBuf::from(url))
        }
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ByteSource for FileSource {
    async fn open(&self, url: &str) -> Result<ByteStream, TransportError> {
        let path = Self::resolve(url)?;
        let file = tokio::fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransportError::NotFound { url: url.to_string() }
            } else {
                TransportError::Io(e)
            }
        })?;
        let stream =
            ReaderStream::with_capacity(file, self.read_buffer).map_err(TransportError::from);
        Ok(stream.boxed())
    }

    fn name(&self) -> &str {
        "file"
    }
}
