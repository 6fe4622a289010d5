//! Groups a record stream into fixed-size, indexed batches.

use std::pin::Pin;

use extractkit_core::{Batch, PipelineError};
use extractkit_formats::RecordStream;
use futures::stream::{self, Stream, StreamExt};

/// Lazy, fallible sequence of batches.
pub type BatchStream = Pin<Box<dyn Stream<Item = Result<Batch, PipelineError>> + Send>>;

struct BatchState {
    /// `None` once the record stream has ended or failed.
    records: Option<RecordStream>,
    chunk_size: usize,
    next_index: u64,
}

/// Group `records` into batches of exactly `chunk_size`, except the last
/// which holds the remainder.
///
/// No empty batch is ever produced. Records are only pulled while a batch is
/// being filled, so at most `chunk_size` records are held at once. An
/// upstream error discards the partial batch and is forwarded as the final
/// item.
pub fn batch(records: RecordStream, chunk_size: usize) -> Result<BatchStream, PipelineError> {
    if chunk_size == 0 {
        return Err(PipelineError::config("chunk_size must be at least 1"));
    }
    let state = BatchState {
        records: Some(records),
        chunk_size,
        next_index: 0,
    };

    let batches = stream::unfold(state, |mut st| async move {
        let mut records = st.records.take()?;
        let mut acc = Vec::with_capacity(st.chunk_size);
        let mut exhausted = false;

        while acc.len() < st.chunk_size {
            match records.next().await {
                Some(Ok(record)) => acc.push(record),
                Some(Err(e)) => return Some((Err(e), st)),
                None => {
                    exhausted = true;
                    break;
                }
            }
        }

        if !exhausted {
            st.records = Some(records);
        }
        if acc.is_empty() {
            return None;
        }
        let batch = Batch::new(st.next_index, acc);
        st.next_index += 1;
        Some((Ok(batch), st))
    });
    Ok(batches.boxed())
}
