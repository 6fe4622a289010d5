//! The `BatchProcessor` trait, the caller-supplied consumer of batches.

use std::future::Future;

use async_trait::async_trait;

use crate::error::ProcessorError;
use crate::record::Batch;

/// Asynchronous consumer of batches.
///
/// The pipeline moves each [`Batch`] into exactly one `process` call.
/// Returning `Err` (or panicking) aborts the run; the error is surfaced
/// unchanged as the run's result.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so several invocations can be in
/// flight against one shared processor.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(&self, batch: Batch) -> Result<(), ProcessorError>;
}

/// Adapter that lets an async closure act as a [`BatchProcessor`].
pub struct FnProcessor<F> {
    f: F,
}

/// Wrap `f` as a processor.
///
/// ```
/// use extractkit_core::{processor_fn, Batch, ProcessorError};
///
/// let processor = processor_fn(|batch: Batch| async move {
///     println!("batch {} has {} records", batch.index(), batch.len());
///     Ok::<_, ProcessorError>(())
/// });
/// # let _ = processor;
/// ```
pub fn processor_fn<F, Fut>(f: F) -> FnProcessor<F>
where
    F: Fn(Batch) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
{
    FnProcessor { f }
}

#[async_trait]
impl<F, Fut> BatchProcessor for FnProcessor<F>
where
    F: Fn(Batch) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ProcessorError>> + Send + 'static,
{
    async fn process(&self, batch: Batch) -> Result<(), ProcessorError> {
        (self.f)(batch).await
    }
}
