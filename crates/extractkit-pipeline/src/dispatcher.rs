//! Bounded concurrent dispatcher.
//!
//! ```text
//!   BatchStream ──pull (only when a slot is free)──► in-flight window (≤ N)
//!                                                       │
//!                           first failure ◄── settle ───┘
//! ```
//!
//! One task drives both the upstream pull and the in-flight set, so
//! invocations are interleaved rather than run in parallel. On the first
//! failure the upstream stream is dropped at once; invocations already in
//! flight are driven to completion and their outcomes discarded.

use std::error::Error as StdError;
use std::panic::AssertUnwindSafe;

use extractkit_core::{Batch, BatchProcessor, PipelineError, ProcessorError, ProcessorPanic};
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::batcher::BatchStream;
use crate::settlement::Settlement;

/// Counts of work that settled successfully.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub batches: u64,
    pub records: u64,
}

/// Outcome of one processor invocation.
struct Settled {
    index: u64,
    records: usize,
    outcome: Result<(), ProcessorError>,
}

/// Drives batches through a processor with at most `concurrency`
/// invocations in flight.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    concurrency: usize,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn new(concurrency: usize) -> Result<Self, PipelineError> {
        if concurrency == 0 {
            return Err(PipelineError::config("concurrency must be at least 1"));
        }
        Ok(Self {
            concurrency,
            cancel: CancellationToken::new(),
        })
    }

    /// Stop pulling batches once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Dispatch every batch of `batches` to `processor`.
    ///
    /// Resolves once upstream is exhausted and every invocation has settled,
    /// or with the first error observed.
    pub async fn run<P>(
        &self,
        batches: BatchStream,
        processor: &P,
    ) -> Result<DispatchStats, PipelineError>
    where
        P: BatchProcessor + ?Sized,
    {
        let mut upstream = Some(batches);
        let mut in_flight: FuturesUnordered<BoxFuture<'_, Settled>> = FuturesUnordered::new();
        let mut settlement = Settlement::new();
        let mut stats = DispatchStats::default();

        loop {
            let can_pull = upstream.is_some()
                && settlement.is_pending()
                && in_flight.len() < self.concurrency;
            let may_cancel = upstream.is_some() && settlement.is_pending();

            tokio::select! {
                biased;

                _ = self.cancel.cancelled(), if may_cancel => {
                    debug!(
                        in_flight = in_flight.len(),
                        "dispatch cancelled; draining in-flight batches"
                    );
                    upstream = None;
                    settlement.reject(PipelineError::Cancelled);
                }

                Some(settled) = in_flight.next(), if !in_flight.is_empty() => {
                    match settled.outcome {
                        Ok(()) => {
                            stats.batches += 1;
                            stats.records += settled.records as u64;
                            debug!(
                                batch = settled.index,
                                records = settled.records,
                                "batch processed"
                            );
                        }
                        Err(err) if settlement.is_pending() => {
                            upstream = None;
                            let error_id = Uuid::new_v4();
                            error!(
                                %error_id,
                                batch = settled.index,
                                error = %err,
                                causes = %cause_chain(&err),
                                "batch processor failed; aborting run"
                            );
                            settlement.reject(PipelineError::Processor(err));
                        }
                        Err(err) => {
                            debug!(
                                batch = settled.index,
                                error = %err,
                                "discarding failure after run settled"
                            );
                        }
                    }
                }

                next = pull(&mut upstream), if can_pull => match next {
                    Some(Ok(batch)) => {
                        trace!(
                            batch = batch.index(),
                            records = batch.len(),
                            in_flight = in_flight.len() + 1,
                            "dispatching batch"
                        );
                        in_flight.push(invoke(processor, batch));
                    }
                    Some(Err(err)) => {
                        debug!(error = %err, "batch stream failed");
                        upstream = None;
                        settlement.reject(err);
                    }
                    None => {
                        trace!("batch stream exhausted");
                        upstream = None;
                    }
                },

                else => break,
            }
        }

        settlement.finish(stats)
    }
}

/// Dispatch with a fresh [`Dispatcher`] and no cancellation.
pub async fn dispatch<P>(
    batches: BatchStream,
    concurrency: usize,
    processor: &P,
) -> Result<DispatchStats, PipelineError>
where
    P: BatchProcessor + ?Sized,
{
    Dispatcher::new(concurrency)?.run(batches, processor).await
}

async fn pull(upstream: &mut Option<BatchStream>) -> Option<Result<Batch, PipelineError>> {
    match upstream {
        Some(batches) => batches.next().await,
        None => None,
    }
}

/// Run one invocation, turning a panic into a `ProcessorError`.
///
/// `process` itself is called inside the guarded future, so a panic raised
/// before the processor hands back its future is caught too.
fn invoke<'a, P>(processor: &'a P, batch: Batch) -> BoxFuture<'a, Settled>
where
    P: BatchProcessor + ?Sized,
{
    let index = batch.index();
    let records = batch.len();
    async move {
        let call = async move { processor.process(batch).await };
        let outcome = match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ProcessorError::new(ProcessorPanic::from_payload(payload))),
        };
        Settled { index, records, outcome }
    }
    .boxed()
}

fn cause_chain(err: &dyn StdError) -> String {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes.join(": ")
}
