//! `ExtractPipeline` wires source → decoder → batcher → dispatcher.

use std::time::Instant;

use extractkit_core::{
    millis, BatchProcessor, ByteSource, ExtractConfig, PipelineError, RunSummary,
};
use extractkit_formats::decode_with_options;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::batcher::batch;
use crate::dispatcher::Dispatcher;

/// One configured extract run.
///
/// # Example
/// ```no_run
/// use extractkit_core::{processor_fn, Batch, ExtractConfig, FileSource, Format, ProcessorError};
/// use extractkit_pipeline::ExtractPipeline;
///
/// # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractConfig::new("users.csv").format(Format::Csv).chunk_size(500);
/// let pipeline = ExtractPipeline::new(config);
/// let processor = processor_fn(|batch: Batch| async move {
///     println!("{} records", batch.len());
///     Ok::<_, ProcessorError>(())
/// });
/// let summary = pipeline.run(&FileSource::new(), &processor).await?;
/// println!("{} batches", summary.batches);
/// # Ok(())
/// # }
/// ```
pub struct ExtractPipeline {
    config: ExtractConfig,
    cancel: CancellationToken,
}

impl ExtractPipeline {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned token, e.g. one cancelled by a shutdown routine.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Execute the run.
    ///
    /// The configuration is validated before the source is opened. The byte
    /// stream and every buffer derived from it are dropped before this
    /// returns, whatever the outcome.
    pub async fn run<P>(
        &self,
        source: &dyn ByteSource,
        processor: &P,
    ) -> Result<RunSummary, PipelineError>
    where
        P: BatchProcessor + ?Sized,
    {
        let url = self.config.validate()?;
        let started = Instant::now();

        info!(
            url,
            source = source.name(),
            format = %self.config.format,
            chunk_size = self.config.chunk_size,
            concurrency = self.config.concurrency,
            "Starting extract run"
        );

        match self.execute(url, source, processor).await {
            Ok((batches, records)) => {
                let summary = RunSummary {
                    url: url.to_string(),
                    format: self.config.format,
                    batches,
                    records,
                    elapsed: started.elapsed(),
                };
                info!(
                    url,
                    batches,
                    records,
                    elapsed_ms = summary.elapsed_ms(),
                    "Extract run complete"
                );
                Ok(summary)
            }
            Err(err) => {
                // Processor failures are reported by the dispatcher with their batch index.
                if !err.is_processor() {
                    let error_id = Uuid::new_v4();
                    error!(
                        %error_id,
                        url,
                        kind = err.kind(),
                        error = %err,
                        elapsed_ms = millis(started.elapsed()),
                        "Extract run failed"
                    );
                }
                Err(err)
            }
        }
    }

    async fn execute<P>(
        &self,
        url: &str,
        source: &dyn ByteSource,
        processor: &P,
    ) -> Result<(u64, u64), PipelineError>
    where
        P: BatchProcessor + ?Sized,
    {
        let dispatcher =
            Dispatcher::new(self.config.concurrency)?.with_cancellation(self.cancel.clone());
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let bytes = source.open(url).await?;
        let records = decode_with_options(self.config.format, &self.config.csv, bytes);
        let batches = batch(records, self.config.chunk_size)?;
        let stats = dispatcher.run(batches, processor).await?;
        Ok((stats.batches, stats.records))
    }
}

/// Run `config` once against `source`.
pub async fn run<P>(
    source: &dyn ByteSource,
    config: &ExtractConfig,
    processor: &P,
) -> Result<RunSummary, PipelineError>
where
    P: BatchProcessor + ?Sized,
{
    ExtractPipeline::new(config.clone()).run(source, processor).await
}
