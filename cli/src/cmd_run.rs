//! `extractkit run`: execute one pipeline run.
//!
//! Config file format (YAML or JSON, selected by extension):
//! ```yaml
//! url: https://example.com/export/users.csv
//! format: csv
//! chunkSize: 500
//! concurrency: 4
//! csv:
//!   delimiter: ";"
//!   strict: true
//! log:
//!   level: info
//!   components:
//!     extractkit-pipeline: debug
//! ```
//! Command-line flags override file values.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use extractkit_core::{
    Batch, BatchProcessor, ByteSource, ExtractConfig, FileSource, Format, ProcessorError, Record,
};
use extractkit_http::{HttpSource, HttpSourceConfig, RetryConfig};
use extractkit_observability::{init_tracing, LogConfig, PipelineMetrics};
use extractkit_pipeline::{CancellationToken, ExtractPipeline};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// URL (http, https, file) or local path of the extract
    #[arg(long)]
    url: Option<String>,
    /// csv | json
    #[arg(long)]
    format: Option<String>,
    /// Records per batch
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Maximum batches in flight
    #[arg(long)]
    concurrency: Option<usize>,
    /// YAML or JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV field delimiter
    #[arg(long)]
    delimiter: Option<char>,
    /// CSV quote character
    #[arg(long)]
    quote: Option<char>,
    /// CSV escape character inside quoted fields
    #[arg(long)]
    escape: Option<char>,
    /// Reject CSV rows whose cell count differs from the header
    #[arg(long)]
    strict: bool,
    /// Retries when opening an HTTP stream
    #[arg(long, default_value_t = 3)]
    retries: u32,
    /// Overall HTTP request deadline in seconds (default: none)
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// Emit JSON structured logs
    #[arg(long)]
    json_logs: bool,
    /// Global log level
    #[arg(long)]
    log_level: Option<String>,
}

/// Shape of the `--config` file.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(flatten)]
    extract: ExtractConfig,
    #[serde(default)]
    log: Option<LogConfig>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let file = match &args.config {
        Some(path) => load_file(path)?,
        None => FileConfig::default(),
    };

    let mut log = file.log.unwrap_or_default();
    if let Some(level) = &args.log_level {
        log.level = level.clone();
    }
    log.json |= args.json_logs;
    init_tracing(&log).context("failed to initialise logging")?;

    let config = merge(file.extract, &args)?;
    let url = config.validate()?.to_string();
    let source = source_for(&url, &args)?;

    let pipeline = ExtractPipeline::new(config);
    let shutdown = spawn_shutdown(pipeline.cancellation_token());
    let metrics = PipelineMetrics::global();

    let result = pipeline.run(source.as_ref(), &JsonLinesSink).await;
    shutdown.abort();

    match result {
        Ok(summary) => {
            metrics.record_run(&summary);
            eprintln!(
                "extracted {} records in {} batches from {} ({} ms)",
                summary.records,
                summary.batches,
                summary.url,
                summary.elapsed_ms()
            );
            Ok(())
        }
        Err(err) => {
            metrics.record_failure(&err);
            Err(err).with_context(|| format!("extract from {url} failed"))
        }
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        _ => serde_yaml::from_str(&text)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };
    Ok(parsed)
}

/// Apply command-line flags on top of the file config.
fn merge(mut config: ExtractConfig, args: &RunArgs) -> Result<ExtractConfig> {
    if let Some(url) = &args.url {
        config.url = Some(url.clone());
    }
    if let Some(format) = &args.format {
        config.format = format.parse::<Format>()?;
    }
    if let Some(n) = args.chunk_size {
        config.chunk_size = n;
    }
    if let Some(n) = args.concurrency {
        config.concurrency = n;
    }
    if let Some(c) = args.delimiter {
        config.csv.delimiter = c;
    }
    if let Some(c) = args.quote {
        config.csv.quote = c;
    }
    if let Some(c) = args.escape {
        config.csv.escape = Some(c);
    }
    config.csv.strict |= args.strict;
    Ok(config)
}

fn source_for(url: &str, args: &RunArgs) -> Result<Box<dyn ByteSource>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        let http = HttpSource::new(HttpSourceConfig {
            retry: RetryConfig {
                max_retries: args.retries,
                ..RetryConfig::default()
            },
            request_timeout: args.timeout_secs.map(Duration::from_secs),
            ..HttpSourceConfig::default()
        })?;
        Ok(Box::new(http))
    } else {
        Ok(Box::new(FileSource::new()))
    }
}

/// Explicit shutdown routine: Ctrl-C cancels the run's token.
fn spawn_shutdown(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing in-flight batches");
            token.cancel();
        }
    })
}

/// Writes each batch to stdout as one JSON line.
struct JsonLinesSink;

#[derive(Serialize)]
struct BatchLine<'a> {
    batch: u64,
    records: &'a [Record],
}

#[async_trait]
impl BatchProcessor for JsonLinesSink {
    async fn process(&self, batch: Batch) -> Result<(), ProcessorError> {
        let line = BatchLine {
            batch: batch.index(),
            records: batch.records(),
        };
        let mut out = std::io::stdout().lock();
        serde_json::to_writer(&mut out, &line).map_err(ProcessorError::new)?;
        writeln!(out).map_err(ProcessorError::new)?;
        Ok(())
    }
}
