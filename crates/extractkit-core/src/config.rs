//! Pipeline run configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Wire format of the extract stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Header row followed by delimited data rows.
    Csv,
    /// A single JSON array, or a stream of whitespace-separated JSON values.
    #[default]
    Json,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for Format {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" | "" => Ok(Self::Json),
            other => Err(PipelineError::config(format!(
                "unsupported format '{other}' (expected 'csv' or 'json')"
            ))),
        }
    }
}

/// CSV dialect options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field separator.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Character that opens and closes a quoted field.
    #[serde(default = "default_quote")]
    pub quote: char,
    /// Character that makes the next byte inside a quoted field literal.
    /// Unset (or equal to `quote`) means embedded quotes are written doubled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<char>,
    /// Reject rows whose cell count differs from the header.
    #[serde(default)]
    pub strict: bool,
}

fn default_delimiter() -> char {
    ','
}

fn default_quote() -> char {
    '"'
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            escape: None,
            strict: false,
        }
    }
}

impl CsvOptions {
    /// Escape character in effect: the configured one, else `quote`.
    pub fn effective_escape(&self) -> char {
        self.escape.unwrap_or(self.quote)
    }

    /// Dialect characters must be single-byte and distinct from the
    /// delimiter and line terminators.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (name, c) in [
            ("delimiter", self.delimiter),
            ("quote", self.quote),
            ("escape", self.effective_escape()),
        ] {
            if !c.is_ascii() || c == '\n' || c == '\r' {
                return Err(PipelineError::config(format!(
                    "csv {name} must be a single ASCII character other than a line break, got {c:?}"
                )));
            }
        }
        if self.delimiter == self.quote || self.delimiter == self.effective_escape() {
            return Err(PipelineError::config(
                "csv delimiter must differ from the quote and escape characters",
            ));
        }
        Ok(())
    }
}

/// Configuration for one extract run.
///
/// Field aliases accept the camelCase names used by job-request payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Where to fetch the extract from. Required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Format,
    /// Records per batch.
    #[serde(default = "default_chunk_size", alias = "chunkSize")]
    pub chunk_size: usize,
    /// Maximum processor invocations in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub csv: CsvOptions,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            url: None,
            format: Format::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            csv: CsvOptions::default(),
        }
    }
}

impl ExtractConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn csv(mut self, options: CsvOptions) -> Self {
        self.csv = options;
        self
    }

    /// Fail-fast checks run before any I/O. Returns the URL on success.
    pub fn validate(&self) -> Result<&str, PipelineError> {
        let url = match self.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Err(PipelineError::MissingInput { field: "URL" }),
        };
        if self.chunk_size == 0 {
            return Err(PipelineError::config("chunk_size must be at least 1"));
        }
        if self.concurrency == 0 {
            return Err(PipelineError::config("concurrency must be at least 1"));
        }
        if self.format == Format::Csv {
            self.csv.validate()?;
        }
        Ok(url)
    }
}
