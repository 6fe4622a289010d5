//! `HttpSource` streams an extract over HTTP(S) with `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use extractkit_core::{millis, ByteSource, ByteStream, TransportError};
use futures::StreamExt;
use url::Url;

use crate::retry::{RetryConfig, RetryPolicy};

/// Configuration for [`HttpSource`].
#[derive(Debug, Clone)]
pub struct HttpSourceConfig {
    /// Applied to opening the stream only. A stream that breaks mid-body is
    /// never retried.
    pub retry: RetryConfig,
    pub connect_timeout: Duration,
    /// Deadline for the whole response, body included. `None` lets long
    /// extracts stream for as long as they need.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("extractkit/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Byte source for `http://` and `https://` URLs.
pub struct HttpSource {
    http: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(config: HttpSourceConfig) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| TransportError::Http(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            retry: RetryPolicy::new(config.retry),
            timeout: config.request_timeout.unwrap_or(config.connect_timeout),
        })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(HttpSourceConfig::default())
    }

    async fn open_once(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let resp = self.http.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    ms: millis(self.timeout),
                }
            } else {
                TransportError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl ByteSource for HttpSource {
    async fn open(&self, url: &str) -> Result<ByteStream, TransportError> {
        let parsed = Url::parse(url).map_err(|e| TransportError::UnsupportedUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(TransportError::UnsupportedUrl {
                url: url.to_string(),
                reason: format!("scheme '{}' is not http or https", parsed.scheme()),
            });
        }

        let mut attempt = 0u32;
        let resp = loop {
            attempt += 1;
            match self.open_once(url).await {
                Ok(resp) => break resp,
                Err(e) if e.is_retryable() => match self.retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::warn!(
                            attempt,
                            delay_ms = millis(delay),
                            error = %e,
                            url,
                            "retrying extract request"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        tracing::warn!(attempt, error = %e, url, "max retries exceeded");
                        return Err(e);
                    }
                },
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(
            url,
            status = resp.status().as_u16(),
            content_length = ?resp.content_length(),
            "extract stream opened"
        );

        let mut bytes_read = 0u64;
        let body = resp.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => {
                bytes_read += bytes.len() as u64;
                Ok(bytes)
            }
            Err(e) => Err(TransportError::Read {
                bytes_read,
                reason: e.to_string(),
            }),
        });
        Ok(body.boxed())
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let source = HttpSource::with_defaults().unwrap();
        for url in ["ftp://example.com/x.csv", "not a url"] {
            let err = source.open(url).await.err().unwrap();
            assert!(matches!(err, TransportError::UnsupportedUrl { .. }), "{url}: {err}");
        }
    }

    #[test]
    fn default_user_agent_names_the_crate() {
        assert!(HttpSourceConfig::default().user_agent.starts_with("extractkit/"));
    }
}
