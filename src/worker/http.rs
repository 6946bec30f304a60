use super::sleep_or_cancelled;
use crate::error::{Error, Result};
use crate::eventlog::EventLog;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest response body excerpt written to the event log.
const BODY_EXCERPT_CHARS: usize = 200;

/// Validate that a URL is well-formed and uses HTTP/HTTPS scheme.
pub fn validate_url(url: &str) -> Result<()> {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let scheme = parsed.scheme();
            if scheme != "http" && scheme != "https" {
                return Err(Error::InvalidUrl {
                    url: url.to_string(),
                    reason: format!("scheme must be http or https, got '{}'", scheme),
                });
            }
            Ok(())
        }
        Err(e) => Err(Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Periodic outbound GET.
///
/// Each round issues one request and logs either the status with a short body
/// excerpt or the failure. Failures never end the loop and there is no
/// backoff: the next request goes out one interval later regardless.
#[derive(Debug, Clone)]
pub struct HttpPoller {
    url: String,
    client: Client,
    timeout: Duration,
}

impl HttpPoller {
    /// # Errors
    ///
    /// Returns error if URL is malformed or uses unsupported scheme.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        validate_url(&url)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            client,
            timeout,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one request; `Ok` carries a one-line summary of a 2xx response.
    pub async fn poll_once(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let status = response.status();
        let body = response.text().await?;
        Ok(format!("{} {}", status, excerpt(&body)))
    }

    /// Poll until `cancel` fires. An in-flight request is abandoned on cancellation.
    pub(crate) async fn run(self, log: EventLog, interval: Duration, cancel: CancellationToken) {
        loop {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => break,
                outcome = self.poll_once() => outcome,
            };
            match outcome {
                Ok(summary) => log.write_info(&format!("GET {} -> {}", self.url, summary)),
                Err(e) => log.write_error(&format!("GET {} failed: {}", self.url, e)),
            }

            if !sleep_or_cancelled(&cancel, interval).await {
                break;
            }
        }
        tracing::debug!("HTTP poll task for {} stopped", self.url);
    }
}

fn excerpt(body: &str) -> String {
    let flat = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= BODY_EXCERPT_CHARS {
        flat
    } else {
        let head: String = flat.chars().take(BODY_EXCERPT_CHARS).collect();
        format!("{}...", head)
    }
}
