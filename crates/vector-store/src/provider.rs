//! Failure taxonomy and call policy shared by every external provider
//! (embeddings here, text generation in the answering layer).

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// What went wrong talking to a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// HTTP 429 or an equivalent quota signal
    RateLimited,
    /// The call did not finish inside the configured timeout
    Timeout,
    /// Non-success HTTP status other than 429
    Status(u16),
    /// Connection, DNS, TLS or request-building failure
    Transport,
    /// The provider answered, but not with something usable
    Malformed,
}

impl ProviderErrorKind {
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        match self {
            Self::RateLimited | Self::Timeout | Self::Transport => true,
            Self::Status(code) => code >= 500,
            Self::Malformed => false,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => f.write_str("rate limited"),
            Self::Timeout => f.write_str("timeout"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Transport => f.write_str("transport failure"),
            Self::Malformed => f.write_str("malformed response"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Malformed, message)
    }

    /// Map a non-success HTTP response to a failure kind
    pub fn from_status(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let kind = if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            ProviderErrorKind::RateLimited
        } else {
            ProviderErrorKind::Status(status.as_u16())
        };
        Self::new(kind, body)
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_decode() {
            ProviderErrorKind::Malformed
        } else if let Some(status) = err.status() {
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                ProviderErrorKind::RateLimited
            } else {
                ProviderErrorKind::Status(status.as_u16())
            }
        } else {
            ProviderErrorKind::Transport
        };
        Self::new(kind, err.to_string())
    }
}

/// Timeout and bounded retry applied around every provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallPolicy {
    pub timeout: Duration,
    /// Extra attempts after the first failure (only for retryable kinds)
    pub max_retries: usize,
    /// Delay before the first retry; doubles for each further retry
    pub backoff: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 1,
            backoff: Duration::from_millis(500),
        }
    }
}

impl CallPolicy {
    /// Run `call` under the timeout, retrying retryable failures.
    ///
    /// A timed-out attempt is dropped, which cancels the in-flight request.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0usize;
        loop {
            let outcome = match tokio::time::timeout(self.timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(ProviderError::timeout(format!(
                    "{operation} did not finish within {:?}",
                    self.timeout
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff_for(attempt);
                    log::warn!(
                        "{operation} failed ({err}); retry {attempt}/{} in {delay:?}",
                        self.max_retries
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff_for(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1).min(5) as u32;
        self.backoff.saturating_mul(1 << exponent)
    }
}
