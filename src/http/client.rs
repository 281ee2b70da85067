//! Rate-limit aware fetcher
//!
//! Issues a single authenticated GET and handles:
//! - 429 responses with exponential backoff plus jitter
//! - Any other failure status by renewing the bearer token
//! - Connection errors and timeouts with the same backoff as 429
//! - An attempt budget taken from the `Session`

use super::backoff::BackoffPolicy;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use crate::auth::{Session, TokenRenewer};
use crate::error::{Error, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Backoff applied to 429s and transport errors
    pub backoff: BackoffPolicy,
    /// Optional client-side throttle
    pub rate_limit: Option<RateLimiterConfig>,
    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
            rate_limit: None,
            user_agent: format!("catalog-harvest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl FetcherConfig {
    /// Create a new config builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::default()
    }
}

/// Builder for fetcher config
#[derive(Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the backoff policy
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.config.backoff = backoff;
        self
    }

    /// Enable client-side throttling
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

/// Result of one `fetch` call
#[derive(Debug)]
pub enum FetchOutcome {
    /// A 2xx response, with the session that obtained it
    Success {
        /// The successful response
        response: Response,
        /// Session after any renewals made during this call
        session: Session,
    },
    /// The attempt budget ran out before a 2xx arrived
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: Error,
        /// Session after any renewals made during this call
        session: Session,
    },
}

impl FetchOutcome {
    /// Check if this is a success
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The session carried by this outcome
    pub fn session(&self) -> &Session {
        match self {
            Self::Success { session, .. } | Self::Exhausted { session, .. } => session,
        }
    }
}

/// GET with backoff on 429 and token renewal on other failures
#[derive(Debug, Clone)]
pub struct RateLimitedFetcher {
    client: Client,
    config: FetcherConfig,
    renewer: TokenRenewer,
    rate_limiter: Option<RateLimiter>,
}

impl RateLimitedFetcher {
    /// Create a fetcher whose renewals hit `{base_url}/auth/token`
    pub fn new(base_url: &Url, config: FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let renewer = TokenRenewer::for_base(base_url, client.clone())?;
        Ok(Self::with_renewer(client, config, renewer))
    }

    /// Create a fetcher from parts
    pub fn with_renewer(client: Client, config: FetcherConfig, renewer: TokenRenewer) -> Self {
        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);
        Self {
            client,
            config,
            renewer,
            rate_limiter,
        }
    }

    /// Fetch `url`, retrying up to `session.max_attempts()` times.
    ///
    /// Only non-retryable transport errors (e.g. a malformed request) are
    /// returned as `Err`; a spent budget is `FetchOutcome::Exhausted`.
    pub async fn fetch(&self, url: &Url, session: Session) -> Result<FetchOutcome> {
        let max_attempts = session.max_attempts();
        let mut session = session;
        let mut backoff = self.config.backoff.start();
        let mut attempt = 0;

        loop {
            if let Some(ref limiter) = self.rate_limiter {
                limiter.wait().await;
            }

            let mut req = self.client.get(url.clone());
            if let Some(token) = session.current_token() {
                req = req.bearer_auth(token);
            }

            attempt += 1;
            let (error, delay) = match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    // Only a 200 carries a page; any other 2xx is treated as an auth failure
                    if status == StatusCode::OK {
                        debug!("GET {} succeeded after {} attempt(s)", url, attempt);
                        return Ok(FetchOutcome::Success { response, session });
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        let delay = backoff.next_delay();
                        debug!(
                            "Rate limited (429) on {}, attempt {}/{}, waiting {:?}",
                            url, attempt, max_attempts, delay
                        );
                        let error = Error::RateLimited {
                            retry_after_seconds: delay.as_secs(),
                        };
                        (error, Some(delay))
                    } else {
                        debug!(
                            "GET {} returned {}, attempt {}/{}, renewing token",
                            url,
                            status.as_u16(),
                            attempt,
                            max_attempts
                        );

                        match self.renewer.renew().await {
                            Ok(token) => {
                                session = session.with_token(token);
                                (Error::http_status(status.as_u16(), String::new()), None)
                            }
                            Err(e) => {
                                warn!("Token renewal failed: {e}");
                                session = session.without_token();
                                let delay = e.is_retryable().then(|| backoff.next_delay());
                                (e, delay)
                            }
                        }
                    }
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    let delay = backoff.next_delay();
                    warn!(
                        "Transport error on {}, attempt {}/{}, retrying in {:?}: {}",
                        url, attempt, max_attempts, delay, e
                    );
                    (Error::Http(e), Some(delay))
                }
                Err(e) => return Err(Error::Http(e)),
            };

            if attempt >= max_attempts {
                warn!("Giving up on {} after {} attempts", url, max_attempts);
                return Ok(FetchOutcome::Exhausted {
                    attempts: max_attempts,
                    last_error: error,
                    session,
                });
            }

            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
