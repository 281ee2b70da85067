//! HTTP fetch module
//!
//! Provides the rate-limit aware fetcher used by pagination.
//!
//! # Features
//!
//! - **Backoff on 429**: Exponential delay with uniform jitter, doubling per 429
//! - **Re-authentication**: Any other failure renews the bearer token and retries
//! - **Tagged outcome**: A spent attempt budget is reported, never silently dropped
//! - **Throttling**: Optional client-side token bucket using governor

mod backoff;
mod client;
mod rate_limit;

pub use backoff::{Backoff, BackoffPolicy};
pub use client::{FetchOutcome, FetcherConfig, FetcherConfigBuilder, RateLimitedFetcher};
pub use rate_limit::{RateLimiter, RateLimiterConfig};

#[cfg(test)]
mod tests;
