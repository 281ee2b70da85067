//! Token renewal
//!
//! Obtains a new bearer token from the source's auth endpoint.

use crate::decode::decode_token;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// Path of the auth endpoint, relative to the API base URL
pub const AUTH_TOKEN_PATH: &str = "auth/token";

/// Fetches fresh tokens from `{base}/auth/token`
#[derive(Debug, Clone)]
pub struct TokenRenewer {
    /// HTTP client for token requests
    http_client: Client,
    /// Fully resolved auth endpoint
    token_url: Url,
}

impl TokenRenewer {
    /// Create a renewer sharing an existing HTTP client
    pub fn with_client(token_url: Url, http_client: Client) -> Self {
        Self {
            http_client,
            token_url,
        }
    }

    /// Create a renewer for the auth endpoint under `base_url`
    pub fn for_base(base_url: &Url, http_client: Client) -> Result<Self> {
        let token_url = join_path(base_url, AUTH_TOKEN_PATH)?;
        Ok(Self::with_client(token_url, http_client))
    }

    /// The auth endpoint this renewer calls
    pub fn token_url(&self) -> &Url {
        &self.token_url
    }

    /// Request a new token.
    ///
    /// Sends exactly one unauthenticated GET. Only a 200 is accepted. A 429 is
    /// reported as `Error::RateLimited` so the caller can back off; every
    /// other failure is an `Error::Auth`.
    pub async fn renew(&self) -> Result<String> {
        debug!("Re-authenticating against {}", self.token_url);

        let response = self
            .http_client
            .get(self.token_url.clone())
            .send()
            .await
            .map_err(|e| Error::auth(format!("Token request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_seconds: 1,
            });
        }

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token request failed with status {}: {body}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Token response is not JSON: {e}")))?;

        let token = decode_token(&body)
            .map_err(|e| Error::auth(format!("Malformed token response: {e}")))?;

        Ok(token.token)
    }
}

/// Append a relative path to a base URL, keeping the base's own path
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}
