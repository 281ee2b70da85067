//! Page cursor and lazy page stream

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::http::{FetchOutcome, RateLimitedFetcher};
use crate::types::ExhaustionPolicy;
use futures::stream::{self, Stream};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

/// Query parameter carrying the page number
pub const PAGE_PARAM: &str = "page";

/// Result of advancing a cursor by one page
#[derive(Debug)]
pub enum PageStep {
    /// A decoded page body
    Page {
        /// Parsed JSON body
        body: Value,
        /// Page number that produced this body
        page: u32,
        /// Session to use for the next request
        session: Session,
    },
    /// No further pages will be produced by this cursor
    End {
        /// Session to use for the next request
        session: Session,
    },
}

impl PageStep {
    /// Check if this is the end of the sequence
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End { .. })
    }

    /// Take the session out of the step
    pub fn into_session(self) -> Session {
        match self {
            Self::Page { session, .. } | Self::End { session } => session,
        }
    }
}

/// Walks `base_url?page=1`, `?page=2`, ...
#[derive(Debug, Clone)]
pub struct PageCursor {
    base_url: Url,
    page: u32,
    policy: ExhaustionPolicy,
    done: bool,
}

impl PageCursor {
    /// Create a cursor positioned at page 1
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            page: 1,
            policy: ExhaustionPolicy::default(),
            done: false,
        }
    }

    /// Set what happens when a page cannot be fetched within the attempt budget
    #[must_use]
    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Page number of the next request
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Whether the cursor has ended
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// URL of the next request; other query pairs on the base are preserved
    pub fn page_url(&self) -> Url {
        let pairs: Vec<(String, String)> = self
            .base_url
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(pairs)
            .append_pair(PAGE_PARAM, &self.page.to_string());
        url
    }

    /// Fetch and parse the next page.
    ///
    /// A spent attempt budget is an `Error::RetriesExhausted` under
    /// `ExhaustionPolicy::Fail`, and `PageStep::End` under `EndOfData`.
    pub async fn next(
        &mut self,
        fetcher: &RateLimitedFetcher,
        session: Session,
    ) -> Result<PageStep> {
        if self.done {
            return Ok(PageStep::End { session });
        }

        let url = self.page_url();
        match fetcher.fetch(&url, session).await? {
            FetchOutcome::Success { response, session } => {
                let text = response.text().await?;
                let body: Value = serde_json::from_str(&text)?;
                let page = self.page;
                debug!("Page: {} of url: {} read", page, self.base_url);
                self.page += 1;
                Ok(PageStep::Page {
                    body,
                    page,
                    session,
                })
            }
            FetchOutcome::Exhausted {
                attempts,
                last_error,
                session,
            } => {
                self.done = true;
                match self.policy {
                    ExhaustionPolicy::Fail => Err(Error::exhausted(url, attempts, last_error)),
                    ExhaustionPolicy::EndOfData => {
                        warn!(
                            "Treating {} as end of data after {} attempts: {}",
                            url, attempts, last_error
                        );
                        Ok(PageStep::End { session })
                    }
                }
            }
        }
    }

    /// Mark the cursor as finished (e.g. after an empty page)
    pub fn finish(&mut self) {
        self.done = true;
    }
}

/// Lazily fetch pages of `base_url` starting at page 1.
///
/// Each call starts over from page 1 with the given session. The stream ends
/// when the cursor ends, or after yielding the first error.
pub fn pages<'a>(
    fetcher: &'a RateLimitedFetcher,
    base_url: Url,
    session: Session,
    policy: ExhaustionPolicy,
) -> impl Stream<Item = Result<(Value, Session)>> + 'a {
    let cursor = PageCursor::new(base_url).with_policy(policy);

    stream::unfold(Some((cursor, session)), move |state| async move {
        let (mut cursor, session) = state?;
        match cursor.next(fetcher, session).await {
            Ok(PageStep::Page { body, session, .. }) => {
                Some((Ok((body, session.clone())), Some((cursor, session))))
            }
            Ok(PageStep::End { .. }) => None,
            Err(e) => Some((Err(e), None)),
        }
    })
}
