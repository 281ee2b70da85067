//! Nested category/entry walk

use crate::auth::Session;
use crate::decode::{CategoryPage, DecodePage, EntryPage};
use crate::error::Result;
use crate::http::RateLimitedFetcher;
use crate::pagination::{PageCursor, PageStep};
use crate::types::{CategoryApiRecord, ExhaustionPolicy};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, info};
use url::Url;

/// Categories listing, relative to the API base URL
pub const CATEGORIES_PATH: &str = "apis/categories";

/// Per-category entries, relative to the API base URL
pub const ENTRIES_PATH: &str = "apis/entry";

/// Walks every category and yields one record per listed API
#[derive(Debug, Clone)]
pub struct CatalogWalker {
    fetcher: RateLimitedFetcher,
    base_url: Url,
    max_attempts: u32,
    policy: ExhaustionPolicy,
}

/// Entry pagination in progress for one category
struct CategoryWalk {
    name: String,
    cursor: PageCursor,
    records: usize,
}

/// Everything the walk carries between pages. Owns the only `Session`.
struct WalkState {
    session: Session,
    categories: PageCursor,
    pending: VecDeque<String>,
    current: Option<CategoryWalk>,
}

impl CatalogWalker {
    /// Create a walker over the catalog at `base_url`
    pub fn new(fetcher: RateLimitedFetcher, base_url: Url, max_attempts: u32) -> Self {
        Self {
            fetcher,
            base_url,
            max_attempts,
            policy: ExhaustionPolicy::default(),
        }
    }

    /// Set the exhaustion policy used at both levels
    #[must_use]
    pub fn with_policy(mut self, policy: ExhaustionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// `{base}/apis/categories`
    pub fn categories_url(&self) -> Result<Url> {
        crate::auth::join_path(&self.base_url, CATEGORIES_PATH)
    }

    /// `{base}/apis/entry?category=<name>`
    pub fn entries_url(&self, category: &str) -> Result<Url> {
        let mut url = crate::auth::join_path(&self.base_url, ENTRIES_PATH)?;
        url.query_pairs_mut().append_pair("category", category);
        Ok(url)
    }

    /// Lazily walk the whole catalog.
    ///
    /// Each call starts a fresh, unauthenticated session. The stream ends
    /// after the first empty category page, or after yielding an error.
    pub fn walk(&self) -> impl Stream<Item = Result<CategoryApiRecord>> + '_ {
        let start = self.categories_url().map(|url| WalkState {
            session: Session::new(self.max_attempts),
            categories: PageCursor::new(url).with_policy(self.policy),
            pending: VecDeque::new(),
            current: None,
        });

        stream::unfold(Some(start), move |state| async move {
            let mut state = match state? {
                Ok(state) => state,
                Err(e) => return Some((stream::iter(vec![Err(e)]), None)),
            };

            match self.step(&mut state).await {
                Ok(Some(batch)) => {
                    let items: Vec<Result<CategoryApiRecord>> = batch.into_iter().map(Ok).collect();
                    Some((stream::iter(items), Some(Ok(state))))
                }
                Ok(None) => None,
                Err(e) => Some((stream::iter(vec![Err(e)]), None)),
            }
        })
        .flatten()
    }

    /// Advance by one request. `Ok(None)` means the walk is complete.
    async fn step(&self, state: &mut WalkState) -> Result<Option<Vec<CategoryApiRecord>>> {
        if let Some(walk) = state.current.as_mut() {
            let step = walk.cursor.next(&self.fetcher, state.session.clone()).await?;
            return match step {
                PageStep::Page { body, page, session } => {
                    state.session = session;
                    let entries = EntryPage::decode(&body)?;

                    if entries.is_terminal() {
                        info!(
                            "Category '{}' done: {} APIs over {} page(s)",
                            walk.name,
                            walk.records,
                            page - 1
                        );
                        walk.cursor.finish();
                        state.current = None;
                        return Ok(Some(Vec::new()));
                    }

                    debug!(
                        "Category '{}' page {}: {} entries",
                        walk.name,
                        page,
                        entries.entries.len()
                    );
                    walk.records += entries.entries.len();
                    let records = entries
                        .entries
                        .into_iter()
                        .map(|entry| CategoryApiRecord::new(walk.name.clone(), entry.link))
                        .collect();
                    Ok(Some(records))
                }
                PageStep::End { session } => {
                    state.session = session;
                    state.current = None;
                    Ok(Some(Vec::new()))
                }
            };
        }

        if let Some(name) = state.pending.pop_front() {
            let url = self.entries_url(&name)?;
            state.current = Some(CategoryWalk {
                name,
                cursor: PageCursor::new(url).with_policy(self.policy),
                records: 0,
            });
            return Ok(Some(Vec::new()));
        }

        if state.categories.is_done() {
            return Ok(None);
        }

        match state
            .categories
            .next(&self.fetcher, state.session.clone())
            .await?
        {
            PageStep::Page { body, page, session } => {
                state.session = session;
                let listing = CategoryPage::decode(&body)?;

                if listing.is_terminal() {
                    debug!("Category listing exhausted at page {}", page);
                    state.categories.finish();
                    return Ok(None);
                }

                debug!(
                    "Category page {}: {} categories",
                    page,
                    listing.categories.len()
                );
                state.pending.extend(listing.categories);
                Ok(Some(Vec::new()))
            }
            PageStep::End { session } => {
                state.session = session;
                Ok(None)
            }
        }
    }
}
