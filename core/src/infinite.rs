//! Infinite pagination: successive server pages accumulated under one key.
//!
//! Pages are stored by page number, so requesting a page twice replaces it
//! instead of appending its items again. The first page is fetched through an
//! ordinary [`Query`], which gives the accumulated value the same caching,
//! coalescing and invalidation behavior as any other read. Invalidation
//! refetches from page 1.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::Serialize;
use tracing::debug;

use crate::envelope::{Page, Unwrap};
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::keys::QueryKey;
use crate::query::{Query, QueryClient, QueryState};
use crate::types::Entity;

/// `Some(page + 1)` while pages remain, `None` at the last page.
pub fn next_page_param<T>(page: &Page<T>) -> Option<u32> {
    (page.page < page.total_pages).then(|| page.page + 1)
}

/// Every page fetched so far, ordered by page number.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages<T> {
    pages: BTreeMap<u32, Page<T>>,
}

impl<T> Default for Pages<T> {
    fn default() -> Self {
        Self { pages: BTreeMap::new() }
    }
}

impl<T: Clone> Pages<T> {
    pub fn first(page: Page<T>) -> Self {
        let mut pages = Self::default();
        pages.insert(page);
        pages
    }

    pub fn insert(&mut self, page: Page<T>) {
        self.pages.insert(page.page, page);
    }

    /// All items, in page order.
    pub fn items(&self) -> Vec<T> {
        self.pages.values().flat_map(|page| page.items.iter().cloned()).collect()
    }

    pub fn last(&self) -> Option<&Page<T>> {
        self.pages.values().next_back()
    }

    pub fn next_page(&self) -> Option<u32> {
        self.last().and_then(next_page_param)
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The server's total, as reported by the most recent page.
    pub fn total(&self) -> u64 {
        self.last().map(|page| page.total).unwrap_or(0)
    }
}

type PageFetcher<T> = Arc<dyn Fn(u32) -> BoxFuture<'static, Result<Page<T>, ApiError>> + Send + Sync>;

pub struct InfiniteQuery<T> {
    first: Query<Pages<T>>,
    fetch_page: PageFetcher<T>,
    client: QueryClient,
}

impl<T> Clone for InfiniteQuery<T> {
    fn clone(&self) -> Self {
        Self {
            first: self.first.clone(),
            fetch_page: self.fetch_page.clone(),
            client: self.client.clone(),
        }
    }
}

impl<T> fmt::Debug for InfiniteQuery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfiniteQuery").field("key", self.first.key()).finish()
    }
}

#[derive(Serialize)]
struct PageRequest<'a, F> {
    page: u32,
    #[serde(flatten)]
    filters: &'a F,
}

impl<T> InfiniteQuery<T>
where
    T: Entity,
{
    /// Page through `GET path?page=N&<filters>`, cached under `key`.
    pub fn new<F>(gateway: &Gateway, key: QueryKey, path: &'static str, filters: F) -> Self
    where
        F: Serialize + Send + Sync + 'static,
    {
        let page_gateway = gateway.clone();
        let filters = Arc::new(filters);
        let fetch_page: PageFetcher<T> = Arc::new(move |page: u32| -> BoxFuture<'static, Result<Page<T>, ApiError>> {
            let gateway = page_gateway.clone();
            let request = gateway.api().build_get(
                path,
                &PageRequest {
                    page,
                    filters: filters.as_ref(),
                },
            );
            Box::pin(async move { gateway.execute::<Page<T>>(request?, Unwrap::Data).await })
        });

        let first_page = fetch_page.clone();
        let first = Query::new(
            key,
            move || {
                let fetch = first_page(1);
                Box::pin(async move { Ok::<_, ApiError>(Pages::first(fetch.await?)) })
            },
            gateway.cache().clone(),
        );

        Self {
            first,
            fetch_page,
            client: gateway.cache().clone(),
        }
    }

    pub fn key(&self) -> &QueryKey {
        self.first.key()
    }

    pub fn state(&self) -> QueryState<Pages<T>> {
        self.first.state()
    }

    pub fn pages(&self) -> Option<Pages<T>> {
        self.first.data()
    }

    /// Flattened items of every page fetched so far.
    pub fn items(&self) -> Vec<T> {
        self.pages().map(|pages| pages.items()).unwrap_or_default()
    }

    pub fn has_next_page(&self) -> bool {
        self.pages().and_then(|pages| pages.next_page()).is_some()
    }

    /// Page 1, from cache when fresh.
    pub async fn fetch_first(&self) -> Result<Pages<T>, ApiError> {
        self.first.fetch().await
    }

    /// Fetch the page after the last one held and add it to the list.
    ///
    /// Returns `false` without a request when the last page has been
    /// reached. Also returns `false` when the list was invalidated or
    /// replaced while the page was in flight: the page is dropped and the
    /// entry keeps its stale flag, so the next read starts again at page 1.
    pub async fn fetch_next_page(&self) -> Result<bool, ApiError> {
        let pages = match self.pages() {
            Some(pages) => pages,
            None => self.fetch_first().await?,
        };
        let Some(next) = pages.next_page() else {
            return Ok(false);
        };
        let generation = self.client.generation(self.key());
        debug!(key = %self.key(), page = next, "fetching next page");
        let page = (self.fetch_page)(next).await?;
        Ok(self
            .client
            .merge_query_data::<Pages<T>, _>(self.key(), generation, move |mut pages| {
                pages.insert(page);
                pages
            }))
    }

    /// Drop the accumulated pages and fetch page 1 again.
    pub async fn refetch(&self) -> Result<Pages<T>, ApiError> {
        self.first.refetch().await
    }

    pub fn invalidate(&self) -> usize {
        self.first.invalidate()
    }

    pub fn watch(&self) -> BoxStream<'static, QueryState<Pages<T>>> {
        self.first.watch()
    }
}
