pub mod http;
pub mod memory;
pub mod traits;

pub use http::HttpSource;
pub use memory::MemorySource;
pub use traits::PropertySource;

use crate::error::QueryError;
use crate::filters::{encode_query, PropertyFilters};
use crate::models::PropertyPage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Cache and de-duplication key: the full parameter tuple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    filters: String,
    page: u32,
    page_size: u32,
}

impl QueryKey {
    pub fn new(filters: &PropertyFilters, page: u32, page_size: u32) -> Self {
        Self {
            filters: encode_query(filters, 1),
            page: page.max(1),
            page_size,
        }
    }
}

/// Result of [`QueryExecutor::query`]
#[derive(Debug)]
pub struct QueryOutcome {
    pub page: PropertyPage,
    /// Served from cache without waiting on the source
    pub from_cache: bool,
    /// Background refresh of the stale entry that was served
    pub revalidation: Option<Revalidation>,
}

impl QueryOutcome {
    pub fn is_revalidating(&self) -> bool {
        self.revalidation.is_some()
    }
}

/// Handle on a background refresh. The cache is updated whether or not the
/// handle is awaited; dropping it detaches the refresh.
#[derive(Debug)]
pub struct Revalidation(JoinHandle<Result<PropertyPage, QueryError>>);

impl Revalidation {
    /// Wait for the refreshed page
    pub async fn finished(self) -> Result<PropertyPage, QueryError> {
        match self.0.await {
            Ok(result) => result,
            Err(err) => Err(anyhow::Error::new(err)
                .context("Background refresh did not complete")
                .into()),
        }
    }
}

struct CacheEntry {
    page: PropertyPage,
    fetched_at: Instant,
}

type InFlight = Arc<OnceCell<Result<PropertyPage, QueryError>>>;

/// Runs listing queries against a [`PropertySource`].
///
/// Concurrent requests for the same key share one source call. Successful
/// pages are cached per key; entries older than `stale_after` are still served
/// immediately while a background task refreshes them. Cloning is cheap and
/// clones share cache and in-flight state.
#[derive(Clone)]
pub struct QueryExecutor {
    source: Arc<dyn PropertySource>,
    page_size: u32,
    stale_after: Duration,
    cache: Arc<Mutex<HashMap<QueryKey, CacheEntry>>>,
    in_flight: Arc<Mutex<HashMap<QueryKey, InFlight>>>,
}

impl QueryExecutor {
    pub fn new(source: Arc<dyn PropertySource>, page_size: u32, stale_after: Duration) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            stale_after,
            cache: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn source_name(&self) -> &'static str {
        self.source.source_name()
    }

    /// Load a page, preferring the cache
    pub async fn query(
        &self,
        filters: &PropertyFilters,
        page: u32,
    ) -> Result<QueryOutcome, QueryError> {
        let key = QueryKey::new(filters, page, self.page_size);

        if let Some((cached, age)) = self.cached(&key) {
            let stale = age >= self.stale_after;
            debug!(?key, stale, "cache hit");
            let revalidation = stale.then(|| self.spawn_refresh(key, filters.clone()));
            return Ok(QueryOutcome {
                page: cached,
                from_cache: true,
                revalidation,
            });
        }

        let page = self.fetch(&key, filters).await?;
        Ok(QueryOutcome {
            page,
            from_cache: false,
            revalidation: None,
        })
    }

    /// Cached page for a key, if any, regardless of age
    pub fn peek(&self, filters: &PropertyFilters, page: u32) -> Option<PropertyPage> {
        self.cached(&QueryKey::new(filters, page, self.page_size))
            .map(|(page, _)| page)
    }

    /// Drop every cached page, e.g. after a record was edited
    pub fn invalidate(&self) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn cached(&self, key: &QueryKey) -> Option<(PropertyPage, Duration)> {
        let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache
            .get(key)
            .map(|entry| (entry.page.clone(), entry.fetched_at.elapsed()))
    }

    fn spawn_refresh(&self, key: QueryKey, filters: PropertyFilters) -> Revalidation {
        let executor = self.clone();
        Revalidation(tokio::spawn(async move {
            let result = executor.fetch(&key, &filters).await;
            if let Err(err) = &result {
                warn!("Background refresh failed: {}", err);
            }
            result
        }))
    }

    /// Source call shared by every concurrent caller of the same key
    async fn fetch(&self, key: &QueryKey, filters: &PropertyFilters) -> Result<PropertyPage, QueryError> {
        let cell = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            in_flight.entry(key.clone()).or_default().clone()
        };

        let result = cell
            .get_or_init(|| async {
                info!(
                    "Loading page {} from {} source",
                    key.page,
                    self.source.source_name()
                );
                self.source
                    .fetch(filters, key.page, key.page_size)
                    .await
                    .map_err(QueryError::from)
            })
            .await
            .clone();

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, &cell)) {
                in_flight.remove(key);
            }
        }

        if let Ok(page) = &result {
            let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            cache.insert(
                key.clone(),
                CacheEntry {
                    page: page.clone(),
                    fetched_at: Instant::now(),
                },
            );
        }

        result
    }
}
