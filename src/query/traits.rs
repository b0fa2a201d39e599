use crate::filters::PropertyFilters;
use crate::models::PropertyPage;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for everything that can answer a filtered, paginated listing.
/// Implementations never mutate the filters they are given.
#[async_trait]
pub trait PropertySource: Send + Sync {
    /// Fetch one 1-based page of properties matching `filters`.
    /// No matches is `Ok` with an empty page, not an error.
    async fn fetch(
        &self,
        filters: &PropertyFilters,
        page: u32,
        page_size: u32,
    ) -> Result<PropertyPage>;

    /// Get the name of the backing source
    fn source_name(&self) -> &'static str;
}
