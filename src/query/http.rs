use crate::filters::codec::{encode, render_query, PAGE};
use crate::filters::PropertyFilters;
use crate::models::PropertyPage;
use crate::query::traits::PropertySource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Property source backed by the dashboard's JSON API
pub struct HttpSource {
    client: Client,
    base_url: Url,
}

impl HttpSource {
    /// `base_url` is treated as a directory: `https://host/api` and
    /// `https://host/api/` both list from `https://host/api/houses`
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url).context("Invalid property API url")?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Property API url cannot be a base: {}", base_url);
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("houses-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// `{base}/houses?<filters>&page=N&pageSize=M`
    pub fn listing_url(&self, filters: &PropertyFilters, page: u32, page_size: u32) -> Result<Url> {
        let mut params = encode(filters);
        params.insert(PAGE.to_string(), page.max(1).to_string());
        params.insert("pageSize".to_string(), page_size.to_string());

        let mut url = self
            .base_url
            .join("houses")
            .context("Failed to build listing url")?;
        url.set_query(Some(&render_query(&params)));
        Ok(url)
    }
}

#[async_trait]
impl PropertySource for HttpSource {
    async fn fetch(
        &self,
        filters: &PropertyFilters,
        page: u32,
        page_size: u32,
    ) -> Result<PropertyPage> {
        let url = self.listing_url(filters, page, page_size)?;
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch property listing")?;

        if !response.status().is_success() {
            warn!("Property API returned status: {}", response.status());
            anyhow::bail!("Failed to fetch property listing: {}", response.status());
        }

        response
            .json::<PropertyPage>()
            .await
            .context("Failed to decode property listing")
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
