//! HTTP client for the Companies House public data API.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chouse_core::{DetailRecord, SearchResultPage, SummaryRecord, normalize_company_number};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::{PageCache, page_key};
use crate::{Registry, RegistryError};

pub const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";

/// How 429 responses are handled: a fixed delay between a bounded number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; `1` disables retrying.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(30),
        }
    }
}

/// Connection settings for [`HttpRegistry`].
#[derive(Clone)]
pub struct RegistryConfig {
    pub base_url: String,
    /// Sent as the basic-auth username with a blank password.
    pub api_key: String,
    pub page_size: usize,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl RegistryConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            page_size: chouse_core::config::DEFAULT_PAGE_SIZE,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("page_size", &self.page_size)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Deserialize)]
struct WireSearchResponse {
    #[serde(default)]
    items: Vec<WireSearchItem>,
    total_results: Option<u64>,
}

#[derive(Deserialize)]
struct WireSearchItem {
    company_number: Option<String>,
    title: Option<String>,
}

/// Registry client speaking to the live REST API.
pub struct HttpRegistry {
    client: reqwest::Client,
    config: RegistryConfig,
    cache: Option<Arc<dyn PageCache>>,
}

impl HttpRegistry {
    /// Create a client for the configured base URL (trailing slash trimmed).
    pub fn new(mut config: RegistryConfig) -> Result<Self, RegistryError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            config,
            cache: None,
        })
    }

    /// Serve search pages from `cache` when present and fill it on success.
    pub fn with_cache(mut self, cache: Arc<dyn PageCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    async fn cached_page(&self, query: &str, page: usize) -> Option<SearchResultPage> {
        let cache = self.cache.as_ref()?;
        match cache.get(&page_key(query, page)).await {
            Ok(Some(raw)) => match parse_search(&raw, self.config.page_size) {
                Ok(result) => {
                    debug!(query, page, "search page served from cache");
                    Some(result)
                }
                Err(e) => {
                    warn!(query, page, error = %e, "ignoring unreadable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(query, page, error = %e, "page cache read failed");
                None
            }
        }
    }

    /// GET with basic auth, retrying 429s per the configured policy.
    async fn get_text(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, RegistryError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let resp = self
                .client
                .get(url)
                .basic_auth(&self.config.api_key, None::<&str>)
                .header(ACCEPT, "application/json")
                .query(params)
                .send()
                .await?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt >= max_attempts {
                    return Err(RegistryError::RateLimited { attempts: attempt });
                }
                warn!(
                    url = %url,
                    attempt,
                    delay_secs = self.config.retry.delay.as_secs(),
                    "rate limited by registry, retrying"
                );
                tokio::time::sleep(self.config.retry.delay).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(RegistryError::Server {
                    status: status.as_u16(),
                    body,
                });
            }

            return Ok(resp.text().await?);
        }
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn search(&self, query: &str, page: usize) -> Result<SearchResultPage, RegistryError> {
        if page == 0 {
            return Err(RegistryError::InvalidPage(page));
        }
        if let Some(cached) = self.cached_page(query, page).await {
            return Ok(cached);
        }

        let page_size = self.config.page_size;
        let start_index = (page - 1)
            .checked_mul(page_size)
            .ok_or(RegistryError::InvalidPage(page))?;
        let url = format!("{}/search/companies", self.config.base_url);
        info!(query, page, start_index, "searching registry");

        let raw = self
            .get_text(
                &url,
                &[
                    ("q", query.to_string()),
                    ("items_per_page", page_size.to_string()),
                    ("start_index", start_index.to_string()),
                ],
            )
            .await?;
        let result = parse_search(&raw, page_size)?;
        info!(query, page, count = result.items.len(), "received search page");

        if let Some(cache) = &self.cache
            && let Err(e) = cache.put(&page_key(query, page), &raw).await
        {
            warn!(query, page, error = %e, "page cache write failed");
        }
        Ok(result)
    }

    async fn fetch_detail(&self, identifier: &str) -> Result<DetailRecord, RegistryError> {
        let number = normalize_company_number(identifier);
        if number.is_empty() {
            return Err(RegistryError::EmptyIdentifier);
        }
        let url = format!("{}/company/{}", self.config.base_url, number);
        debug!(company_number = %number, "fetching company profile");
        let raw = self.get_text(&url, &[]).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn parse_search(raw: &str, page_size: usize) -> Result<SearchResultPage, RegistryError> {
    let wire: WireSearchResponse = serde_json::from_str(raw)?;
    Ok(SearchResultPage {
        items: wire
            .items
            .into_iter()
            .map(|item| SummaryRecord {
                identifier: item.company_number.unwrap_or_default(),
                display_name: item.title.unwrap_or_default(),
            })
            .collect(),
        total_results: wire.total_results,
        page_size,
    })
}
