//! Registry access: HTTP client, search-page cache, pagination and detail fan-out.

use async_trait::async_trait;
use chouse_core::{DetailRecord, SearchResultPage};

mod error;
pub use error::RegistryError;

pub mod cache;
pub mod fanout;
pub mod http;
pub mod paginate;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use cache::{DiskCache, MemoryCache, PageCache};
pub use fanout::{DetailOutcome, fetch_all_details};
pub use http::{HttpRegistry, RegistryConfig, RetryPolicy};
pub use paginate::fetch_all;

/// The two read operations the pipeline needs from the registry.
#[async_trait]
pub trait Registry: Send + Sync {
    /// One page of search results; `page` starts at 1.
    async fn search(&self, query: &str, page: usize) -> Result<SearchResultPage, RegistryError>;

    /// Full profile for one company number.
    async fn fetch_detail(&self, identifier: &str) -> Result<DetailRecord, RegistryError>;
}
