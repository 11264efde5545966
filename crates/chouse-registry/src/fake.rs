//! In-process [`Registry`] with a fixed company list, for tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chouse_core::{DetailRecord, SearchResultPage, SummaryRecord, normalize_company_number};
use serde_json::json;

use crate::{Registry, RegistryError};

/// Serves `companies` in pages of `page_size`. Company `i` has number
/// `{i:08}`, title `COMPANY {i} LIMITED`, and SIC code `62020` when `i` is
/// even or `82990` when odd.
pub struct FakeRegistry {
    page_size: usize,
    companies: Vec<SummaryRecord>,
    endless: bool,
    failing_details: HashSet<String>,
    fail_search_from: Option<usize>,
    detail_delay: Duration,
    search_calls: AtomicUsize,
    detail_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeRegistry {
    pub fn with_companies(count: usize, page_size: usize) -> Self {
        let companies = (0..count)
            .map(|i| SummaryRecord {
                identifier: format!("{i:08}"),
                display_name: format!("COMPANY {i} LIMITED"),
            })
            .collect();
        Self {
            page_size,
            companies,
            endless: false,
            failing_details: HashSet::new(),
            fail_search_from: None,
            detail_delay: Duration::ZERO,
            search_calls: AtomicUsize::new(0),
            detail_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Every search page is full, as from an upstream that never shrinks its page.
    pub fn endless(page_size: usize) -> Self {
        let mut registry = Self::with_companies(page_size, page_size);
        registry.endless = true;
        registry
    }

    /// Detail lookups for `identifier` answer 500.
    pub fn fail_detail(mut self, identifier: &str) -> Self {
        self.failing_details.insert(identifier.to_string());
        self
    }

    /// Search pages from `page` onwards answer 503.
    pub fn fail_search_from(mut self, page: usize) -> Self {
        self.fail_search_from = Some(page);
        self
    }

    pub fn with_detail_delay_ms(mut self, ms: u64) -> Self {
        self.detail_delay = Duration::from_millis(ms);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    /// Highest number of detail lookups observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn search(&self, _query: &str, page: usize) -> Result<SearchResultPage, RegistryError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if page == 0 {
            return Err(RegistryError::InvalidPage(page));
        }
        if self.fail_search_from.is_some_and(|from| page >= from) {
            return Err(RegistryError::Server {
                status: 503,
                body: "service unavailable".into(),
            });
        }

        let items = if self.endless {
            self.companies.clone()
        } else {
            let start = (page - 1)
                .checked_mul(self.page_size)
                .ok_or(RegistryError::InvalidPage(page))?
                .min(self.companies.len());
            let end = (start + self.page_size).min(self.companies.len());
            self.companies[start..end].to_vec()
        };
        Ok(SearchResultPage {
            items,
            total_results: (!self.endless).then_some(self.companies.len() as u64),
            page_size: self.page_size,
        })
    }

    async fn fetch_detail(&self, identifier: &str) -> Result<DetailRecord, RegistryError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.detail_delay.is_zero() {
            tokio::time::sleep(self.detail_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let number = normalize_company_number(identifier);
        if self.failing_details.contains(&number) {
            return Err(RegistryError::Server {
                status: 500,
                body: "internal error".into(),
            });
        }
        let Some(index) = self.companies.iter().position(|c| c.identifier == number) else {
            return Err(RegistryError::Server {
                status: 404,
                body: r#"{"errors":[{"error":"company-profile-not-found"}]}"#.into(),
            });
        };
        let company = &self.companies[index];
        let sic = if index % 2 == 0 { "62020" } else { "82990" };
        Ok(json!({
            "company_name": company.display_name,
            "company_number": company.identifier,
            "company_status": "active",
            "type": "ltd",
            "date_of_creation": "2010-01-01",
            "registered_office_address": { "address_line_1": format!("{index} High Street") },
            "sic_codes": [sic]
        }))
    }
}
