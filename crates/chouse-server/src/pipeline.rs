//! Search → detail fan-out → normalise → export, scoped to one request.
//!
//! A [`Pipeline`] owns no accumulators: every operation builds its own
//! collections and returns them, so concurrent requests never share state.
//! Dropping an operation's future cancels its in-flight registry calls.

use std::sync::Arc;

use chouse_core::{
    ExportFormat, NormalizedRecord, PipelineConfig, SummaryRecord, normalize,
    normalize_company_number,
};
use chouse_export::{ExportJob, ExportedFile, company_numbers_from_csv, file_stem_for, page_of};
use chouse_registry::{DetailOutcome, Registry, fetch_all, fetch_all_details};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_results: usize,
}

/// A detail lookup that failed, with the registry's reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLookup {
    pub company_number: String,
    pub error: String,
}

/// One page of fully detailed, normalised companies.
///
/// Lookups that failed are listed in `failed` rather than dropped.
#[derive(Debug, Clone, Serialize)]
pub struct DetailedPage {
    pub data: Vec<NormalizedRecord>,
    pub failed: Vec<FailedLookup>,
    pub pagination: Pagination,
}

/// Every summary matching a query.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryList {
    pub total: usize,
    pub items: Vec<SummaryRecord>,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub file: ExportedFile,
    pub matched: usize,
    pub exported: usize,
    /// Left out of the file.
    pub failed: Vec<FailedLookup>,
}

#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<dyn Registry>,
    config: PipelineConfig,
    today: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(registry: Arc<dyn Registry>, config: PipelineConfig) -> Self {
        Self {
            registry,
            config,
            today: None,
        }
    }

    /// Pin the date used for overdue checks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// One search page with every hit's detail record fetched and normalised.
    pub async fn search_page(&self, query: &str, page: usize) -> Result<DetailedPage, ApiError> {
        let query = required_query(query)?;
        if page == 0 {
            return Err(ApiError::InvalidPage(page.to_string()));
        }

        let result = self.registry.search(query, page).await?;
        if result.is_empty() {
            return Err(ApiError::NoMatches {
                query: query.to_string(),
            });
        }

        let total_results = result
            .total_results
            .map_or(result.items.len(), |n| n as usize);
        let total_pages = total_results.div_ceil(result.page_size.max(1));
        let identifiers = company_numbers(result.items);
        let (data, failed) = self.detailed(&identifiers).await?;

        Ok(DetailedPage {
            data,
            failed,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_results,
            },
        })
    }

    /// Every summary for `query`, walking pages up to the configured cap.
    pub async fn search_all(&self, query: &str) -> Result<SummaryList, ApiError> {
        let query = required_query(query)?;
        let items = fetch_all(self.registry.as_ref(), query, self.config.max_pages).await?;
        Ok(SummaryList {
            total: items.len(),
            items,
        })
    }

    pub async fn company(&self, number: &str) -> Result<NormalizedRecord, ApiError> {
        let number = normalize_company_number(number);
        if number.is_empty() {
            return Err(ApiError::MissingCompanyNumber);
        }
        match self.registry.fetch_detail(&number).await {
            Ok(detail) => Ok(normalize(&detail, self.today())),
            Err(e) if e.is_not_found() => Err(ApiError::CompanyNotFound {
                company_number: number,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Collect every match for `query`, fetch and normalise each, keep those
    /// carrying `sic_code` when one is given, and write the export file.
    ///
    /// Failed detail lookups are left out of the file.
    pub async fn export(
        &self,
        query: &str,
        format: ExportFormat,
        sic_code: Option<&str>,
    ) -> Result<ExportReport, ApiError> {
        let query = required_query(query)?;
        let summaries = fetch_all(self.registry.as_ref(), query, self.config.max_pages).await?;
        if summaries.is_empty() {
            return Err(ApiError::NoMatches {
                query: query.to_string(),
            });
        }

        let identifiers = company_numbers(summaries);
        let (mut records, failed) = self.detailed(&identifiers).await?;
        if !failed.is_empty() {
            warn!(
                query,
                failed = failed.len(),
                "skipping companies whose details could not be fetched"
            );
        }

        if let Some(code) = sic_code.map(str::trim).filter(|c| !c.is_empty()) {
            records.retain(|r| r.has_sic_code(code));
            info!(query, sic_code = code, kept = records.len(), "filtered by SIC code");
        }
        if records.is_empty() {
            return Err(ApiError::NothingToExport);
        }

        let exported = records.len();
        let job = ExportJob::new(records, format, &file_stem_for(query));
        let dir = self.config.output_dir.clone();
        let file = tokio::task::spawn_blocking(move || job.write_to(&dir))
            .await
            .map_err(|e| ApiError::Internal(format!("export task failed: {e}")))??;

        Ok(ExportReport {
            file,
            matched: identifiers.len(),
            exported,
            failed,
        })
    }

    /// Detailed records for the `page`-th slice of the company numbers in an
    /// uploaded CSV document.
    pub async fn import(&self, csv: &[u8], page: usize) -> Result<DetailedPage, ApiError> {
        if page == 0 {
            return Err(ApiError::InvalidPage(page.to_string()));
        }
        let numbers = company_numbers_from_csv(csv)?;
        if numbers.is_empty() {
            return Err(ApiError::NoCompanyNumbers);
        }

        let (slice, total_pages) = page_of(&numbers, page, self.config.page_size);
        let (data, failed) = self.detailed(slice).await?;
        Ok(DetailedPage {
            data,
            failed,
            pagination: Pagination {
                current_page: page,
                total_pages,
                total_results: numbers.len(),
            },
        })
    }

    /// Normalised records for the lookups that succeeded and the lookups
    /// that failed, both in input order.
    ///
    /// When every lookup fails the registry is treated as unavailable.
    async fn detailed(
        &self,
        identifiers: &[String],
    ) -> Result<(Vec<NormalizedRecord>, Vec<FailedLookup>), ApiError> {
        let outcomes =
            fetch_all_details(self.registry.as_ref(), identifiers, self.config.workers).await;
        let today = self.today();
        let mut records = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        for DetailOutcome { identifier, result } in outcomes {
            match result {
                Ok(detail) => records.push(normalize(&detail, today)),
                Err(e) => failed.push(FailedLookup {
                    company_number: identifier,
                    error: e.to_string(),
                }),
            }
        }

        if records.is_empty() && !failed.is_empty() {
            return Err(ApiError::LookupsFailed { failed });
        }
        Ok((records, failed))
    }
}

/// Hits without a company number have no detail record to fetch.
fn company_numbers(summaries: Vec<SummaryRecord>) -> Vec<String> {
    summaries
        .into_iter()
        .map(|s| s.identifier)
        .filter(|id| !id.is_empty())
        .collect()
}

fn required_query(query: &str) -> Result<&str, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        Err(ApiError::MissingQuery)
    } else {
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chouse_registry::fake::FakeRegistry;

    fn pipeline(registry: FakeRegistry, out: &std::path::Path) -> (Pipeline, Arc<FakeRegistry>) {
        let registry = Arc::new(registry);
        let config = PipelineConfig {
            output_dir: out.to_path_buf(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(registry.clone(), config)
            .with_today(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
        (pipeline, registry)
    }

    fn csv_rows(bytes: &[u8]) -> usize {
        String::from_utf8(bytes.to_vec()).unwrap().lines().count() - 1
    }

    #[tokio::test]
    async fn ukpa_export_walks_two_pages() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, registry) = pipeline(FakeRegistry::with_companies(25, 20), dir.path());

        let report = pipeline.export("UKPA", ExportFormat::Csv, None).await.unwrap();
        assert_eq!(registry.search_calls(), 2);
        assert_eq!(registry.detail_calls(), 25);
        assert_eq!(report.matched, 25);
        assert_eq!(report.exported, 25);
        assert_eq!(csv_rows(&report.file.bytes), 25);
        assert_eq!(report.file.file_name, "exported_companies_ukpa.csv");
        assert!(report.file.path.starts_with(dir.path()));
    }

    #[tokio::test]
    async fn failed_lookup_is_skipped_in_export() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FakeRegistry::with_companies(10, 20).fail_detail("00000003");
        let (pipeline, _) = pipeline(registry, dir.path());

        let report = pipeline.export("acme", ExportFormat::Csv, None).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].company_number, "00000003");
        assert_eq!(report.exported, 9);
        assert_eq!(csv_rows(&report.file.bytes), 9);
        let text = String::from_utf8(report.file.bytes).unwrap();
        assert!(!text.contains("00000003"));
    }

    #[tokio::test]
    async fn search_page_lists_failed_lookups_beside_data() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FakeRegistry::with_companies(5, 20).fail_detail("00000002");
        let (pipeline, _) = pipeline(registry, dir.path());

        let page = pipeline.search_page("acme", 1).await.unwrap();
        assert_eq!(page.data.len(), 4);
        assert_eq!(page.failed.len(), 1);
        assert_eq!(page.failed[0].company_number, "00000002");
        assert!(!page.failed[0].error.is_empty());
        assert_eq!(page.pagination.total_results, 5);
    }

    #[tokio::test]
    async fn every_lookup_failing_is_an_upstream_error() {
        let dir = tempfile::tempdir().unwrap();
        let registry = FakeRegistry::with_companies(3, 20)
            .fail_detail("00000000")
            .fail_detail("00000001")
            .fail_detail("00000002");
        let (pipeline, _) = pipeline(registry, dir.path());

        let err = pipeline.search_page("acme", 1).await.unwrap_err();
        let ApiError::LookupsFailed { failed } = err else {
            panic!("expected LookupsFailed, got {err:?}");
        };
        let numbers: Vec<_> = failed.iter().map(|f| f.company_number.as_str()).collect();
        assert_eq!(numbers, ["00000000", "00000001", "00000002"]);

        let err = pipeline.import(b"company_number\n0\n1\n", 1).await.unwrap_err();
        assert!(matches!(err, ApiError::LookupsFailed { failed } if failed.len() == 2));

        let err = pipeline.export("acme", ExportFormat::Csv, None).await.unwrap_err();
        assert!(matches!(err, ApiError::LookupsFailed { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn export_filters_by_sic_code() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(10, 20), dir.path());

        let report = pipeline.export("acme", ExportFormat::Xlsx, Some("62020")).await.unwrap();
        assert_eq!(report.exported, 5);
        assert_eq!(report.file.file_name, "exported_companies_acme.xlsx");

        let err = pipeline.export("acme", ExportFormat::Csv, Some("01110")).await.unwrap_err();
        assert!(matches!(err, ApiError::NothingToExport));
    }

    #[tokio::test]
    async fn export_with_no_matches_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(0, 20), dir.path());
        let err = pipeline.export("nothing", ExportFormat::Csv, None).await.unwrap_err();
        assert!(matches!(err, ApiError::NoMatches { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn search_page_reports_pagination() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(45, 20), dir.path());

        let page = pipeline.search_page("acme", 3).await.unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].company_number, "00000040");
        assert_eq!(
            page.pagination,
            Pagination {
                current_page: 3,
                total_pages: 3,
                total_results: 45,
            }
        );
    }

    #[tokio::test]
    async fn search_page_without_total_uses_item_count() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::endless(20), dir.path());
        let page = pipeline.search_page("acme", 1).await.unwrap();
        assert_eq!(page.pagination.total_results, 20);
        assert_eq!(page.pagination.total_pages, 1);
    }

    #[tokio::test]
    async fn search_rejects_blank_query_and_page_zero() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, registry) = pipeline(FakeRegistry::with_companies(5, 20), dir.path());
        assert!(matches!(pipeline.search_page("  ", 1).await, Err(ApiError::MissingQuery)));
        assert!(matches!(pipeline.search_page("acme", 0).await, Err(ApiError::InvalidPage(_))));
        assert_eq!(registry.search_calls(), 0);
    }

    #[tokio::test]
    async fn search_all_collects_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(45, 20), dir.path());
        let all = pipeline.search_all("acme").await.unwrap();
        assert_eq!(all.total, 45);
        assert_eq!(all.items.len(), 45);
    }

    #[tokio::test]
    async fn company_lookup_normalises_number() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(10, 20), dir.path());

        let record = pipeline.company(" 7 ").await.unwrap();
        assert_eq!(record.company_number, "00000007");
        assert_eq!(record.company_status, "active");

        let err = pipeline.company("99999999").await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::CompanyNotFound { company_number } if company_number == "99999999"
        ));
    }

    #[tokio::test]
    async fn import_pages_uploaded_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, registry) = pipeline(FakeRegistry::with_companies(30, 20), dir.path());
        let csv: String = std::iter::once("company_number".to_string())
            .chain((0..25).map(|i| i.to_string()))
            .collect::<Vec<_>>()
            .join("\n");

        let page = pipeline.import(csv.as_bytes(), 2).await.unwrap();
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].company_number, "00000020");
        assert_eq!(page.pagination.total_pages, 2);
        assert_eq!(page.pagination.total_results, 25);
        assert_eq!(registry.detail_calls(), 5);
    }

    #[tokio::test]
    async fn import_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (pipeline, _) = pipeline(FakeRegistry::with_companies(5, 20), dir.path());

        let missing = pipeline.import(b"name\nAcme\n", 1).await.unwrap_err();
        assert!(matches!(missing, ApiError::BadUpload(_)));

        let empty = pipeline.import(b"company_number\n\n", 1).await.unwrap_err();
        assert!(matches!(empty, ApiError::NoCompanyNumbers));
    }
}
