//! Record types flowing through the search → detail → export pipeline.

use serde::{Deserialize, Serialize};

/// Sentinel written in place of any value the registry did not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Raw company profile as returned by `GET /company/{number}`.
///
/// Field presence is not guaranteed; the normaliser reads it defensively.
pub type DetailRecord = serde_json::Value;

/// A minimal search hit: company number plus display title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub identifier: String,
    pub display_name: String,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultPage {
    pub items: Vec<SummaryRecord>,
    /// Total matches reported by the registry, when it reports one.
    pub total_results: Option<u64>,
    /// Page size the request was made with.
    pub page_size: usize,
}

impl SearchResultPage {
    /// A short page means the registry has nothing further.
    pub fn is_last_page(&self) -> bool {
        self.items.len() < self.page_size
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Filing schedule for either annual accounts or the confirmation statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingSchedule {
    pub next_statement_date: String,
    pub due_date: String,
    pub last_statement_date: String,
    /// `"Yes"`, `"No"`, or [`NOT_AVAILABLE`] when no due date is known.
    pub overdue: String,
}

impl Default for FilingSchedule {
    fn default() -> Self {
        Self {
            next_statement_date: NOT_AVAILABLE.into(),
            due_date: NOT_AVAILABLE.into(),
            last_statement_date: NOT_AVAILABLE.into(),
            overdue: NOT_AVAILABLE.into(),
        }
    }
}

/// A Standard Industrial Classification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SicEntry {
    pub sic_code: String,
    pub description: String,
}

impl SicEntry {
    /// The single row emitted when a company lists no SIC codes.
    pub fn placeholder() -> Self {
        Self {
            sic_code: NOT_AVAILABLE.into(),
            description: NOT_AVAILABLE.into(),
        }
    }
}

/// A name the company was previously registered under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousName {
    pub name: String,
    pub start_date: String,
    pub end_date: String,
}

/// Fixed-shape company record used for JSON responses and tabular export.
///
/// Every field is always present; missing upstream values hold [`NOT_AVAILABLE`].
/// `nature_of_business` always has at least one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub company_name: String,
    pub company_number: String,
    pub registered_office_address: String,
    pub company_type: String,
    pub company_status: String,
    pub incorporated_date: String,
    pub accounts: FilingSchedule,
    pub confirmation_statement: FilingSchedule,
    pub nature_of_business: Vec<SicEntry>,
    pub previous_names: Vec<PreviousName>,
}

impl NormalizedRecord {
    /// True when any SIC entry carries exactly `code`.
    pub fn has_sic_code(&self, code: &str) -> bool {
        let code = code.trim();
        self.nature_of_business.iter().any(|e| e.sic_code == code)
    }

    /// SIC entries collapsed into one display cell: `"code: description, ..."`.
    pub fn nature_of_business_display(&self) -> String {
        self.nature_of_business
            .iter()
            .map(|e| format!("{}: {}", e.sic_code, e.description))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Previous names collapsed into one display cell.
    pub fn previous_names_display(&self) -> String {
        self.previous_names
            .iter()
            .map(|p| format!("{} (Start: {}, End: {})", p.name, p.start_date, p.end_date))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
