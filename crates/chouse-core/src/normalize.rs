//! Flattening of raw company profiles into [`NormalizedRecord`]s.
//!
//! The registry omits whole sub-objects (`accounts`, `confirmation_statement`,
//! `registered_office_address`, ...) for dormant, dissolved or newly
//! incorporated companies. Each sub-object degrades to its own default
//! independently so one gap never loses the rest of the record.

use chrono::NaiveDate;
use serde_json::Value;

use crate::record::{
    DetailRecord, FilingSchedule, NOT_AVAILABLE, NormalizedRecord, PreviousName, SicEntry,
};

/// At most this many SIC codes are kept per company.
pub const MAX_SIC_CODES: usize = 4;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Normalise a company profile, judging overdue filings against `today`.
pub fn normalize(detail: &DetailRecord, today: NaiveDate) -> NormalizedRecord {
    NormalizedRecord {
        company_name: text_or_na(detail.get("company_name")),
        company_number: text_or_na(detail.get("company_number")),
        registered_office_address: text_or_na(
            detail
                .get("registered_office_address")
                .and_then(|a| a.get("address_line_1")),
        ),
        company_type: text_or_na(detail.get("type")),
        company_status: text_or_na(detail.get("company_status")),
        incorporated_date: text_or_na(detail.get("date_of_creation")),
        accounts: detail
            .get("accounts")
            .map(|a| accounts_schedule(a, today))
            .unwrap_or_default(),
        confirmation_statement: detail
            .get("confirmation_statement")
            .map(|c| confirmation_schedule(c, today))
            .unwrap_or_default(),
        nature_of_business: sic_entries(detail.get("sic_codes")),
        previous_names: previous_names(detail.get("previous_names")),
    }
}

/// `true` when `today` is strictly after `due`.
///
/// Returns `None` if `due` is not a `YYYY-MM-DD` date.
pub fn is_overdue(due: &str, today: NaiveDate) -> Option<bool> {
    NaiveDate::parse_from_str(due.trim(), DATE_FORMAT)
        .ok()
        .map(|due| today > due)
}

fn accounts_schedule(accounts: &Value, today: NaiveDate) -> FilingSchedule {
    let next_accounts = accounts.get("next_accounts");
    let next_statement = text(accounts.get("next_made_up_to"))
        .or_else(|| text(next_accounts.and_then(|n| n.get("period_end_on"))));
    let due = text(accounts.get("next_due"))
        .or_else(|| text(next_accounts.and_then(|n| n.get("due_on"))));
    let last = accounts.get("last_accounts").and_then(|l| match l {
        Value::Object(_) => text(l.get("made_up_to")),
        other => text(Some(other)),
    });
    schedule(next_statement, due, last, today)
}

fn confirmation_schedule(confirmation: &Value, today: NaiveDate) -> FilingSchedule {
    schedule(
        text(confirmation.get("next_made_up_to")),
        text(confirmation.get("next_due")),
        text(confirmation.get("last_made_up_to")),
        today,
    )
}

fn schedule(
    next_statement: Option<String>,
    due: Option<String>,
    last: Option<String>,
    today: NaiveDate,
) -> FilingSchedule {
    let overdue = match due.as_deref().and_then(|d| is_overdue(d, today)) {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => NOT_AVAILABLE.to_string(),
    };
    FilingSchedule {
        next_statement_date: next_statement.unwrap_or_else(na),
        due_date: due.unwrap_or_else(na),
        last_statement_date: last.unwrap_or_else(na),
        overdue,
    }
}

fn sic_entries(codes: Option<&Value>) -> Vec<SicEntry> {
    let entries: Vec<SicEntry> = codes
        .and_then(Value::as_array)
        .map(|codes| {
            codes
                .iter()
                .filter_map(|c| text(Some(c)))
                .take(MAX_SIC_CODES)
                .map(|sic_code| SicEntry {
                    sic_code,
                    description: NOT_AVAILABLE.into(),
                })
                .collect()
        })
        .unwrap_or_default();

    if entries.is_empty() {
        vec![SicEntry::placeholder()]
    } else {
        entries
    }
}

fn previous_names(names: Option<&Value>) -> Vec<PreviousName> {
    let Some(names) = names.and_then(Value::as_array) else {
        return Vec::new();
    };
    names
        .iter()
        .filter(|n| n.is_object())
        .map(|n| PreviousName {
            name: text(n.get("name"))
                .or_else(|| text(n.get("company_name")))
                .unwrap_or_else(na),
            start_date: text(n.get("effective_from"))
                .or_else(|| text(n.get("start_date")))
                .unwrap_or_else(na),
            end_date: text(n.get("ceased_on"))
                .or_else(|| text(n.get("end_date")))
                .unwrap_or_else(na),
        })
        .collect()
}

/// Scalar JSON value as text; blank strings, nulls and containers are absent.
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_or_na(value: Option<&Value>) -> String {
    text(value).unwrap_or_else(na)
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}
