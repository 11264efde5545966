//! Vertical card display for company records.
//!
//! Renders each row of the export table as a grouped, human-readable card,
//! leaving out cells that hold the `N/A` sentinel.

use std::fmt::Write;

use arrow::array::{Array, StringArray};
use arrow::record_batch::RecordBatch;
use chouse_core::export::*;
use chouse_core::{NOT_AVAILABLE, NormalizedRecord, SummaryRecord};
use chouse_server::FailedLookup;

// ── Schema section groupings ──

const IDENTITY: &[&str] = &[
    COMPANY_NUMBER,
    COMPANY_TYPE,
    COMPANY_STATUS,
    INCORPORATED_DATE,
    REGISTERED_OFFICE_ADDRESS,
];

const ACCOUNTS: &[&str] = &[
    ACCOUNTS_NEXT_STATEMENT_DATE,
    ACCOUNTS_DUE_DATE,
    ACCOUNTS_LAST_STATEMENT_DATE,
    ACCOUNTS_OVERDUE,
];

const CONFIRMATION: &[&str] = &[
    CONFIRMATION_NEXT_STATEMENT_DATE,
    CONFIRMATION_DUE_DATE,
    CONFIRMATION_LAST_STATEMENT_DATE,
    CONFIRMATION_OVERDUE,
];

const ACTIVITY: &[&str] = &[NATURE_OF_BUSINESS, PREVIOUS_COMPANY_NAMES];

// ── Public API ──

/// Render every record as a card, separated by blank lines.
pub fn render_cards(records: &[NormalizedRecord]) -> anyhow::Result<String> {
    if records.is_empty() {
        return Ok(String::new());
    }
    let batch = chouse_export::to_record_batch(records)?;
    let mut out = String::new();
    for row in 0..batch.num_rows() {
        render_card(&batch, row, &mut out)?;
    }
    Ok(out)
}

/// One `number  name` line per summary.
pub fn render_summaries(items: &[SummaryRecord]) -> String {
    let mut out = String::new();
    for item in items {
        let _ = writeln!(out, "{:<10} {}", item.identifier, item.display_name);
    }
    out
}

/// One `number  error` line per lookup that failed; nothing when none did.
pub fn render_failed(failed: &[FailedLookup]) -> String {
    let mut out = String::new();
    for lookup in failed {
        let _ = writeln!(out, "failed {:<10} {}", lookup.company_number, lookup.error);
    }
    out
}

// ── Card rendering ──

fn render_card(batch: &RecordBatch, row: usize, out: &mut String) -> anyhow::Result<()> {
    let name = cell(batch, COMPANY_NAME, row).unwrap_or(NOT_AVAILABLE);
    writeln!(out, "=== {name} ===")?;
    render_section(batch, row, "Company", IDENTITY, out)?;
    render_section(batch, row, "Accounts", ACCOUNTS, out)?;
    render_section(batch, row, "Confirmation Statement", CONFIRMATION, out)?;
    render_section(batch, row, "Activity", ACTIVITY, out)?;
    writeln!(out)?;
    Ok(())
}

fn render_section(
    batch: &RecordBatch,
    row: usize,
    header: &str,
    cols: &[&str],
    out: &mut String,
) -> std::fmt::Result {
    let present: Vec<(&str, &str)> = cols
        .iter()
        .filter_map(|&col| cell(batch, col, row).map(|v| (col, v)))
        .filter(|(_, v)| *v != NOT_AVAILABLE)
        .collect();
    if present.is_empty() {
        return Ok(());
    }

    writeln!(out, "{header}")?;
    for (col, value) in present {
        writeln!(out, "  {col:<34} {value}")?;
    }
    Ok(())
}

fn cell<'a>(batch: &'a RecordBatch, col: &str, row: usize) -> Option<&'a str> {
    let idx = batch.schema_ref().index_of(col).ok()?;
    let arr = batch.column(idx).as_any().downcast_ref::<StringArray>()?;
    (row < arr.len() && !arr.is_null(row)).then(|| arr.value(row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chouse_core::normalize;
    use chrono::NaiveDate;
    use serde_json::json;

    fn record() -> NormalizedRecord {
        normalize(
            &json!({
                "company_name": "UKPA LIMITED",
                "company_number": "01234567",
                "company_status": "active",
                "accounts": { "next_due": "2026-01-31" },
                "sic_codes": ["62020"]
            }),
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        )
    }

    #[test]
    fn card_groups_sections_and_skips_placeholders() {
        let card = render_cards(&[record()]).unwrap();
        assert!(card.starts_with("=== UKPA LIMITED ===\n"));
        assert!(card.contains("Company\n"));
        assert!(card.contains("Accounts Overdue"));
        assert!(card.contains("Yes"));
        assert!(card.contains("62020: N/A"));
        assert!(
            !card.contains("Confirmation Statement\n"),
            "all-N/A section omitted"
        );
        assert!(!card.contains("Incorporated Date"));
    }

    #[test]
    fn no_records_renders_nothing() {
        assert_eq!(render_cards(&[]).unwrap(), "");
    }

    #[test]
    fn summaries_one_per_line() {
        let items = vec![
            SummaryRecord {
                identifier: "00000001".into(),
                display_name: "ONE LTD".into(),
            },
            SummaryRecord {
                identifier: "SC012345".into(),
                display_name: "TWO LTD".into(),
            },
        ];
        let out = render_summaries(&items);
        assert_eq!(out.lines().count(), 2);
        assert!(out.starts_with("00000001   ONE LTD"));
    }

    #[test]
    fn failed_lookups_name_number_and_reason() {
        assert_eq!(render_failed(&[]), "");
        let out = render_failed(&[FailedLookup {
            company_number: "00000003".into(),
            error: "registry returned 500: internal error".into(),
        }]);
        assert_eq!(
            out,
            "failed 00000003   registry returned 500: internal error\n"
        );
    }
}
