//! Read company numbers from an uploaded CSV document.

use chouse_core::normalize_company_number;
use csv::{ReaderBuilder, Trim};
use tracing::debug;

use crate::ExportError;

pub const COMPANY_NUMBER_COLUMN: &str = "company_number";

/// Company numbers from the `company_number` column, normalised, in file order.
///
/// The header match ignores case and surrounding whitespace. Blank cells are
/// skipped; duplicates are kept.
pub fn company_numbers_from_csv(data: &[u8]) -> Result<Vec<String>, ExportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(data);

    let column = reader
        .headers()?
        .iter()
        .position(|h| {
            h.trim_start_matches('\u{feff}')
                .trim()
                .eq_ignore_ascii_case(COMPANY_NUMBER_COLUMN)
        })
        .ok_or_else(|| ExportError::MissingColumn(COMPANY_NUMBER_COLUMN.to_string()))?;

    let mut numbers = Vec::new();
    for row in reader.records() {
        let row = row?;
        if let Some(cell) = row.get(column)
            && !cell.is_empty()
        {
            numbers.push(normalize_company_number(cell));
        }
    }
    debug!(count = numbers.len(), "company numbers imported");
    Ok(numbers)
}

/// The `page`-th slice of `items` (1-based) and the total page count.
///
/// Pages past the end are empty.
pub fn page_of<T>(items: &[T], page: usize, page_size: usize) -> (&[T], usize) {
    let page_size = page_size.max(1);
    let total_pages = items.len().div_ceil(page_size);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = start.saturating_add(page_size).min(items.len());
    (&items[start..end], total_pages)
}
