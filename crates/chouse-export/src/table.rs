//! Flatten normalised records into the Arrow export table.

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::record_batch::RecordBatch;
use chouse_core::export::{self, COLUMNS};
use chouse_core::{NOT_AVAILABLE, NormalizedRecord};

use crate::ExportError;

/// One record as cells in [`COLUMNS`] order.
pub fn row_cells(record: &NormalizedRecord) -> [String; 16] {
    let previous = record.previous_names_display();
    [
        record.company_name.clone(),
        record.company_number.clone(),
        record.registered_office_address.clone(),
        record.company_type.clone(),
        record.company_status.clone(),
        record.incorporated_date.clone(),
        record.accounts.next_statement_date.clone(),
        record.accounts.due_date.clone(),
        record.accounts.last_statement_date.clone(),
        record.accounts.overdue.clone(),
        record.confirmation_statement.next_statement_date.clone(),
        record.confirmation_statement.due_date.clone(),
        record.confirmation_statement.last_statement_date.clone(),
        record.confirmation_statement.overdue.clone(),
        record.nature_of_business_display(),
        if previous.is_empty() {
            NOT_AVAILABLE.to_string()
        } else {
            previous
        },
    ]
}

/// Build a single [`RecordBatch`] with one row per record.
///
/// Returns [`ExportError::NothingToExport`] for an empty slice so no
/// header-only file is ever produced.
pub fn to_record_batch(records: &[NormalizedRecord]) -> Result<RecordBatch, ExportError> {
    if records.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let rows: Vec<[String; 16]> = records.iter().map(row_cells).collect();
    let columns: Vec<ArrayRef> = (0..COLUMNS.len())
        .map(|c| {
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r[c].as_str()))) as ArrayRef
        })
        .collect();

    let batch = RecordBatch::try_new(Arc::new(export::company_schema()), columns)?;
    Ok(batch)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chouse_core::{PreviousName, normalize};
    use chrono::NaiveDate;
    use serde_json::json;

    pub(crate) fn sample(n: usize) -> Vec<NormalizedRecord> {
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        (0..n)
            .map(|i| {
                normalize(
                    &json!({
                        "company_name": format!("UKPA {i} LIMITED"),
                        "company_number": format!("{i:08}"),
                        "company_status": "active",
                        "type": "ltd",
                        "date_of_creation": "2015-03-02",
                        "registered_office_address": {
                            "address_line_1": format!("{i} Mill Lane, Leeds")
                        },
                        "accounts": {
                            "next_due": "2020-01-01",
                            "next_made_up_to": "2019-03-31"
                        },
                        "sic_codes": ["62020", "70229"]
                    }),
                    today,
                )
            })
            .collect()
    }

    #[test]
    fn empty_slice_is_nothing_to_export() {
        assert!(matches!(to_record_batch(&[]), Err(ExportError::NothingToExport)));
    }

    #[test]
    fn one_row_per_record_in_schema_order() {
        let batch = to_record_batch(&sample(3)).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 16);
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, COLUMNS);

        let numbers = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(numbers.value(2), "00000002");
    }

    #[test]
    fn multi_valued_fields_collapse_into_one_cell() {
        let mut record = sample(1).remove(0);
        record.previous_names = vec![PreviousName {
            name: "OLD NAME LTD".into(),
            start_date: "2001-01-01".into(),
            end_date: "2015-03-01".into(),
        }];
        let cells = row_cells(&record);
        assert_eq!(cells[9], "Yes");
        assert_eq!(cells[14], "62020: N/A, 70229: N/A");
        assert_eq!(cells[15], "OLD NAME LTD (Start: 2001-01-01, End: 2015-03-01)");
    }

    #[test]
    fn no_previous_names_is_not_available() {
        let cells = row_cells(&sample(1)[0]);
        assert_eq!(cells[15], "N/A");
    }
}
