/// Arrow schema for the flat company export table.
pub mod export {
    use arrow::datatypes::{DataType, Field, Schema};

    pub const COMPANY_NAME: &str = "Company Name";
    pub const COMPANY_NUMBER: &str = "Company Number";
    pub const REGISTERED_OFFICE_ADDRESS: &str = "Registered Office Address";
    pub const COMPANY_TYPE: &str = "Company Type";
    pub const COMPANY_STATUS: &str = "Company Status";
    pub const INCORPORATED_DATE: &str = "Incorporated Date";
    pub const ACCOUNTS_NEXT_STATEMENT_DATE: &str = "Accounts Next Statement Date";
    pub const ACCOUNTS_DUE_DATE: &str = "Accounts Due Date";
    pub const ACCOUNTS_LAST_STATEMENT_DATE: &str = "Accounts Last Statement Date";
    pub const ACCOUNTS_OVERDUE: &str = "Accounts Overdue";
    pub const CONFIRMATION_NEXT_STATEMENT_DATE: &str = "Confirmation Next Statement Date";
    pub const CONFIRMATION_DUE_DATE: &str = "Confirmation Due Date";
    pub const CONFIRMATION_LAST_STATEMENT_DATE: &str = "Confirmation Last Statement Date";
    pub const CONFIRMATION_OVERDUE: &str = "Confirmation Overdue";
    pub const NATURE_OF_BUSINESS: &str = "Nature of Business";
    pub const PREVIOUS_COMPANY_NAMES: &str = "Previous Company Names";

    /// Column order of every exported table.
    pub const COLUMNS: [&str; 16] = [
        COMPANY_NAME,
        COMPANY_NUMBER,
        REGISTERED_OFFICE_ADDRESS,
        COMPANY_TYPE,
        COMPANY_STATUS,
        INCORPORATED_DATE,
        ACCOUNTS_NEXT_STATEMENT_DATE,
        ACCOUNTS_DUE_DATE,
        ACCOUNTS_LAST_STATEMENT_DATE,
        ACCOUNTS_OVERDUE,
        CONFIRMATION_NEXT_STATEMENT_DATE,
        CONFIRMATION_DUE_DATE,
        CONFIRMATION_LAST_STATEMENT_DATE,
        CONFIRMATION_OVERDUE,
        NATURE_OF_BUSINESS,
        PREVIOUS_COMPANY_NAMES,
    ];

    /// Every column is a non-null string; absent values hold the `N/A` sentinel.
    pub fn company_schema() -> Schema {
        Schema::new(
            COLUMNS
                .iter()
                .map(|name| Field::new(*name, DataType::Utf8, false))
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::export;

    #[test]
    fn company_schema_has_expected_fields() {
        let schema = export::company_schema();
        assert_eq!(schema.fields().len(), 16);
        assert!(schema.field_with_name("Company Number").is_ok());
        assert!(schema.field_with_name("Nature of Business").is_ok());
        assert_eq!(schema.field(0).name(), export::COMPANY_NAME);
        assert_eq!(schema.field(15).name(), export::PREVIOUS_COMPANY_NAMES);
    }

    #[test]
    fn company_schema_is_non_nullable() {
        let schema = export::company_schema();
        assert!(schema.fields().iter().all(|f| !f.is_nullable()));
    }
}
