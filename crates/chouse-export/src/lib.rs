//! Tabular export of normalised company records, and company-number import.

mod error;
pub use error::ExportError;

pub mod import;
pub mod table;
pub mod writer;

pub use import::{company_numbers_from_csv, page_of};
pub use table::to_record_batch;
pub use writer::{ExportJob, ExportedFile, export, file_stem_for};
