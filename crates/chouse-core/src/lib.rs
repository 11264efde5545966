pub mod company_number;
pub mod config;
pub mod normalize;
pub mod record;
pub mod schema;

pub use company_number::normalize_company_number;
pub use config::{ExportFormat, PipelineConfig, UnknownFormat};
pub use normalize::normalize;
pub use record::{
    DetailRecord, FilingSchedule, NOT_AVAILABLE, NormalizedRecord, PreviousName, SearchResultPage,
    SicEntry, SummaryRecord,
};
pub use schema::export;
