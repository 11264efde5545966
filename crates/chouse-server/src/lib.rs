//! The company search and export pipeline, and the HTTP API over it.

mod error;
pub use error::ApiError;

pub mod handlers;
pub mod pipeline;
pub mod router;

pub use pipeline::{DetailedPage, ExportReport, FailedLookup, Pagination, Pipeline, SummaryList};
pub use router::build_router;
