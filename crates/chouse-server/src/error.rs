use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chouse_core::UnknownFormat;
use chouse_export::ExportError;
use chouse_registry::RegistryError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::pipeline::FailedLookup;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("search term is required")]
    MissingQuery,

    #[error("invalid page {0:?} (pages start at 1)")]
    InvalidPage(String),

    #[error(transparent)]
    InvalidFormat(#[from] UnknownFormat),

    #[error("company number is required")]
    MissingCompanyNumber,

    #[error("invalid upload: {0}")]
    BadUpload(String),

    #[error("no companies found matching {query:?}")]
    NoMatches { query: String },

    #[error("company {company_number} not found")]
    CompanyNotFound { company_number: String },

    #[error("no companies found to export")]
    NothingToExport,

    #[error("no company numbers found in upload")]
    NoCompanyNumbers,

    #[error("registry request failed: {0}")]
    Upstream(RegistryError),

    #[error("all {} company lookups failed", .failed.len())]
    LookupsFailed { failed: Vec<FailedLookup> },

    #[error("export failed: {0}")]
    Export(ExportError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuery
            | ApiError::InvalidPage(_)
            | ApiError::InvalidFormat(_)
            | ApiError::MissingCompanyNumber
            | ApiError::BadUpload(_) => StatusCode::BAD_REQUEST,
            ApiError::NoMatches { .. }
            | ApiError::CompanyNotFound { .. }
            | ApiError::NothingToExport
            | ApiError::NoCompanyNumbers => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::LookupsFailed { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Export(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn company_number(&self) -> Option<&str> {
        match self {
            ApiError::CompanyNotFound { company_number } => Some(company_number),
            _ => None,
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidPage(page) => ApiError::InvalidPage(page.to_string()),
            RegistryError::EmptyIdentifier => ApiError::MissingCompanyNumber,
            other => ApiError::Upstream(other),
        }
    }
}

impl From<ExportError> for ApiError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::NothingToExport => ApiError::NothingToExport,
            ExportError::MissingColumn(_) | ExportError::Csv(_) => {
                ApiError::BadUpload(err.to_string())
            }
            other => ApiError::Export(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "request rejected");
        }

        let mut body = json!({ "error": self.to_string() });
        if let Some(number) = self.company_number() {
            body["company_number"] = number.into();
        }
        if let ApiError::LookupsFailed { failed } = &self {
            body["failed"] = json!(failed);
        }
        (status, Json(body)).into_response()
    }
}
