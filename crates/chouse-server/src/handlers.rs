use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chouse_core::{ExportFormat, NormalizedRecord};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::ApiError;
use crate::pipeline::{DetailedPage, Pipeline, SummaryList};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub query: String,
    pub file_type: Option<String>,
    pub sic_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ImportParams {
    pub page: Option<String>,
}

/// Missing or blank means page 1.
fn parse_page(raw: Option<&str>) -> Result<usize, ApiError> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(1),
        Some(p) => match p.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(ApiError::InvalidPage(p.to_string())),
        },
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn search(
    State(pipeline): State<Pipeline>,
    Query(params): Query<SearchParams>,
) -> Result<Json<DetailedPage>, ApiError> {
    let page = parse_page(params.page.as_deref())?;
    Ok(Json(pipeline.search_page(&params.query, page).await?))
}

pub async fn search_all(
    State(pipeline): State<Pipeline>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SummaryList>, ApiError> {
    Ok(Json(pipeline.search_all(&params.query).await?))
}

pub async fn company(
    State(pipeline): State<Pipeline>,
    Path(number): Path<String>,
) -> Result<Json<NormalizedRecord>, ApiError> {
    Ok(Json(pipeline.company(&number).await?))
}

pub async fn export(
    State(pipeline): State<Pipeline>,
    Query(params): Query<ExportParams>,
) -> Result<Response, ApiError> {
    let format: ExportFormat = params.file_type.as_deref().unwrap_or_default().parse()?;
    let report = pipeline
        .export(&params.query, format, params.sic_code.as_deref())
        .await?;

    let disposition = format!("attachment; filename=\"{}\"", report.file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.file.bytes,
    )
        .into_response())
}

pub async fn import(
    State(pipeline): State<Pipeline>,
    Query(params): Query<ImportParams>,
    body: Bytes,
) -> Result<Json<DetailedPage>, ApiError> {
    let page = parse_page(params.page.as_deref())?;
    Ok(Json(pipeline.import(&body, page).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_parsing() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some(" ")).unwrap(), 1);
        assert_eq!(parse_page(Some(" 4 ")).unwrap(), 4);
        assert!(matches!(parse_page(Some("0")), Err(ApiError::InvalidPage(p)) if p == "0"));
        assert!(matches!(parse_page(Some("two")), Err(ApiError::InvalidPage(_))));
    }
}
