use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::ingest::{self, IngestReport, Upload};
use crate::model::Category;
use crate::query::QueryEngine;
use crate::server::AppState;
use crate::Error;

/// Longest accepted query parameter, in characters
pub const MAX_PARAM_CHARS: usize = 256;

#[derive(Deserialize)]
pub struct CreateCategoryParams {
    pub category_name: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct UploadParams {
    pub category_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SumParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Deserialize)]
pub struct RegionParams {
    pub search_term: Option<String>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SumResponse {
    pub sum: f64,
}

#[derive(Serialize)]
pub struct RegionsResponse {
    pub regions: Vec<String>,
}

/// Handler failure, rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    Core(Error),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Core(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Core(err) if err.is_client_error() => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Core(err @ Error::PoolTimeout(_)) => {
                tracing::warn!("{}", err);
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ApiError::Core(err) => {
                tracing::error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Internal(message) => {
                tracing::error!("Request failed: {}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Check a required query parameter: present and 1..=256 characters.
pub fn bounded(field: &str, value: Option<String>) -> Result<String, Error> {
    match value {
        Some(v) if (1..=MAX_PARAM_CHARS).contains(&v.chars().count()) => Ok(v),
        Some(_) => Err(Error::Validation(format!(
            "{} must be between 1 and {} characters",
            field, MAX_PARAM_CHARS
        ))),
        None => Err(Error::Validation(format!("{} is required", field))),
    }
}

/// Run blocking store work on a pooled connection off the async runtime.
async fn with_connection<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        work(&mut *conn)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("worker task failed: {}", e)))?
    .map_err(ApiError::from)
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CreateCategoryParams>,
) -> Result<Json<Category>, ApiError> {
    let name = bounded("category_name", params.category_name)?;
    let region = bounded("region", params.region)?;
    let kind = bounded("type", params.kind)?;

    let category = with_connection(&state, move |conn| {
        ingest::create_category(conn, &name, &region, &kind)
    })
    .await?;

    Ok(Json(category))
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestReport>, ApiError> {
    let category_name = bounded("category_name", params.category_name)?;
    let mut multipart = multipart.map_err(|e| Error::Validation(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let contents = field
            .bytes()
            .await
            .map_err(|e| Error::Validation(e.body_text()))?;

        upload = Some(Upload {
            category_name,
            filename,
            content_type,
            contents: contents.to_vec(),
        });
        break;
    }

    let upload = upload.ok_or_else(|| Error::Validation("file is required".to_string()))?;
    tracing::debug!(
        "Upload {:?} ({} bytes) for category {:?}",
        upload.filename,
        upload.contents.len(),
        upload.category_name
    );

    let report = with_connection(&state, move |conn| ingest::ingest(conn, &upload)).await?;
    Ok(Json(report))
}

pub async fn sum_type(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SumParams>,
) -> Result<Json<SumResponse>, ApiError> {
    let kind = bounded("type", params.kind)?;
    let sum = with_connection(&state, move |conn| QueryEngine::new(conn).sum_by_type(&kind)).await?;
    Ok(Json(SumResponse { sum }))
}

pub async fn find_regions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RegionParams>,
) -> Result<Json<RegionsResponse>, ApiError> {
    let term = bounded("search_term", params.search_term)?;
    let regions =
        with_connection(&state, move |conn| QueryEngine::new(conn).find_regions(&term)).await?;
    Ok(Json(RegionsResponse { regions }))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    with_connection(&state, |conn| {
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    })
    .await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_params() {
        assert_eq!(bounded("type", Some("retail".into())).unwrap(), "retail");
        assert!(bounded("type", Some(String::new())).is_err());
        assert!(bounded("type", None).is_err());
        assert!(bounded("type", Some("é".repeat(256))).is_ok());
        let err = bounded("type", Some("x".repeat(257))).unwrap_err();
        assert_eq!(err.to_string(), "type must be between 1 and 256 characters");
    }

    #[test]
    fn test_error_status_codes() {
        let status = |err: ApiError| err.into_response().status();
        assert_eq!(status(Error::EmptyFile.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::CategoryNotFound("Ghost".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(Error::PoolTimeout(std::time::Duration::from_secs(1)).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(Error::Storage(rusqlite::Error::InvalidQuery).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
