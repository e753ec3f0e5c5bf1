//! Prices API routes
//!
//! This module wires the import command and export query to Axum HTTP
//! handlers.
//!
//! # Route Structure
//!
//! - `POST /api/v1/prices?type=zip|tar` - Import an archive of price records
//! - `GET /api/v1/prices?start=&end=&min=&max=` - Export stored records as a zip
//!
//! The import endpoint accepts either a raw archive body or a
//! `multipart/form-data` upload carrying the archive in a file field.

use axum::{
    extract::{FromRequest, Multipart, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::api::response::ErrorResponse;
use crate::features::FeatureState;
use crate::ingest::archive::UnknownArchiveKind;
use crate::ingest::ArchiveKind;

use super::{
    commands::{self, ImportPricesCommand, ImportPricesError},
    queries::{self, ExportPricesError, ExportPricesQuery},
    types::{ExportFilters, ExportParams, FilterError},
};

// ============================================================================
// Router Configuration
// ============================================================================

/// Creates the prices router with all routes configured
pub fn prices_routes() -> Router<FeatureState> {
    Router::new().route("/", post(import_prices).get(export_prices))
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Query parameters accepted by the import endpoint
#[derive(Debug, Clone, Default, Deserialize)]
struct ImportParams {
    /// Container format of the uploaded archive. Absent or empty means zip.
    #[serde(rename = "type")]
    archive_type: Option<String>,
}

/// Import an archive of price records
///
/// # Endpoint
///
/// `POST /api/v1/prices?type=zip|tar`
///
/// # Response
///
/// - `200 OK` - Import counters as JSON
/// - `400 Bad Request` - Unknown archive type, unreadable archive, or bad CSV schema
/// - `500 Internal Server Error` - Database error
#[tracing::instrument(skip(state, request), fields(archive_type = ?params.archive_type))]
async fn import_prices(
    State(state): State<FeatureState>,
    Query(params): Query<ImportParams>,
    request: Request,
) -> Result<Response, PricesApiError> {
    let kind = ArchiveKind::from_param(params.archive_type.as_deref())?;
    let data = read_upload(state.max_upload_bytes, request).await?;

    let command = ImportPricesCommand { kind, data };
    let result = commands::import::handle(state.db, command).await?;

    tracing::info!(
        total = result.total_count,
        inserted = result.total_items,
        duplicates = result.duplicates_count,
        "Prices imported via API"
    );

    Ok((StatusCode::OK, Json(result)).into_response())
}

/// Read the uploaded archive bytes from either a multipart form or the raw
/// request body, bounded by the configured upload limit.
async fn read_upload(max_bytes: usize, request: Request) -> Result<Vec<u8>, UploadError> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"));

    let data = if is_multipart {
        read_multipart_upload(request).await?
    } else {
        axum::body::to_bytes(request.into_body(), max_bytes)
            .await
            .map_err(|_| UploadError::TooLarge(max_bytes))?
            .to_vec()
    };

    if data.is_empty() {
        return Err(UploadError::Empty);
    }
    if data.len() > max_bytes {
        return Err(UploadError::TooLarge(max_bytes));
    }

    Ok(data)
}

/// Pick the archive out of a multipart form: the field named `file` wins,
/// otherwise the first field carrying a filename.
async fn read_multipart_upload(request: Request) -> Result<Vec<u8>, UploadError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?;

    let mut fallback: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| UploadError::Multipart(e.to_string()))?
    {
        let is_file_field = field.name() == Some("file");
        let has_filename = field.file_name().is_some();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| UploadError::Multipart(e.to_string()))?
            .to_vec();

        if is_file_field {
            return Ok(bytes);
        }
        if has_filename && fallback.is_none() {
            fallback = Some(bytes);
        }
    }

    fallback.ok_or(UploadError::NoFilePart)
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// Export stored price records as a zip archive
///
/// # Endpoint
///
/// `GET /api/v1/prices?start=2024-01-01&end=2024-12-31&min=5&max=100`
///
/// # Query Parameters
///
/// - `start` - Inclusive lower date bound (YYYY-MM-DD)
/// - `end` - Inclusive upper date bound (YYYY-MM-DD)
/// - `min` - Inclusive lower price bound in whole units (> 0)
/// - `max` - Inclusive upper price bound in whole units (> 0)
///
/// # Response
///
/// - `200 OK` - `application/zip` body with a single `data.csv` entry
/// - `400 Bad Request` - Malformed or inconsistent filters
/// - `500 Internal Server Error` - Database or packaging error
#[tracing::instrument(skip(state), fields(start = ?params.start, end = ?params.end))]
async fn export_prices(
    State(state): State<FeatureState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, PricesApiError> {
    let filters = ExportFilters::try_from(params)?;

    let zip_bytes = queries::export::handle(state.db, ExportPricesQuery { filters }).await?;

    tracing::debug!(bytes = zip_bytes.len(), "Prices exported via API");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"data.zip\"",
            ),
        ],
        zip_bytes,
    )
        .into_response())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Failures while reading the uploaded archive body
#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("empty upload body")]
    Empty,

    #[error("upload exceeds the {0} byte limit")]
    TooLarge(usize),

    #[error("multipart form contains no file part")]
    NoFilePart,

    #[error("malformed multipart body: {0}")]
    Multipart(String),
}

/// Unified error type for prices API endpoints
#[derive(Debug, thiserror::Error)]
enum PricesApiError {
    #[error(transparent)]
    Kind(#[from] UnknownArchiveKind),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Import(#[from] ImportPricesError),

    #[error(transparent)]
    Export(#[from] ExportPricesError),
}

impl IntoResponse for PricesApiError {
    fn into_response(self) -> Response {
        match self {
            PricesApiError::Kind(_) | PricesApiError::Filter(_) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PricesApiError::Upload(_) => {
                let error = ErrorResponse::new("UPLOAD_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PricesApiError::Import(ImportPricesError::Archive(_))
            | PricesApiError::Import(ImportPricesError::Csv(_)) => {
                let error = ErrorResponse::new("IMPORT_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PricesApiError::Import(ImportPricesError::Database(_)) => {
                tracing::error!("Database error during price import: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            PricesApiError::Export(ExportPricesError::Filter(_)) => {
                let error = ErrorResponse::new("VALIDATION_ERROR", self.to_string());
                (StatusCode::BAD_REQUEST, Json(error)).into_response()
            },
            PricesApiError::Export(ExportPricesError::Database(_)) => {
                tracing::error!("Database error during price export: {}", self);
                let error = ErrorResponse::new("INTERNAL_ERROR", "A database error occurred");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
            PricesApiError::Export(_) => {
                tracing::error!("Packaging error during price export: {}", self);
                let error = ErrorResponse::new("EXPORT_ERROR", "Failed to package export archive");
                (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
            },
        }
    }
}
