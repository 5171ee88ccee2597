//! Export Routes
//!
//! - GET /api/v1/404/export - Export matching events as CSV or JSON

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{ExportFormat, ExportRow};
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::blocking;
use crate::api::state::AppState;
use crate::query::ListParams;
use crate::store::MissEvent;

const CSV_HEADER: [&str; 6] = ["id", "url", "referrer", "user_agent", "ip", "created_at"];

/// GET /api/v1/404/export
///
/// `format=csv|json` (default csv) plus the same `filterBy[key]` entries
/// the list endpoint takes. Events come out oldest id first.
pub async fn export_misses(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Response> {
    if !state.config.enable_export {
        return Err(ApiError::Validation(
            "Export feature is disabled".to_string(),
        ));
    }

    let mut format = ExportFormat::Csv;
    let mut rest = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if key == "format" {
            format = ExportFormat::parse(&value).ok_or_else(|| {
                ApiError::Validation(format!("Unsupported export format: {}", value))
            })?;
        } else {
            rest.push((key, value));
        }
    }

    let predicate = ListParams::from_query_pairs(rest)?.filter.predicate();
    let store = Arc::clone(&state.store);
    let events = blocking(move || Ok(store.export(&predicate)?)).await?;

    tracing::info!(events = events.len(), format = format.extension(), "Exporting misses");

    let body = match format {
        ExportFormat::Csv => format_csv(&events)?,
        ExportFormat::Json => serde_json::to_vec_pretty(&events)
            .map_err(|e| ApiError::Internal(format!("JSON encoding failed: {}", e)))?,
    };

    let disposition = format!(
        "attachment; filename=\"misslog_export_{}.{}\"",
        Utc::now().format("%Y%m%d_%H%M%S"),
        format.extension()
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type()),
            (header::CONTENT_DISPOSITION, disposition.as_str()),
        ],
        Body::from(body),
    )
        .into_response())
}

/// Format as CSV, header row included even when empty
fn format_csv(events: &[MissEvent]) -> ApiResult<Vec<u8>> {
    let csv_error = |e: csv::Error| ApiError::Internal(format!("CSV encoding failed: {}", e));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER).map_err(csv_error)?;
    for event in events {
        writer.serialize(ExportRow::from(event)).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| ApiError::Internal(format!("CSV encoding failed: {}", e)))
}
