//! Miss Log Routes
//!
//! - GET /api/v1/404 - List, flat or grouped
//! - POST /api/v1/404 - Delete by group values or by filter
//! - POST /api/v1/bulk/404/delete - Delete by ids and group values
//! - DELETE /api/v1/404/:id - Delete one event
//! - POST /api/v1/404/log - Record a miss

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use std::sync::Arc;

use crate::api::dto::ListResponse;
use crate::api::error::{ApiError, ApiResult};
use crate::api::routes::blocking;
use crate::api::state::AppState;
use crate::bulk::{
    parse_group_values, parse_items, BulkDeleteCoordinator, BulkError, BulkResult, DeleteScope,
};
use crate::query::{ListParams, ListResult};
use crate::store::{MissEvent, NewMissEvent};

const MAX_URL_LEN: usize = 2048;
const MAX_HEADER_LEN: usize = 1024;

/// GET /api/v1/404
///
/// Query string: `groupBy`, `orderby`, `direction`, `per_page`, `page`,
/// `filterBy[key]`.
pub async fn list_misses(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ApiResult<Json<ListResponse>> {
    let params = ListParams::from_query_pairs(pairs)?;
    run_and_list(&state, params, |coordinator, view| coordinator.list(view)).await
}

/// POST /api/v1/404
///
/// With `items`, an array whose every entry is a group value, each whole
/// group is removed. Without, everything matching `filterBy` is removed, and an
/// absent filter removes the whole log. The refreshed view starts from
/// page 1; after a filter delete it also drops the filter.
pub async fn delete_misses(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ListResponse>> {
    let params = ListParams::from_value(&body)?;
    let view = params.clone().first_page();

    match body.get("items").filter(|items| !items.is_null()) {
        Some(items) => {
            let values = parse_group_values(items)?;
            run_and_list(&state, view, move |coordinator, view| {
                coordinator.delete_groups(&values, view)
            })
            .await
        }
        None => {
            let scope = DeleteScope::from_filter(params.filter);
            run_and_list(&state, view.without_filter(), move |coordinator, view| {
                coordinator.delete_by_filter(&scope, view)
            })
            .await
        }
    }
}

/// POST /api/v1/bulk/404/delete
///
/// `items` is an array or a comma-separated string of ids and group
/// values. The refreshed view keeps the caller's page and filter.
pub async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> ApiResult<Json<ListResponse>> {
    let params = ListParams::from_value(&body)?;

    let items = match body.get("items") {
        Some(items) if !items.is_null() => parse_items(items)?,
        _ => {
            return Err(BulkError::InvalidItemList("items is required".to_string()).into());
        }
    };

    run_and_list(&state, params, move |coordinator, view| {
        coordinator.delete_by_items(&items, view)
    })
    .await
}

/// DELETE /api/v1/404/:id
///
/// Idempotent: a missing id still answers 204.
pub async fn delete_miss(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let coordinator = state.coordinator.clone();
    blocking(move || Ok(coordinator.delete_by_id(id)?)).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/404/log
///
/// Record one miss event.
pub async fn record_miss(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewMissEvent>,
) -> ApiResult<(StatusCode, Json<MissEvent>)> {
    validate_record_request(&req)?;

    let store = Arc::clone(&state.store);
    let event = blocking(move || Ok(store.insert(req)?)).await?;

    tracing::debug!(id = event.id, url = %event.url, "Recorded miss");

    Ok((StatusCode::CREATED, Json(event)))
}

/// Run `op` on the blocking pool and wrap its result with the paging the
/// planner applied to `view`
async fn run_and_list<F>(state: &AppState, view: ListParams, op: F) -> ApiResult<Json<ListResponse>>
where
    F: FnOnce(&BulkDeleteCoordinator, &ListParams) -> BulkResult<ListResult> + Send + 'static,
{
    let page = state.planner.plan(&view).page();
    let group_by = view.group_by;
    let coordinator = state.coordinator.clone();

    let result = blocking(move || Ok(op(&coordinator, &view)?)).await?;

    Ok(Json(ListResponse::new(result, page, group_by)))
}

fn validate_record_request(req: &NewMissEvent) -> ApiResult<()> {
    if req.url.trim().is_empty() {
        return Err(ApiError::Validation("url cannot be empty".to_string()));
    }

    if req.url.len() > MAX_URL_LEN {
        return Err(ApiError::Validation(format!(
            "url exceeds maximum length of {} characters",
            MAX_URL_LEN
        )));
    }

    let headers = [
        ("referrer", req.referrer.as_deref()),
        ("user_agent", req.user_agent.as_deref()),
    ];
    for (name, value) in headers {
        if value.is_some_and(|v| v.len() > MAX_HEADER_LEN) {
            return Err(ApiError::Validation(format!(
                "{} exceeds maximum length of {} characters",
                name, MAX_HEADER_LEN
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_request_valid() {
        let req = NewMissEvent::new("/old").referrer("https://example.com/");
        assert!(validate_record_request(&req).is_ok());
    }

    #[test]
    fn test_validate_record_request_empty_url() {
        assert!(validate_record_request(&NewMissEvent::new("  ")).is_err());
    }

    #[test]
    fn test_validate_record_request_long_agent() {
        let req = NewMissEvent::new("/old").user_agent("x".repeat(MAX_HEADER_LEN + 1));
        assert!(validate_record_request(&req).is_err());
    }
}
