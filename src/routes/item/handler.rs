use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{AppState, error::AppError, middleware::CallerId, utils::success_to_api_response};

use super::model::CreateItemRequest;

// 匿名调用方共享的所有者
const ANONYMOUS_OWNER: &str = "anonymous";

fn owner_of(caller: &Option<CallerId>) -> &str {
    caller
        .as_ref()
        .map(|c| c.0.as_str())
        .unwrap_or(ANONYMOUS_OWNER)
}

pub async fn list_items(
    State(state): State<AppState>,
    caller: Option<CallerId>,
) -> impl IntoResponse {
    let items = state.items.list(owner_of(&caller)).await;
    success_to_api_response(items)
}

pub async fn get_item(
    State(state): State<AppState>,
    caller: Option<CallerId>,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .items
        .find(owner_of(&caller), &item_id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(item))
}

pub async fn create_item(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Json(req): Json<CreateItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }

    let item = state.items.create(&owner_id, req).await;
    Ok((StatusCode::CREATED, success_to_api_response(item)))
}

pub async fn delete_item(
    State(state): State<AppState>,
    CallerId(owner_id): CallerId,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let item = state
        .items
        .remove(&owner_id, &item_id)
        .await
        .ok_or(AppError::NotFound)?;
    Ok(success_to_api_response(item))
}
