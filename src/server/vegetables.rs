//! Catalog routes: `/vegetables` and `/vegetables/{id}`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiError, AppState, MessageResponse, WriteResponse};
use crate::models::{Vegetable, VegetableId};
use crate::validation::VegetablePayload;

const INVALID_ID: &str = "Invalid ID format: Must be a 24-character hexadecimal string";
const NOT_FOUND: &str = "Vegetable not found";

fn parse_id(raw: &str) -> Result<VegetableId, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request(INVALID_ID))
}

pub async fn create_vegetable(
    State(state): State<AppState>,
    payload: Result<Json<VegetablePayload>, JsonRejection>,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    let Json(payload) = payload?;
    let draft = payload.validate()?;

    let created = state
        .vegetables
        .create(&draft)
        .await
        .map_err(ApiError::store("creating vegetable"))?;

    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            id: created.id.to_string(),
            message: "Vegetable created",
        }),
    ))
}

pub async fn list_vegetables(
    State(state): State<AppState>,
) -> Result<Json<Vec<Vegetable>>, ApiError> {
    let vegetables = state
        .vegetables
        .list()
        .await
        .map_err(ApiError::store("fetching vegetables"))?;
    tracing::debug!("Listing {} vegetable(s)", vegetables.len());
    Ok(Json(vegetables))
}

pub async fn get_vegetable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vegetable>, ApiError> {
    let id = parse_id(&id)?;
    state
        .vegetables
        .get_by_id(&id)
        .await
        .map_err(ApiError::store("fetching vegetable"))?
        .map(Json)
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))
}

pub async fn update_vegetable(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<VegetablePayload>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    let draft = payload.validate()?;

    state
        .vegetables
        .update(&id, &draft)
        .await
        .map_err(ApiError::store("updating vegetable"))?
        .ok_or_else(|| ApiError::not_found(NOT_FOUND))?;

    Ok(Json(MessageResponse::new("Vegetable updated")))
}

pub async fn delete_vegetable(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = parse_id(&id)?;
    let deleted = state
        .vegetables
        .delete(&id)
        .await
        .map_err(ApiError::store("deleting vegetable"))?;

    if !deleted {
        return Err(ApiError::not_found(NOT_FOUND));
    }
    Ok(Json(MessageResponse::new("Vegetable deleted")))
}
