//! Daily stock routes, keyed by `YYYY-MM-DD` date.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiError, AppState, MessageResponse, WriteResponse};
use crate::dates::{format_stock_date, parse_stock_date, DateParam};
use crate::db::{RemoveOutcome, ReplaceOutcome, UpsertOutcome};
use crate::models::{DailyStock, VegetableId};
use crate::validation::{validate_stock_entries, StockPayload};

const NOT_FOUND_FOR_DATE: &str = "Daily stock not found for this date";

fn parse_date(raw: &str) -> Result<chrono::NaiveDate, ApiError> {
    parse_stock_date(raw).ok_or_else(ApiError::invalid_date)
}

/// `POST /daily-stock`: merge-or-create for `date` (default today).
pub async fn create_daily_stock(
    State(state): State<AppState>,
    payload: Result<Json<StockPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<WriteResponse>), ApiError> {
    let Json(payload) = payload?;
    let date = match payload.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => state.clock.today(),
    };
    let entries = validate_stock_entries(payload.vegetables.as_ref(), &state.vegetables).await?;

    let (_, outcome) = state
        .stock
        .merge(date, entries)
        .await
        .map_err(ApiError::stock("creating or updating daily stock"))?;

    let message = match outcome {
        UpsertOutcome::Created => "Daily stock created",
        UpsertOutcome::Merged => "Vegetables merged or appended to daily stock",
    };
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            id: format_stock_date(date),
            message,
        }),
    ))
}

pub async fn list_daily_stock(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyStock>>, ApiError> {
    let stocks = state
        .stock
        .list()
        .await
        .map_err(ApiError::store("fetching daily stocks"))?;
    Ok(Json(stocks))
}

/// `GET /daily-stock/{date}`, where `date` may be `previous-day`.
pub async fn get_daily_stock(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailyStock>, ApiError> {
    let param =
        DateParam::resolve(&date, &*state.clock).ok_or_else(ApiError::invalid_date)?;
    tracing::debug!("Fetching daily stock for {}", param.date());

    let stock = state
        .stock
        .get(param.date())
        .await
        .map_err(ApiError::store("fetching daily stock"))?;

    match (stock, param) {
        (Some(stock), _) => Ok(Json(stock)),
        (None, DateParam::PreviousDay(_)) => {
            Err(ApiError::not_found("Daily stock not found for previous day"))
        }
        (None, DateParam::Explicit(d)) => Err(ApiError::not_found(format!(
            "Daily stock not found for {}",
            format_stock_date(d)
        ))),
    }
}

/// `PUT /daily-stock/{date}`: full replace, creating the record if needed.
pub async fn replace_daily_stock(
    State(state): State<AppState>,
    Path(date): Path<String>,
    payload: Result<Json<StockPayload>, JsonRejection>,
) -> Result<Json<WriteResponse>, ApiError> {
    let date = parse_date(&date)?;
    let Json(payload) = payload?;
    let entries = validate_stock_entries(payload.vegetables.as_ref(), &state.vegetables).await?;

    let (_, outcome) = state
        .stock
        .replace(date, entries)
        .await
        .map_err(ApiError::stock("updating daily stock"))?;

    let message = match outcome {
        ReplaceOutcome::Created => "Daily stock created",
        ReplaceOutcome::Replaced => "Daily stock updated",
    };
    Ok(Json(WriteResponse {
        id: format_stock_date(date),
        message,
    }))
}

pub async fn delete_daily_stock(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let date = parse_date(&date)?;
    let deleted = state
        .stock
        .delete(date)
        .await
        .map_err(ApiError::store("deleting daily stock"))?;

    if !deleted {
        return Err(ApiError::not_found(NOT_FOUND_FOR_DATE));
    }
    Ok(Json(MessageResponse::new("Daily stock deleted")))
}

/// `DELETE /daily-stock/{date}/vegetable/{vegetable_id}`
pub async fn remove_stock_entry(
    State(state): State<AppState>,
    Path((date, vegetable_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let date = parse_date(&date)?;
    let id: VegetableId = vegetable_id.parse().map_err(|_| {
        ApiError::bad_request(
            "Invalid vegetable ID format: Must be a 24-character hexadecimal string",
        )
    })?;

    let outcome = state
        .stock
        .remove_entry(date, &id)
        .await
        .map_err(ApiError::stock("removing vegetable from daily stock"))?;

    match outcome {
        RemoveOutcome::Removed => Ok(Json(MessageResponse::new(
            "Vegetable removed from daily stock",
        ))),
        RemoveOutcome::RecordNotFound => Err(ApiError::not_found(NOT_FOUND_FOR_DATE)),
        RemoveOutcome::EntryNotFound => {
            Err(ApiError::not_found("Vegetable not found in daily stock"))
        }
    }
}
