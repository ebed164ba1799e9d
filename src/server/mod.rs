//! HTTP API for the vegetable catalog and daily stock.
//!
//! # Endpoints
//!
//! - `GET /health`: Health check, including the server's current date
//! - `POST|GET /vegetables`, `GET|PUT|DELETE /vegetables/{id}`
//! - `POST|GET /daily-stock`, `GET|PUT|DELETE /daily-stock/{date}`
//! - `DELETE /daily-stock/{date}/vegetable/{vegetable_id}`
//!
//! Every failure is answered with `{"error": "<message>"}`.

mod daily_stock;
mod error;
mod vegetables;

pub use error::ApiError;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::dates::{format_stock_date, Clock, LocalClock};
use crate::db::{StockRepository, VegetableRepository};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub vegetables: VegetableRepository,
    pub stock: StockRepository,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            vegetables: VegetableRepository::new(pool.clone()),
            stock: StockRepository::new(pool),
            clock: Arc::new(LocalClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }
}

/// `{id, message}` reply to a write.
#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub id: String,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}

/// Health check response; `today` is the date used when a write omits one.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    today: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        today: format_stock_date(state.clock.today()),
    })
}

async fn not_found() -> ApiError {
    ApiError::not_found("Endpoint not found")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    ApiError::Internal(detail).into_response()
}

/// Builds the full API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/vegetables",
            get(vegetables::list_vegetables).post(vegetables::create_vegetable),
        )
        .route(
            "/vegetables/{id}",
            get(vegetables::get_vegetable)
                .put(vegetables::update_vegetable)
                .delete(vegetables::delete_vegetable),
        )
        .route(
            "/daily-stock",
            get(daily_stock::list_daily_stock).post(daily_stock::create_daily_stock),
        )
        .route(
            "/daily-stock/{date}",
            get(daily_stock::get_daily_stock)
                .put(daily_stock::replace_daily_stock)
                .delete(daily_stock::delete_daily_stock),
        )
        .route(
            "/daily-stock/{date}/vegetable/{vegetable_id}",
            delete(daily_stock::remove_stock_entry),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}
