//! HTTP surface: JSON routes over the engine plus live change feeds.

pub mod dto;
mod error;
mod events;
mod parking;
mod reservations;
mod rooms;

pub use error::{ApiError, ApiResult};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;
use tracing::Level;

use crate::engine::Engine;
use crate::observability::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS, route_label};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

/// `Json` whose rejection uses the API error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

/// `Query` whose rejection uses the API error body.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(Self(value))
    }
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let route = route_label(req.uri().path());
    let method = req.method().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    metrics::counter!(
        HTTP_REQUESTS_TOTAL,
        "route" => route.clone(),
        "method" => method,
        "status" => response.status().as_u16().to_string()
    )
    .increment(1);
    metrics::histogram!(HTTP_REQUEST_DURATION_SECONDS, "route" => route)
        .record(started.elapsed().as_secs_f64());
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "nextsus" }))
}

/// Every route. Long-lived event streams are exempt from the request timeout.
pub fn router(engine: Arc<Engine>, request_timeout: Duration) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/rooms", get(rooms::list).post(rooms::create))
        .route(
            "/api/rooms/:id",
            get(rooms::show).put(rooms::update).delete(rooms::remove),
        )
        .route("/api/rooms/:id/availability", get(rooms::availability))
        .route("/api/bookings", get(reservations::list_bookings).post(reservations::create_booking))
        .route(
            "/api/bookings/:id",
            get(reservations::show_booking)
                .put(reservations::update_booking)
                .delete(reservations::cancel_booking),
        )
        .route("/api/bookings/room/:room_id", get(reservations::room_schedule))
        .route("/api/parking", get(parking::list).post(parking::create))
        .route("/api/parking/stats", get(parking::stats))
        .route("/api/parking/:id", get(parking::show).delete(parking::remove))
        .route("/api/parking/:id/occupy", post(parking::occupy))
        .route("/api/parking/:id/release", post(parking::release))
        .route("/api/parking/:id/actions", post(parking::action))
        .route("/api/canteen/orders", get(reservations::list_orders).post(reservations::place_order))
        .route("/api/canteen/orders/:id/cancel", patch(reservations::cancel_order))
        .route("/api/library/borrows", get(reservations::list_borrows).post(reservations::borrow_book))
        .route("/api/library/borrows/:id/return", patch(reservations::return_book))
        .route(
            "/api/faculty/consults",
            get(reservations::list_consults).post(reservations::book_consultation),
        )
        .route("/api/faculty/consults/:id/cancel", patch(reservations::cancel_consult))
        .route(
            "/api/health/appointments",
            get(reservations::list_appointments).post(reservations::book_appointment),
        )
        .route("/api/health/appointments/:id/cancel", patch(reservations::cancel_appointment))
        .route("/api/reservations", get(reservations::list_all))
        .route("/api/reservations/:id", get(reservations::show))
        .route("/api/reservations/:id/transition", patch(reservations::transition))
        .route("/api/schedule", get(reservations::schedule))
        .layer(TimeoutLayer::new(request_timeout));

    let feeds = Router::new()
        .route("/api/rooms/:id/events", get(events::room_feed))
        .route("/api/parking/events", get(events::parking_feed));

    api.merge(feeds)
        .layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine })
}
