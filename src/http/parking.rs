use axum::extract::{Path, State};
use axum::Json;

use crate::model::{ParkingStats, Requester};

use super::dto::*;
use super::{ApiJson, ApiQuery, ApiResult, AppState};

pub async fn list(State(state): State<AppState>, ApiQuery(q): ApiQuery<SpotQuery>) -> Json<Vec<SpotView>> {
    let spots = state.engine.list_spots(&q.into()).await;
    Json(spots.into_iter().map(Into::into).collect())
}

pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<SpotView>> {
    Ok(Json(state.engine.get_spot(parse_id(&id)?).await?.into()))
}

pub async fn stats(State(state): State<AppState>) -> Json<ParkingStats> {
    Json(state.engine.parking_stats().await)
}

pub async fn create(
    State(state): State<AppState>,
    actor: Requester,
    ApiJson(body): ApiJson<CreateSpotBody>,
) -> ApiResult<Json<SpotView>> {
    let spot = state.engine.create_spot(&actor, body.into()).await?;
    Ok(Json(spot.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.engine.delete_spot(&actor, parse_id(&id)?).await?;
    Ok(Json(serde_json::json!({ "message": "Parking spot deleted" })))
}

pub async fn occupy(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
) -> ApiResult<Json<SpotView>> {
    Ok(Json(state.engine.occupy_spot(&actor, parse_id(&id)?).await?.into()))
}

pub async fn release(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
) -> ApiResult<Json<SpotView>> {
    Ok(Json(state.engine.release_spot(&actor, parse_id(&id)?).await?.into()))
}

/// Administrative moves: reserve, begin-maintenance, end-maintenance.
pub async fn action(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ActionBody>,
) -> ApiResult<Json<SpotView>> {
    let spot = state
        .engine
        .spot_action(&actor, parse_id(&id)?, body.action)
        .await?;
    Ok(Json(spot.into()))
}
