use axum::extract::{Path, State};
use axum::Json;

use crate::model::Requester;

use super::dto::*;
use super::{ApiJson, ApiQuery, ApiResult, AppState};

pub async fn list(State(state): State<AppState>, ApiQuery(q): ApiQuery<RoomQuery>) -> Json<Vec<RoomView>> {
    let rooms = state.engine.list_rooms(&q.into()).await;
    Json(rooms.into_iter().map(Into::into).collect())
}

pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<RoomView>> {
    let room = state.engine.get_room(parse_id(&id)?).await?;
    Ok(Json(room.into()))
}

pub async fn create(
    State(state): State<AppState>,
    actor: Requester,
    ApiJson(body): ApiJson<CreateRoomBody>,
) -> ApiResult<Json<RoomView>> {
    let room = state.engine.create_room(&actor, body.into()).await?;
    Ok(Json(room.into()))
}

pub async fn update(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateRoomBody>,
) -> ApiResult<Json<RoomView>> {
    let room = state.engine.update_room(&actor, parse_id(&id)?, body.into()).await?;
    Ok(Json(room.into()))
}

pub async fn remove(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let id = parse_id(&id)?;
    state.engine.delete_room(&actor, id).await?;
    Ok(Json(serde_json::json!({ "message": "Room deleted" })))
}

pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiQuery(q): ApiQuery<AvailabilityQuery>,
) -> ApiResult<Json<AvailabilityView>> {
    let room_id = parse_id(&id)?;
    let free = state
        .engine
        .room_availability(room_id, q.date, q.min_minutes)
        .await?;
    Ok(Json(AvailabilityView {
        room_id,
        date: q.date,
        free: free.into_iter().map(Into::into).collect(),
    }))
}
