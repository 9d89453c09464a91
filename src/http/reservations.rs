use axum::extract::{Path, State};
use axum::Json;

use crate::engine::{Action, EngineError};
use crate::model::*;

use super::dto::*;
use super::{ApiJson, ApiQuery, ApiResult, AppState};

type One = ApiResult<Json<ReservationView>>;
type Many = Json<Vec<ReservationView>>;

async fn list_domain(state: &AppState, actor: &Requester, domain: Domain) -> Many {
    Json(reservation_views(
        state.engine.list_reservations(actor, Some(domain)).await,
    ))
}

async fn apply(state: &AppState, actor: &Requester, id: &str, domain: Option<Domain>, action: Action) -> One {
    let id = parse_id(id)?;
    let r = state.engine.transition(actor, id, domain, action).await?;
    Ok(Json(r.into()))
}

fn created(r: Reservation) -> One {
    Ok(Json(r.into()))
}

// ── Room bookings ────────────────────────────────────────────────

pub async fn list_bookings(State(state): State<AppState>, actor: Requester) -> Many {
    list_domain(&state, &actor, Domain::Room).await
}

pub async fn create_booking(
    State(state): State<AppState>,
    actor: Requester,
    ApiJson(body): ApiJson<CreateBookingBody>,
) -> One {
    let req = body.into_request()?;
    created(state.engine.book_room(&actor, req).await?)
}

pub async fn show_booking(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    let id = parse_id(&id)?;
    let r = state.engine.get_reservation(&actor, id).await?;
    if r.domain() != Domain::Room {
        return Err(EngineError::NotFound(id).into());
    }
    Ok(Json(r.into()))
}

pub async fn update_booking(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UpdateBookingBody>,
) -> One {
    let r = state
        .engine
        .update_booking(&actor, parse_id(&id)?, body.try_into()?)
        .await?;
    Ok(Json(r.into()))
}

pub async fn cancel_booking(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    apply(&state, &actor, &id, Some(Domain::Room), Action::Cancel).await
}

pub async fn room_schedule(
    State(state): State<AppState>,
    _actor: Requester,
    Path(room_id): Path<String>,
    ApiQuery(q): ApiQuery<DateQuery>,
) -> ApiResult<Many> {
    let list = state.engine.room_schedule(parse_id(&room_id)?, q.date).await?;
    Ok(Json(reservation_views(list)))
}

// ── Canteen ──────────────────────────────────────────────────────

pub async fn list_orders(State(state): State<AppState>, actor: Requester) -> Many {
    list_domain(&state, &actor, Domain::Canteen).await
}

pub async fn place_order(State(state): State<AppState>, actor: Requester, ApiJson(body): ApiJson<OrderBody>) -> One {
    let req = OrderRequest::try_from(body)?;
    created(state.engine.place_order(&actor, req).await?)
}

pub async fn cancel_order(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    apply(&state, &actor, &id, Some(Domain::Canteen), Action::Cancel).await
}

// ── Library ──────────────────────────────────────────────────────

pub async fn list_borrows(State(state): State<AppState>, actor: Requester) -> Many {
    list_domain(&state, &actor, Domain::Library).await
}

pub async fn borrow_book(State(state): State<AppState>, actor: Requester, ApiJson(body): ApiJson<BorrowBody>) -> One {
    created(state.engine.borrow_book(&actor, body.into()).await?)
}

pub async fn return_book(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    apply(&state, &actor, &id, Some(Domain::Library), Action::Return).await
}

// ── Faculty ──────────────────────────────────────────────────────

pub async fn list_consults(State(state): State<AppState>, actor: Requester) -> Many {
    list_domain(&state, &actor, Domain::Faculty).await
}

pub async fn book_consultation(
    State(state): State<AppState>,
    actor: Requester,
    ApiJson(body): ApiJson<ConsultBody>,
) -> One {
    let req = ConsultRequest::try_from(body)?;
    created(state.engine.book_consultation(&actor, req).await?)
}

pub async fn cancel_consult(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    apply(&state, &actor, &id, Some(Domain::Faculty), Action::Cancel).await
}

// ── Health ───────────────────────────────────────────────────────

pub async fn list_appointments(State(state): State<AppState>, actor: Requester) -> Many {
    list_domain(&state, &actor, Domain::Health).await
}

pub async fn book_appointment(
    State(state): State<AppState>,
    actor: Requester,
    ApiJson(body): ApiJson<AppointmentBody>,
) -> One {
    let req = AppointmentRequest::try_from(body)?;
    created(state.engine.book_appointment(&actor, req).await?)
}

pub async fn cancel_appointment(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    apply(&state, &actor, &id, Some(Domain::Health), Action::Cancel).await
}

// ── Cross-domain ─────────────────────────────────────────────────

pub async fn list_all(State(state): State<AppState>, actor: Requester) -> Many {
    Json(reservation_views(state.engine.list_reservations(&actor, None).await))
}

pub async fn show(State(state): State<AppState>, actor: Requester, Path(id): Path<String>) -> One {
    Ok(Json(state.engine.get_reservation(&actor, parse_id(&id)?).await?.into()))
}

pub async fn transition(
    State(state): State<AppState>,
    actor: Requester,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ActionBody>,
) -> One {
    apply(&state, &actor, &id, None, body.action).await
}

/// The caller's upcoming commitments across every service.
pub async fn schedule(State(state): State<AppState>, actor: Requester) -> Many {
    Json(reservation_views(state.engine.schedule(&actor).await))
}
