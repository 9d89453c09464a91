//! JSON shapes of the HTTP API. Field names are camelCase; money is a decimal
//! amount in major units.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::{Action, EngineError, status_label};
use crate::limits::{CLINIC_SLOT_MINUTES, DEFAULT_CONSULT_MINUTES};
use crate::model::*;

use super::ApiError;

pub fn parse_id(raw: &str) -> Result<Ulid, ApiError> {
    Ulid::from_string(raw).map_err(|_| ApiError::BadRequest(format!("invalid id: {raw}")))
}

fn to_cents(amount: f64) -> Result<Cents, EngineError> {
    if !amount.is_finite() {
        return Err(EngineError::InvalidInput("price must be a number"));
    }
    Ok((amount * 100.0).round() as Cents)
}

fn to_amount(cents: Cents) -> f64 {
    cents as f64 / 100.0
}

// ── Requests ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomBody {
    pub name: String,
    pub building: String,
    #[serde(default)]
    pub floor: i32,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub coordinates: Option<Coordinates>,
}

impl From<CreateRoomBody> for NewRoom {
    fn from(b: CreateRoomBody) -> Self {
        NewRoom {
            name: b.name,
            building: b.building,
            floor: b.floor,
            capacity: b.capacity,
            kind: b.kind,
            amenities: b.amenities,
            coordinates: b.coordinates,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoomBody {
    pub name: Option<String>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<RoomKind>,
    pub amenities: Option<Vec<String>>,
    pub status: Option<ResourceStatus>,
    pub coordinates: Option<Coordinates>,
}

impl From<UpdateRoomBody> for RoomPatch {
    fn from(b: UpdateRoomBody) -> Self {
        RoomPatch {
            name: b.name,
            building: b.building,
            floor: b.floor,
            capacity: b.capacity,
            kind: b.kind,
            amenities: b.amenities,
            status: b.status,
            coordinates: b.coordinates,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSpotBody {
    pub spot_number: String,
    pub zone: String,
    #[serde(rename = "type", default = "default_vehicle")]
    pub kind: VehicleKind,
    pub coordinates: Option<Coordinates>,
}

fn default_vehicle() -> VehicleKind {
    VehicleKind::Car
}

impl From<CreateSpotBody> for NewSpot {
    fn from(b: CreateSpotBody) -> Self {
        NewSpot {
            spot_number: b.spot_number,
            zone: b.zone,
            kind: b.kind,
            coordinates: b.coordinates,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingBody {
    pub room_id: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub purpose: String,
    #[serde(default = "one")]
    pub attendees: u32,
}

fn one() -> u32 {
    1
}

impl CreateBookingBody {
    pub fn into_request(self) -> Result<RoomRequest, ApiError> {
        Ok(RoomRequest {
            room_id: parse_id(&self.room_id)?,
            slot: Slot::new(self.date, Span::parse(&self.start_time, &self.end_time)?),
            purpose: self.purpose,
            attendees: self.attendees,
        })
    }
}

/// Every field is optional; a new slot needs all three of date, start and end.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingBody {
    pub date: Option<NaiveDate>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub purpose: Option<String>,
    pub attendees: Option<u32>,
}

impl TryFrom<UpdateBookingBody> for BookingChange {
    type Error = EngineError;

    fn try_from(b: UpdateBookingBody) -> Result<Self, Self::Error> {
        let slot = match (b.date, b.start_time, b.end_time) {
            (Some(date), Some(start), Some(end)) => Some(Slot::new(date, Span::parse(&start, &end)?)),
            (None, None, None) => None,
            _ => return Err(EngineError::InvalidInput("date, startTime and endTime must be given together")),
        };
        if slot.is_none() && b.purpose.is_none() && b.attendees.is_none() {
            return Err(EngineError::InvalidInput("nothing to update"));
        }
        Ok(BookingChange {
            slot,
            purpose: b.purpose,
            attendees: b.attendees,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultBody {
    pub faculty_name: String,
    pub department: Option<String>,
    pub date: NaiveDate,
    pub start_time: String,
    /// Minutes; defaults to a standard consultation.
    pub duration: Option<u16>,
    pub purpose: String,
    pub location: Option<String>,
}

impl TryFrom<ConsultBody> for ConsultRequest {
    type Error = EngineError;

    fn try_from(b: ConsultBody) -> Result<Self, Self::Error> {
        let start = parse_clock(&b.start_time)?;
        let span = Span::starting_at(start, b.duration.unwrap_or(DEFAULT_CONSULT_MINUTES))?;
        Ok(ConsultRequest {
            faculty: b.faculty_name,
            department: b.department,
            slot: Slot::new(b.date, span),
            purpose: b.purpose,
            location: b.location,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentBody {
    pub service_type: ServiceType,
    pub date: NaiveDate,
    pub time: String,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

impl TryFrom<AppointmentBody> for AppointmentRequest {
    type Error = EngineError;

    fn try_from(b: AppointmentBody) -> Result<Self, Self::Error> {
        let span = Span::starting_at(parse_clock(&b.time)?, CLINIC_SLOT_MINUTES)?;
        Ok(AppointmentRequest {
            slot: Slot::new(b.date, span),
            service: b.service_type,
            symptoms: b.symptoms,
            notes: b.notes,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody {
    pub meal_name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody {
    pub items: Vec<OrderItemBody>,
    pub pickup_time: Option<DateTime<Utc>>,
}

impl TryFrom<OrderBody> for OrderRequest {
    type Error = EngineError;

    fn try_from(b: OrderBody) -> Result<Self, Self::Error> {
        let items = b
            .items
            .into_iter()
            .map(|i| {
                Ok(OrderItem {
                    meal_name: i.meal_name,
                    quantity: i.quantity,
                    unit_price: to_cents(i.price)?,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(OrderRequest {
            items,
            pickup_at: b.pickup_time,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowBody {
    pub book_title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub due_date: DateTime<Utc>,
}

impl From<BorrowBody> for BorrowRequest {
    fn from(b: BorrowBody) -> Self {
        BorrowRequest {
            title: b.book_title,
            author: b.author,
            isbn: b.isbn,
            due_at: b.due_date,
        }
    }
}

// ── Query strings ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct RoomQuery {
    pub building: Option<String>,
    pub floor: Option<i32>,
    #[serde(rename = "type")]
    pub kind: Option<RoomKind>,
    pub status: Option<ResourceStatus>,
}

impl From<RoomQuery> for RoomFilter {
    fn from(q: RoomQuery) -> Self {
        RoomFilter {
            building: q.building,
            floor: q.floor,
            kind: q.kind,
            status: q.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SpotQuery {
    pub zone: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<VehicleKind>,
    pub status: Option<ResourceStatus>,
}

impl From<SpotQuery> for SpotFilter {
    fn from(q: SpotQuery) -> Self {
        SpotFilter {
            zone: q.zone,
            kind: q.kind,
            status: q.status,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub min_minutes: Minute,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

// ── Responses ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: Ulid,
    pub name: String,
    pub building: String,
    pub floor: i32,
    pub capacity: u32,
    #[serde(rename = "type")]
    pub kind: RoomKind,
    pub amenities: Vec<String>,
    pub status: ResourceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
}

impl From<Room> for RoomView {
    fn from(r: Room) -> Self {
        RoomView {
            id: r.id,
            name: r.name,
            building: r.building,
            floor: r.floor,
            capacity: r.capacity,
            kind: r.kind,
            amenities: r.amenities,
            status: r.status,
            coordinates: r.coordinates,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotView {
    pub id: Ulid,
    pub spot_number: String,
    pub zone: String,
    #[serde(rename = "type")]
    pub kind: VehicleKind,
    pub status: ResourceStatus,
    pub occupied_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    pub updated_at: DateTime<Utc>,
}

impl From<ParkingSpot> for SpotView {
    fn from(s: ParkingSpot) -> Self {
        SpotView {
            id: s.id,
            spot_number: s.spot_number,
            zone: s.zone,
            kind: s.kind,
            status: s.status,
            occupied_by: s.occupant.map(|u| u.0),
            coordinates: s.coordinates,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanView {
    pub start_time: String,
    pub end_time: String,
    pub minutes: Minute,
}

impl From<Span> for SpanView {
    fn from(s: Span) -> Self {
        SpanView {
            start_time: format_clock(s.start),
            end_time: format_clock(s.end),
            minutes: s.duration(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityView {
    pub room_id: Ulid,
    pub date: NaiveDate,
    pub free: Vec<SpanView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
}

impl From<Slot> for SlotView {
    fn from(s: Slot) -> Self {
        SlotView {
            date: s.date,
            start_time: format_clock(s.span.start),
            end_time: format_clock(s.span.end),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomBookingView {
    pub room_id: Ulid,
    #[serde(flatten)]
    pub slot: SlotView,
    pub purpose: String,
    pub attendees: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultView {
    pub faculty_name: String,
    pub department: Option<String>,
    #[serde(flatten)]
    pub slot: SlotView,
    pub purpose: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub service_type: ServiceType,
    #[serde(flatten)]
    pub slot: SlotView,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub queue_number: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub meal_name: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub order_number: String,
    pub items: Vec<OrderItemView>,
    pub total_amount: f64,
    pub pickup_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowView {
    pub book_title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub fine: f64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DetailView {
    Room(RoomBookingView),
    Faculty(ConsultView),
    Health(AppointmentView),
    Canteen(OrderView),
    Library(BorrowView),
}

impl From<Detail> for DetailView {
    fn from(d: Detail) -> Self {
        match d {
            Detail::Room(b) => DetailView::Room(RoomBookingView {
                room_id: b.room_id,
                slot: b.slot.into(),
                purpose: b.purpose,
                attendees: b.attendees,
            }),
            Detail::Faculty(c) => DetailView::Faculty(ConsultView {
                faculty_name: c.faculty,
                department: c.department,
                slot: c.slot.into(),
                purpose: c.purpose,
                location: c.location,
            }),
            Detail::Health(a) => DetailView::Health(AppointmentView {
                service_type: a.service,
                slot: a.slot.into(),
                symptoms: a.symptoms,
                notes: a.notes,
                queue_number: a.queue_number,
            }),
            Detail::Canteen(o) => DetailView::Canteen(OrderView {
                order_number: o.order_number,
                items: o
                    .items
                    .into_iter()
                    .map(|i| OrderItemView {
                        meal_name: i.meal_name,
                        quantity: i.quantity,
                        price: to_amount(i.unit_price),
                    })
                    .collect(),
                total_amount: to_amount(o.total),
                pickup_time: o.pickup_at,
            }),
            Detail::Library(b) => DetailView::Library(BorrowView {
                book_title: b.title,
                author: b.author,
                isbn: b.isbn,
                borrow_date: b.borrowed_at,
                due_date: b.due_at,
                return_date: b.returned_at,
                fine: to_amount(b.fine),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    pub id: Ulid,
    pub domain: Domain,
    pub user_id: String,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub detail: DetailView,
}

impl From<Reservation> for ReservationView {
    fn from(r: Reservation) -> Self {
        ReservationView {
            id: r.id,
            domain: r.domain(),
            user_id: r.requester.0.clone(),
            status: status_label(&r),
            created_at: r.created_at,
            detail: r.detail.into(),
        }
    }
}

pub fn reservation_views(list: Vec<Reservation>) -> Vec<ReservationView> {
    list.into_iter().map(Into::into).collect()
}

/// Payload of one live-feed message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum ChangeView {
    RoomUpdated(RoomView),
    RoomDeleted { id: Ulid },
    SpotUpdated(SpotView),
    SpotDeleted { id: Ulid },
    Reservation(ReservationView),
}

impl ChangeView {
    pub fn name(&self) -> &'static str {
        match self {
            ChangeView::RoomUpdated(_) => "room-updated",
            ChangeView::RoomDeleted { .. } => "room-deleted",
            ChangeView::SpotUpdated(_) => "spot-updated",
            ChangeView::SpotDeleted { .. } => "spot-deleted",
            ChangeView::Reservation(_) => "reservation",
        }
    }
}

impl From<Event> for ChangeView {
    fn from(e: Event) -> Self {
        match e {
            Event::RoomCreated { room } | Event::RoomUpdated { room } => ChangeView::RoomUpdated(room.into()),
            Event::RoomDeleted { id } => ChangeView::RoomDeleted { id },
            Event::SpotCreated { spot } | Event::SpotUpdated { spot } => ChangeView::SpotUpdated(spot.into()),
            Event::SpotDeleted { id } => ChangeView::SpotDeleted { id },
            Event::ReservationCreated { reservation } | Event::ReservationUpdated { reservation } => {
                ChangeView::Reservation(reservation.into())
            }
        }
    }
}
