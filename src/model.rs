use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::engine::EngineError;

/// Minutes since midnight; the only time-of-day type.
pub type Minute = u16;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// Money in minor currency units.
pub type Cents = i64;

/// Half-open time-of-day interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Minute,
    pub end: Minute,
}

impl Span {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Validated constructor for caller-supplied ranges.
    pub fn checked(start: Minute, end: Minute) -> Result<Self, EngineError> {
        if end <= start || end > MINUTES_PER_DAY {
            return Err(EngineError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// Parse a `HH:MM`–`HH:MM` pair.
    pub fn parse(start: &str, end: &str) -> Result<Self, EngineError> {
        Self::checked(parse_clock(start)?, parse_clock(end)?)
    }

    /// A span of `minutes` starting at `start`.
    pub fn starting_at(start: Minute, minutes: Minute) -> Result<Self, EngineError> {
        Self::checked(start, start.saturating_add(minutes))
    }

    pub fn duration(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && self.end > other.start
    }
}

/// A span pinned to a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub span: Span,
}

impl Slot {
    pub fn new(date: NaiveDate, span: Span) -> Self {
        Self { date, span }
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.date == other.date && self.span.overlaps(&other.span)
    }

    fn sort_key(&self) -> (NaiveDate, Minute) {
        (self.date, self.span.start)
    }
}

/// Parse a 24-hour `HH:MM` wall-clock string. `24:00` is accepted as end of day.
pub fn parse_clock(s: &str) -> Result<Minute, EngineError> {
    let s = s.trim();
    if s == "24:00" {
        return Ok(MINUTES_PER_DAY);
    }
    let t = NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| EngineError::InvalidInput("time must be HH:MM"))?;
    Ok((t.hour() * 60 + t.minute()) as Minute)
}

pub fn format_clock(m: Minute) -> String {
    format!("{:02}:{:02}", m / 60, m % 60)
}

// ── Identity ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

/// The authenticated caller of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub id: UserId,
    pub role: Role,
}

impl Requester {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(id),
            role,
        }
    }

    pub fn student(id: impl Into<String>) -> Self {
        Self::new(id, Role::Student)
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self::new(id, Role::Admin)
    }

    /// Identity used by background maintenance.
    pub fn system() -> Self {
        Self::admin("system")
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns(&self, owner: &UserId) -> bool {
        &self.id == owner
    }
}

// ── Resources ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceStatus {
    Available,
    Occupied,
    Reserved,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomKind {
    Classroom,
    StudyNiche,
    Lab,
    MeetingRoom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleKind {
    Car,
    Motorcycle,
    Bicycle,
    EvCharging,
}

/// Position on the campus map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Ulid,
    pub name: String,
    pub building: String,
    pub floor: i32,
    pub capacity: u32,
    pub kind: RoomKind,
    pub amenities: Vec<String>,
    pub status: ResourceStatus,
    pub coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParkingSpot {
    pub id: Ulid,
    pub spot_number: String,
    pub zone: String,
    pub kind: VehicleKind,
    pub status: ResourceStatus,
    pub occupant: Option<UserId>,
    pub coordinates: Option<Coordinates>,
    pub updated_at: DateTime<Utc>,
}

// ── Reservation statuses ─────────────────────────────────────────

/// Room bookings and faculty consultations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HealthStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BorrowStatus {
    Borrowed,
    Overdue,
    Returned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceType {
    GeneralCheckup,
    Dental,
    Consultation,
    Emergency,
    Prescription,
}

// ── Reservations ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Room,
    Faculty,
    Health,
    Canteen,
    Library,
}

impl Domain {
    pub fn label(self) -> &'static str {
        match self {
            Domain::Room => "room",
            Domain::Faculty => "faculty",
            Domain::Health => "health",
            Domain::Canteen => "canteen",
            Domain::Library => "library",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomBooking {
    pub room_id: Ulid,
    pub slot: Slot,
    pub purpose: String,
    pub attendees: u32,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consultation {
    pub faculty: String,
    pub department: Option<String>,
    pub slot: Slot,
    pub purpose: String,
    pub location: Option<String>,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub slot: Slot,
    pub service: ServiceType,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
    pub queue_number: u32,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub meal_name: String,
    pub quantity: u32,
    pub unit_price: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub items: Vec<OrderItem>,
    pub total: Cents,
    pub pickup_at: Option<DateTime<Utc>>,
    pub order_number: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrow {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub borrowed_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub fine: Cents,
    pub status: BorrowStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Detail {
    Room(RoomBooking),
    Faculty(Consultation),
    Health(Appointment),
    Canteen(Order),
    Library(Borrow),
}

/// Which calendar a time-bound reservation occupies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CalendarKey {
    Room(Ulid),
    Faculty(String),
    Clinic,
}

/// Normalized calendar key for a faculty member.
pub fn faculty_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A booking, order, appointment or loan. Owned by exactly one requester and
/// never deleted: cancellation is a status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub requester: UserId,
    pub created_at: DateTime<Utc>,
    pub detail: Detail,
}

impl Reservation {
    pub fn domain(&self) -> Domain {
        match &self.detail {
            Detail::Room(_) => Domain::Room,
            Detail::Faculty(_) => Domain::Faculty,
            Detail::Health(_) => Domain::Health,
            Detail::Canteen(_) => Domain::Canteen,
            Detail::Library(_) => Domain::Library,
        }
    }

    /// The stored resource this reservation references, if any.
    pub fn resource_id(&self) -> Option<Ulid> {
        match &self.detail {
            Detail::Room(b) => Some(b.room_id),
            _ => None,
        }
    }

    pub fn slot(&self) -> Option<Slot> {
        match &self.detail {
            Detail::Room(b) => Some(b.slot),
            Detail::Faculty(c) => Some(c.slot),
            Detail::Health(a) => Some(a.slot),
            Detail::Canteen(_) | Detail::Library(_) => None,
        }
    }

    pub fn calendar_key(&self) -> Option<CalendarKey> {
        match &self.detail {
            Detail::Room(b) => Some(CalendarKey::Room(b.room_id)),
            Detail::Faculty(c) => Some(CalendarKey::Faculty(faculty_key(&c.faculty))),
            Detail::Health(_) => Some(CalendarKey::Clinic),
            Detail::Canteen(_) | Detail::Library(_) => None,
        }
    }

    /// Ordering used by listings: slot date/start for time-bound records,
    /// otherwise the relevant instant's date and minute.
    pub fn timeline_key(&self) -> (NaiveDate, Minute, DateTime<Utc>) {
        if let Some(slot) = self.slot() {
            return (slot.date, slot.span.start, self.created_at);
        }
        let at = match &self.detail {
            Detail::Library(b) => b.borrowed_at,
            Detail::Canteen(o) => o.pickup_at.unwrap_or(self.created_at),
            _ => self.created_at,
        };
        let minute = (at.hour() * 60 + at.minute()) as Minute;
        (at.date_naive(), minute, self.created_at)
    }
}

// ── Calendars ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarEntry {
    pub reservation_id: Ulid,
    pub slot: Slot,
}

/// Active slots of one bookable resource, sorted by `(date, span.start)`.
/// Only active reservations have an entry; deactivation removes it.
#[derive(Debug, Clone, Default)]
pub struct Calendar {
    pub entries: Vec<CalendarEntry>,
}

impl Calendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert maintaining sort order.
    pub fn insert(&mut self, entry: CalendarEntry) {
        let key = entry.slot.sort_key();
        let pos = self
            .entries
            .partition_point(|e| e.slot.sort_key() <= key);
        self.entries.insert(pos, entry);
    }

    pub fn remove(&mut self, reservation_id: Ulid) -> Option<CalendarEntry> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.reservation_id == reservation_id)?;
        Some(self.entries.remove(pos))
    }

    /// Bring the calendar in line with a reservation's current state.
    pub fn sync(&mut self, reservation: &Reservation) {
        self.remove(reservation.id);
        if crate::engine::is_active(reservation)
            && let Some(slot) = reservation.slot()
        {
            self.insert(CalendarEntry {
                reservation_id: reservation.id,
                slot,
            });
        }
    }

    /// Entries whose slot overlaps `query`. Binary search skips everything
    /// starting at or after the query's end on that date.
    pub fn overlapping(&self, query: &Slot) -> impl Iterator<Item = &CalendarEntry> {
        let q = *query;
        let left_bound = self.entries.partition_point(|e| e.slot.date < q.date);
        let right_bound = self
            .entries
            .partition_point(|e| e.slot.sort_key() < (q.date, q.span.end));
        self.entries[left_bound..right_bound]
            .iter()
            .filter(move |e| e.slot.overlaps(&q))
    }

    pub fn on_date(&self, date: NaiveDate) -> impl Iterator<Item = &CalendarEntry> {
        let lo = self.entries.partition_point(|e| e.slot.date < date);
        self.entries[lo..]
            .iter()
            .take_while(move |e| e.slot.date == date)
    }
}

/// A room and its booking calendar, locked together.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room: Room,
    pub calendar: Calendar,
}

impl RoomState {
    pub fn new(room: Room) -> Self {
        Self {
            room,
            calendar: Calendar::new(),
        }
    }
}

// ── WAL events ───────────────────────────────────────────────────

/// Snapshots of the changed record. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    RoomCreated { room: Room },
    RoomUpdated { room: Room },
    RoomDeleted { id: Ulid },
    SpotCreated { spot: ParkingSpot },
    SpotUpdated { spot: ParkingSpot },
    SpotDeleted { id: Ulid },
    ReservationCreated { reservation: Reservation },
    ReservationUpdated { reservation: Reservation },
}

/// Channels a change can be broadcast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Parking,
    Room(Ulid),
}

impl Event {
    pub fn topic(&self) -> Option<Topic> {
        match self {
            Event::SpotCreated { .. } | Event::SpotUpdated { .. } | Event::SpotDeleted { .. } => {
                Some(Topic::Parking)
            }
            Event::RoomCreated { room } | Event::RoomUpdated { room } => Some(Topic::Room(room.id)),
            Event::RoomDeleted { id } => Some(Topic::Room(*id)),
            Event::ReservationCreated { reservation } | Event::ReservationUpdated { reservation } => {
                reservation.resource_id().map(Topic::Room)
            }
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub name: String,
    pub building: String,
    pub floor: i32,
    pub capacity: u32,
    pub kind: RoomKind,
    pub amenities: Vec<String>,
    pub coordinates: Option<Coordinates>,
}

/// Partial room update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct RoomPatch {
    pub name: Option<String>,
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub capacity: Option<u32>,
    pub kind: Option<RoomKind>,
    pub amenities: Option<Vec<String>>,
    pub status: Option<ResourceStatus>,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone)]
pub struct NewSpot {
    pub spot_number: String,
    pub zone: String,
    pub kind: VehicleKind,
    pub coordinates: Option<Coordinates>,
}

#[derive(Debug, Clone)]
pub struct RoomRequest {
    pub room_id: Ulid,
    pub slot: Slot,
    pub purpose: String,
    pub attendees: u32,
}

/// Edits to an active room booking; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct BookingChange {
    pub slot: Option<Slot>,
    pub purpose: Option<String>,
    pub attendees: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ConsultRequest {
    pub faculty: String,
    pub department: Option<String>,
    pub slot: Slot,
    pub purpose: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppointmentRequest {
    pub slot: Slot,
    pub service: ServiceType,
    pub symptoms: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub items: Vec<OrderItem>,
    pub pickup_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BorrowRequest {
    pub title: String,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub due_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct RoomFilter {
    pub building: Option<String>,
    pub floor: Option<i32>,
    pub kind: Option<RoomKind>,
    pub status: Option<ResourceStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct SpotFilter {
    pub zone: Option<String>,
    pub kind: Option<VehicleKind>,
    pub status: Option<ResourceStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParkingStats {
    pub total: usize,
    pub available: usize,
    pub occupied: usize,
    pub reserved: usize,
    pub maintenance: usize,
}
