use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability::{CONFLICTS_TOTAL, RESERVATIONS_CREATED_TOTAL, TRANSITIONS_TOTAL, WAL_COMPACTIONS_TOTAL};

use super::conflict::{check_exclusive, check_no_conflict, now, validate_slot};
use super::transition::{action_towards, advance, is_active, transition};
use super::{Action, Engine, EngineError, WalCommand};

const COMPACT_ATTEMPTS: usize = 20;

fn require_admin(actor: &Requester) -> Result<(), EngineError> {
    if actor.is_admin() { Ok(()) } else { Err(EngineError::Forbidden) }
}

fn check_requester(actor: &Requester) -> Result<(), EngineError> {
    if actor.id.as_str().trim().is_empty() {
        return Err(EngineError::InvalidInput("requester id is required"));
    }
    if actor.id.as_str().len() > MAX_USER_ID_LEN {
        return Err(EngineError::LimitExceeded("requester id too long"));
    }
    Ok(())
}

fn required(value: &str, missing: &'static str, max: usize, too_long: &'static str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::InvalidInput(missing));
    }
    if value.len() > max {
        return Err(EngineError::LimitExceeded(too_long));
    }
    Ok(())
}

fn optional(value: Option<&String>, max: usize, too_long: &'static str) -> Result<(), EngineError> {
    match value {
        Some(v) if v.len() > max => Err(EngineError::LimitExceeded(too_long)),
        _ => Ok(()),
    }
}

fn record_conflict(domain: &'static str, e: &EngineError) {
    if e.is_conflict() {
        metrics::counter!(CONFLICTS_TOTAL, "domain" => domain).increment(1);
    }
}

fn validate_room_fields(name: &str, building: &str, capacity: u32, amenities: &[String]) -> Result<(), EngineError> {
    required(name, "room name is required", MAX_NAME_LEN, "room name too long")?;
    required(building, "building is required", MAX_NAME_LEN, "building name too long")?;
    if capacity == 0 {
        return Err(EngineError::InvalidInput("capacity must be at least 1"));
    }
    if capacity > MAX_ROOM_CAPACITY {
        return Err(EngineError::LimitExceeded("room capacity too large"));
    }
    if amenities.len() > MAX_AMENITIES {
        return Err(EngineError::LimitExceeded("too many amenities"));
    }
    if amenities.iter().any(|a| a.len() > MAX_NAME_LEN) {
        return Err(EngineError::LimitExceeded("amenity name too long"));
    }
    Ok(())
}

/// `ORD` followed by the low eight digits of the id's millisecond timestamp.
fn order_number(id: Ulid) -> String {
    format!("ORD{:08}", id.timestamp_ms() % 100_000_000)
}

impl Engine {
    // ── Rooms ────────────────────────────────────────────────

    pub async fn create_room(&self, actor: &Requester, new: NewRoom) -> Result<Room, EngineError> {
        require_admin(actor)?;
        validate_room_fields(&new.name, &new.building, new.capacity, &new.amenities)?;
        if self.store.room_count() >= MAX_ROOMS {
            return Err(EngineError::LimitExceeded("too many rooms"));
        }

        let room = Room {
            id: Ulid::new(),
            name: new.name.trim().to_string(),
            building: new.building.trim().to_string(),
            floor: new.floor,
            capacity: new.capacity,
            kind: new.kind,
            amenities: new.amenities,
            status: ResourceStatus::Available,
            coordinates: new.coordinates,
            created_at: now(),
        };
        let event = Event::RoomCreated { room: room.clone() };
        self.commit(event, |_| self.store.insert_room(room.clone())).await?;
        tracing::info!(room = %room.id, name = %room.name, by = %actor.id, "room created");
        Ok(room)
    }

    /// Metadata edits apply directly; a status change must be a legal move in
    /// the resource lifecycle.
    pub async fn update_room(&self, actor: &Requester, id: Ulid, patch: RoomPatch) -> Result<Room, EngineError> {
        require_admin(actor)?;
        let rs = self.store.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = rs.write().await;
        if !self.store.holds_room(&id, &rs) {
            return Err(EngineError::NotFound(id));
        }

        let mut room = guard.room.clone();
        if let Some(name) = patch.name {
            room.name = name.trim().to_string();
        }
        if let Some(building) = patch.building {
            room.building = building.trim().to_string();
        }
        if let Some(floor) = patch.floor {
            room.floor = floor;
        }
        if let Some(capacity) = patch.capacity {
            room.capacity = capacity;
        }
        if let Some(kind) = patch.kind {
            room.kind = kind;
        }
        if let Some(amenities) = patch.amenities {
            room.amenities = amenities;
        }
        if let Some(coordinates) = patch.coordinates {
            room.coordinates = Some(coordinates);
        }
        validate_room_fields(&room.name, &room.building, room.capacity, &room.amenities)?;

        if let Some(target) = patch.status
            && target != room.status
        {
            let action = action_towards(room.status, target).unwrap_or(match target {
                ResourceStatus::Available => Action::Release,
                ResourceStatus::Occupied => Action::Occupy,
                ResourceStatus::Reserved => Action::Reserve,
                ResourceStatus::Maintenance => Action::BeginMaintenance,
            });
            room.status = transition(room.status, action, actor, None)?;
            metrics::counter!(TRANSITIONS_TOTAL, "domain" => "room-resource", "action" => action.label())
                .increment(1);
        }

        let event = Event::RoomUpdated { room: room.clone() };
        self.commit(event, |_| guard.room = room.clone()).await?;
        Ok(room)
    }

    pub async fn delete_room(&self, actor: &Requester, id: Ulid) -> Result<(), EngineError> {
        require_admin(actor)?;
        let rs = self.store.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.write().await;
        if !self.store.holds_room(&id, &rs) {
            return Err(EngineError::NotFound(id));
        }
        if !guard.calendar.is_empty() {
            return Err(EngineError::HasActiveReservations(id));
        }

        let event = Event::RoomDeleted { id };
        self.commit(event, |_| {
            self.store.remove_room(&id);
        })
        .await?;
        drop(guard);
        tracing::info!(room = %id, by = %actor.id, "room deleted");
        Ok(())
    }

    // ── Parking ──────────────────────────────────────────────

    pub async fn create_spot(&self, actor: &Requester, new: NewSpot) -> Result<ParkingSpot, EngineError> {
        require_admin(actor)?;
        let spot_number = new.spot_number.trim().to_string();
        required(&spot_number, "spot number is required", MAX_NAME_LEN, "spot number too long")?;
        required(&new.zone, "zone is required", MAX_NAME_LEN, "zone name too long")?;
        if self.store.spot_count() >= MAX_SPOTS {
            return Err(EngineError::LimitExceeded("too many parking spots"));
        }
        let id = Ulid::new();
        if !self.store.claim_spot_number(&spot_number, id) {
            return Err(EngineError::InvalidInput("spot number already exists"));
        }

        let spot = ParkingSpot {
            id,
            spot_number,
            zone: new.zone.trim().to_string(),
            kind: new.kind,
            status: ResourceStatus::Available,
            occupant: None,
            coordinates: new.coordinates,
            updated_at: now(),
        };
        let event = Event::SpotCreated { spot: spot.clone() };
        if let Err(e) = self.commit(event, |_| self.store.insert_spot(spot.clone())).await {
            self.store.release_spot_number(&spot.spot_number, id);
            return Err(e);
        }
        tracing::info!(spot = %spot.id, number = %spot.spot_number, "parking spot created");
        Ok(spot)
    }

    pub async fn delete_spot(&self, actor: &Requester, id: Ulid) -> Result<(), EngineError> {
        require_admin(actor)?;
        let shared = self.store.get_spot(&id).ok_or(EngineError::NotFound(id))?;
        let guard = shared.write().await;
        if !self.store.holds_spot(&id, &shared) {
            return Err(EngineError::NotFound(id));
        }
        if guard.status == ResourceStatus::Occupied {
            return Err(EngineError::Unavailable { id, status: guard.status });
        }

        let event = Event::SpotDeleted { id };
        self.commit(event, |_| self.store.remove_spot(&id, &guard.spot_number)).await?;
        Ok(())
    }

    /// Apply a resource lifecycle action to a parking spot. `Occupy` records
    /// the actor as occupant; every other move clears it.
    pub async fn spot_action(&self, actor: &Requester, id: Ulid, action: Action) -> Result<ParkingSpot, EngineError> {
        check_requester(actor)?;
        let shared = self.store.get_spot(&id).ok_or(EngineError::NotFound(id))?;
        let mut guard = shared.write().await;
        if !self.store.holds_spot(&id, &shared) {
            return Err(EngineError::NotFound(id));
        }

        if action == Action::Occupy {
            check_exclusive(id, guard.status).inspect_err(|e| record_conflict("parking", e))?;
        }
        let status = transition(guard.status, action, actor, guard.occupant.as_ref())?;

        let mut spot = guard.clone();
        spot.status = status;
        spot.occupant = (status == ResourceStatus::Occupied).then(|| actor.id.clone());
        spot.updated_at = now();

        let event = Event::SpotUpdated { spot: spot.clone() };
        self.commit(event, |_| *guard = spot.clone()).await?;
        metrics::counter!(TRANSITIONS_TOTAL, "domain" => "parking", "action" => action.label()).increment(1);
        tracing::debug!(spot = %id, action = action.label(), by = %actor.id, "parking spot updated");
        Ok(spot)
    }

    pub async fn occupy_spot(&self, actor: &Requester, id: Ulid) -> Result<ParkingSpot, EngineError> {
        self.spot_action(actor, id, Action::Occupy).await
    }

    pub async fn release_spot(&self, actor: &Requester, id: Ulid) -> Result<ParkingSpot, EngineError> {
        self.spot_action(actor, id, Action::Release).await
    }

    // ── Reservations ─────────────────────────────────────────

    async fn check_active_quota(&self, user: &UserId) -> Result<(), EngineError> {
        let mut active = 0usize;
        for id in self.store.reservation_ids_for(user) {
            if let Some(shared) = self.store.get_reservation(&id)
                && is_active(&*shared.read().await)
            {
                active += 1;
            }
        }
        if active >= MAX_ACTIVE_PER_REQUESTER {
            return Err(EngineError::LimitExceeded("too many active reservations"));
        }
        Ok(())
    }

    fn new_reservation(actor: &Requester, detail: Detail) -> Reservation {
        Reservation {
            id: Ulid::new(),
            requester: actor.id.clone(),
            created_at: now(),
            detail,
        }
    }

    /// Persist a new reservation and index it; time-bound ones also take
    /// their slot in `calendar`.
    async fn commit_new(
        &self,
        reservation: Reservation,
        calendar: Option<&mut Calendar>,
    ) -> Result<Reservation, EngineError> {
        let domain = reservation.domain();
        let event = Event::ReservationCreated {
            reservation: reservation.clone(),
        };
        self.commit(event, |_| {
            if let Some(cal) = calendar {
                cal.sync(&reservation);
            }
            self.store.index_reservation(reservation.clone());
        })
        .await?;
        metrics::counter!(RESERVATIONS_CREATED_TOTAL, "domain" => domain.label()).increment(1);
        tracing::info!(
            reservation = %reservation.id,
            domain = domain.label(),
            requester = %reservation.requester,
            "reservation created"
        );
        Ok(reservation)
    }

    pub async fn book_room(&self, actor: &Requester, req: RoomRequest) -> Result<Reservation, EngineError> {
        check_requester(actor)?;
        validate_slot(&req.slot)?;
        required(&req.purpose, "purpose is required", MAX_TEXT_LEN, "purpose too long")?;
        self.check_active_quota(&actor.id).await?;

        let rs = self.store.get_room(&req.room_id).ok_or(EngineError::NotFound(req.room_id))?;
        let mut guard = rs.write().await;
        if !self.store.holds_room(&req.room_id, &rs) {
            return Err(EngineError::NotFound(req.room_id));
        }
        check_exclusive(req.room_id, guard.room.status).inspect_err(|e| record_conflict("room", e))?;
        if req.attendees == 0 || req.attendees > guard.room.capacity {
            return Err(EngineError::InvalidInput("attendees must be between 1 and the room capacity"));
        }
        check_no_conflict(&guard.calendar, &req.slot, None).inspect_err(|e| record_conflict("room", e))?;

        let reservation = Self::new_reservation(
            actor,
            Detail::Room(RoomBooking {
                room_id: req.room_id,
                slot: req.slot,
                purpose: req.purpose.trim().to_string(),
                attendees: req.attendees,
                status: BookingStatus::Confirmed,
            }),
        );
        self.commit_new(reservation, Some(&mut guard.calendar)).await
    }

    /// Edit an active room booking in place: slot, purpose or head count.
    /// A new slot is conflict-checked against every other booking of the room.
    pub async fn update_booking(
        &self,
        actor: &Requester,
        id: Ulid,
        change: BookingChange,
    ) -> Result<Reservation, EngineError> {
        if let Some(slot) = &change.slot {
            validate_slot(slot)?;
        }
        if let Some(purpose) = &change.purpose {
            required(purpose, "purpose is required", MAX_TEXT_LEN, "purpose too long")?;
        }
        let shared = self.store.get_reservation(&id).ok_or(EngineError::NotFound(id))?;
        let room_id = match &shared.read().await.detail {
            Detail::Room(b) => b.room_id,
            _ => return Err(EngineError::NotFound(id)),
        };

        let rs = self.store.get_room(&room_id).ok_or(EngineError::NotFound(room_id))?;
        let mut room = rs.write().await;
        if !self.store.holds_room(&room_id, &rs) {
            return Err(EngineError::NotFound(room_id));
        }
        let mut guard = shared.write().await;
        if !actor.is_admin() && !actor.owns(&guard.requester) {
            return Err(EngineError::Forbidden);
        }
        if !is_active(&guard) {
            return Err(EngineError::InvalidInput("only active bookings can be changed"));
        }
        if let Some(attendees) = change.attendees
            && (attendees == 0 || attendees > room.room.capacity)
        {
            return Err(EngineError::InvalidInput("attendees must be between 1 and the room capacity"));
        }
        if let Some(slot) = &change.slot {
            check_no_conflict(&room.calendar, slot, Some(id)).inspect_err(|e| record_conflict("room", e))?;
        }

        let mut updated = guard.clone();
        if let Detail::Room(b) = &mut updated.detail {
            if let Some(slot) = change.slot {
                b.slot = slot;
            }
            if let Some(purpose) = change.purpose {
                b.purpose = purpose.trim().to_string();
            }
            if let Some(attendees) = change.attendees {
                b.attendees = attendees;
            }
        }
        let event = Event::ReservationUpdated {
            reservation: updated.clone(),
        };
        self.commit(event, |_| {
            room.calendar.sync(&updated);
            *guard = updated.clone();
        })
        .await?;
        tracing::info!(reservation = %id, room = %room_id, by = %actor.id, "booking updated");
        Ok(updated)
    }

    pub async fn book_consultation(&self, actor: &Requester, req: ConsultRequest) -> Result<Reservation, EngineError> {
        check_requester(actor)?;
        validate_slot(&req.slot)?;
        required(&req.faculty, "faculty name is required", MAX_NAME_LEN, "faculty name too long")?;
        required(&req.purpose, "purpose is required", MAX_TEXT_LEN, "purpose too long")?;
        optional(req.department.as_ref(), MAX_NAME_LEN, "department too long")?;
        optional(req.location.as_ref(), MAX_NAME_LEN, "location too long")?;
        self.check_active_quota(&actor.id).await?;

        let calendar = self.store.faculty_calendar(&req.faculty);
        let mut guard = calendar.write().await;
        check_no_conflict(&guard, &req.slot, None).inspect_err(|e| record_conflict("faculty", e))?;

        let reservation = Self::new_reservation(
            actor,
            Detail::Faculty(Consultation {
                faculty: req.faculty.trim().to_string(),
                department: req.department,
                slot: req.slot,
                purpose: req.purpose.trim().to_string(),
                location: req.location,
                status: BookingStatus::Pending,
            }),
        );
        self.commit_new(reservation, Some(&mut *guard)).await
    }

    /// Clinic visits share one queue per day; overlap is allowed.
    pub async fn book_appointment(&self, actor: &Requester, req: AppointmentRequest) -> Result<Reservation, EngineError> {
        check_requester(actor)?;
        validate_slot(&req.slot)?;
        optional(req.symptoms.as_ref(), MAX_TEXT_LEN, "symptoms too long")?;
        optional(req.notes.as_ref(), MAX_TEXT_LEN, "notes too long")?;
        self.check_active_quota(&actor.id).await?;

        let clinic = self.store.clinic();
        let mut guard = clinic.write().await;
        let queue_number = guard.on_date(req.slot.date).count() as u32 + 1;

        let reservation = Self::new_reservation(
            actor,
            Detail::Health(Appointment {
                slot: req.slot,
                service: req.service,
                symptoms: req.symptoms,
                notes: req.notes,
                queue_number,
                status: HealthStatus::Scheduled,
            }),
        );
        self.commit_new(reservation, Some(&mut *guard)).await
    }

    pub async fn place_order(&self, actor: &Requester, req: OrderRequest) -> Result<Reservation, EngineError> {
        check_requester(actor)?;
        if req.items.is_empty() {
            return Err(EngineError::InvalidInput("order must contain at least one item"));
        }
        if req.items.len() > MAX_ORDER_ITEMS {
            return Err(EngineError::LimitExceeded("too many order items"));
        }
        for item in &req.items {
            required(&item.meal_name, "meal name is required", MAX_NAME_LEN, "meal name too long")?;
            if item.quantity == 0 {
                return Err(EngineError::InvalidInput("quantity must be at least 1"));
            }
            if item.quantity > MAX_ITEM_QUANTITY {
                return Err(EngineError::LimitExceeded("quantity too large"));
            }
            if item.unit_price < 0 {
                return Err(EngineError::InvalidInput("price must not be negative"));
            }
            if item.unit_price > MAX_UNIT_PRICE_CENTS {
                return Err(EngineError::LimitExceeded("price too large"));
            }
        }
        self.check_active_quota(&actor.id).await?;

        let total = req
            .items
            .iter()
            .map(|i| i.unit_price * i64::from(i.quantity))
            .sum();
        let mut reservation = Self::new_reservation(
            actor,
            Detail::Canteen(Order {
                items: req.items,
                total,
                pickup_at: req.pickup_at,
                order_number: String::new(),
                status: OrderStatus::Pending,
            }),
        );
        if let Detail::Canteen(o) = &mut reservation.detail {
            o.order_number = order_number(reservation.id);
        }
        self.commit_new(reservation, None).await
    }

    pub async fn borrow_book(&self, actor: &Requester, req: BorrowRequest) -> Result<Reservation, EngineError> {
        check_requester(actor)?;
        required(&req.title, "title is required", MAX_NAME_LEN, "title too long")?;
        optional(req.author.as_ref(), MAX_NAME_LEN, "author too long")?;
        optional(req.isbn.as_ref(), MAX_NAME_LEN, "isbn too long")?;
        let borrowed_at = now();
        if req.due_at <= borrowed_at {
            return Err(EngineError::InvalidRange);
        }
        if req.due_at - borrowed_at > chrono::Duration::days(MAX_LOAN_DAYS) {
            return Err(EngineError::LimitExceeded("loan period too long"));
        }
        self.check_active_quota(&actor.id).await?;

        let reservation = Self::new_reservation(
            actor,
            Detail::Library(Borrow {
                title: req.title.trim().to_string(),
                author: req.author,
                isbn: req.isbn,
                borrowed_at,
                due_at: req.due_at,
                returned_at: None,
                fine: 0,
                status: BorrowStatus::Borrowed,
            }),
        );
        self.commit_new(reservation, None).await
    }

    /// Apply a lifecycle action to any reservation. With `expected` set, a
    /// reservation of another domain is reported as not found.
    pub async fn transition(
        &self,
        actor: &Requester,
        id: Ulid,
        expected: Option<Domain>,
        action: Action,
    ) -> Result<Reservation, EngineError> {
        let shared = self.store.get_reservation(&id).ok_or(EngineError::NotFound(id))?;
        let (domain, key) = {
            let r = shared.read().await;
            (r.domain(), r.calendar_key())
        };
        if expected.is_some_and(|d| d != domain) {
            return Err(EngineError::NotFound(id));
        }

        // Calendar before reservation, always.
        let mut calendar = match key.and_then(|k| self.calendar_for(&k)) {
            Some(handle) => Some(handle.write().await),
            None => None,
        };
        let mut guard = shared.write().await;

        let mut updated = guard.clone();
        advance(&mut updated, action, actor, now(), self.policy.fine_per_day)?;

        let event = Event::ReservationUpdated {
            reservation: updated.clone(),
        };
        self.commit(event, |_| {
            if let Some(cal) = calendar.as_mut() {
                cal.calendar_mut().sync(&updated);
            }
            *guard = updated.clone();
        })
        .await?;
        metrics::counter!(TRANSITIONS_TOTAL, "domain" => domain.label(), "action" => action.label()).increment(1);
        tracing::info!(
            reservation = %id,
            action = action.label(),
            by = %actor.id,
            "reservation transitioned"
        );
        Ok(updated)
    }

    /// Loans still `borrowed` whose due instant has passed.
    pub async fn collect_overdue_loans(&self, at: DateTime<Utc>) -> Vec<Ulid> {
        let mut overdue = Vec::new();
        for shared in self.store.reservations() {
            let r = shared.read().await;
            if let Detail::Library(b) = &r.detail
                && b.status == BorrowStatus::Borrowed
                && b.due_at < at
            {
                overdue.push(r.id);
            }
        }
        overdue
    }

    // ── WAL maintenance ──────────────────────────────────────

    /// Events that recreate the current state. `None` if any record is
    /// write-locked by an in-flight mutation.
    fn snapshot_events(&self) -> Option<Vec<Event>> {
        let mut events = Vec::new();
        for rs in self.store.rooms() {
            let guard = rs.try_read().ok()?;
            events.push(Event::RoomCreated {
                room: guard.room.clone(),
            });
        }
        for spot in self.store.spots() {
            let guard = spot.try_read().ok()?;
            events.push(Event::SpotCreated { spot: guard.clone() });
        }
        let mut reservations = Vec::with_capacity(self.store.reservation_count());
        for shared in self.store.reservations() {
            reservations.push(shared.try_read().ok()?.clone());
        }
        reservations.sort_by_key(|r| r.id);
        events.extend(
            reservations
                .into_iter()
                .map(|reservation| Event::ReservationCreated { reservation }),
        );
        Some(events)
    }

    /// Compact the WAL by rewriting it with only the events needed to recreate
    /// the current state. Returns `false` if the store stayed busy and the
    /// compaction was skipped.
    pub async fn compact_wal(&self) -> Result<bool, EngineError> {
        for attempt in 0..COMPACT_ATTEMPTS {
            let gate = self.commit_gate.write().await;
            let Some(events) = self.snapshot_events() else {
                drop(gate);
                tracing::debug!(attempt, "compaction snapshot contended, retrying");
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            };

            let count = events.len();
            let (tx, rx) = oneshot::channel();
            self.wal_tx
                .send(WalCommand::Compact { events, response: tx })
                .await
                .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
            rx.await
                .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
                .map_err(|e| EngineError::WalError(e.to_string()))?;
            drop(gate);

            metrics::counter!(WAL_COMPACTIONS_TOTAL).increment(1);
            tracing::info!(events = count, "WAL compacted");
            return Ok(true);
        }
        Ok(false)
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_have_eight_digits() {
        let n = order_number(Ulid::new());
        assert_eq!(n.len(), 11);
        assert!(n.starts_with("ORD"));
        assert!(n[3..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn text_validation() {
        assert!(matches!(
            required("  ", "missing", 10, "long"),
            Err(EngineError::InvalidInput("missing"))
        ));
        assert!(matches!(
            required("abcdefghijk", "missing", 10, "long"),
            Err(EngineError::LimitExceeded("long"))
        ));
        assert!(required("ok", "missing", 10, "long").is_ok());
        assert!(optional(None, 1, "long").is_ok());
    }
}
