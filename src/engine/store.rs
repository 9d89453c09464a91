use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::RwLock;
use ulid::Ulid;

use crate::model::*;

use super::{SharedCalendar, SharedReservation, SharedRoom, SharedSpot};

/// Resource Store + Reservation Ledger: keyed records with the secondary
/// indexes the queries need. Each record sits behind its own lock.
pub struct Store {
    rooms: DashMap<Ulid, SharedRoom>,
    faculty: DashMap<String, SharedCalendar>,
    clinic: SharedCalendar,
    spots: DashMap<Ulid, SharedSpot>,
    /// Unique spot number → spot id.
    spot_numbers: DashMap<String, Ulid>,
    reservations: DashMap<Ulid, SharedReservation>,
    /// Requester → their reservation ids, in creation order.
    by_requester: DashMap<UserId, Vec<Ulid>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            faculty: DashMap::new(),
            clinic: Arc::new(RwLock::new(Calendar::new())),
            spots: DashMap::new(),
            spot_numbers: DashMap::new(),
            reservations: DashMap::new(),
            by_requester: DashMap::new(),
        }
    }

    /// Rebuild state from a replayed event log. Works on owned values before
    /// anything is shared, so no locks are involved.
    pub fn replay(events: Vec<Event>) -> Self {
        let mut rooms: HashMap<Ulid, RoomState> = HashMap::new();
        let mut spots: HashMap<Ulid, ParkingSpot> = HashMap::new();
        let mut reservations: HashMap<Ulid, Reservation> = HashMap::new();
        let mut order: Vec<Ulid> = Vec::new();

        for event in events {
            match event {
                Event::RoomCreated { room } => {
                    rooms.insert(room.id, RoomState::new(room));
                }
                Event::RoomUpdated { room } => {
                    if let Some(rs) = rooms.get_mut(&room.id) {
                        rs.room = room;
                    }
                }
                Event::RoomDeleted { id } => {
                    rooms.remove(&id);
                }
                Event::SpotCreated { spot } | Event::SpotUpdated { spot } => {
                    spots.insert(spot.id, spot);
                }
                Event::SpotDeleted { id } => {
                    spots.remove(&id);
                }
                Event::ReservationCreated { reservation } | Event::ReservationUpdated { reservation } => {
                    if !reservations.contains_key(&reservation.id) {
                        order.push(reservation.id);
                    }
                    reservations.insert(reservation.id, reservation);
                }
            }
        }

        let mut faculty: HashMap<String, Calendar> = HashMap::new();
        let mut clinic = Calendar::new();
        for id in &order {
            let r = &reservations[id];
            match r.calendar_key() {
                Some(CalendarKey::Room(room_id)) => {
                    if let Some(rs) = rooms.get_mut(&room_id) {
                        rs.calendar.sync(r);
                    }
                }
                Some(CalendarKey::Faculty(key)) => faculty.entry(key).or_default().sync(r),
                Some(CalendarKey::Clinic) => clinic.sync(r),
                None => {}
            }
        }

        let store = Self {
            clinic: Arc::new(RwLock::new(clinic)),
            ..Self::new()
        };
        for (id, rs) in rooms {
            store.rooms.insert(id, Arc::new(RwLock::new(rs)));
        }
        for (key, cal) in faculty {
            store.faculty.insert(key, Arc::new(RwLock::new(cal)));
        }
        for (id, spot) in spots {
            store.spot_numbers.insert(spot.spot_number.clone(), id);
            store.spots.insert(id, Arc::new(RwLock::new(spot)));
        }
        for id in order {
            if let Some(r) = reservations.remove(&id) {
                store.index_reservation(r);
            }
        }
        store
    }

    // ── Rooms ────────────────────────────────────────────────

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn get_room(&self, id: &Ulid) -> Option<SharedRoom> {
        self.rooms.get(id).map(|e| e.value().clone())
    }

    pub fn insert_room(&self, room: Room) {
        self.rooms.insert(room.id, Arc::new(RwLock::new(RoomState::new(room))));
    }

    pub fn remove_room(&self, id: &Ulid) -> Option<(Ulid, SharedRoom)> {
        self.rooms.remove(id)
    }

    /// Whether `shared` is still the stored record for `id`. A handle taken
    /// before a delete outlives it, so writers re-check once locked.
    pub fn holds_room(&self, id: &Ulid, shared: &SharedRoom) -> bool {
        self.rooms.get(id).is_some_and(|e| Arc::ptr_eq(e.value(), shared))
    }

    pub fn rooms(&self) -> Vec<SharedRoom> {
        self.rooms.iter().map(|e| e.value().clone()).collect()
    }

    // ── Calendars ────────────────────────────────────────────

    pub fn faculty_calendar(&self, name: &str) -> SharedCalendar {
        self.faculty
            .entry(faculty_key(name))
            .or_insert_with(|| Arc::new(RwLock::new(Calendar::new())))
            .clone()
    }

    pub fn clinic(&self) -> SharedCalendar {
        self.clinic.clone()
    }

    // ── Parking ──────────────────────────────────────────────

    pub fn spot_count(&self) -> usize {
        self.spots.len()
    }

    pub fn get_spot(&self, id: &Ulid) -> Option<SharedSpot> {
        self.spots.get(id).map(|e| e.value().clone())
    }

    pub fn holds_spot(&self, id: &Ulid, shared: &SharedSpot) -> bool {
        self.spots.get(id).is_some_and(|e| Arc::ptr_eq(e.value(), shared))
    }

    /// Reserve `number` for spot `id`. `false` if another spot holds it.
    pub fn claim_spot_number(&self, number: &str, id: Ulid) -> bool {
        match self.spot_numbers.entry(number.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(id);
                true
            }
        }
    }

    pub fn release_spot_number(&self, number: &str, id: Ulid) {
        self.spot_numbers.remove_if(number, |_, owner| *owner == id);
    }

    /// The spot's number must already be claimed.
    pub fn insert_spot(&self, spot: ParkingSpot) {
        self.spots.insert(spot.id, Arc::new(RwLock::new(spot)));
    }

    pub fn remove_spot(&self, id: &Ulid, spot_number: &str) {
        self.spots.remove(id);
        self.release_spot_number(spot_number, *id);
    }

    pub fn spots(&self) -> Vec<SharedSpot> {
        self.spots.iter().map(|e| e.value().clone()).collect()
    }

    // ── Reservations ─────────────────────────────────────────

    pub fn get_reservation(&self, id: &Ulid) -> Option<SharedReservation> {
        self.reservations.get(id).map(|e| e.value().clone())
    }

    /// Insert a new record and index it under its requester.
    pub fn index_reservation(&self, reservation: Reservation) -> SharedReservation {
        let id = reservation.id;
        self.by_requester
            .entry(reservation.requester.clone())
            .or_default()
            .push(id);
        let shared = Arc::new(RwLock::new(reservation));
        self.reservations.insert(id, shared.clone());
        shared
    }

    pub fn reservation_ids_for(&self, requester: &UserId) -> Vec<Ulid> {
        self.by_requester
            .get(requester)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    pub fn reservations(&self) -> Vec<SharedReservation> {
        self.reservations.iter().map(|e| e.value().clone()).collect()
    }

    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }
}
