use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

use super::availability::free_spans;
use super::transition::is_active;
use super::{Engine, EngineError, SharedReservation};

fn matches_room(room: &Room, filter: &RoomFilter) -> bool {
    filter.building.as_ref().is_none_or(|b| room.building.eq_ignore_ascii_case(b))
        && filter.floor.is_none_or(|f| room.floor == f)
        && filter.kind.is_none_or(|k| room.kind == k)
        && filter.status.is_none_or(|s| room.status == s)
}

fn matches_spot(spot: &ParkingSpot, filter: &SpotFilter) -> bool {
    filter.zone.as_ref().is_none_or(|z| spot.zone.eq_ignore_ascii_case(z))
        && filter.kind.is_none_or(|k| spot.kind == k)
        && filter.status.is_none_or(|s| spot.status == s)
}

impl Engine {
    // ── Rooms ────────────────────────────────────────────────

    pub async fn list_rooms(&self, filter: &RoomFilter) -> Vec<Room> {
        let mut rooms = Vec::new();
        for rs in self.store.rooms() {
            let guard = rs.read().await;
            if matches_room(&guard.room, filter) {
                rooms.push(guard.room.clone());
            }
        }
        rooms.sort_by(|a, b| {
            (a.building.as_str(), a.floor, a.name.as_str()).cmp(&(b.building.as_str(), b.floor, b.name.as_str()))
        });
        rooms
    }

    pub async fn get_room(&self, id: Ulid) -> Result<Room, EngineError> {
        let rs = self.store.get_room(&id).ok_or(EngineError::NotFound(id))?;
        Ok(rs.read().await.room.clone())
    }

    /// Free spans within opening hours on `date`, at least `min_minutes` long.
    pub async fn room_availability(
        &self,
        id: Ulid,
        date: NaiveDate,
        min_minutes: Minute,
    ) -> Result<Vec<Span>, EngineError> {
        let rs = self.store.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        Ok(free_spans(&guard.calendar, date, self.policy.opening_hours, min_minutes))
    }

    /// Active bookings for a room, ascending by slot.
    pub async fn room_schedule(&self, id: Ulid, date: Option<NaiveDate>) -> Result<Vec<Reservation>, EngineError> {
        let rs = self.store.get_room(&id).ok_or(EngineError::NotFound(id))?;
        let guard = rs.read().await;
        let ids: Vec<Ulid> = match date {
            Some(d) => guard.calendar.on_date(d).map(|e| e.reservation_id).collect(),
            None => guard.calendar.entries.iter().map(|e| e.reservation_id).collect(),
        };
        let mut out = Vec::with_capacity(ids.len());
        for rid in ids {
            if let Some(shared) = self.store.get_reservation(&rid) {
                out.push(shared.read().await.clone());
            }
        }
        Ok(out)
    }

    // ── Parking ──────────────────────────────────────────────

    pub async fn list_spots(&self, filter: &SpotFilter) -> Vec<ParkingSpot> {
        let mut spots = Vec::new();
        for shared in self.store.spots() {
            let guard = shared.read().await;
            if matches_spot(&guard, filter) {
                spots.push(guard.clone());
            }
        }
        spots.sort_by(|a, b| (a.zone.as_str(), a.spot_number.as_str()).cmp(&(b.zone.as_str(), b.spot_number.as_str())));
        spots
    }

    pub async fn get_spot(&self, id: Ulid) -> Result<ParkingSpot, EngineError> {
        let shared = self.store.get_spot(&id).ok_or(EngineError::NotFound(id))?;
        Ok(shared.read().await.clone())
    }

    pub async fn parking_stats(&self) -> ParkingStats {
        let mut stats = ParkingStats::default();
        for shared in self.store.spots() {
            stats.total += 1;
            match shared.read().await.status {
                ResourceStatus::Available => stats.available += 1,
                ResourceStatus::Occupied => stats.occupied += 1,
                ResourceStatus::Reserved => stats.reserved += 1,
                ResourceStatus::Maintenance => stats.maintenance += 1,
            }
        }
        stats
    }

    // ── Reservations ─────────────────────────────────────────

    /// Owner or admin only; others get `Forbidden`.
    pub async fn get_reservation(&self, actor: &Requester, id: Ulid) -> Result<Reservation, EngineError> {
        let shared = self.store.get_reservation(&id).ok_or(EngineError::NotFound(id))?;
        let r = shared.read().await;
        if !actor.is_admin() && !actor.owns(&r.requester) {
            return Err(EngineError::Forbidden);
        }
        Ok(r.clone())
    }

    async fn visible_to(&self, actor: &Requester) -> Vec<Reservation> {
        let shared: Vec<SharedReservation> = if actor.is_admin() {
            self.store.reservations()
        } else {
            self.store
                .reservation_ids_for(&actor.id)
                .iter()
                .filter_map(|id| self.store.get_reservation(id))
                .collect()
        };
        let mut out = Vec::with_capacity(shared.len());
        for s in shared {
            out.push(s.read().await.clone());
        }
        out
    }

    /// The actor's own reservations (all of them for admins), newest first.
    pub async fn list_reservations(&self, actor: &Requester, domain: Option<Domain>) -> Vec<Reservation> {
        let mut out = self.visible_to(actor).await;
        out.retain(|r| domain.is_none_or(|d| r.domain() == d));
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out
    }

    /// The actor's active reservations across every domain, soonest first.
    pub async fn schedule(&self, actor: &Requester) -> Vec<Reservation> {
        let mut out = Vec::new();
        for id in self.store.reservation_ids_for(&actor.id) {
            if let Some(shared) = self.store.get_reservation(&id) {
                let r = shared.read().await;
                if is_active(&r) {
                    out.push(r.clone());
                }
            }
        }
        out.sort_by_key(|r| r.timeline_key());
        out
    }
}
