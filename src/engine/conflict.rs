use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn validate_slot(slot: &Slot) -> Result<(), EngineError> {
    if slot.span.end <= slot.span.start {
        return Err(EngineError::InvalidRange);
    }
    if slot.span.duration() > MAX_SLOT_MINUTES {
        return Err(EngineError::LimitExceeded("time slot too long"));
    }
    Ok(())
}

/// First entry overlapping `requested`, ignoring `exclude` (the reservation
/// being rescheduled). Entries are expected to be active reservations only.
pub fn find_conflict<'a>(
    entries: impl IntoIterator<Item = &'a CalendarEntry>,
    requested: &Slot,
    exclude: Option<Ulid>,
) -> Option<Ulid> {
    entries
        .into_iter()
        .filter(|e| Some(e.reservation_id) != exclude)
        .find(|e| e.slot.overlaps(requested))
        .map(|e| e.reservation_id)
}

/// Time-range rule: `[s1,e1)` and `[s2,e2)` on the same date conflict iff
/// `s1 < e2 && e1 > s2`.
pub(crate) fn check_no_conflict(
    calendar: &Calendar,
    requested: &Slot,
    exclude: Option<Ulid>,
) -> Result<(), EngineError> {
    validate_slot(requested)?;
    match find_conflict(calendar.overlapping(requested), requested, exclude) {
        Some(id) => Err(EngineError::Conflict(id)),
        None => Ok(()),
    }
}

/// Exclusivity rule for single-occupancy resources: anything but `available`
/// conflicts with a new occupy or booking request, regardless of time.
pub(crate) fn check_exclusive(id: Ulid, status: ResourceStatus) -> Result<(), EngineError> {
    match status {
        ResourceStatus::Available => Ok(()),
        status => Err(EngineError::Unavailable { id, status }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 3).unwrap()
    }

    fn calendar_with(spans: &[(Minute, Minute)]) -> (Calendar, Vec<Ulid>) {
        let mut cal = Calendar::new();
        let mut ids = Vec::new();
        for &(s, e) in spans {
            let id = Ulid::new();
            cal.insert(CalendarEntry {
                reservation_id: id,
                slot: Slot::new(day(), Span::new(s, e)),
            });
            ids.push(id);
        }
        (cal, ids)
    }

    #[test]
    fn overlap_is_conflict() {
        let (cal, ids) = calendar_with(&[(540, 600)]);
        let req = Slot::new(day(), Span::new(570, 630));
        match check_no_conflict(&cal, &req, None) {
            Err(EngineError::Conflict(id)) => assert_eq!(id, ids[0]),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_is_not_conflict() {
        let (cal, _) = calendar_with(&[(540, 600)]);
        let after = Slot::new(day(), Span::new(600, 660));
        let before = Slot::new(day(), Span::new(480, 540));
        assert!(check_no_conflict(&cal, &after, None).is_ok());
        assert!(check_no_conflict(&cal, &before, None).is_ok());
    }

    #[test]
    fn containing_request_conflicts() {
        let (cal, _) = calendar_with(&[(600, 615)]);
        let req = Slot::new(day(), Span::new(540, 720));
        assert!(check_no_conflict(&cal, &req, None).is_err());
    }

    #[test]
    fn other_date_is_not_conflict() {
        let (cal, _) = calendar_with(&[(540, 600)]);
        let req = Slot::new(day().succ_opt().unwrap(), Span::new(540, 600));
        assert!(check_no_conflict(&cal, &req, None).is_ok());
    }

    #[test]
    fn excluded_entry_is_ignored() {
        let (cal, ids) = calendar_with(&[(540, 600)]);
        let req = Slot::new(day(), Span::new(550, 610));
        assert!(check_no_conflict(&cal, &req, Some(ids[0])).is_ok());
    }

    #[test]
    fn zero_length_request_is_invalid() {
        let (cal, _) = calendar_with(&[]);
        let req = Slot {
            date: day(),
            span: Span { start: 600, end: 600 },
        };
        assert!(matches!(check_no_conflict(&cal, &req, None), Err(EngineError::InvalidRange)));
    }

    #[test]
    fn overlong_request_is_rejected() {
        let (cal, _) = calendar_with(&[]);
        let req = Slot::new(day(), Span::new(0, MAX_SLOT_MINUTES + 1));
        assert!(matches!(check_no_conflict(&cal, &req, None), Err(EngineError::LimitExceeded(_))));
    }

    #[test]
    fn exclusivity() {
        let id = Ulid::new();
        assert!(check_exclusive(id, ResourceStatus::Available).is_ok());
        for status in [ResourceStatus::Occupied, ResourceStatus::Reserved, ResourceStatus::Maintenance] {
            let err = check_exclusive(id, status).unwrap_err();
            assert!(err.is_conflict());
        }
    }
}
