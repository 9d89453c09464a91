//! Lifecycle tables for every reservation domain and for resource occupancy.
//!
//! Each status enum declares its legal moves as a table of [`Rule`]s; one
//! generic [`transition`] function authorizes and applies them. A status with
//! no outgoing rule is terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::*;

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Confirm,
    Start,
    Prepare,
    MarkReady,
    Complete,
    Cancel,
    MarkOverdue,
    Return,
    Occupy,
    Reserve,
    Release,
    BeginMaintenance,
    EndMaintenance,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Confirm => "confirm",
            Action::Start => "start",
            Action::Prepare => "prepare",
            Action::MarkReady => "mark-ready",
            Action::Complete => "complete",
            Action::Cancel => "cancel",
            Action::MarkOverdue => "mark-overdue",
            Action::Return => "return",
            Action::Occupy => "occupy",
            Action::Reserve => "reserve",
            Action::Release => "release",
            Action::BeginMaintenance => "begin-maintenance",
            Action::EndMaintenance => "end-maintenance",
        }
    }
}

/// Who may invoke a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initiator {
    Anyone,
    OwnerOrAdmin,
    Admin,
}

#[derive(Debug)]
pub struct Rule<S: 'static> {
    pub action: Action,
    pub from: &'static [S],
    pub to: S,
    pub initiator: Initiator,
}

pub trait Lifecycle: Copy + Eq + std::fmt::Debug + 'static {
    fn rules() -> &'static [Rule<Self>];

    fn label(self) -> &'static str;

    /// Whether this status holds the resource or time slot.
    fn is_active(self) -> bool;

    fn is_terminal(self) -> bool {
        !Self::rules().iter().any(|r| r.from.contains(&self))
    }
}

impl Lifecycle for BookingStatus {
    fn rules() -> &'static [Rule<Self>] {
        use BookingStatus::*;
        &[
            Rule { action: Action::Confirm, from: &[Pending], to: Confirmed, initiator: Initiator::Admin },
            Rule { action: Action::Cancel, from: &[Pending, Confirmed], to: Cancelled, initiator: Initiator::OwnerOrAdmin },
            Rule { action: Action::Complete, from: &[Confirmed], to: Completed, initiator: Initiator::Admin },
        ]
    }

    fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl Lifecycle for HealthStatus {
    fn rules() -> &'static [Rule<Self>] {
        use HealthStatus::*;
        &[
            Rule { action: Action::Start, from: &[Scheduled], to: InProgress, initiator: Initiator::Admin },
            Rule { action: Action::Cancel, from: &[Scheduled, InProgress], to: Cancelled, initiator: Initiator::OwnerOrAdmin },
            Rule { action: Action::Complete, from: &[InProgress], to: Completed, initiator: Initiator::Admin },
        ]
    }

    fn label(self) -> &'static str {
        match self {
            HealthStatus::Scheduled => "scheduled",
            HealthStatus::InProgress => "in-progress",
            HealthStatus::Completed => "completed",
            HealthStatus::Cancelled => "cancelled",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, HealthStatus::Scheduled | HealthStatus::InProgress)
    }
}

impl Lifecycle for OrderStatus {
    fn rules() -> &'static [Rule<Self>] {
        use OrderStatus::*;
        &[
            Rule { action: Action::Prepare, from: &[Pending], to: Preparing, initiator: Initiator::Admin },
            Rule { action: Action::MarkReady, from: &[Preparing], to: Ready, initiator: Initiator::Admin },
            Rule { action: Action::Complete, from: &[Ready], to: Completed, initiator: Initiator::Admin },
            Rule { action: Action::Cancel, from: &[Pending, Preparing, Ready], to: Cancelled, initiator: Initiator::OwnerOrAdmin },
        ]
    }

    fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl Lifecycle for BorrowStatus {
    fn rules() -> &'static [Rule<Self>] {
        use BorrowStatus::*;
        &[
            Rule { action: Action::MarkOverdue, from: &[Borrowed], to: Overdue, initiator: Initiator::Admin },
            Rule { action: Action::Return, from: &[Borrowed, Overdue], to: Returned, initiator: Initiator::OwnerOrAdmin },
        ]
    }

    fn label(self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Overdue => "overdue",
            BorrowStatus::Returned => "returned",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, BorrowStatus::Borrowed | BorrowStatus::Overdue)
    }
}

/// Occupancy of rooms and parking spots. For `Release` the owner is the
/// current occupant.
impl Lifecycle for ResourceStatus {
    fn rules() -> &'static [Rule<Self>] {
        use ResourceStatus::*;
        &[
            Rule { action: Action::Occupy, from: &[Available], to: Occupied, initiator: Initiator::Anyone },
            Rule { action: Action::Reserve, from: &[Available], to: Reserved, initiator: Initiator::Admin },
            Rule { action: Action::Release, from: &[Occupied, Reserved], to: Available, initiator: Initiator::OwnerOrAdmin },
            Rule { action: Action::BeginMaintenance, from: &[Available], to: Maintenance, initiator: Initiator::Admin },
            Rule { action: Action::EndMaintenance, from: &[Maintenance], to: Available, initiator: Initiator::Admin },
        ]
    }

    fn label(self) -> &'static str {
        match self {
            ResourceStatus::Available => "available",
            ResourceStatus::Occupied => "occupied",
            ResourceStatus::Reserved => "reserved",
            ResourceStatus::Maintenance => "maintenance",
        }
    }

    fn is_active(self) -> bool {
        matches!(self, ResourceStatus::Occupied | ResourceStatus::Reserved)
    }
}

fn authorize(initiator: Initiator, actor: &Requester, owner: Option<&UserId>) -> Result<(), EngineError> {
    let allowed = match initiator {
        Initiator::Anyone => true,
        Initiator::OwnerOrAdmin => actor.is_admin() || owner.is_some_and(|o| actor.owns(o)),
        Initiator::Admin => actor.is_admin(),
    };
    if allowed { Ok(()) } else { Err(EngineError::Forbidden) }
}

/// Authorize `action` for `actor` and return the status it leads to.
pub fn transition<S: Lifecycle>(
    current: S,
    action: Action,
    actor: &Requester,
    owner: Option<&UserId>,
) -> Result<S, EngineError> {
    let rule = S::rules()
        .iter()
        .find(|r| r.action == action)
        .ok_or(EngineError::InvalidTransition {
            from: current.label(),
            action,
        })?;
    authorize(rule.initiator, actor, owner)?;
    if !rule.from.contains(&current) {
        return Err(EngineError::InvalidTransition {
            from: current.label(),
            action,
        });
    }
    Ok(rule.to)
}

/// The action that moves `current` to `target`, if the table has one.
pub fn action_towards<S: Lifecycle>(current: S, target: S) -> Option<Action> {
    S::rules()
        .iter()
        .find(|r| r.to == target && r.from.contains(&current))
        .map(|r| r.action)
}

pub fn is_active(reservation: &Reservation) -> bool {
    match &reservation.detail {
        Detail::Room(b) => b.status.is_active(),
        Detail::Faculty(c) => c.status.is_active(),
        Detail::Health(a) => a.status.is_active(),
        Detail::Canteen(o) => o.status.is_active(),
        Detail::Library(b) => b.status.is_active(),
    }
}

pub fn status_label(reservation: &Reservation) -> &'static str {
    match &reservation.detail {
        Detail::Room(b) => b.status.label(),
        Detail::Faculty(c) => c.status.label(),
        Detail::Health(a) => a.status.label(),
        Detail::Canteen(o) => o.status.label(),
        Detail::Library(b) => b.status.label(),
    }
}

/// `ceil(days late) × per_day`; zero when returned on time.
pub fn overdue_fine(due_at: DateTime<Utc>, returned_at: DateTime<Utc>, per_day: Cents) -> Cents {
    const DAY_MS: i64 = 86_400_000;
    let late_ms = (returned_at - due_at).num_milliseconds();
    if late_ms <= 0 {
        return 0;
    }
    let days = (late_ms + DAY_MS - 1) / DAY_MS;
    days * per_day
}

/// Apply `action` to a reservation in place, including side effects such as
/// the return timestamp and fine for library loans.
pub(crate) fn advance(
    reservation: &mut Reservation,
    action: Action,
    actor: &Requester,
    at: DateTime<Utc>,
    fine_per_day: Cents,
) -> Result<(), EngineError> {
    let owner = Some(&reservation.requester);
    match &mut reservation.detail {
        Detail::Room(b) => b.status = transition(b.status, action, actor, owner)?,
        Detail::Faculty(c) => c.status = transition(c.status, action, actor, owner)?,
        Detail::Health(a) => a.status = transition(a.status, action, actor, owner)?,
        Detail::Canteen(o) => o.status = transition(o.status, action, actor, owner)?,
        Detail::Library(b) => {
            b.status = transition(b.status, action, actor, owner)?;
            if b.status == BorrowStatus::Returned {
                b.returned_at = Some(at);
                b.fine = overdue_fine(b.due_at, at, fine_per_day);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn student() -> Requester {
        Requester::student("s-1")
    }

    #[test]
    fn booking_happy_path() {
        let admin = Requester::admin("a-1");
        let owner = UserId::new("s-1");
        let s = transition(BookingStatus::Pending, Action::Confirm, &admin, Some(&owner)).unwrap();
        assert_eq!(s, BookingStatus::Confirmed);
        let s = transition(s, Action::Complete, &admin, Some(&owner)).unwrap();
        assert_eq!(s, BookingStatus::Completed);
        assert!(s.is_terminal());
    }

    #[test]
    fn owner_may_cancel_but_not_confirm() {
        let owner = UserId::new("s-1");
        let s = transition(BookingStatus::Pending, Action::Cancel, &student(), Some(&owner)).unwrap();
        assert_eq!(s, BookingStatus::Cancelled);
        let err = transition(BookingStatus::Pending, Action::Confirm, &student(), Some(&owner));
        assert!(matches!(err, Err(EngineError::Forbidden)));
    }

    #[test]
    fn stranger_cannot_cancel() {
        let owner = UserId::new("a-1");
        let err = transition(BookingStatus::Confirmed, Action::Cancel, &student(), Some(&owner));
        assert!(matches!(err, Err(EngineError::Forbidden)));
    }

    #[test]
    fn terminal_states_never_move() {
        let admin = Requester::admin("a-1");
        let owner = UserId::new("s-1");
        for status in [BookingStatus::Completed, BookingStatus::Cancelled] {
            assert!(status.is_terminal());
            for rule in BookingStatus::rules() {
                let r = transition(status, rule.action, &admin, Some(&owner));
                assert!(matches!(r, Err(EngineError::InvalidTransition { .. })));
            }
        }
        assert!(OrderStatus::Completed.is_terminal());
        assert!(HealthStatus::Cancelled.is_terminal());
        assert!(BorrowStatus::Returned.is_terminal());
    }

    #[test]
    fn unknown_action_for_domain_is_invalid() {
        let owner = UserId::new("s-1");
        let r = transition(BookingStatus::Confirmed, Action::Return, &student(), Some(&owner));
        assert!(matches!(r, Err(EngineError::InvalidTransition { action: Action::Return, .. })));
    }

    #[test]
    fn completed_order_cannot_be_cancelled() {
        let owner = UserId::new("s-1");
        let r = transition(OrderStatus::Completed, Action::Cancel, &student(), Some(&owner));
        assert!(matches!(r, Err(EngineError::InvalidTransition { from: "completed", .. })));
    }

    #[test]
    fn order_kitchen_flow_is_admin_only() {
        let owner = UserId::new("s-1");
        let admin = Requester::admin("kitchen");
        assert!(matches!(
            transition(OrderStatus::Pending, Action::Prepare, &student(), Some(&owner)),
            Err(EngineError::Forbidden)
        ));
        let s = transition(OrderStatus::Pending, Action::Prepare, &admin, Some(&owner)).unwrap();
        let s = transition(s, Action::MarkReady, &admin, Some(&owner)).unwrap();
        let s = transition(s, Action::Complete, &admin, Some(&owner)).unwrap();
        assert_eq!(s, OrderStatus::Completed);
    }

    #[test]
    fn occupancy_toggles() {
        let s = transition(ResourceStatus::Available, Action::Occupy, &student(), None).unwrap();
        assert_eq!(s, ResourceStatus::Occupied);
        let occupant = UserId::new("s-1");
        let s = transition(s, Action::Release, &student(), Some(&occupant)).unwrap();
        assert_eq!(s, ResourceStatus::Available);
        let r = transition(s, Action::Release, &student(), Some(&occupant));
        assert!(matches!(r, Err(EngineError::InvalidTransition { .. })));
    }

    #[test]
    fn release_without_occupant_needs_admin() {
        let r = transition(ResourceStatus::Reserved, Action::Release, &student(), None);
        assert!(matches!(r, Err(EngineError::Forbidden)));
        let admin = Requester::admin("a-1");
        assert_eq!(
            transition(ResourceStatus::Reserved, Action::Release, &admin, None).unwrap(),
            ResourceStatus::Available
        );
    }

    #[test]
    fn action_towards_finds_table_path() {
        use ResourceStatus::*;
        assert_eq!(action_towards(Available, Maintenance), Some(Action::BeginMaintenance));
        assert_eq!(action_towards(Maintenance, Available), Some(Action::EndMaintenance));
        assert_eq!(action_towards(Occupied, Available), Some(Action::Release));
        assert_eq!(action_towards(Occupied, Maintenance), None);
    }

    #[test]
    fn fine_is_proportional_to_days_late() {
        let due = Utc::now();
        assert_eq!(overdue_fine(due, due - Duration::hours(5), 1000), 0);
        assert_eq!(overdue_fine(due, due, 1000), 0);
        assert_eq!(overdue_fine(due, due + Duration::days(3), 1000), 3000);
        // Partial days round up.
        assert_eq!(overdue_fine(due, due + Duration::days(2) + Duration::minutes(1), 1000), 3000);
    }

    #[test]
    fn returning_a_loan_records_fine() {
        let now = Utc::now();
        let mut loan = Reservation {
            id: ulid::Ulid::new(),
            requester: UserId::new("s-1"),
            created_at: now - Duration::days(17),
            detail: Detail::Library(Borrow {
                title: "Operating Systems".into(),
                author: None,
                isbn: None,
                borrowed_at: now - Duration::days(17),
                due_at: now - Duration::days(3),
                returned_at: None,
                fine: 0,
                status: BorrowStatus::Overdue,
            }),
        };
        advance(&mut loan, Action::Return, &student(), now, 1000).unwrap();
        let Detail::Library(b) = &loan.detail else { unreachable!() };
        assert_eq!(b.status, BorrowStatus::Returned);
        assert_eq!(b.returned_at, Some(now));
        assert_eq!(b.fine, 3000);
        assert!(!is_active(&loan));
    }
}
