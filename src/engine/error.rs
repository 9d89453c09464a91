use ulid::Ulid;

use crate::model::ResourceStatus;

use super::transition::Action;

#[derive(Debug)]
pub enum EngineError {
    NotFound(Ulid),
    Forbidden,
    /// Overlaps the active reservation with this id.
    Conflict(Ulid),
    /// Single-occupancy resource is not free.
    Unavailable {
        id: Ulid,
        status: ResourceStatus,
    },
    InvalidRange,
    InvalidInput(&'static str),
    InvalidTransition {
        from: &'static str,
        action: Action,
    },
    HasActiveReservations(Ulid),
    LimitExceeded(&'static str),
    WalError(String),
}

impl EngineError {
    /// Conflict-class errors: the request was valid but the resource is taken.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::Conflict(_) | EngineError::Unavailable { .. }
        )
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::Forbidden => write!(f, "access denied"),
            EngineError::Conflict(id) => {
                write!(f, "already booked for this time slot (conflicts with {id})")
            }
            EngineError::Unavailable { id, status } => {
                write!(f, "resource {id} is not available (status: {status:?})")
            }
            EngineError::InvalidRange => write!(f, "invalid time range: end must be after start"),
            EngineError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            EngineError::InvalidTransition { from, action } => {
                write!(f, "cannot {} from status {from}", action.label())
            }
            EngineError::HasActiveReservations(id) => {
                write!(f, "resource {id} still has active reservations")
            }
            EngineError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            EngineError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
