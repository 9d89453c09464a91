//! Hard input limits. Anything beyond these is rejected with `LimitExceeded`.

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_TEXT_LEN: usize = 2_000;
pub const MAX_USER_ID_LEN: usize = 128;
pub const MAX_AMENITIES: usize = 32;

pub const MAX_ROOMS: usize = 10_000;
pub const MAX_SPOTS: usize = 50_000;
pub const MAX_ROOM_CAPACITY: u32 = 5_000;

/// Upper bound on a single booking's length.
pub const MAX_SLOT_MINUTES: u16 = 12 * 60;
pub const DEFAULT_CONSULT_MINUTES: u16 = 30;
pub const CLINIC_SLOT_MINUTES: u16 = 30;

pub const MAX_ORDER_ITEMS: usize = 50;
pub const MAX_ITEM_QUANTITY: u32 = 100;
pub const MAX_UNIT_PRICE_CENTS: i64 = 10_000_000;

pub const MAX_LOAN_DAYS: i64 = 365;

/// Active (non-terminal) reservations one requester may hold at once.
pub const MAX_ACTIVE_PER_REQUESTER: usize = 200;
