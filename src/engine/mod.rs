mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;
mod store;
pub mod transition;

pub use availability::{free_spans, merge_overlapping, subtract_intervals};
pub use conflict::find_conflict;
pub use error::EngineError;
pub use store::Store;
pub use transition::{Action, Initiator, Lifecycle, is_active, overdue_fine, status_label};

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc, oneshot};

use crate::model::*;
use crate::notify::NotifyHub;
use crate::wal::Wal;

pub type SharedRoom = Arc<RwLock<RoomState>>;
pub type SharedCalendar = Arc<RwLock<Calendar>>;
pub type SharedSpot = Arc<RwLock<ParkingSpot>>;
pub type SharedReservation = Arc<RwLock<Reservation>>;

/// Tunables that change engine outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub fine_per_day: Cents,
    /// Bookable window used by availability queries.
    pub opening_hours: Span,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            fine_per_day: 1_000,
            opening_hours: Span::new(7 * 60, 22 * 60),
        }
    }
}

// ── Group-commit WAL channel ─────────────────────────────

pub(super) enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit:
/// block for the first append, drain whatever else is queued, then one
/// `flush_sync` for the whole batch and answer every sender.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];
                let mut deferred = None;

                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                        Ok(other) => {
                            deferred = Some(other);
                            break;
                        }
                        Err(_) => break, // channel empty, flush batch
                    }
                }

                commit_batch(&mut wal, &mut batch);
                if let Some(other) = deferred {
                    handle_non_append(&mut wal, other);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn commit_batch(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let started = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(wal: &mut Wal, batch: &[(Event, oneshot::Sender<io::Result<()>>)]) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Flush even after an append error so partial bytes don't leak into the next batch.
    let flush_err = wal.flush_sync().err();
    match (append_err, flush_err) {
        (Some(e), _) | (None, Some(e)) => Err(e),
        (None, None) => Ok(()),
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

pub struct Engine {
    pub(super) store: Store,
    pub(super) wal_tx: mpsc::Sender<WalCommand>,
    /// Commits hold this shared; compaction holds it exclusively so a
    /// snapshot never misses an event appended to the old log.
    pub(super) commit_gate: RwLock<()>,
    pub notify: Arc<NotifyHub>,
    pub(super) policy: Policy,
}

impl Engine {
    /// Replay the WAL at `wal_path` and start its writer task. Must be called
    /// inside a tokio runtime.
    pub fn new(wal_path: PathBuf, notify: Arc<NotifyHub>, policy: Policy) -> io::Result<Self> {
        let events = Wal::replay(&wal_path)?;
        let replayed = events.len();
        let store = Store::replay(events);
        let wal = Wal::open(&wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        tracing::info!(
            replayed,
            rooms = store.room_count(),
            spots = store.spot_count(),
            reservations = store.reservation_count(),
            "engine state restored from {}",
            wal_path.display()
        );

        Ok(Self {
            store,
            wal_tx,
            commit_gate: RwLock::new(()),
            notify,
            policy,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Write event to WAL via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), EngineError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append {
                event: event.clone(),
                response: tx,
            })
            .await
            .map_err(|_| EngineError::WalError("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| EngineError::WalError("WAL writer dropped response".into()))?
            .map_err(|e| EngineError::WalError(e.to_string()))
    }

    /// WAL-append, then apply in memory, then notify. `apply` runs only once
    /// the event is durable.
    pub(super) async fn commit(
        &self,
        event: Event,
        apply: impl FnOnce(&Event),
    ) -> Result<(), EngineError> {
        let _gate = self.commit_gate.read().await;
        self.wal_append(&event).await?;
        apply(&event);
        if let Some(topic) = event.topic() {
            self.notify.send(topic, &event);
        }
        Ok(())
    }

    /// Calendar that must be locked before a reservation with this key is mutated.
    pub(super) fn calendar_for(&self, key: &CalendarKey) -> Option<CalendarHandle> {
        match key {
            CalendarKey::Room(id) => self.store.get_room(id).map(CalendarHandle::Room),
            CalendarKey::Faculty(name) => Some(CalendarHandle::Shared(self.store.faculty_calendar(name))),
            CalendarKey::Clinic => Some(CalendarHandle::Shared(self.store.clinic())),
        }
    }
}

/// Either a room (calendar embedded in its state) or a standalone calendar.
pub(super) enum CalendarHandle {
    Room(SharedRoom),
    Shared(SharedCalendar),
}

/// Write guard over whichever calendar a reservation lives in.
pub(super) enum CalendarGuard {
    Room(tokio::sync::OwnedRwLockWriteGuard<RoomState>),
    Shared(tokio::sync::OwnedRwLockWriteGuard<Calendar>),
}

impl CalendarHandle {
    pub(super) async fn write(self) -> CalendarGuard {
        match self {
            CalendarHandle::Room(rs) => CalendarGuard::Room(rs.write_owned().await),
            CalendarHandle::Shared(cal) => CalendarGuard::Shared(cal.write_owned().await),
        }
    }
}

impl CalendarGuard {
    pub(super) fn calendar_mut(&mut self) -> &mut Calendar {
        match self {
            CalendarGuard::Room(rs) => &mut rs.calendar,
            CalendarGuard::Shared(cal) => cal,
        }
    }
}
