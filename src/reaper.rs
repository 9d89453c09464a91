use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::engine::{Action, Engine};
use crate::model::{Domain, Requester};
use crate::observability::OVERDUE_MARKED_TOTAL;

/// One pass of the overdue sweep. Returns how many loans were marked.
pub async fn sweep_overdue(engine: &Engine) -> usize {
    let now = chrono::Utc::now();
    let system = Requester::system();
    let mut marked = 0;
    for id in engine.collect_overdue_loans(now).await {
        match engine
            .transition(&system, id, Some(Domain::Library), Action::MarkOverdue)
            .await
        {
            Ok(_) => {
                marked += 1;
                info!("loan {id} is overdue");
            }
            Err(e) => {
                // Returned between collection and transition.
                tracing::debug!("overdue sweep skip {id}: {e}");
            }
        }
    }
    metrics::counter!(OVERDUE_MARKED_TOTAL).increment(marked as u64);
    marked
}

/// Background task that periodically moves loans past their due date to
/// `overdue`.
pub async fn run_overdue_sweep(engine: Arc<Engine>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        sweep_overdue(&engine).await;
    }
}

/// Background task that compacts the WAL once enough appends pile up.
pub async fn run_compactor(engine: Arc<Engine>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = engine.wal_appends_since_compact().await;
        if appends < threshold {
            tracing::debug!(appends, threshold, "compaction not needed");
            continue;
        }
        match engine.compact_wal().await {
            Ok(true) => {}
            Ok(false) => tracing::debug!("compaction skipped, store busy"),
            Err(e) => tracing::error!("WAL compaction failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Policy;
    use crate::model::*;
    use crate::notify::NotifyHub;
    use std::path::PathBuf;

    fn test_wal_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("nextsus_test_reaper");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn sweep_marks_only_past_due_loans() {
        let path = test_wal_path("sweep_overdue.wal");
        let engine = Engine::new(path, Arc::new(NotifyHub::new()), Policy::default()).unwrap();
        let student = Requester::student("s-1");

        let loan = engine
            .borrow_book(
                &student,
                BorrowRequest {
                    title: "Compilers".into(),
                    author: None,
                    isbn: None,
                    due_at: chrono::Utc::now() + chrono::Duration::milliseconds(50),
                },
            )
            .await
            .unwrap();
        let later = engine
            .borrow_book(
                &student,
                BorrowRequest {
                    title: "Networks".into(),
                    author: None,
                    isbn: None,
                    due_at: chrono::Utc::now() + chrono::Duration::days(14),
                },
            )
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(sweep_overdue(&engine).await, 1);
        // Idempotent: already overdue.
        assert_eq!(sweep_overdue(&engine).await, 0);

        let r = engine.get_reservation(&student, loan.id).await.unwrap();
        let Detail::Library(b) = &r.detail else { unreachable!() };
        assert_eq!(b.status, BorrowStatus::Overdue);
        let r = engine.get_reservation(&student, later.id).await.unwrap();
        let Detail::Library(b) = &r.detail else { unreachable!() };
        assert_eq!(b.status, BorrowStatus::Borrowed);
    }
}
