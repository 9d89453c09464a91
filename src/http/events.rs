//! Server-sent event feeds: the parking map and per-room calendars.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::model::{Event, Topic};
use crate::observability::SSE_SUBSCRIBERS;

use super::dto::{ChangeView, parse_id};
use super::{ApiResult, AppState};

/// Keeps the subscriber gauge in step with open streams.
struct Subscription {
    rx: broadcast::Receiver<Event>,
}

impl Subscription {
    fn new(rx: broadcast::Receiver<Event>) -> Self {
        metrics::gauge!(SSE_SUBSCRIBERS).increment(1.0);
        Self { rx }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        metrics::gauge!(SSE_SUBSCRIBERS).decrement(1.0);
    }
}

fn to_sse(event: Event) -> SseEvent {
    let change = ChangeView::from(event);
    let data = serde_json::to_string(&change).unwrap_or_else(|_| "{}".into());
    SseEvent::default().event(change.name()).data(data)
}

fn feed(rx: broadcast::Receiver<Event>) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    futures::stream::unfold(Subscription::new(rx), |mut sub| async move {
        loop {
            match sub.rx.recv().await {
                Ok(event) => return Some((Ok(to_sse(event)), sub)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event feed subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
}

fn keep_alive() -> KeepAlive {
    KeepAlive::new().interval(Duration::from_secs(15))
}

pub async fn parking_feed(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    Sse::new(feed(state.engine.notify.subscribe(Topic::Parking))).keep_alive(keep_alive())
}

pub async fn room_feed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>> {
    let id = parse_id(&id)?;
    state.engine.get_room(id).await?;
    let rx = state.engine.notify.subscribe(Topic::Room(id));
    Ok(Sse::new(feed(rx)).keep_alive(keep_alive()))
}
