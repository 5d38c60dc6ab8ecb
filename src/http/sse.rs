//! Server-Sent Events endpoint.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::future;

use crate::events::CacherEvent;
use crate::http::server::AppState;

/// `GET /events`: the status snapshot, then live changes and heartbeats.
///
/// The stream ends when the client disconnects or the process shuts down.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.events.subscribe();
    let subscriber = subscription.id();
    tracing::info!(subscriber = %subscriber, "Event stream opened");

    let mut shutdown = state.shutdown.subscribe();
    let stream = subscription
        .into_stream()
        .filter_map(move |event| future::ready(to_sse(event)))
        .take_until(async move {
            let _ = shutdown.recv().await;
        })
        .map(Ok);

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: CacherEvent) -> Option<Event> {
    match event.data() {
        Ok(data) => Some(Event::default().event(event.name()).data(data)),
        Err(e) => {
            tracing::error!(event = event.name(), error = %e, "Failed to encode event");
            None
        }
    }
}
