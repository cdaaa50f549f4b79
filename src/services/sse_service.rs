//! Server-Sent Events subscription plumbing for match fan-out channels.

use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dto::{matches::MatchView, sse::ServerEvent},
    error::ServiceError,
    services::{match_service, sse_events},
    state::SharedState,
};

/// Everything a new subscriber needs to start streaming: the live receiver
/// and the snapshot it resyncs from.
pub struct Subscription {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub snapshot: MatchView,
}

/// Subscribe a participant to a match's fan-out channel.
///
/// Authorizes against the persisted record, registers the participant on the
/// channel's presence roster, and announces the updated roster to everyone
/// already connected. The snapshot is captured after subscribing, so no
/// delta published in between can be missed.
pub async fn subscribe(
    state: &SharedState,
    code: &str,
    participant: Uuid,
) -> Result<Subscription, ServiceError> {
    let record = match_service::load_match(state, code).await?;
    match_service::ensure_participant(&record, participant)?;

    let channel = state.fanout().channel(code);
    let receiver = channel.subscribe();
    channel.join(participant);

    let record = match_service::load_match(state, code).await?;
    let snapshot = MatchView::from(&record);

    sse_events::broadcast_presence(state, code, channel.roster());
    info!(code, participant = %participant, "sse subscriber connected");

    Ok(Subscription {
        receiver,
        snapshot,
    })
}

/// Convert a subscription into an SSE response.
///
/// The snapshot goes out first, then events are forwarded from the broadcast
/// channel until either side closes. Teardown runs in the forwarder task so
/// presence is released even when the request context is long gone.
pub fn to_sse_stream(
    state: SharedState,
    code: String,
    participant: Uuid,
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        snapshot,
    } = subscription;

    // Small bounded channel between the forwarder and the response body.
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(event) = sse_events::snapshot_event(snapshot)
            && tx.send(Ok(to_event(event))).await.is_err()
        {
            teardown(&state, &code, participant);
            return;
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(_)) => {
                            // Skip lagged messages but keep the stream alive.
                            continue;
                        }
                    }
                }
            }
        }

        teardown(&state, &code, participant);
    });

    // The response stream reads from the mpsc side. Axum drops it when the
    // client disconnects, which closes `tx` and wakes the forwarder.
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

fn teardown(state: &SharedState, code: &str, participant: Uuid) {
    if let Some(channel) = state.fanout().get(code) {
        channel.leave(participant);
        sse_events::broadcast_presence(state, code, channel.roster());
    }
    info!(code, participant = %participant, "sse subscriber disconnected");
}
