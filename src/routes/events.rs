use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt};

use crate::feed::{Notification, Subscription};

/// Serve a change subscription as server-sent events.
///
/// `change` carries the JSON event, `resync` tells the client it missed
/// events and must refetch. The subscription ends when the client goes away.
pub fn sse_from(
    subscription: Subscription,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let stream = subscription.into_stream().map(|notification| Ok(to_event(notification)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_event(notification: Notification) -> Event {
    match notification {
        Notification::Change(change) => match Event::default().event("change").json_data(&change) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "failed to encode change event");
                Event::default().event("resync").data("0")
            }
        },
        Notification::Resync { missed } => Event::default()
            .event("resync")
            .data(missed.to_string()),
    }
}
