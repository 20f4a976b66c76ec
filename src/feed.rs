//! In-process change feed.
//!
//! Services publish a [`ChangeEvent`] after a write commits. Subscribers get a
//! filtered, cancellable [`Subscription`]; dropping it unsubscribes. Delivery is
//! best-effort: a subscriber that falls behind the channel capacity is told to
//! resync and should refetch instead of trusting its local state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::{
    Stream, StreamExt,
    wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    CartItems,
    Orders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Uuid,
    /// Owner of the changed row.
    pub user_id: Uuid,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row_id: Uuid, user_id: Uuid) -> Self {
        Self {
            table,
            kind,
            row_id,
            user_id,
            at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: Table,
    pub user_id: Option<Uuid>,
    pub row_id: Option<Uuid>,
}

impl ChangeFilter {
    pub fn table(table: Table) -> Self {
        Self {
            table,
            user_id: None,
            row_id: None,
        }
    }

    pub fn for_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn for_row(mut self, row_id: Uuid) -> Self {
        self.row_id = Some(row_id);
        self
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table
            && self.user_id.is_none_or(|id| id == event.user_id)
            && self.row_id.is_none_or(|id| id == event.row_id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Change(ChangeEvent),
    /// Events were dropped before this subscriber saw them.
    Resync { missed: u64 },
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: ChangeEvent) {
        tracing::debug!(
            table = ?event.table,
            kind = ?event.kind,
            row_id = %event.row_id,
            "publishing change"
        );
        // No live subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    /// Next matching notification, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<Notification> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => {
                    return Some(Notification::Change(event));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => return Some(Notification::Resync { missed }),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Notification> + Send + 'static {
        let filter = self.filter;
        BroadcastStream::new(self.receiver).filter_map(move |item| match item {
            Ok(event) if filter.matches(&event) => Some(Notification::Change(event)),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(missed)) => Some(Notification::Resync { missed }),
        })
    }
}
