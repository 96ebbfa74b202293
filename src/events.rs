use async_channel::{Receiver, Sender};
use serde::Serialize;
use uuid::Uuid;

/// Lifecycle events emitted to the audit/notification sink. Delivery is
/// at-least-once at best; the engine never rolls back a committed
/// transaction because an event could not be queued.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    BidPlaced {
        load_id: Uuid,
        bid_id: Uuid,
        driver_id: Uuid,
    },
    BidWithdrawn {
        load_id: Uuid,
        bid_id: Uuid,
        driver_id: Uuid,
    },
    BidAccepted {
        load_id: Uuid,
        bid_id: Uuid,
        booking_id: Uuid,
    },
    BookingStatusChanged {
        booking_id: Uuid,
        load_id: Uuid,
        status: String,
    },
    LoadCancelled {
        load_id: Uuid,
    },
    LoadReopened {
        load_id: Uuid,
    },
}

#[derive(Clone)]
pub struct EventSink {
    tx: Sender<Event>,
}

impl EventSink {
    pub fn new(capacity: usize) -> (Self, Receiver<Event>) {
        let (tx, rx) = async_channel::bounded(capacity);

        (Self { tx }, rx)
    }

    /// Fire-and-forget emission. A full or closed channel drops the event
    /// with a warning; the originating transaction has already committed.
    pub fn emit(&self, event: Event) {
        if let Err(err) = self.tx.try_send(event) {
            tracing::warn!(?err, "dropping lifecycle event");
        }
    }
}
