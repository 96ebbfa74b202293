use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{booking, Bid, Booking, Load, LoadAttrs, Proposal, TrackingEntry, TrackingMeta};
use crate::error::Error;

#[async_trait]
pub trait LoadAPI {
    async fn create_load(&self, owner_id: Uuid, attrs: LoadAttrs) -> Result<Load, Error>;
    async fn find_load(&self, id: Uuid) -> Result<Load, Error>;
    async fn cancel_load(&self, id: Uuid, actor_id: Uuid) -> Result<Load, Error>;
}

#[async_trait]
pub trait BidAPI {
    async fn submit_bid(
        &self,
        load_id: Uuid,
        driver_id: Uuid,
        amount: i64,
        proposal: Proposal,
    ) -> Result<Bid, Error>;

    async fn find_bid(&self, id: Uuid) -> Result<Bid, Error>;

    async fn withdraw_bid(&self, id: Uuid, driver_id: Uuid) -> Result<Bid, Error>;

    /// Pending bids on a load, submission time ascending.
    async fn list_pending_bids(&self, load_id: Uuid) -> Result<Vec<Bid>, Error>;
}

/// The one operation that spans two aggregates. At most one bid per load can
/// ever be accepted; concurrent callers lose with `Error::Conflict`.
#[async_trait]
pub trait AcceptanceAPI {
    async fn accept_bid(&self, load_id: Uuid, bid_id: Uuid, actor_id: Uuid)
        -> Result<Booking, Error>;
}

#[async_trait]
pub trait BookingAPI {
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error>;

    async fn append_tracking_update(
        &self,
        booking_id: Uuid,
        new_status: booking::Status,
        meta: TrackingMeta,
    ) -> Result<Booking, Error>;

    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error>;

    async fn tracking_log(&self, booking_id: Uuid) -> Result<Vec<TrackingEntry>, Error>;
}

pub trait API: LoadAPI + BidAPI + AcceptanceAPI + BookingAPI {}

pub type DynAPI = Arc<dyn API + Send + Sync>;
