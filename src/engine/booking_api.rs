use super::helpers::{cas_update_load, fetch_active_booking, fetch_booking, fetch_load, update_booking};
use super::{Database, Engine};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Acquire, Transaction};
use uuid::Uuid;

use crate::{
    api::BookingAPI,
    entities::{booking, load, Booking, TrackingEntry, TrackingMeta},
    error::Error,
    events::Event,
};

#[async_trait]
impl BookingAPI for Engine {
    #[tracing::instrument(skip(self))]
    async fn find_booking(&self, id: Uuid) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        fetch_booking(&mut tx, &id).await
    }

    #[tracing::instrument(skip(self, meta))]
    async fn append_tracking_update(
        &self,
        booking_id: Uuid,
        new_status: booking::Status,
        meta: TrackingMeta,
    ) -> Result<Booking, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut booking = fetch_booking(&mut tx, &booking_id).await?;

        if meta.actor_id != booking.driver_id && meta.actor_id != booking.cargo_owner_id {
            return Err(Error::Forbidden {
                entity: "booking",
                id: booking_id,
                actor_id: meta.actor_id,
            });
        }

        let previous = booking.status.clone();
        booking.advance(new_status, meta, Utc::now())?;

        if !update_booking(&mut tx, &booking, previous.name()).await? {
            return Err(Error::Conflict("booking was updated concurrently".into()));
        }

        let reopened = sync_load(&mut tx, &booking).await?;

        tx.commit().await?;

        self.events.emit(Event::BookingStatusChanged {
            booking_id,
            load_id: booking.load_id,
            status: booking.status.name().into(),
        });

        if reopened {
            self.events.emit(Event::LoadReopened {
                load_id: booking.load_id,
            });
        }

        Ok(booking)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        reason: Option<String>,
    ) -> Result<Booking, Error> {
        self.append_tracking_update(
            booking_id,
            booking::Status::Cancelled,
            TrackingMeta {
                location: None,
                note: reason,
                actor_id,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn tracking_log(&self, booking_id: Uuid) -> Result<Vec<TrackingEntry>, Error> {
        let booking = self.find_booking(booking_id).await?;

        Ok(booking.tracking_log)
    }
}

/// Reflects booking progress onto the originating load. Every write is
/// version-guarded and best-effort: losing the race here means the load
/// moved on (cancelled or re-assigned) and must not be resurrected.
async fn sync_load(tx: &mut Transaction<'_, Database>, booking: &Booking) -> Result<bool, Error> {
    let mut target = fetch_load(tx, &booking.load_id).await?;
    let expected = target.version;

    let transition = match booking.status {
        booking::Status::PickedUp | booking::Status::InTransit => target.mark_in_transit(),
        booking::Status::Delivered => target.mark_delivered(),
        booking::Status::Cancelled => {
            // reopen only when no active booking survives and the owner has
            // not cancelled; mirroring may already have moved the load to
            // in_transit, which reopens the same way
            if !matches!(
                target.status,
                load::Status::Assigned | load::Status::InTransit
            ) || fetch_active_booking(tx, &booking.load_id).await?.is_some()
            {
                return Ok(false);
            }

            target.reopen()
        }
        booking::Status::Confirmed => return Ok(false),
    };

    if let Err(err) = transition {
        tracing::warn!(?err, load_id = %booking.load_id, "load did not follow booking status");
        return Ok(false);
    }

    if target.version == expected {
        return Ok(false);
    }

    if !cas_update_load(tx, &target, expected).await? {
        tracing::warn!(load_id = %booking.load_id, "load changed concurrently, skipping sync");
        return Ok(false);
    }

    Ok(target.status == load::Status::Available)
}
