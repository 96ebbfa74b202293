use super::helpers::{cas_update_load, fetch_bid, fetch_load, fetch_pending_bids, update_bid};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{types::Json, Acquire, Executor};
use uuid::Uuid;

use crate::{
    api::AcceptanceAPI,
    entities::{load, Booking, RejectionReason},
    error::Error,
    events::Event,
};

#[async_trait]
impl AcceptanceAPI for Engine {
    /// Atomically accepts one bid, rejects its pending siblings, flips the
    /// load to assigned and creates the booking. The version-guarded write on
    /// the load row is the single linearization point: every effect in this
    /// transaction happens after it and commits with it, or not at all. No
    /// retry on conflict; the caller re-fetches and decides.
    #[tracing::instrument(skip(self))]
    async fn accept_bid(
        &self,
        load_id: Uuid,
        bid_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Booking, Error> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut target = fetch_load(&mut tx, &load_id).await?;

        if actor_id != target.owner_id {
            return Err(Error::Forbidden {
                entity: "load",
                id: load_id,
                actor_id,
            });
        }

        if target.status != load::Status::Available {
            return Err(Error::Conflict(
                "load already matched or unavailable".into(),
            ));
        }

        let mut bid = fetch_bid(&mut tx, &bid_id).await?;

        if bid.load_id != load_id {
            return Err(Error::NotFound {
                entity: "bid",
                id: bid_id,
            });
        }

        // rejects non-pending and expired bids with a StateTransition error
        bid.accept(now)?;

        let expected = target.version;
        target.assign()?;

        if !cas_update_load(&mut tx, &target, expected).await? {
            // another acceptance (or a cancellation) won the race
            tracing::info!(%load_id, "lost acceptance race");
            return Err(Error::Conflict(
                "load already matched or unavailable".into(),
            ));
        }

        if !update_bid(&mut tx, &bid, "pending").await? {
            // the driver withdrew between our read and the write
            return Err(Error::Conflict("bid was settled concurrently".into()));
        }

        // Siblings read after the guarded write; a bid that lands later is
        // simply too late and stays pending on an assigned load.
        for mut sibling in fetch_pending_bids(&mut tx, &load_id).await? {
            if sibling.id == bid.id {
                continue;
            }

            sibling.reject(RejectionReason::AnotherBidAccepted)?;
            update_bid(&mut tx, &sibling, "pending").await?;
        }

        let booking = Booking::new(&target, &bid, now);

        tx.execute(
            sqlx::query("INSERT INTO bookings (id, load_id, status, data) VALUES ($1, $2, $3, $4)")
                .bind(&booking.id)
                .bind(&booking.load_id)
                .bind(booking.status.name())
                .bind(Json(&booking)),
        )
        .await?;

        tx.commit().await?;

        self.events.emit(Event::BidAccepted {
            load_id,
            bid_id,
            booking_id: booking.id,
        });

        Ok(booking)
    }
}
