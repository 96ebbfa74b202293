use super::helpers::{
    cas_update_load, fetch_active_booking, fetch_load, fetch_pending_bids, update_bid,
    update_booking,
};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::LoadAPI,
    entities::{booking, Load, LoadAttrs, RejectionReason, TrackingMeta},
    error::Error,
    events::Event,
};

#[async_trait]
impl LoadAPI for Engine {
    #[tracing::instrument(skip(self, attrs))]
    async fn create_load(&self, owner_id: Uuid, attrs: LoadAttrs) -> Result<Load, Error> {
        let load = Load::new(owner_id, attrs, Utc::now())?;

        let mut conn = self.pool.acquire().await?;

        conn.execute(
            sqlx::query("INSERT INTO loads (id, status, version, data) VALUES ($1, $2, $3, $4)")
                .bind(&load.id)
                .bind(load.status.name())
                .bind(load.version)
                .bind(Json(&load)),
        )
        .await?;

        Ok(load)
    }

    #[tracing::instrument(skip(self))]
    async fn find_load(&self, id: Uuid) -> Result<Load, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(load): Json<Load> = conn
            .fetch_optional(sqlx::query("SELECT data FROM loads WHERE id = $1").bind(&id))
            .await?
            .ok_or(Error::NotFound { entity: "load", id })?
            .try_get("data")?;

        Ok(load)
    }

    #[tracing::instrument(skip(self))]
    async fn cancel_load(&self, id: Uuid, actor_id: Uuid) -> Result<Load, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut load = fetch_load(&mut tx, &id).await?;

        if actor_id != load.owner_id {
            return Err(Error::Forbidden {
                entity: "load",
                id,
                actor_id,
            });
        }

        // A booking that has progressed past confirmation pins the load.
        let active_booking = fetch_active_booking(&mut tx, &id).await?;
        if let Some(ref existing) = active_booking {
            if existing.status != booking::Status::Confirmed {
                return Err(Error::Conflict(
                    "load has a booking already in progress".into(),
                ));
            }
        }

        // Booking first, then the load, matching the lock order of tracking
        // updates so the two paths cannot deadlock.
        if let Some(mut booking) = active_booking {
            booking.advance(
                booking::Status::Cancelled,
                TrackingMeta {
                    location: None,
                    note: Some("load cancelled by owner".into()),
                    actor_id,
                },
                Utc::now(),
            )?;

            if !update_booking(&mut tx, &booking, "confirmed").await? {
                return Err(Error::Conflict(
                    "booking was updated concurrently".into(),
                ));
            }
        }

        let expected = load.version;
        load.cancel()?;

        if !cas_update_load(&mut tx, &load, expected).await? {
            return Err(Error::Conflict("load was modified concurrently".into()));
        }

        // Every still-pending bid is settled in the same transaction.
        for mut bid in fetch_pending_bids(&mut tx, &id).await? {
            bid.reject(RejectionReason::LoadCancelled)?;
            update_bid(&mut tx, &bid, "pending").await?;
        }

        tx.commit().await?;

        self.events.emit(Event::LoadCancelled { load_id: id });

        Ok(load)
    }
}
