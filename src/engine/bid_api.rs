use super::helpers::{fetch_bid, fetch_load, fetch_pending_bids, update_bid};
use super::Engine;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{types::Json, Acquire, Executor, Row};
use uuid::Uuid;

use crate::{
    api::BidAPI,
    entities::{Bid, Load, Proposal},
    error::Error,
    events::Event,
};

#[async_trait]
impl BidAPI for Engine {
    #[tracing::instrument(skip(self, proposal))]
    async fn submit_bid(
        &self,
        load_id: Uuid,
        driver_id: Uuid,
        amount: i64,
        proposal: Proposal,
    ) -> Result<Bid, Error> {
        if amount <= 0 {
            return Err(Error::Validation("bid amount must be positive".into()));
        }

        if let Some(minimum) = self.policy.minimum_amount {
            if amount < minimum {
                return Err(Error::Validation(format!(
                    "bid amount is below the minimum of {}",
                    minimum
                )));
            }
        }

        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;

        let Json(load): Json<Load> = conn
            .fetch_optional(sqlx::query("SELECT data FROM loads WHERE id = $1").bind(&load_id))
            .await?
            .ok_or(Error::NotFound {
                entity: "load",
                id: load_id,
            })?
            .try_get("data")?;

        if !load.is_biddable(now) {
            return Err(Error::LoadNotBiddable(load_id));
        }

        let existing = conn
            .fetch_optional(
                sqlx::query(
                    "SELECT 1 FROM bids
                     WHERE load_id = $1 AND driver_id = $2 AND status <> 'withdrawn'",
                )
                .bind(&load_id)
                .bind(&driver_id),
            )
            .await?;

        if existing.is_some() {
            return Err(Error::DuplicateBid { load_id, driver_id });
        }

        let bid = Bid::new(
            load_id,
            driver_id,
            amount,
            proposal,
            now + self.policy.validity_window,
            now,
        );

        let inserted = conn
            .execute(
                sqlx::query(
                    "INSERT INTO bids (id, load_id, driver_id, status, submitted_at, data)
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(&bid.id)
                .bind(&bid.load_id)
                .bind(&bid.driver_id)
                .bind(bid.status.name())
                .bind(&bid.submitted_at)
                .bind(Json(&bid)),
            )
            .await;

        if let Err(err) = inserted {
            // the partial unique index backstops the pre-check under races
            if let sqlx::Error::Database(ref db_err) = err {
                if db_err.code().as_deref() == Some("23505") {
                    return Err(Error::DuplicateBid { load_id, driver_id });
                }
            }

            return Err(err.into());
        }

        self.events.emit(Event::BidPlaced {
            load_id,
            bid_id: bid.id,
            driver_id,
        });

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn find_bid(&self, id: Uuid) -> Result<Bid, Error> {
        let mut conn = self.pool.acquire().await?;

        let Json(bid): Json<Bid> = conn
            .fetch_optional(sqlx::query("SELECT data FROM bids WHERE id = $1").bind(&id))
            .await?
            .ok_or(Error::NotFound { entity: "bid", id })?
            .try_get("data")?;

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn withdraw_bid(&self, id: Uuid, driver_id: Uuid) -> Result<Bid, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let mut bid = fetch_bid(&mut tx, &id).await?;

        if bid.driver_id != driver_id {
            return Err(Error::Forbidden {
                entity: "bid",
                id,
                actor_id: driver_id,
            });
        }

        if !bid.withdraw()? {
            // already withdrawn; retries are no-op successes
            return Ok(bid);
        }

        if !update_bid(&mut tx, &bid, "pending").await? {
            return Err(Error::Conflict("bid was settled concurrently".into()));
        }

        tx.commit().await?;

        self.events.emit(Event::BidWithdrawn {
            load_id: bid.load_id,
            bid_id: bid.id,
            driver_id,
        });

        Ok(bid)
    }

    #[tracing::instrument(skip(self))]
    async fn list_pending_bids(&self, load_id: Uuid) -> Result<Vec<Bid>, Error> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        // existence check so a missing load is distinguishable from no bids
        fetch_load(&mut tx, &load_id).await?;

        let bids = fetch_pending_bids(&mut tx, &load_id).await?;

        Ok(bids)
    }
}
