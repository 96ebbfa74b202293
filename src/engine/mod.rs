mod acceptance_api;
mod bid_api;
mod booking_api;
mod helpers;
mod load_api;

use sqlx::{Executor, Pool, Postgres};

use crate::{api::API, config::BidPolicy, error::Error, events::EventSink};

type Database = Postgres;

pub struct Engine {
    pool: Pool<Database>,
    policy: BidPolicy,
    events: EventSink,
}

impl Engine {
    #[tracing::instrument(name = "Engine::new", skip_all)]
    pub async fn new(
        pool: Pool<Database>,
        policy: BidPolicy,
        events: EventSink,
    ) -> Result<Self, Error> {
        // TODO: move this to migrations
        pool.execute(
            "CREATE TABLE IF NOT EXISTS loads (
                id UUID PRIMARY KEY,
                status VARCHAR NOT NULL,
                version BIGINT NOT NULL,
                data JSONB NOT NULL
            )",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS bids (
                id UUID PRIMARY KEY,
                load_id UUID NOT NULL,
                driver_id UUID NOT NULL,
                status VARCHAR NOT NULL,
                submitted_at TIMESTAMPTZ NOT NULL,
                data JSONB NOT NULL
            )",
        )
        .await?;

        // a driver holds at most one live bid per load
        pool.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS bids_one_live_per_driver
             ON bids (load_id, driver_id) WHERE status <> 'withdrawn'",
        )
        .await?;

        // at most one accepted bid per load, ever
        pool.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS bids_one_accepted_per_load
             ON bids (load_id) WHERE status = 'accepted'",
        )
        .await?;

        pool.execute(
            "CREATE TABLE IF NOT EXISTS bookings (
                id UUID PRIMARY KEY,
                load_id UUID NOT NULL,
                status VARCHAR NOT NULL,
                data JSONB NOT NULL
            )",
        )
        .await?;

        // at most one non-cancelled booking per load
        pool.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS bookings_one_active_per_load
             ON bookings (load_id) WHERE status <> 'cancelled'",
        )
        .await?;

        Ok(Self {
            pool,
            policy,
            events,
        })
    }
}

impl API for Engine {}
