use super::Database;

use sqlx::{types::Json, Executor, Row, Transaction};
use uuid::Uuid;

use crate::{
    entities::{Bid, Booking, Load},
    error::Error,
};

#[tracing::instrument(skip(tx))]
pub async fn fetch_load(tx: &mut Transaction<'_, Database>, id: &Uuid) -> Result<Load, Error> {
    let Json(load): Json<Load> = tx
        .fetch_optional(sqlx::query("SELECT data FROM loads WHERE id = $1").bind(id))
        .await?
        .ok_or(Error::NotFound {
            entity: "load",
            id: *id,
        })?
        .try_get("data")?;

    Ok(load)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_bid(tx: &mut Transaction<'_, Database>, id: &Uuid) -> Result<Bid, Error> {
    let Json(bid): Json<Bid> = tx
        .fetch_optional(sqlx::query("SELECT data FROM bids WHERE id = $1").bind(id))
        .await?
        .ok_or(Error::NotFound {
            entity: "bid",
            id: *id,
        })?
        .try_get("data")?;

    Ok(bid)
}

#[tracing::instrument(skip(tx))]
pub async fn fetch_booking(
    tx: &mut Transaction<'_, Database>,
    id: &Uuid,
) -> Result<Booking, Error> {
    let Json(booking): Json<Booking> = tx
        .fetch_optional(sqlx::query("SELECT data FROM bookings WHERE id = $1").bind(id))
        .await?
        .ok_or(Error::NotFound {
            entity: "booking",
            id: *id,
        })?
        .try_get("data")?;

    Ok(booking)
}

/// Pending bids on a load, submission time ascending.
#[tracing::instrument(skip(tx))]
pub async fn fetch_pending_bids(
    tx: &mut Transaction<'_, Database>,
    load_id: &Uuid,
) -> Result<Vec<Bid>, Error> {
    let rows = tx
        .fetch_all(
            sqlx::query(
                "SELECT data FROM bids
                 WHERE load_id = $1 AND status = 'pending'
                 ORDER BY submitted_at ASC",
            )
            .bind(load_id),
        )
        .await?;

    let mut bids = Vec::with_capacity(rows.len());
    for row in rows {
        let Json(bid): Json<Bid> = row.try_get("data")?;
        bids.push(bid);
    }

    Ok(bids)
}

/// Conditional write on the load row, guarded by the version the caller read.
/// Returns false when another writer got there first; the caller decides
/// whether that is a `Conflict` or a best-effort no-op.
#[tracing::instrument(skip(tx, load))]
pub async fn cas_update_load(
    tx: &mut Transaction<'_, Database>,
    load: &Load,
    expected_version: i64,
) -> Result<bool, Error> {
    let result = tx
        .execute(
            sqlx::query(
                "UPDATE loads SET status = $3, version = $4, data = $5
                 WHERE id = $1 AND version = $2",
            )
            .bind(&load.id)
            .bind(expected_version)
            .bind(load.status.name())
            .bind(load.version)
            .bind(Json(load)),
        )
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Bid writes are guarded on the status the caller saw, so a concurrent
/// settlement (withdraw racing a sibling rejection, say) cannot be clobbered.
#[tracing::instrument(skip(tx, bid))]
pub async fn update_bid(
    tx: &mut Transaction<'_, Database>,
    bid: &Bid,
    expected_status: &str,
) -> Result<bool, Error> {
    let result = tx
        .execute(
            sqlx::query(
                "UPDATE bids SET status = $3, data = $4
                 WHERE id = $1 AND status = $2",
            )
            .bind(&bid.id)
            .bind(expected_status)
            .bind(bid.status.name())
            .bind(Json(bid)),
        )
        .await?;

    Ok(result.rows_affected() == 1)
}

#[tracing::instrument(skip(tx, booking))]
pub async fn update_booking(
    tx: &mut Transaction<'_, Database>,
    booking: &Booking,
    expected_status: &str,
) -> Result<bool, Error> {
    let result = tx
        .execute(
            sqlx::query(
                "UPDATE bookings SET status = $3, data = $4
                 WHERE id = $1 AND status = $2",
            )
            .bind(&booking.id)
            .bind(expected_status)
            .bind(booking.status.name())
            .bind(Json(booking)),
        )
        .await?;

    Ok(result.rows_affected() == 1)
}

/// The non-cancelled booking on a load, if one exists. The partial unique
/// index guarantees there is at most one.
#[tracing::instrument(skip(tx))]
pub async fn fetch_active_booking(
    tx: &mut Transaction<'_, Database>,
    load_id: &Uuid,
) -> Result<Option<Booking>, Error> {
    let maybe_row = tx
        .fetch_optional(
            sqlx::query(
                "SELECT data FROM bookings
                 WHERE load_id = $1 AND status <> 'cancelled'",
            )
            .bind(load_id),
        )
        .await?;

    match maybe_row {
        Some(row) => {
            let Json(booking): Json<Booking> = row.try_get("data")?;
            Ok(Some(booking))
        }
        None => Ok(None),
    }
}
