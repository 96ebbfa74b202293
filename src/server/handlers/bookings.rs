use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{booking, Booking, TrackingEntry, TrackingMeta};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct TrackingParams {
    status: booking::Status,
    location: Option<String>,
    note: Option<String>,
    actor_id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct CancelParams {
    actor_id: Uuid,
    reason: Option<String>,
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, Error> {
    let booking = api.find_booking(id).await?;

    Ok(booking.into())
}

pub async fn append_update(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<TrackingParams>,
) -> Result<Json<Booking>, Error> {
    let meta = TrackingMeta {
        location: params.location,
        note: params.note,
        actor_id: params.actor_id,
    };

    let booking = api.append_tracking_update(id, params.status, meta).await?;

    Ok(booking.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CancelParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.cancel_booking(id, params.actor_id, params.reason).await?;

    Ok(booking.into())
}

pub async fn tracking_log(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<TrackingEntry>>, Error> {
    let log = api.tracking_log(id).await?;

    Ok(log.into())
}
