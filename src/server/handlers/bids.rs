use axum::extract::{Extension, Json, Path};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{Bid, Booking, Proposal};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct SubmitParams {
    driver_id: Uuid,
    amount: i64,
    #[serde(default)]
    proposal: Proposal,
}

#[derive(Serialize, Deserialize)]
pub struct WithdrawParams {
    driver_id: Uuid,
}

#[derive(Serialize, Deserialize)]
pub struct AcceptParams {
    actor_id: Uuid,
}

pub async fn submit(
    Extension(api): Extension<DynAPI>,
    Path(load_id): Path<Uuid>,
    Json(params): Json<SubmitParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api
        .submit_bid(load_id, params.driver_id, params.amount, params.proposal)
        .await?;

    Ok(bid.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Bid>, Error> {
    let bid = api.find_bid(id).await?;

    Ok(bid.into())
}

pub async fn list_pending(
    Extension(api): Extension<DynAPI>,
    Path(load_id): Path<Uuid>,
) -> Result<Json<Vec<Bid>>, Error> {
    let bids = api.list_pending_bids(load_id).await?;

    Ok(bids.into())
}

pub async fn withdraw(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<WithdrawParams>,
) -> Result<Json<Bid>, Error> {
    let bid = api.withdraw_bid(id, params.driver_id).await?;

    Ok(bid.into())
}

pub async fn accept(
    Extension(api): Extension<DynAPI>,
    Path((load_id, bid_id)): Path<(Uuid, Uuid)>,
    Json(params): Json<AcceptParams>,
) -> Result<Json<Booking>, Error> {
    let booking = api.accept_bid(load_id, bid_id, params.actor_id).await?;

    Ok(booking.into())
}
