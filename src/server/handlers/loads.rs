use axum::extract::{Extension, Json, Path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::DynAPI;
use crate::entities::{CargoDetails, Load, LoadAttrs, Stop};
use crate::error::Error;

#[derive(Serialize, Deserialize)]
pub struct CreateParams {
    owner_id: Uuid,
    pickup: Stop,
    delivery: Stop,
    cargo: CargoDetails,
    bidding_deadline: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct CancelParams {
    actor_id: Uuid,
}

pub async fn create(
    Extension(api): Extension<DynAPI>,
    Json(params): Json<CreateParams>,
) -> Result<Json<Load>, Error> {
    let attrs = LoadAttrs {
        pickup: params.pickup,
        delivery: params.delivery,
        cargo: params.cargo,
        bidding_deadline: params.bidding_deadline,
    };

    let load = api.create_load(params.owner_id, attrs).await?;

    Ok(load.into())
}

pub async fn find(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
) -> Result<Json<Load>, Error> {
    let load = api.find_load(id).await?;

    Ok(load.into())
}

pub async fn cancel(
    Extension(api): Extension<DynAPI>,
    Path(id): Path<Uuid>,
    Json(params): Json<CancelParams>,
) -> Result<Json<Load>, Error> {
    let load = api.cancel_load(id, params.actor_id).await?;

    Ok(load.into())
}
