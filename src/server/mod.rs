mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::Extension,
    routing::{get, patch, post},
    Router,
};

use crate::api::{DynAPI, API};
use crate::server::handlers::{bids, bookings, loads};

pub async fn serve<T: API + Sync + Send + 'static>(api: T, addr: SocketAddr) {
    let api = Arc::new(api) as DynAPI;

    let app = Router::new()
        .route("/loads", post(loads::create))
        .route("/loads/:id", get(loads::find))
        .route("/loads/:id/cancel", patch(loads::cancel))
        .route("/loads/:id/bids", post(bids::submit).get(bids::list_pending))
        .route("/loads/:id/bids/:bid_id/accept", patch(bids::accept))
        .route("/bids/:id", get(bids::find))
        .route("/bids/:id/withdraw", patch(bids::withdraw))
        .route("/bookings/:id", get(bookings::find))
        .route("/bookings/:id/status", patch(bookings::append_update))
        .route("/bookings/:id/cancel", patch(bookings::cancel))
        .route("/bookings/:id/tracking", get(bookings::tracking_log))
        .layer(Extension(api));

    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .unwrap();
}
