use axum::extract::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Engine error taxonomy. `Conflict` is the only variant that signals losing
/// an optimistic-concurrency race; callers are expected to re-fetch rather
/// than treat it as a failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("actor {actor_id} has no authority over {entity} {id}")]
    Forbidden {
        entity: &'static str,
        id: Uuid,
        actor_id: Uuid,
    },

    #[error("load {0} is not open for bidding")]
    LoadNotBiddable(Uuid),

    #[error("driver {driver_id} already has a live bid on load {load_id}")]
    DuplicateBid { load_id: Uuid, driver_id: Uuid },

    #[error("{entity} {id}: {detail}")]
    StateTransition {
        entity: &'static str,
        id: Uuid,
        detail: String,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

impl Error {
    /// Machine-readable kind, stable across message changes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::Forbidden { .. } => "forbidden",
            Self::LoadNotBiddable(_) => "load_not_biddable",
            Self::DuplicateBid { .. } => "duplicate_bid",
            Self::StateTransition { .. } => "state_transition_error",
            Self::Conflict(_) => "conflict",
            Self::Config(_) => "configuration_error",
            Self::Database(_) => "database_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::LoadNotBiddable(_)
            | Self::DuplicateBid { .. }
            | Self::StateTransition { .. }
            | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Config(_) | Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "internal error");
            "internal server error".into()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "code": self.kind(),
            "error": message,
        }));

        (status, body).into_response()
    }
}
