use axum::{Json, extract::State, extract::rejection::JsonRejection, response::IntoResponse};
use tracing::debug;

use sii_types::api::{Envelope, HelpSubmittedResponse, UserDetails};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/help: record that a user needs help and alert users nearby.
pub async fn submit_help(
    State(state): State<AppState>,
    body: Result<Json<Envelope<UserDetails>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let (_, nearby_users) = state.coordinator.submit_help_request(body.into_inner()).await?;

    Ok(Json(HelpSubmittedResponse {
        success: true,
        message: "Help record registered successfully".into(),
        nearby_users,
    }))
}

/// GET /api/help: every help request, newest first.
pub async fn list_help(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    debug!("Returning all help records");
    let requests = state.coordinator.list_help_requests().await?;
    Ok(Json(requests))
}
