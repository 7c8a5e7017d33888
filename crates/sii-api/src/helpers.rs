use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};

use sii_types::api::{Envelope, HelperDetails, HelperRegisteredResponse, HelpersQuery};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/helpers: register a helper and notify the seeker.
pub async fn register_helper(
    State(state): State<AppState>,
    body: Result<Json<Envelope<HelperDetails>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    let helper = state.coordinator.register_helper_offer(body.into_inner()).await?;

    Ok(Json(HelperRegisteredResponse {
        success: true,
        message: "Helper registered successfully".into(),
        helper,
    }))
}

/// GET /api/helpers?helpSeekerToken=: helpers on their way to the seeker.
/// Also alerts nearby users who are not helping yet.
pub async fn list_helpers(
    State(state): State<AppState>,
    query: Result<Query<HelpersQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let helpers = state.coordinator.list_helpers_for(query.help_seeker_token).await?;
    Ok(Json(helpers))
}
