use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};

use sii_types::api::{Envelope, LocationUpdatedResponse, UserDetails, UserLocationQuery};

use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/user-location: replace the caller's last known position.
pub async fn update_location(
    State(state): State<AppState>,
    body: Result<Json<Envelope<UserDetails>>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = body?;
    state.coordinator.update_user_location(body.into_inner()).await?;

    Ok(Json(LocationUpdatedResponse {
        success: true,
        message: "Updated user location".into(),
    }))
}

/// GET /api/user-location?userId=: one location (or `null`), or all of them
/// when `userId` is omitted.
pub async fn get_location(
    State(state): State<AppState>,
    query: Result<Query<UserLocationQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let lookup = state.coordinator.get_user_location(query.user_id).await?;
    Ok(Json(lookup))
}
