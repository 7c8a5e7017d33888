//! Help coordination: turns help requests, location updates and helper
//! offers into store writes plus the matching push fan-out.
//!
//! Notifications never affect a result. They are handed to the
//! [`Dispatcher`] after the primary write succeeds and run in the
//! background; a failed write aborts the operation, but nothing written
//! before it is rolled back.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use sii_db::Database;
use sii_push::Dispatcher;
use sii_types::api::{HelperDetails, UserDetails};
use sii_types::models::{HelpRequest, HelperOffer, UserLocation};
use sii_types::push::PushPayload;

use crate::error::ApiError;
use crate::proximity::ProximityMatcher;
use crate::{store, validate};

/// Result of a location lookup: one user (possibly absent) or the whole fleet.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LocationLookup {
    One(Option<UserLocation>),
    All(Vec<UserLocation>),
}

#[derive(Clone)]
pub struct Coordinator {
    db: Arc<Database>,
    matcher: ProximityMatcher,
    dispatcher: Dispatcher,
}

impl Coordinator {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher, delta: f64) -> Self {
        Self {
            matcher: ProximityMatcher::new(db.clone(), delta),
            db,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // -- Help requests --

    /// Record a help request and alert every user near it. Returns the stored
    /// request and the nearby users that were found.
    pub async fn submit_help_request(&self, details: UserDetails) -> Result<(HelpRequest, Vec<UserLocation>), ApiError> {
        let seeker = validate::user_details(details)?;

        let request = HelpRequest {
            id: Uuid::new_v4(),
            user_id: seeker.id,
            lat: seeker.position.lat,
            long: seeker.position.long,
            device_token: seeker.device_token,
            created_at: Utc::now(),
            extra: seeker.extra,
        };
        let row = request.clone();
        store::run(&self.db, "Failed to add help request", move |db| db.insert_help_request(&row)).await?;
        info!(
            "{} needs help at ({}, {})",
            request.username().unwrap_or(request.user_id.as_str()),
            request.lat,
            request.long
        );

        // The requester never alerts their own device.
        let exclude: Vec<String> = request.device_token.iter().cloned().collect();
        let nearby = self.matcher.find_nearby(seeker.position, exclude).await?;

        let alerted = self.dispatcher.fan_out(
            nearby.iter().filter_map(UserLocation::notify_token),
            PushPayload::NotifyUser {
                user_id: request.user_id.clone(),
                lat: request.lat,
                long: request.long,
                help_seeker_token: request.device_token.clone(),
            },
        );
        info!("Help request {}: {} nearby user(s), {} alerted", request.id, nearby.len(), alerted);

        Ok((request, nearby))
    }

    /// Every help request, newest first.
    pub async fn list_help_requests(&self) -> Result<Vec<HelpRequest>, ApiError> {
        store::run(&self.db, "Failed to get help data", |db| db.list_help_requests()).await
    }

    // -- Locations --

    /// Replace the caller's last known position.
    pub async fn update_user_location(&self, details: UserDetails) -> Result<UserLocation, ApiError> {
        let user = validate::user_details(details)?;

        let location = UserLocation {
            id: Uuid::new_v4(),
            user_id: user.id,
            lat: user.position.lat,
            long: user.position.long,
            device_token: user.device_token,
            updated_at: Utc::now(),
            extra: user.extra,
        };
        let row = location.clone();
        store::run(&self.db, "Failed to update user location", move |db| db.upsert_user_location(&row)).await?;

        Ok(location)
    }

    /// One user's location when `user_id` is given, otherwise every stored
    /// location. The unfiltered form exposes the whole fleet's positions to
    /// any caller; it is kept because existing clients depend on it.
    pub async fn get_user_location(&self, user_id: Option<String>) -> Result<LocationLookup, ApiError> {
        match user_id.filter(|id| !id.trim().is_empty()) {
            Some(id) => {
                let found =
                    store::run(&self.db, "Failed to get current user location", move |db| db.get_user_location(&id))
                        .await?;
                Ok(LocationLookup::One(found))
            }
            None => {
                let all = store::run(&self.db, "Failed to get user locations", |db| db.list_user_locations()).await?;
                Ok(LocationLookup::All(all))
            }
        }
    }

    // -- Helpers --

    /// Record a helper's offer and tell the seeker someone is coming.
    pub async fn register_helper_offer(&self, details: HelperDetails) -> Result<HelperOffer, ApiError> {
        let helper = validate::helper_details(&details)?;

        let offer = HelperOffer {
            id: Uuid::new_v4(),
            helper_user_id: helper.id,
            lat: helper.position.lat,
            long: helper.position.long,
            device_token: helper.device_token,
            help_seeker_token: details.help_seeker_token,
            positioned: HelperOffer::is_positioned(helper.position.lat, helper.position.long),
            created_at: Utc::now(),
        };
        let row = offer.clone();
        store::run(&self.db, "Failed to add helper", move |db| db.insert_helper_offer(&row)).await?;
        info!("{} offered help", offer.helper_user_id);

        if let Some(seeker_token) = &offer.help_seeker_token {
            self.dispatcher.send(
                seeker_token,
                PushPayload::NotifyVictim {
                    helper_user_id: offer.helper_user_id.clone(),
                    lat: offer.lat,
                    long: offer.long,
                },
            );
        }

        Ok(offer)
    }

    /// Positioned helpers registered for the seeker behind `seeker_token`.
    ///
    /// As a side effect this re-runs the proximity search around the seeker
    /// and alerts nearby users who are not already helping, widening the
    /// search every time the seeker polls. Existing clients rely on that.
    pub async fn list_helpers_for(&self, seeker_token: Option<String>) -> Result<Vec<HelperOffer>, ApiError> {
        let Some(seeker_token) = seeker_token.filter(|t| !t.trim().is_empty()) else {
            return Err(ApiError::Validation("missing helpSeekerToken".into()));
        };

        let token = seeker_token.clone();
        let seeker = store::run(&self.db, "Failed to get help seeker location", move |db| {
            db.find_user_location_by_token(&token)
        })
        .await?
        .ok_or_else(|| ApiError::NotFound("No location on file for this help seeker".into()))?;

        let token = seeker_token.clone();
        let (offers, helper_tokens) = store::run(&self.db, "Failed to get helpers", move |db| {
            let offers = db.positioned_offers_for(&token)?;
            let helper_ids: Vec<String> = offers.iter().map(|o| o.helper_user_id.clone()).collect();
            let mut tokens: HashSet<String> = db.tokens_for_users(&helper_ids)?.into_iter().collect();
            tokens.extend(offers.iter().filter_map(|o| o.device_token.clone()));
            Ok((offers, tokens))
        })
        .await?;

        let candidates = self
            .matcher
            .find_nearby(seeker.coordinates(), vec![seeker_token.clone()])
            .await?;
        let fresh = not_yet_helping(candidates, &helper_tokens);

        if !fresh.is_empty() {
            let alerted = self.dispatcher.fan_out(
                fresh.iter().filter_map(UserLocation::notify_token),
                PushPayload::NotifyUser {
                    user_id: seeker.user_id.clone(),
                    lat: seeker.lat,
                    long: seeker.long,
                    help_seeker_token: Some(seeker_token),
                },
            );
            info!("Escalating help for {}: {} more user(s) alerted", seeker.user_id, alerted);
        }

        Ok(offers)
    }
}

/// Drop candidates whose device already belongs to a registered helper.
/// Matching is by token, not user id.
fn not_yet_helping(candidates: Vec<UserLocation>, helper_tokens: &HashSet<String>) -> Vec<UserLocation> {
    candidates
        .into_iter()
        .filter(|c| c.device_token.as_ref().is_none_or(|t| !helper_tokens.contains(t)))
        .collect()
}
