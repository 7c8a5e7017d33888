//! Bounding-box proximity.
//!
//! "Nearby" means inside a square of half-width `delta` degrees around a
//! point. This is not a great-circle distance; over the few hundred meters
//! the default delta covers, the error is acceptable. Results come back in
//! storage order, unsorted by distance.

use std::sync::Arc;

use sii_db::Database;
use sii_types::models::{BoundingBox, Coordinates, UserLocation};

use crate::error::ApiError;
use crate::store;

/// Half-width of the search box in degrees, roughly 780 m of latitude.
pub const DEFAULT_DELTA: f64 = 0.007;

#[derive(Clone)]
pub struct ProximityMatcher {
    db: Arc<Database>,
    delta: f64,
}

impl ProximityMatcher {
    pub fn new(db: Arc<Database>, delta: f64) -> Self {
        Self { db, delta }
    }

    /// Search box around `center`, refusing centers that would produce
    /// meaningless bounds.
    pub fn search_box(&self, center: Coordinates) -> Result<BoundingBox, ApiError> {
        if !center.is_valid() {
            return Err(ApiError::Validation(format!(
                "invalid search center ({}, {})",
                center.lat, center.long
            )));
        }
        Ok(BoundingBox::around(center, self.delta))
    }

    /// Every stored location inside the box around `center` whose device
    /// token is not in `exclude`.
    pub async fn find_nearby(&self, center: Coordinates, exclude: Vec<String>) -> Result<Vec<UserLocation>, ApiError> {
        let bbox = self.search_box(center)?;
        store::run(&self.db, "Failed to find nearby users", move |db| {
            db.find_locations_within(&bbox, &exclude)
        })
        .await
    }
}
