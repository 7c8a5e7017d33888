//! Database row types. These map directly to SQLite rows and are converted
//! into the `sii-types` records at the edge of the store.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use sii_types::models::{Extra, HelpRequest, HelperOffer, UserLocation};

/// The three kinds of record the service persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    HelpRequest,
    UserLocation,
    HelperOffer,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [Self::HelpRequest, Self::UserLocation, Self::HelperOffer];

    /// Storage table backing this kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::HelpRequest => "help_requests",
            Self::UserLocation => "user_locations",
            Self::HelperOffer => "helper_offers",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// Fixed-width RFC 3339 so that text ordering matches time ordering.
pub(crate) fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("corrupt timestamp '{}'", s))?
        .with_timezone(&Utc))
}

/// Client fields as stored: NULL when there are none.
pub(crate) fn encode_extra(extra: &Extra) -> Result<Option<String>> {
    if extra.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(extra)?))
}

fn decode_extra(s: Option<String>) -> Result<Extra> {
    match s {
        Some(s) => serde_json::from_str(&s).with_context(|| format!("corrupt client fields '{}'", s)),
        None => Ok(Extra::new()),
    }
}

fn parse_id(s: &str) -> Result<Uuid> {
    s.parse().with_context(|| format!("corrupt record id '{}'", s))
}

pub struct HelpRequestRow {
    pub id: String,
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
    pub device_token: Option<String>,
    pub created_at: String,
    pub extra: Option<String>,
}

impl TryFrom<HelpRequestRow> for HelpRequest {
    type Error = anyhow::Error;

    fn try_from(row: HelpRequestRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            user_id: row.user_id,
            lat: row.lat,
            long: row.lng,
            device_token: row.device_token,
            created_at: parse_time(&row.created_at)?,
            extra: decode_extra(row.extra)?,
        })
    }
}

pub struct UserLocationRow {
    pub id: String,
    pub user_id: String,
    pub lat: f64,
    pub lng: f64,
    pub device_token: Option<String>,
    pub updated_at: String,
    pub extra: Option<String>,
}

impl TryFrom<UserLocationRow> for UserLocation {
    type Error = anyhow::Error;

    fn try_from(row: UserLocationRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            user_id: row.user_id,
            lat: row.lat,
            long: row.lng,
            device_token: row.device_token,
            updated_at: parse_time(&row.updated_at)?,
            extra: decode_extra(row.extra)?,
        })
    }
}

pub struct HelperOfferRow {
    pub id: String,
    pub helper_user_id: String,
    pub lat: f64,
    pub lng: f64,
    pub device_token: Option<String>,
    pub help_seeker_token: Option<String>,
    pub positioned: bool,
    pub created_at: String,
}

impl TryFrom<HelperOfferRow> for HelperOffer {
    type Error = anyhow::Error;

    fn try_from(row: HelperOfferRow) -> Result<Self> {
        Ok(Self {
            id: parse_id(&row.id)?,
            helper_user_id: row.helper_user_id,
            lat: row.lat,
            long: row.lng,
            device_token: row.device_token,
            help_seeker_token: row.help_seeker_token,
            positioned: row.positioned,
            created_at: parse_time(&row.created_at)?,
        })
    }
}
