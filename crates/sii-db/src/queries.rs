use anyhow::Result;
use rusqlite::{Connection, Row, types::ToSql};

use sii_types::models::{BoundingBox, HelpRequest, HelperOffer, UserLocation};

use crate::Database;
use crate::models::{HelpRequestRow, HelperOfferRow, RecordKind, UserLocationRow, encode_extra, format_time};

const HELP_REQUEST_COLUMNS: &str = "id, user_id, lat, lng, device_token, created_at, extra";
const USER_LOCATION_COLUMNS: &str = "id, user_id, lat, lng, device_token, updated_at, extra";
const HELPER_OFFER_COLUMNS: &str =
    "id, helper_user_id, lat, lng, device_token, help_seeker_token, positioned, created_at";

impl Database {
    // -- Help requests --

    pub fn insert_help_request(&self, req: &HelpRequest) -> Result<()> {
        let extra = encode_extra(&req.extra)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO help_requests (id, user_id, lat, lng, device_token, created_at, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    req.id.to_string(),
                    req.user_id,
                    req.lat,
                    req.long,
                    req.device_token,
                    format_time(&req.created_at),
                    extra,
                ],
            )?;
            Ok(())
        })
    }

    /// All help requests, newest first.
    pub fn list_help_requests(&self) -> Result<Vec<HelpRequest>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM help_requests ORDER BY created_at DESC, rowid DESC",
                HELP_REQUEST_COLUMNS
            );
            query_all(conn, &sql, rusqlite::params![], help_request_row)
        })
    }

    // -- User locations --

    /// Replace the location stored for `loc.user_id`, or insert one.
    /// A single statement, so readers never see the user without a location
    /// and concurrent writers cannot leave two rows behind.
    pub fn upsert_user_location(&self, loc: &UserLocation) -> Result<()> {
        let extra = encode_extra(&loc.extra)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO user_locations (id, user_id, lat, lng, device_token, updated_at, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(user_id) DO UPDATE SET
                    id = excluded.id,
                    lat = excluded.lat,
                    lng = excluded.lng,
                    device_token = excluded.device_token,
                    updated_at = excluded.updated_at,
                    extra = excluded.extra",
                rusqlite::params![
                    loc.id.to_string(),
                    loc.user_id,
                    loc.lat,
                    loc.long,
                    loc.device_token,
                    format_time(&loc.updated_at),
                    extra,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_location(&self, user_id: &str) -> Result<Option<UserLocation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM user_locations WHERE user_id = ?1", USER_LOCATION_COLUMNS);
            query_one(conn, &sql, rusqlite::params![user_id], user_location_row)
        })
    }

    /// Current location of whichever user last reported from `token`.
    pub fn find_user_location_by_token(&self, token: &str) -> Result<Option<UserLocation>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM user_locations WHERE device_token = ?1
                 ORDER BY updated_at DESC LIMIT 1",
                USER_LOCATION_COLUMNS
            );
            query_one(conn, &sql, rusqlite::params![token], user_location_row)
        })
    }

    /// Every stored location, in storage order.
    pub fn list_user_locations(&self) -> Result<Vec<UserLocation>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM user_locations ORDER BY rowid", USER_LOCATION_COLUMNS);
            query_all(conn, &sql, rusqlite::params![], user_location_row)
        })
    }

    /// Locations inside `bbox` (inclusive) whose token is not in `exclude`.
    /// Locations without a token are never excluded. Returned in storage order.
    pub fn find_locations_within(&self, bbox: &BoundingBox, exclude: &[String]) -> Result<Vec<UserLocation>> {
        self.with_conn(|conn| {
            let mut sql = format!(
                "SELECT {} FROM user_locations
                 WHERE lat BETWEEN ?1 AND ?2 AND lng BETWEEN ?3 AND ?4",
                USER_LOCATION_COLUMNS
            );
            if !exclude.is_empty() {
                let placeholders: Vec<String> = (5..5 + exclude.len()).map(|i| format!("?{}", i)).collect();
                sql.push_str(&format!(
                    " AND (device_token IS NULL OR device_token NOT IN ({}))",
                    placeholders.join(", ")
                ));
            }
            sql.push_str(" ORDER BY rowid");

            let mut params: Vec<&dyn ToSql> = Vec::with_capacity(4 + exclude.len());
            params.push(&bbox.lat_min);
            params.push(&bbox.lat_max);
            params.push(&bbox.long_min);
            params.push(&bbox.long_max);
            params.extend(exclude.iter().map(|t| t as &dyn ToSql));

            query_all(conn, &sql, &params, user_location_row)
        })
    }

    /// Device tokens currently on file for the given users.
    pub fn tokens_for_users(&self, user_ids: &[String]) -> Result<Vec<String>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=user_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT device_token FROM user_locations
                 WHERE device_token IS NOT NULL AND user_id IN ({})",
                placeholders.join(", ")
            );
            let params: Vec<&dyn ToSql> = user_ids.iter().map(|id| id as &dyn ToSql).collect();

            let mut stmt = conn.prepare(&sql)?;
            let tokens = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(tokens)
        })
    }

    // -- Helper offers --

    pub fn insert_helper_offer(&self, offer: &HelperOffer) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO helper_offers
                    (id, helper_user_id, lat, lng, device_token, help_seeker_token, positioned, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    offer.id.to_string(),
                    offer.helper_user_id,
                    offer.lat,
                    offer.long,
                    offer.device_token,
                    offer.help_seeker_token,
                    offer.positioned,
                    format_time(&offer.created_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Positioned offers registered for `seeker_token`, newest first.
    pub fn positioned_offers_for(&self, seeker_token: &str) -> Result<Vec<HelperOffer>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM helper_offers
                 WHERE help_seeker_token = ?1 AND positioned = 1
                 ORDER BY created_at DESC, rowid DESC",
                HELPER_OFFER_COLUMNS
            );
            query_all(conn, &sql, rusqlite::params![seeker_token], helper_offer_row)
        })
    }

    // -- Any kind --

    pub fn count(&self, kind: RecordKind) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", kind.table()), [], |r| r.get(0))?;
            Ok(u64::try_from(n)?)
        })
    }

    /// Delete every record of `kind`. Returns the number removed.
    pub fn purge(&self, kind: RecordKind) -> Result<usize> {
        self.with_conn(|conn| Ok(conn.execute(&format!("DELETE FROM {}", kind.table()), [])?))
    }
}

fn query_all<T, R, F>(conn: &Connection, sql: &str, params: &[&dyn ToSql], map: F) -> Result<Vec<T>>
where
    R: TryInto<T, Error = anyhow::Error>,
    F: FnMut(&Row<'_>) -> rusqlite::Result<R>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().map(<R as TryInto<T>>::try_into).collect()
}

fn query_one<T, R, F>(conn: &Connection, sql: &str, params: &[&dyn ToSql], map: F) -> Result<Option<T>>
where
    R: TryInto<T, Error = anyhow::Error>,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<R>,
{
    let mut stmt = conn.prepare(sql)?;
    let row = stmt.query_row(params, map).optional()?;
    row.map(<R as TryInto<T>>::try_into).transpose()
}

fn help_request_row(row: &Row<'_>) -> rusqlite::Result<HelpRequestRow> {
    Ok(HelpRequestRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        lat: row.get(2)?,
        lng: row.get(3)?,
        device_token: row.get(4)?,
        created_at: row.get(5)?,
        extra: row.get(6)?,
    })
}

fn user_location_row(row: &Row<'_>) -> rusqlite::Result<UserLocationRow> {
    Ok(UserLocationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        lat: row.get(2)?,
        lng: row.get(3)?,
        device_token: row.get(4)?,
        updated_at: row.get(5)?,
        extra: row.get(6)?,
    })
}

fn helper_offer_row(row: &Row<'_>) -> rusqlite::Result<HelperOfferRow> {
    Ok(HelperOfferRow {
        id: row.get(0)?,
        helper_user_id: row.get(1)?,
        lat: row.get(2)?,
        lng: row.get(3)?,
        device_token: row.get(4)?,
        help_seeker_token: row.get(5)?,
        positioned: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
