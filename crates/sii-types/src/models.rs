use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Client fields the service does not interpret, kept as sent.
pub type Extra = Map<String, Value>;

/// Keys the service writes itself; a client value under one of these names
/// is dropped instead of being echoed beside the real one.
pub const RESERVED_KEYS: &[&str] = &[
    "id",
    "userId",
    "lat",
    "long",
    "deviceToken",
    "createdAt",
    "updatedAt",
];

/// Drop every reserved key from `extra`.
pub fn strip_reserved(extra: &mut Extra) {
    extra.retain(|key, _| !RESERVED_KEYS.contains(&key.as_str()));
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub long: f64,
}

impl Coordinates {
    pub fn new(lat: f64, long: f64) -> Self {
        Self { lat, long }
    }

    /// Both components finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.long.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.long)
    }
}

/// Axis-aligned box in degrees, bounds inclusive on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lat_max: f64,
    pub long_min: f64,
    pub long_max: f64,
}

impl BoundingBox {
    /// Square of half-width `delta` degrees around `center`.
    pub fn around(center: Coordinates, delta: f64) -> Self {
        Self {
            lat_min: center.lat - delta,
            lat_max: center.lat + delta,
            long_min: center.long - delta,
            long_max: center.long + delta,
        }
    }

    pub fn contains(&self, lat: f64, long: f64) -> bool {
        (self.lat_min..=self.lat_max).contains(&lat) && (self.long_min..=self.long_max).contains(&long)
    }
}

/// A user asking for help at a location. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpRequest {
    pub id: Uuid,
    pub user_id: String,
    pub lat: f64,
    pub long: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl HelpRequest {
    /// Display name the client sent, if any.
    pub fn username(&self) -> Option<&str> {
        self.extra.get("username").and_then(Value::as_str)
    }
}

/// Latest known position of a user. At most one per `user_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub id: Uuid,
    pub user_id: String,
    pub lat: f64,
    pub long: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl UserLocation {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.long)
    }

    /// Device token if present and non-empty.
    pub fn notify_token(&self) -> Option<&str> {
        self.device_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// A user committing to help the seeker addressed by `help_seeker_token`.
///
/// `help_seeker_token` is a reference by value: nothing guarantees a
/// matching help request or location exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperOffer {
    pub id: Uuid,
    pub helper_user_id: String,
    pub lat: f64,
    pub long: f64,
    /// The helper's own device token, when the client sent one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help_seeker_token: Option<String>,
    /// False when the offer was registered at (0, 0), which clients use to
    /// mean "no fix yet". Such offers are left out of the active helper set.
    pub positioned: bool,
    pub created_at: DateTime<Utc>,
}

impl HelperOffer {
    /// Zero on either axis means the helper has not been positioned yet.
    pub fn is_positioned(lat: f64, long: f64) -> bool {
        lat != 0.0 && long != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_ranges() {
        assert!(Coordinates::new(10.0, 20.0).is_valid());
        assert!(Coordinates::new(-90.0, 180.0).is_valid());
        assert!(!Coordinates::new(90.5, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, -180.1).is_valid());
        assert!(!Coordinates::new(f64::NAN, 0.0).is_valid());
        assert!(!Coordinates::new(0.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn box_bounds_are_inclusive() {
        let bbox = BoundingBox::around(Coordinates::new(10.0, 20.0), 0.5);
        assert!(bbox.contains(10.0, 20.0));
        assert!(bbox.contains(bbox.lat_min, bbox.long_max));
        assert!(!bbox.contains(10.6, 20.0));
        assert!(!bbox.contains(10.0, 19.4));
    }

    #[test]
    fn zero_on_either_axis_is_unpositioned() {
        assert!(HelperOffer::is_positioned(10.0, 20.0));
        assert!(!HelperOffer::is_positioned(0.0, 20.0));
        assert!(!HelperOffer::is_positioned(10.0, 0.0));
        assert!(!HelperOffer::is_positioned(0.0, 0.0));
    }

    #[test]
    fn location_serializes_camel_case() {
        let loc = UserLocation {
            id: Uuid::nil(),
            user_id: "u1".into(),
            lat: 1.5,
            long: 2.5,
            device_token: Some("tok".into()),
            updated_at: DateTime::default(),
            extra: Extra::new(),
        };
        let json = serde_json::to_value(&loc).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["deviceToken"], "tok");
        assert!(json.get("updatedAt").is_some());
    }

    #[test]
    fn client_fields_are_flattened_into_the_record() {
        let mut extra = Extra::new();
        extra.insert("username".into(), Value::from("asha"));
        extra.insert("bloodGroup".into(), Value::from("O+"));
        let req = HelpRequest {
            id: Uuid::nil(),
            user_id: "1".into(),
            lat: 10.0,
            long: 20.0,
            device_token: None,
            created_at: DateTime::default(),
            extra,
        };
        assert_eq!(req.username(), Some("asha"));

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["username"], "asha");
        assert_eq!(json["bloodGroup"], "O+");
        assert_eq!(json["userId"], "1");
    }

    #[test]
    fn reserved_keys_are_stripped() {
        let mut extra: Extra =
            serde_json::from_str(r#"{"id":"forged","createdAt":"x","username":"asha"}"#).unwrap();
        strip_reserved(&mut extra);
        assert_eq!(extra.len(), 1);
        assert!(extra.contains_key("username"));
    }

    #[test]
    fn empty_token_is_not_notifiable() {
        let mut loc = UserLocation {
            id: Uuid::nil(),
            user_id: "u1".into(),
            lat: 0.0,
            long: 0.0,
            device_token: Some(String::new()),
            updated_at: DateTime::default(),
            extra: Extra::new(),
        };
        assert_eq!(loc.notify_token(), None);
        loc.device_token = Some("t".into());
        assert_eq!(loc.notify_token(), Some("t"));
    }
}
