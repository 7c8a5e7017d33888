use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{Extra, HelperOffer, UserLocation};

// -- Request envelopes --

/// Keys under which a wrapped body carries its details.
const WRAPPER_KEYS: [&str; 2] = ["userDetails", "helperDetails"];

/// Request body that is either flat or wrapped in a `userDetails` object.
/// The first mobile clients always sent the wrapped form.
///
/// When a wrapper key is present only its value is parsed, so a bad field
/// inside it is reported as such instead of the body being read as flat.
#[derive(Debug)]
pub enum Envelope<T> {
    Wrapped { details: T },
    Flat(T),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Envelope<T> {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let mut body = Map::<String, Value>::deserialize(de)?;
        for key in WRAPPER_KEYS {
            if let Some(inner) = body.remove(key) {
                return T::deserialize(inner)
                    .map(|details| Self::Wrapped { details })
                    .map_err(|e| D::Error::custom(format_args!("{}: {}", key, e)));
            }
        }
        T::deserialize(Value::Object(body)).map(Self::Flat).map_err(D::Error::custom)
    }
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { details } => details,
            Self::Flat(details) => details,
        }
    }
}

// -- Help requests and locations --

/// Body of `POST /api/help` and `POST /api/user-location`.
/// Every field is optional here; presence is checked by the coordinator so
/// that missing fields are reported by name.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    #[serde(default, deserialize_with = "crate::de::opt_id")]
    pub user_id: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(default, deserialize_with = "crate::de::opt_nonempty")]
    pub device_token: Option<String>,
    /// Anything else the client sent, such as `username`.
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpSubmittedResponse {
    pub success: bool,
    pub message: String,
    pub nearby_users: Vec<UserLocation>,
}

#[derive(Debug, Serialize)]
pub struct LocationUpdatedResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocationQuery {
    pub user_id: Option<String>,
}

// -- Helpers --

/// Body of `POST /api/helpers`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelperDetails {
    #[serde(default, deserialize_with = "crate::de::opt_id")]
    pub helper_user_id: Option<String>,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    #[serde(default, deserialize_with = "crate::de::opt_nonempty")]
    pub device_token: Option<String>,
    #[serde(default, deserialize_with = "crate::de::opt_nonempty")]
    pub help_seeker_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HelperRegisteredResponse {
    pub success: bool,
    pub message: String,
    pub helper: HelperOffer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpersQuery {
    pub help_seeker_token: Option<String>,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_and_wrapped_bodies() {
        let flat: Envelope<UserDetails> =
            serde_json::from_str(r#"{"userId":"u1","lat":1.0,"long":2.0}"#).unwrap();
        let flat = flat.into_inner();
        assert_eq!(flat.user_id.as_deref(), Some("u1"));
        assert_eq!(flat.lat, Some(1.0));

        let wrapped: Envelope<UserDetails> = serde_json::from_str(
            r#"{"userDetails":{"userId":3,"lat":1.0,"long":2.0,"deviceToken":"t"}}"#,
        )
        .unwrap();
        let wrapped = wrapped.into_inner();
        assert_eq!(wrapped.user_id.as_deref(), Some("3"));
        assert_eq!(wrapped.device_token.as_deref(), Some("t"));
    }

    #[test]
    fn helper_body_accepts_helper_details_key() {
        let body: Envelope<HelperDetails> = serde_json::from_str(
            r#"{"helperDetails":{"helperUserId":"h1","lat":1.0,"long":2.0,"helpSeekerToken":"s"}}"#,
        )
        .unwrap();
        let body = body.into_inner();
        assert_eq!(body.helper_user_id.as_deref(), Some("h1"));
        assert_eq!(body.help_seeker_token.as_deref(), Some("s"));
    }

    #[test]
    fn unknown_fields_are_kept() {
        let body: Envelope<UserDetails> = serde_json::from_str(
            r#"{"userDetails":{"userId":1,"username":"asha","lat":1.0,"long":2.0,"age":31}}"#,
        )
        .unwrap();
        let body = body.into_inner();
        assert_eq!(body.user_id.as_deref(), Some("1"));
        assert_eq!(body.extra.get("username").and_then(Value::as_str), Some("asha"));
        assert_eq!(body.extra.get("age").and_then(Value::as_i64), Some(31));
        assert!(!body.extra.contains_key("lat"));
    }

    #[test]
    fn bad_field_inside_wrapper_is_reported() {
        let err = serde_json::from_str::<Envelope<UserDetails>>(
            r#"{"userDetails":{"userId":"u1","lat":"10.0","long":20.0}}"#,
        )
        .unwrap_err()
        .to_string();
        assert!(err.starts_with("userDetails: invalid type"), "{}", err);
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(serde_json::from_str::<Envelope<UserDetails>>("[1, 2]").is_err());
    }

    #[test]
    fn missing_fields_stay_none() {
        let body: Envelope<UserDetails> = serde_json::from_str(r#"{"lat":1.0}"#).unwrap();
        let body = body.into_inner();
        assert!(body.user_id.is_none());
        assert!(body.long.is_none());
    }
}
