use sii_types::api::{HelperDetails, UserDetails};
use sii_types::models::{Coordinates, Extra, strip_reserved};

use crate::error::ApiError;

/// A user id with a usable position, taken from a request body.
#[derive(Debug, Clone)]
pub(crate) struct Located {
    pub id: String,
    pub position: Coordinates,
    pub device_token: Option<String>,
    pub extra: Extra,
}

pub(crate) fn user_details(mut d: UserDetails) -> Result<Located, ApiError> {
    let missing = missing_fields(&[
        ("userId", d.user_id.is_some()),
        ("lat", d.lat.is_some()),
        ("long", d.long.is_some()),
    ]);
    let (Some(id), Some(lat), Some(long)) = (d.user_id, d.lat, d.long) else {
        return Err(missing);
    };
    strip_reserved(&mut d.extra);
    Ok(Located {
        id,
        position: coordinates(lat, long)?,
        device_token: d.device_token,
        extra: d.extra,
    })
}

pub(crate) fn helper_details(d: &HelperDetails) -> Result<Located, ApiError> {
    let missing = missing_fields(&[
        ("helperUserId", d.helper_user_id.is_some()),
        ("lat", d.lat.is_some()),
        ("long", d.long.is_some()),
    ]);
    let (Some(id), Some(lat), Some(long)) = (d.helper_user_id.clone(), d.lat, d.long) else {
        return Err(missing);
    };
    Ok(Located {
        id,
        position: coordinates(lat, long)?,
        device_token: d.device_token.clone(),
        extra: Extra::new(),
    })
}

pub(crate) fn coordinates(lat: f64, long: f64) -> Result<Coordinates, ApiError> {
    let c = Coordinates::new(lat, long);
    if !c.is_valid() {
        return Err(ApiError::Validation(format!("invalid coordinates ({}, {})", lat, long)));
    }
    Ok(c)
}

/// Validation error naming every absent field, in the order given.
fn missing_fields(fields: &[(&str, bool)]) -> ApiError {
    let names: Vec<&str> = fields.iter().filter(|(_, present)| !present).map(|(name, _)| *name).collect();
    ApiError::Validation(format!("missing {}", names.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: ApiError) -> String {
        match err {
            ApiError::Validation(msg) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn names_every_missing_field() {
        let err = user_details(UserDetails {
            lat: Some(1.0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(message(err), "missing userId, long");

        let err = helper_details(&HelperDetails {
            helper_user_id: Some("h".into()),
            long: Some(1.0),
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(message(err), "missing lat");
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = user_details(UserDetails {
            user_id: Some("u1".into()),
            lat: Some(91.0),
            long: Some(0.0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(message(err).starts_with("invalid coordinates"));
    }

    #[test]
    fn accepts_complete_details() {
        let located = user_details(UserDetails {
            user_id: Some("u1".into()),
            lat: Some(10.0),
            long: Some(20.0),
            device_token: Some("t".into()),
            extra: serde_json::from_str(r#"{"username":"asha","createdAt":"forged"}"#).unwrap(),
        })
        .unwrap();
        assert_eq!(located.id, "u1");
        assert_eq!(located.position, Coordinates::new(10.0, 20.0));
        assert_eq!(located.device_token.as_deref(), Some("t"));
        assert_eq!(located.extra.len(), 1);
        assert_eq!(located.extra["username"], "asha");
    }
}
