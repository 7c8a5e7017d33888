use serde::{Deserialize, Serialize};

/// Data carried by a push notification. The device reads `kind` to decide
/// which screen to open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PushPayload {
    /// Someone nearby needs help. `help_seeker_token` lets the receiving
    /// device register itself as a helper for the right seeker.
    #[serde(rename_all = "camelCase")]
    NotifyUser {
        user_id: String,
        lat: f64,
        long: f64,
        help_seeker_token: Option<String>,
    },

    /// A helper is on the way to the seeker.
    #[serde(rename_all = "camelCase")]
    NotifyVictim {
        helper_user_id: String,
        lat: f64,
        long: f64,
    },
}

impl PushPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotifyUser { .. } => "NOTIFY_USER",
            Self::NotifyVictim { .. } => "NOTIFY_VICTIM",
        }
    }
}
