use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Kind of single-sign-on integration a credential came from.
///
/// Aggregator services that front many social providers use `Other` together
/// with a `provider` service identifier on the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SsoType {
    Facebook,
    Google,
    LinkedIn,
    Twitter,
    #[default]
    Other,
}

impl SsoType {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Google => "google",
            Self::LinkedIn => "linked_in",
            Self::Twitter => "twitter",
            Self::Other => "other",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "facebook" => Some(Self::Facebook),
            "google" => Some(Self::Google),
            "linked_in" => Some(Self::LinkedIn),
            "twitter" => Some(Self::Twitter),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for SsoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An SSO credential attached to a principal.
///
/// At most one credential exists per `(principal_id, sso_type, provider)`.
/// The `sso_id` is the opaque user token issued by the external identity
/// provider; it is what login flows present to find the local principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoCredential {
    pub id: Uuid,
    pub principal_id: Uuid,
    pub sso_type: SsoType,
    /// Service identifier of the integration, e.g. "oneall".
    pub provider: String,
    /// External user token from the identity provider.
    pub sso_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSsoCredential {
    pub sso_type: SsoType,
    #[validate(length(min = 1, max = 64))]
    pub provider: String,
    #[validate(length(min = 1, max = 512))]
    pub sso_id: String,
}
