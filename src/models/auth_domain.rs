use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// An authentication domain.
///
/// Domains partition principals for multi-tenant deployments. Token lookups
/// can be scoped to a set of domains, or left unscoped to search the whole
/// store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthDomain {
    pub id: Uuid,
    /// Unique domain name, e.g. "acme.example.com".
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAuthDomain {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}
