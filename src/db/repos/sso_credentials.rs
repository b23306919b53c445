use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateSsoCredential, Principal, SsoCredential, SsoType},
};

/// Repository for SSO credentials.
///
/// This is the bridge between external identity-provider tokens and local
/// principals. Login flows resolve a token to a principal, account-linking
/// flows attach a credential to an existing principal, and outbound calls to
/// the provider look up the stored token for a principal.
#[async_trait]
pub trait SsoCredentialRepo: Send + Sync {
    /// Find the principal linked to an external user token.
    ///
    /// When `domains` is empty, any principal in the store linked to the
    /// token matches. Otherwise only principals belonging to at least one of
    /// the given domains are considered.
    async fn find_principal_by_token(
        &self,
        sso_type: SsoType,
        token: &str,
        provider: &str,
        domains: &[Uuid],
    ) -> DbResult<Option<Principal>>;

    /// Find the stored external token for a principal.
    ///
    /// Candidate domains are tried in caller order and the first matching
    /// credential wins. An empty domain list never matches.
    async fn find_token_for_principal(
        &self,
        principal_id: Uuid,
        sso_type: SsoType,
        provider: &str,
        domains: &[Uuid],
    ) -> DbResult<Option<String>>;

    /// Attach an SSO credential to a principal.
    ///
    /// Idempotent: if the principal already has a credential for the
    /// `(sso_type, provider)` pair, the existing credential is returned
    /// unchanged. A concurrent insert that slips past the existence check
    /// surfaces as `Conflict`; a missing principal as `NotFound`.
    async fn attach(
        &self,
        principal_id: Uuid,
        input: CreateSsoCredential,
    ) -> DbResult<SsoCredential>;

    /// Whether the principal has a credential for the given pair.
    async fn has_credential(
        &self,
        principal_id: Uuid,
        sso_type: SsoType,
        provider: &str,
    ) -> DbResult<bool>;

    /// All credentials attached to a principal, newest first.
    async fn list_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<SsoCredential>>;

    /// Remove the credential for the given pair. Fails with `NotFound` if
    /// the principal has no such credential.
    async fn detach(&self, principal_id: Uuid, sso_type: SsoType, provider: &str) -> DbResult<()>;
}
