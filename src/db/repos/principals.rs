use async_trait::async_trait;
use uuid::Uuid;

use super::ListParams;
use crate::{
    db::error::DbResult,
    models::{AuthDomain, CreatePrincipal, Principal, UpdatePrincipal},
};

#[async_trait]
pub trait PrincipalRepo: Send + Sync {
    /// Create a principal. Fails with `Conflict` if the username is taken.
    async fn create(&self, input: CreatePrincipal) -> DbResult<Principal>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Principal>>;
    async fn get_by_username(&self, username: &str) -> DbResult<Option<Principal>>;
    async fn list(&self, params: ListParams) -> DbResult<Vec<Principal>>;
    async fn count(&self) -> DbResult<i64>;
    /// Partial update. Fails with `NotFound` if the principal does not exist.
    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> DbResult<Principal>;
    /// Hard delete. Domain memberships and SSO credentials cascade.
    async fn delete(&self, id: Uuid) -> DbResult<()>;

    // Domain memberships
    async fn add_to_domain(&self, principal_id: Uuid, domain_id: Uuid) -> DbResult<()>;
    async fn remove_from_domain(&self, principal_id: Uuid, domain_id: Uuid) -> DbResult<()>;
    async fn list_domain_members(
        &self,
        domain_id: Uuid,
        params: ListParams,
    ) -> DbResult<Vec<Principal>>;
    /// All domains the principal belongs to, newest membership first.
    async fn domains_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<AuthDomain>>;
}
