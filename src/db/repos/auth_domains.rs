use async_trait::async_trait;
use uuid::Uuid;

use super::ListParams;
use crate::{
    db::error::DbResult,
    models::{AuthDomain, CreateAuthDomain},
};

#[async_trait]
pub trait AuthDomainRepo: Send + Sync {
    /// Create a domain. Fails with `Conflict` if the name is taken.
    async fn create(&self, input: CreateAuthDomain) -> DbResult<AuthDomain>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<AuthDomain>>;
    async fn get_by_name(&self, name: &str) -> DbResult<Option<AuthDomain>>;
    async fn list(&self, params: ListParams) -> DbResult<Vec<AuthDomain>>;
    /// Hard delete. Memberships cascade; principals themselves are kept.
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
