mod auth_domains;
mod common;
mod principals;
mod sso_credentials;

pub use auth_domains::SqliteAuthDomainRepo;
pub use principals::SqlitePrincipalRepo;
pub use sso_credentials::SqliteSsoCredentialRepo;
