mod auth_domains;
mod principals;
mod sso_credentials;

pub use auth_domains::PostgresAuthDomainRepo;
pub use principals::PostgresPrincipalRepo;
pub use sso_credentials::PostgresSsoCredentialRepo;
