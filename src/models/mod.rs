mod auth_domain;
mod principal;
mod sso_credential;

pub use auth_domain::*;
pub use principal::*;
pub use sso_credential::*;
