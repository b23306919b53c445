use sqlx::{Row, sqlite::SqliteRow};
use uuid::Uuid;

use crate::{
    db::error::{DbError, DbResult},
    models::Principal,
};

/// Parse a UUID string from the database, returning a DbError on failure
pub fn parse_uuid(s: &str) -> DbResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("Invalid UUID in database: {}", e)))
}

/// Map a row from the principals table. Shared between the principal and
/// SSO credential repositories.
pub fn principal_from_row(row: &SqliteRow) -> DbResult<Principal> {
    Ok(Principal {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        username: row.get("username"),
        email: row.get("email"),
        name: row.get("name"),
        enabled: row.get("enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
