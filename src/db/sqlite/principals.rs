use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;
use validator::Validate;

use super::common::{parse_uuid, principal_from_row};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{ListParams, PrincipalRepo},
    },
    models::{AuthDomain, CreatePrincipal, Principal, UpdatePrincipal},
};

pub struct SqlitePrincipalRepo {
    pool: SqlitePool,
}

impl SqlitePrincipalRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalRepo for SqlitePrincipalRepo {
    async fn create(&self, input: CreatePrincipal) -> DbResult<Principal> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO principals (id, username, email, name, enabled, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.name)
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Principal with username '{}' already exists", input.username),
            ),
            _ => DbError::from(e),
        })?;

        Ok(Principal {
            id,
            username: input.username,
            email: input.email,
            name: input.name,
            enabled: true,
            created_at: now,
            updated_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Principal>> {
        let result = sqlx::query(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| principal_from_row(&row)).transpose()
    }

    async fn get_by_username(&self, username: &str) -> DbResult<Option<Principal>> {
        let result = sqlx::query(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| principal_from_row(&row)).transpose()
    }

    async fn list(&self, params: ListParams) -> DbResult<Vec<Principal>> {
        let order = params.sort_order.as_sql();
        let query = format!(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            ORDER BY created_at {order}, id {order}
            LIMIT ? OFFSET ?
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(principal_from_row).collect()
    }

    async fn count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM principals")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> DbResult<Principal> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let mut updates = vec![];

        if input.email.is_some() {
            updates.push("email = ?");
        }
        if input.name.is_some() {
            updates.push("name = ?");
        }
        if input.enabled.is_some() {
            updates.push("enabled = ?");
        }

        if updates.is_empty() {
            return self.get_by_id(id).await?.ok_or(DbError::NotFound);
        }

        let now = chrono::Utc::now();
        let query_str = format!(
            "UPDATE principals SET {}, updated_at = ? WHERE id = ?",
            updates.join(", ")
        );

        let mut query = sqlx::query(&query_str);
        if let Some(ref email) = input.email {
            query = query.bind(email);
        }
        if let Some(ref name) = input.name {
            query = query.bind(name);
        }
        if let Some(enabled) = input.enabled {
            query = query.bind(enabled);
        }
        query = query.bind(now).bind(id.to_string());

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM principals WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn add_to_domain(&self, principal_id: Uuid, domain_id: Uuid) -> DbResult<()> {
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO principal_domains (domain_id, principal_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(domain_id.to_string())
        .bind(principal_id.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict("Principal is already a member of this domain".to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => DbError::NotFound,
            _ => DbError::from(e),
        })?;

        Ok(())
    }

    async fn remove_from_domain(&self, principal_id: Uuid, domain_id: Uuid) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM principal_domains
            WHERE domain_id = ? AND principal_id = ?
            "#,
        )
        .bind(domain_id.to_string())
        .bind(principal_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn list_domain_members(
        &self,
        domain_id: Uuid,
        params: ListParams,
    ) -> DbResult<Vec<Principal>> {
        let order = params.sort_order.as_sql();
        let query = format!(
            r#"
            SELECT p.id, p.username, p.email, p.name, p.enabled, p.created_at, p.updated_at
            FROM principals p
            INNER JOIN principal_domains pd ON p.id = pd.principal_id
            WHERE pd.domain_id = ?
            ORDER BY p.created_at {order}, p.id {order}
            LIMIT ? OFFSET ?
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(domain_id.to_string())
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(principal_from_row).collect()
    }

    async fn domains_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<AuthDomain>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.name, d.description, d.created_at
            FROM auth_domains d
            INNER JOIN principal_domains pd ON d.id = pd.domain_id
            WHERE pd.principal_id = ?
            ORDER BY pd.created_at DESC
            "#,
        )
        .bind(principal_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(AuthDomain {
                    id: parse_uuid(&row.get::<String, _>("id"))?,
                    name: row.get("name"),
                    description: row.get("description"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }
}
