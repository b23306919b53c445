use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{ListParams, PrincipalRepo},
    },
    models::{AuthDomain, CreatePrincipal, Principal, UpdatePrincipal},
};

pub struct PostgresPrincipalRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

pub(super) fn principal_from_row(row: &PgRow) -> Principal {
    Principal {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        name: row.get("name"),
        enabled: row.get("enabled"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

impl PostgresPrincipalRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl PrincipalRepo for PostgresPrincipalRepo {
    async fn create(&self, input: CreatePrincipal) -> DbResult<Principal> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO principals (id, username, email, name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, name, enabled, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.name)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Principal with username '{}' already exists", input.username),
            ),
            _ => DbError::from(e),
        })?;

        Ok(principal_from_row(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Principal>> {
        let result = sqlx::query(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.map(|row| principal_from_row(&row)))
    }

    async fn get_by_username(&self, username: &str) -> DbResult<Option<Principal>> {
        let result = sqlx::query(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.map(|row| principal_from_row(&row)))
    }

    async fn list(&self, params: ListParams) -> DbResult<Vec<Principal>> {
        let order = params.sort_order.as_sql();
        let query = format!(
            r#"
            SELECT id, username, email, name, enabled, created_at, updated_at
            FROM principals
            ORDER BY created_at {order}, id {order}
            LIMIT $1 OFFSET $2
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(principal_from_row).collect())
    }

    async fn count(&self) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM principals")
            .fetch_one(&self.read_pool)
            .await?;
        Ok(row.get::<i64, _>("count"))
    }

    async fn update(&self, id: Uuid, input: UpdatePrincipal) -> DbResult<Principal> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let mut updates = vec![];
        let mut param_count = 1;

        if input.email.is_some() {
            updates.push(format!("email = ${param_count}"));
            param_count += 1;
        }
        if input.name.is_some() {
            updates.push(format!("name = ${param_count}"));
            param_count += 1;
        }
        if input.enabled.is_some() {
            updates.push(format!("enabled = ${param_count}"));
            param_count += 1;
        }

        if updates.is_empty() {
            return self.get_by_id(id).await?.ok_or(DbError::NotFound);
        }

        let query_str = format!(
            "UPDATE principals SET {}, updated_at = NOW() WHERE id = ${} \
             RETURNING id, username, email, name, enabled, created_at, updated_at",
            updates.join(", "),
            param_count
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
        query = query.bind(id);

        let row = query
            .fetch_optional(&self.write_pool)
            .await?
            .ok_or(DbError::NotFound)?;

        Ok(principal_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM principals WHERE id = $1")
            .bind(id)
            .execute(&self.write_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }

    async fn add_to_domain(&self, principal_id: Uuid, domain_id: Uuid) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO principal_domains (domain_id, principal_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(domain_id)
        .bind(principal_id)
        .execute(&self.write_pool)
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
            WHERE domain_id = $1 AND principal_id = $2
            "#,
        )
        .bind(domain_id)
        .bind(principal_id)
        .execute(&self.write_pool)
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
            WHERE pd.domain_id = $1
            ORDER BY p.created_at {order}, p.id {order}
            LIMIT $2 OFFSET $3
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(domain_id)
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(principal_from_row).collect())
    }

    async fn domains_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<AuthDomain>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.name, d.description, d.created_at
            FROM auth_domains d
            INNER JOIN principal_domains pd ON d.id = pd.domain_id
            WHERE pd.principal_id = $1
            ORDER BY pd.created_at DESC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.read_pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AuthDomain {
                id: row.get("id"),
                name: row.get("name"),
                description: row.get("description"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
