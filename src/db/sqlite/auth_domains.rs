use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;
use validator::Validate;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{AuthDomainRepo, ListParams},
    },
    models::{AuthDomain, CreateAuthDomain},
};

pub struct SqliteAuthDomainRepo {
    pool: SqlitePool,
}

fn domain_from_row(row: &SqliteRow) -> DbResult<AuthDomain> {
    Ok(AuthDomain {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    })
}

impl SqliteAuthDomainRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthDomainRepo for SqliteAuthDomainRepo {
    async fn create(&self, input: CreateAuthDomain) -> DbResult<AuthDomain> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO auth_domains (id, name, description, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(&input.description)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("Domain '{}' already exists", input.name))
            }
            _ => DbError::from(e),
        })?;

        Ok(AuthDomain {
            id,
            name: input.name,
            description: input.description,
            created_at: now,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<AuthDomain>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| domain_from_row(&row)).transpose()
    }

    async fn get_by_name(&self, name: &str) -> DbResult<Option<AuthDomain>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            WHERE name = ?
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| domain_from_row(&row)).transpose()
    }

    async fn list(&self, params: ListParams) -> DbResult<Vec<AuthDomain>> {
        let order = params.sort_order.as_sql();
        let query = format!(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            ORDER BY created_at {order}, id {order}
            LIMIT ? OFFSET ?
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(domain_from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM auth_domains WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
