use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{
        error::{DbError, DbResult},
        repos::{AuthDomainRepo, ListParams},
    },
    models::{AuthDomain, CreateAuthDomain},
};

pub struct PostgresAuthDomainRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

fn domain_from_row(row: &PgRow) -> AuthDomain {
    AuthDomain {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

impl PostgresAuthDomainRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }
}

#[async_trait]
impl AuthDomainRepo for PostgresAuthDomainRepo {
    async fn create(&self, input: CreateAuthDomain) -> DbResult<AuthDomain> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        let row = sqlx::query(
            r#"
            INSERT INTO auth_domains (id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("Domain '{}' already exists", input.name))
            }
            _ => DbError::from(e),
        })?;

        Ok(domain_from_row(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<AuthDomain>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.map(|row| domain_from_row(&row)))
    }

    async fn get_by_name(&self, name: &str) -> DbResult<Option<AuthDomain>> {
        let result = sqlx::query(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.map(|row| domain_from_row(&row)))
    }

    async fn list(&self, params: ListParams) -> DbResult<Vec<AuthDomain>> {
        let order = params.sort_order.as_sql();
        let query = format!(
            r#"
            SELECT id, name, description, created_at
            FROM auth_domains
            ORDER BY created_at {order}, id {order}
            LIMIT $1 OFFSET $2
            "#,
        );

        let rows = sqlx::query(&query)
            .bind(params.limit_or_default())
            .bind(params.offset_or_default())
            .fetch_all(&self.read_pool)
            .await?;

        Ok(rows.iter().map(domain_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM auth_domains WHERE id = $1")
            .bind(id)
            .execute(&self.write_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
