use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;
use validator::Validate;

use super::principals::principal_from_row;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::SsoCredentialRepo,
    },
    models::{CreateSsoCredential, Principal, SsoCredential, SsoType},
};

pub struct PostgresSsoCredentialRepo {
    write_pool: PgPool,
    read_pool: PgPool,
}

fn credential_from_row(row: &PgRow) -> SsoCredential {
    let sso_type: String = row.get("sso_type");
    SsoCredential {
        id: row.get("id"),
        principal_id: row.get("principal_id"),
        sso_type: SsoType::from_str(&sso_type).unwrap_or_default(),
        provider: row.get("provider"),
        sso_id: row.get("sso_id"),
        created_at: row.get("created_at"),
    }
}

impl PostgresSsoCredentialRepo {
    pub fn new(write_pool: PgPool, read_pool: Option<PgPool>) -> Self {
        let read_pool = read_pool.unwrap_or_else(|| write_pool.clone());
        Self {
            write_pool,
            read_pool,
        }
    }

    async fn get(
        &self,
        principal_id: Uuid,
        sso_type: SsoType,
        provider: &str,
    ) -> DbResult<Option<SsoCredential>> {
        let result = sqlx::query(
            r#"
            SELECT id, principal_id, sso_type, provider, sso_id, created_at
            FROM sso_credentials
            WHERE principal_id = $1 AND sso_type = $2 AND provider = $3
            "#,
        )
        .bind(principal_id)
        .bind(sso_type.as_str())
        .bind(provider)
        .fetch_optional(&self.read_pool)
        .await?;

        Ok(result.map(|row| credential_from_row(&row)))
    }
}

#[async_trait]
impl SsoCredentialRepo for PostgresSsoCredentialRepo {
    async fn find_principal_by_token(
        &self,
        sso_type: SsoType,
        token: &str,
        provider: &str,
        domains: &[Uuid],
    ) -> DbResult<Option<Principal>> {
        let result = if domains.is_empty() {
            sqlx::query(
                r#"
                SELECT p.id, p.username, p.email, p.name, p.enabled, p.created_at, p.updated_at
                FROM principals p
                INNER JOIN sso_credentials c ON c.principal_id = p.id
                WHERE c.sso_type = $1 AND c.provider = $2 AND c.sso_id = $3
                LIMIT 1
                "#,
            )
            .bind(sso_type.as_str())
            .bind(provider)
            .bind(token)
            .fetch_optional(&self.read_pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT p.id, p.username, p.email, p.name, p.enabled, p.created_at, p.updated_at
                FROM principals p
                INNER JOIN sso_credentials c ON c.principal_id = p.id
                INNER JOIN principal_domains pd ON pd.principal_id = p.id
                WHERE c.sso_type = $1 AND c.provider = $2 AND c.sso_id = $3
                AND pd.domain_id = ANY($4)
                LIMIT 1
                "#,
            )
            .bind(sso_type.as_str())
            .bind(provider)
            .bind(token)
            .bind(domains)
            .fetch_optional(&self.read_pool)
            .await?
        };

        Ok(result.map(|row| principal_from_row(&row)))
    }

    async fn find_token_for_principal(
        &self,
        principal_id: Uuid,
        sso_type: SsoType,
        provider: &str,
        domains: &[Uuid],
    ) -> DbResult<Option<String>> {
        // Domains are tried in caller order; the first credential visible
        // through a listed domain wins.
        for domain_id in domains {
            let result = sqlx::query(
                r#"
                SELECT c.sso_id
                FROM sso_credentials c
                INNER JOIN principal_domains pd ON pd.principal_id = c.principal_id
                WHERE c.principal_id = $1 AND c.sso_type = $2 AND c.provider = $3
                AND pd.domain_id = $4
                LIMIT 1
                "#,
            )
            .bind(principal_id)
            .bind(sso_type.as_str())
            .bind(provider)
            .bind(domain_id)
            .fetch_optional(&self.read_pool)
            .await?;

            if let Some(row) = result {
                return Ok(Some(row.get("sso_id")));
            }
        }

        Ok(None)
    }

    async fn attach(
        &self,
        principal_id: Uuid,
        input: CreateSsoCredential,
    ) -> DbResult<SsoCredential> {
        input
            .validate()
            .map_err(|e| DbError::Validation(e.to_string()))?;

        if let Some(existing) = self
            .get(principal_id, input.sso_type, &input.provider)
            .await?
        {
            tracing::debug!(
                principal_id = %principal_id,
                sso_type = %input.sso_type,
                provider = %input.provider,
                "Principal already has an SSO credential for this pair, skipping attach"
            );
            return Ok(existing);
        }

        let row = sqlx::query(
            r#"
            INSERT INTO sso_credentials (id, principal_id, sso_type, provider, sso_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, principal_id, sso_type, provider, sso_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(principal_id)
        .bind(input.sso_type.as_str())
        .bind(&input.provider)
        .bind(&input.sso_id)
        .fetch_one(&self.write_pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!(
                    "Principal already has an SSO credential for {}/{}",
                    input.sso_type, input.provider
                ),
            ),
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => DbError::NotFound,
            _ => DbError::from(e),
        })?;

        Ok(credential_from_row(&row))
    }

    async fn has_credential(
        &self,
        principal_id: Uuid,
        sso_type: SsoType,
        provider: &str,
    ) -> DbResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sso_credentials
                WHERE principal_id = $1 AND sso_type = $2 AND provider = $3
            ) as present
            "#,
        )
        .bind(principal_id)
        .bind(sso_type.as_str())
        .bind(provider)
        .fetch_one(&self.read_pool)
        .await?;

        Ok(row.get::<bool, _>("present"))
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<SsoCredential>> {
        let rows = sqlx::query(
            r#"
            SELECT id, principal_id, sso_type, provider, sso_id, created_at
            FROM sso_credentials
            WHERE principal_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(principal_id)
        .fetch_all(&self.read_pool)
        .await?;

        Ok(rows.iter().map(credential_from_row).collect())
    }

    async fn detach(&self, principal_id: Uuid, sso_type: SsoType, provider: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM sso_credentials
            WHERE principal_id = $1 AND sso_type = $2 AND provider = $3
            "#,
        )
        .bind(principal_id)
        .bind(sso_type.as_str())
        .bind(provider)
        .execute(&self.write_pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
