use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;
use validator::Validate;

use super::common::{parse_uuid, principal_from_row};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::SsoCredentialRepo,
    },
    models::{CreateSsoCredential, Principal, SsoCredential, SsoType},
};

pub struct SqliteSsoCredentialRepo {
    pool: SqlitePool,
}

fn credential_from_row(row: &SqliteRow) -> DbResult<SsoCredential> {
    let sso_type: String = row.get("sso_type");
    Ok(SsoCredential {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        principal_id: parse_uuid(&row.get::<String, _>("principal_id"))?,
        sso_type: SsoType::from_str(&sso_type).unwrap_or_default(),
        provider: row.get("provider"),
        sso_id: row.get("sso_id"),
        created_at: row.get("created_at"),
    })
}

impl SqliteSsoCredentialRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
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
            WHERE principal_id = ? AND sso_type = ? AND provider = ?
            "#,
        )
        .bind(principal_id.to_string())
        .bind(sso_type.as_str())
        .bind(provider)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| credential_from_row(&row)).transpose()
    }
}

#[async_trait]
impl SsoCredentialRepo for SqliteSsoCredentialRepo {
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
                WHERE c.sso_type = ? AND c.provider = ? AND c.sso_id = ?
                LIMIT 1
                "#,
            )
            .bind(sso_type.as_str())
            .bind(provider)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?
        } else {
            // SQLite has no array binds; expand the domain list inline.
            let placeholders = vec!["?"; domains.len()].join(", ");
            let query = format!(
                r#"
                SELECT p.id, p.username, p.email, p.name, p.enabled, p.created_at, p.updated_at
                FROM principals p
                INNER JOIN sso_credentials c ON c.principal_id = p.id
                INNER JOIN principal_domains pd ON pd.principal_id = p.id
                WHERE c.sso_type = ? AND c.provider = ? AND c.sso_id = ?
                AND pd.domain_id IN ({placeholders})
                LIMIT 1
                "#,
            );

            let mut q = sqlx::query(&query)
                .bind(sso_type.as_str())
                .bind(provider)
                .bind(token);
            for domain_id in domains {
                q = q.bind(domain_id.to_string());
            }
            q.fetch_optional(&self.pool).await?
        };

        result.map(|row| principal_from_row(&row)).transpose()
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
                WHERE c.principal_id = ? AND c.sso_type = ? AND c.provider = ?
                AND pd.domain_id = ?
                LIMIT 1
                "#,
            )
            .bind(principal_id.to_string())
            .bind(sso_type.as_str())
            .bind(provider)
            .bind(domain_id.to_string())
            .fetch_optional(&self.pool)
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

        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO sso_credentials (id, principal_id, sso_type, provider, sso_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(principal_id.to_string())
        .bind(input.sso_type.as_str())
        .bind(&input.provider)
        .bind(&input.sso_id)
        .bind(now)
        .execute(&self.pool)
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

        Ok(SsoCredential {
            id,
            principal_id,
            sso_type: input.sso_type,
            provider: input.provider,
            sso_id: input.sso_id,
            created_at: now,
        })
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
                WHERE principal_id = ? AND sso_type = ? AND provider = ?
            ) as present
            "#,
        )
        .bind(principal_id.to_string())
        .bind(sso_type.as_str())
        .bind(provider)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<bool, _>("present"))
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> DbResult<Vec<SsoCredential>> {
        let rows = sqlx::query(
            r#"
            SELECT id, principal_id, sso_type, provider, sso_id, created_at
            FROM sso_credentials
            WHERE principal_id = ?
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(principal_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(credential_from_row).collect()
    }

    async fn detach(&self, principal_id: Uuid, sso_type: SsoType, provider: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM sso_credentials
            WHERE principal_id = ? AND sso_type = ? AND provider = ?
            "#,
        )
        .bind(principal_id.to_string())
        .bind(sso_type.as_str())
        .bind(provider)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        Ok(())
    }
}
