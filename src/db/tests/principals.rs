//! Shared tests for PrincipalRepo implementations

use uuid::Uuid;

use crate::{
    db::{
        error::DbError,
        repos::{AuthDomainRepo, ListParams, PrincipalRepo, SortOrder},
    },
    models::{CreateAuthDomain, CreatePrincipal, UpdatePrincipal},
};

fn create_principal_input(
    username: &str,
    email: Option<&str>,
    name: Option<&str>,
) -> CreatePrincipal {
    CreatePrincipal {
        username: username.to_string(),
        email: email.map(|e| e.to_string()),
        name: name.map(|n| n.to_string()),
    }
}

/// Test context containing repos needed for principal tests
pub struct PrincipalTestContext<'a> {
    pub principal_repo: &'a dyn PrincipalRepo,
    pub domain_repo: &'a dyn AuthDomainRepo,
}

impl PrincipalTestContext<'_> {
    /// Create a test domain and return its ID
    pub async fn create_test_domain(&self, name: &str) -> Uuid {
        self.domain_repo
            .create(CreateAuthDomain {
                name: name.to_string(),
                description: None,
            })
            .await
            .expect("Failed to create test domain")
            .id
    }
}

// ============================================================================
// Principal CRUD Test Functions
// ============================================================================

pub async fn test_create_principal(ctx: &PrincipalTestContext<'_>) {
    let input = create_principal_input("alice", Some("alice@example.com"), Some("Alice"));
    let principal = ctx
        .principal_repo
        .create(input)
        .await
        .expect("Failed to create principal");

    assert_eq!(principal.username, "alice");
    assert_eq!(principal.email, Some("alice@example.com".to_string()));
    assert_eq!(principal.name, Some("Alice".to_string()));
    assert!(principal.enabled);
    assert!(!principal.id.is_nil());
}

pub async fn test_create_principal_minimal(ctx: &PrincipalTestContext<'_>) {
    let input = create_principal_input("bob", None, None);
    let principal = ctx
        .principal_repo
        .create(input)
        .await
        .expect("Failed to create principal");

    assert_eq!(principal.username, "bob");
    assert!(principal.email.is_none());
    assert!(principal.name.is_none());
}

pub async fn test_create_duplicate_username_fails(ctx: &PrincipalTestContext<'_>) {
    let input1 = create_principal_input("carol", Some("first@example.com"), None);
    ctx.principal_repo
        .create(input1)
        .await
        .expect("Failed to create first principal");

    let input2 = create_principal_input("carol", Some("second@example.com"), None);
    let result = ctx.principal_repo.create(input2).await;

    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_create_rejects_invalid_email(ctx: &PrincipalTestContext<'_>) {
    let input = create_principal_input("dave", Some("not-an-email"), None);
    let result = ctx.principal_repo.create(input).await;

    assert!(matches!(result, Err(DbError::Validation(_))));
}

pub async fn test_get_by_id(ctx: &PrincipalTestContext<'_>) {
    let input = create_principal_input("erin", Some("erin@example.com"), None);
    let created = ctx
        .principal_repo
        .create(input)
        .await
        .expect("Failed to create principal");

    let fetched = ctx
        .principal_repo
        .get_by_id(created.id)
        .await
        .expect("Failed to get principal")
        .expect("Principal should exist");

    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.username, "erin");
    assert_eq!(fetched.email, Some("erin@example.com".to_string()));
}

pub async fn test_get_by_id_not_found(ctx: &PrincipalTestContext<'_>) {
    let result = ctx
        .principal_repo
        .get_by_id(Uuid::new_v4())
        .await
        .expect("Query should succeed");

    assert!(result.is_none());
}

pub async fn test_get_by_username(ctx: &PrincipalTestContext<'_>) {
    let input = create_principal_input("frank", None, None);
    let created = ctx
        .principal_repo
        .create(input)
        .await
        .expect("Failed to create principal");

    let fetched = ctx
        .principal_repo
        .get_by_username("frank")
        .await
        .expect("Failed to get principal")
        .expect("Principal should exist");

    assert_eq!(fetched.id, created.id);
}

pub async fn test_get_by_username_not_found(ctx: &PrincipalTestContext<'_>) {
    let result = ctx
        .principal_repo
        .get_by_username("nonexistent")
        .await
        .expect("Query should succeed");

    assert!(result.is_none());
}

pub async fn test_list_with_limit_and_offset(ctx: &PrincipalTestContext<'_>) {
    for i in 0..5 {
        ctx.principal_repo
            .create(create_principal_input(&format!("user-{}", i), None, None))
            .await
            .expect("Failed to create principal");
    }

    let page1 = ctx
        .principal_repo
        .list(ListParams {
            limit: Some(2),
            ..Default::default()
        })
        .await
        .expect("Failed to list page 1");
    let page2 = ctx
        .principal_repo
        .list(ListParams {
            limit: Some(2),
            offset: Some(2),
            ..Default::default()
        })
        .await
        .expect("Failed to list page 2");

    assert_eq!(page1.len(), 2);
    assert_eq!(page2.len(), 2);
    assert_ne!(page1[0].id, page2[0].id);
}

pub async fn test_list_sort_order(ctx: &PrincipalTestContext<'_>) {
    for name in ["first", "second"] {
        ctx.principal_repo
            .create(create_principal_input(name, None, None))
            .await
            .expect("Failed to create principal");
    }

    let asc = ctx
        .principal_repo
        .list(ListParams {
            sort_order: SortOrder::Asc,
            ..Default::default()
        })
        .await
        .expect("Failed to list ascending");
    let desc = ctx
        .principal_repo
        .list(ListParams::default())
        .await
        .expect("Failed to list descending");

    assert_eq!(asc.len(), 2);
    assert_eq!(desc.len(), 2);
    assert_eq!(asc.first().map(|p| p.id), desc.last().map(|p| p.id));
}

pub async fn test_count(ctx: &PrincipalTestContext<'_>) {
    assert_eq!(
        ctx.principal_repo.count().await.expect("Failed to count"),
        0
    );

    for i in 0..3 {
        ctx.principal_repo
            .create(create_principal_input(&format!("user-{}", i), None, None))
            .await
            .expect("Failed to create principal");
    }

    assert_eq!(
        ctx.principal_repo.count().await.expect("Failed to count"),
        3
    );
}

pub async fn test_update_fields(ctx: &PrincipalTestContext<'_>) {
    let created = ctx
        .principal_repo
        .create(create_principal_input("grace", Some("old@example.com"), None))
        .await
        .expect("Failed to create principal");

    let updated = ctx
        .principal_repo
        .update(
            created.id,
            UpdatePrincipal {
                email: Some("new@example.com".to_string()),
                name: Some("Grace".to_string()),
                enabled: Some(false),
            },
        )
        .await
        .expect("Failed to update principal");

    assert_eq!(updated.email, Some("new@example.com".to_string()));
    assert_eq!(updated.name, Some("Grace".to_string()));
    assert!(!updated.enabled);
    assert!(updated.updated_at >= created.updated_at);
}

pub async fn test_update_empty_is_noop(ctx: &PrincipalTestContext<'_>) {
    let created = ctx
        .principal_repo
        .create(create_principal_input("heidi", None, Some("Heidi")))
        .await
        .expect("Failed to create principal");

    let updated = ctx
        .principal_repo
        .update(created.id, UpdatePrincipal::default())
        .await
        .expect("Empty update should succeed");

    assert_eq!(updated.name, Some("Heidi".to_string()));
    assert!(updated.enabled);
}

pub async fn test_update_not_found(ctx: &PrincipalTestContext<'_>) {
    let result = ctx
        .principal_repo
        .update(
            Uuid::new_v4(),
            UpdatePrincipal {
                email: Some("new@example.com".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_delete(ctx: &PrincipalTestContext<'_>) {
    let created = ctx
        .principal_repo
        .create(create_principal_input("ivan", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .delete(created.id)
        .await
        .expect("Failed to delete principal");

    let result = ctx
        .principal_repo
        .get_by_id(created.id)
        .await
        .expect("Query should succeed");
    assert!(result.is_none());
}

pub async fn test_delete_not_found(ctx: &PrincipalTestContext<'_>) {
    let result = ctx.principal_repo.delete(Uuid::new_v4()).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

// ============================================================================
// Domain Membership Test Functions
// ============================================================================

pub async fn test_add_to_domain(ctx: &PrincipalTestContext<'_>) {
    let domain_id = ctx.create_test_domain("acme.example.com").await;
    let principal = ctx
        .principal_repo
        .create(create_principal_input("member", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .add_to_domain(principal.id, domain_id)
        .await
        .expect("Failed to add principal to domain");

    let members = ctx
        .principal_repo
        .list_domain_members(domain_id, ListParams::default())
        .await
        .expect("Failed to list domain members");

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, principal.id);
}

pub async fn test_add_to_domain_duplicate_fails(ctx: &PrincipalTestContext<'_>) {
    let domain_id = ctx.create_test_domain("acme.example.com").await;
    let principal = ctx
        .principal_repo
        .create(create_principal_input("member", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .add_to_domain(principal.id, domain_id)
        .await
        .expect("Failed to add principal to domain");

    let result = ctx
        .principal_repo
        .add_to_domain(principal.id, domain_id)
        .await;
    assert!(matches!(result, Err(DbError::Conflict(_))));
}

pub async fn test_add_to_domain_missing_principal(ctx: &PrincipalTestContext<'_>) {
    let domain_id = ctx.create_test_domain("acme.example.com").await;

    let result = ctx
        .principal_repo
        .add_to_domain(Uuid::new_v4(), domain_id)
        .await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_remove_from_domain(ctx: &PrincipalTestContext<'_>) {
    let domain_id = ctx.create_test_domain("acme.example.com").await;
    let principal = ctx
        .principal_repo
        .create(create_principal_input("member", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .add_to_domain(principal.id, domain_id)
        .await
        .expect("Failed to add principal to domain");
    ctx.principal_repo
        .remove_from_domain(principal.id, domain_id)
        .await
        .expect("Failed to remove principal from domain");

    let members = ctx
        .principal_repo
        .list_domain_members(domain_id, ListParams::default())
        .await
        .expect("Failed to list domain members");
    assert!(members.is_empty());
}

pub async fn test_remove_from_domain_not_member(ctx: &PrincipalTestContext<'_>) {
    let domain_id = ctx.create_test_domain("acme.example.com").await;
    let principal = ctx
        .principal_repo
        .create(create_principal_input("loner", None, None))
        .await
        .expect("Failed to create principal");

    let result = ctx
        .principal_repo
        .remove_from_domain(principal.id, domain_id)
        .await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

pub async fn test_domain_members_isolated_by_domain(ctx: &PrincipalTestContext<'_>) {
    let domain_a = ctx.create_test_domain("a.example.com").await;
    let domain_b = ctx.create_test_domain("b.example.com").await;

    let p1 = ctx
        .principal_repo
        .create(create_principal_input("in-a", None, None))
        .await
        .expect("Failed to create principal");
    let p2 = ctx
        .principal_repo
        .create(create_principal_input("in-b", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .add_to_domain(p1.id, domain_a)
        .await
        .expect("Failed to add to domain a");
    ctx.principal_repo
        .add_to_domain(p2.id, domain_b)
        .await
        .expect("Failed to add to domain b");

    let members_a = ctx
        .principal_repo
        .list_domain_members(domain_a, ListParams::default())
        .await
        .expect("Failed to list members");
    assert_eq!(members_a.len(), 1);
    assert_eq!(members_a[0].id, p1.id);
}

pub async fn test_domains_for_principal(ctx: &PrincipalTestContext<'_>) {
    let domain_a = ctx.create_test_domain("a.example.com").await;
    let domain_b = ctx.create_test_domain("b.example.com").await;

    let principal = ctx
        .principal_repo
        .create(create_principal_input("multi", None, None))
        .await
        .expect("Failed to create principal");

    ctx.principal_repo
        .add_to_domain(principal.id, domain_a)
        .await
        .expect("Failed to add to domain a");
    ctx.principal_repo
        .add_to_domain(principal.id, domain_b)
        .await
        .expect("Failed to add to domain b");

    let domains = ctx
        .principal_repo
        .domains_for_principal(principal.id)
        .await
        .expect("Failed to list domains");

    assert_eq!(domains.len(), 2);
    let ids: Vec<Uuid> = domains.iter().map(|d| d.id).collect();
    assert!(ids.contains(&domain_a));
    assert!(ids.contains(&domain_b));
}

// ============================================================================
// SQLite Tests - Fast, in-memory
// ============================================================================

#[cfg(all(test, feature = "database-sqlite"))]
mod sqlite_tests {
    use super::*;
    use crate::db::{
        sqlite::{SqliteAuthDomainRepo, SqlitePrincipalRepo},
        tests::harness::{create_sqlite_pool, run_sqlite_migrations},
    };

    async fn create_repos() -> (SqlitePrincipalRepo, SqliteAuthDomainRepo) {
        let pool = create_sqlite_pool().await;
        run_sqlite_migrations(&pool).await;
        (
            SqlitePrincipalRepo::new(pool.clone()),
            SqliteAuthDomainRepo::new(pool),
        )
    }

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let (principal_repo, domain_repo) = create_repos().await;
                let ctx = PrincipalTestContext {
                    principal_repo: &principal_repo,
                    domain_repo: &domain_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    // Principal CRUD tests
    sqlite_test!(test_create_principal);
    sqlite_test!(test_create_principal_minimal);
    sqlite_test!(test_create_duplicate_username_fails);
    sqlite_test!(test_create_rejects_invalid_email);
    sqlite_test!(test_get_by_id);
    sqlite_test!(test_get_by_id_not_found);
    sqlite_test!(test_get_by_username);
    sqlite_test!(test_get_by_username_not_found);
    sqlite_test!(test_list_with_limit_and_offset);
    sqlite_test!(test_list_sort_order);
    sqlite_test!(test_count);
    sqlite_test!(test_update_fields);
    sqlite_test!(test_update_empty_is_noop);
    sqlite_test!(test_update_not_found);
    sqlite_test!(test_delete);
    sqlite_test!(test_delete_not_found);

    // Domain membership tests
    sqlite_test!(test_add_to_domain);
    sqlite_test!(test_add_to_domain_duplicate_fails);
    sqlite_test!(test_add_to_domain_missing_principal);
    sqlite_test!(test_remove_from_domain);
    sqlite_test!(test_remove_from_domain_not_member);
    sqlite_test!(test_domain_members_isolated_by_domain);
    sqlite_test!(test_domains_for_principal);
}

// ============================================================================
// PostgreSQL Tests - Require Docker, run with `cargo test -- --ignored`
// ============================================================================

#[cfg(all(test, feature = "database-postgres"))]
mod postgres_tests {
    use super::*;
    use crate::db::{
        postgres::{PostgresAuthDomainRepo, PostgresPrincipalRepo},
        tests::harness::postgres::{create_isolated_postgres_pool, run_postgres_migrations},
    };

    macro_rules! postgres_test {
        ($name:ident) => {
            #[tokio::test]
            #[ignore = "Requires Docker - run with `cargo test -- --ignored`"]
            async fn $name() {
                let pool = create_isolated_postgres_pool().await;
                run_postgres_migrations(&pool).await;
                let principal_repo = PostgresPrincipalRepo::new(pool.clone(), None);
                let domain_repo = PostgresAuthDomainRepo::new(pool, None);
                let ctx = PrincipalTestContext {
                    principal_repo: &principal_repo,
                    domain_repo: &domain_repo,
                };
                super::$name(&ctx).await;
            }
        };
    }

    // Principal CRUD tests
    postgres_test!(test_create_principal);
    postgres_test!(test_create_principal_minimal);
    postgres_test!(test_create_duplicate_username_fails);
    postgres_test!(test_create_rejects_invalid_email);
    postgres_test!(test_get_by_id);
    postgres_test!(test_get_by_id_not_found);
    postgres_test!(test_get_by_username);
    postgres_test!(test_get_by_username_not_found);
    postgres_test!(test_list_with_limit_and_offset);
    postgres_test!(test_list_sort_order);
    postgres_test!(test_count);
    postgres_test!(test_update_fields);
    postgres_test!(test_update_empty_is_noop);
    postgres_test!(test_update_not_found);
    postgres_test!(test_delete);
    postgres_test!(test_delete_not_found);

    // Domain membership tests
    postgres_test!(test_add_to_domain);
    postgres_test!(test_add_to_domain_duplicate_fails);
    postgres_test!(test_add_to_domain_missing_principal);
    postgres_test!(test_remove_from_domain);
    postgres_test!(test_remove_from_domain_not_member);
    postgres_test!(test_domain_members_isolated_by_domain);
    postgres_test!(test_domains_for_principal);
}
