use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use accesstrack_core::{ActorIdentity, AppError, AppResult};
use accesstrack_domain::{
    AccessGrant, AccessTier, EmailAddress, GrantId, GrantKey, GrantStatus, Instance, InstanceId,
    System, SystemId, TierId, User, UserId,
};

use crate::grant_ports::{DirectoryRepository, GrantQuery, GrantRepository, NewGrant};

use super::{BulkImportService, RowInput};

struct FakeDirectoryRepository {
    users: Vec<User>,
    systems: Vec<System>,
    tiers: Vec<AccessTier>,
    instances: Vec<Instance>,
}

#[async_trait]
impl DirectoryRepository for FakeDirectoryRepository {
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|user| user.email.as_str().eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_system_by_name(&self, name: &str) -> AppResult<Option<System>> {
        Ok(self
            .systems
            .iter()
            .find(|system| system.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_tier_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<AccessTier>> {
        Ok(self
            .tiers
            .iter()
            .find(|tier| tier.system_id == system_id && tier.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn find_instance_by_name(
        &self,
        system_id: SystemId,
        name: &str,
    ) -> AppResult<Option<Instance>> {
        Ok(self
            .instances
            .iter()
            .find(|instance| {
                instance.system_id == system_id && instance.name.eq_ignore_ascii_case(name)
            })
            .cloned())
    }

    async fn find_user(&self, user_id: UserId) -> AppResult<Option<User>> {
        Ok(self.users.iter().find(|user| user.id == user_id).cloned())
    }

    async fn find_system(&self, system_id: SystemId) -> AppResult<Option<System>> {
        Ok(self
            .systems
            .iter()
            .find(|system| system.id == system_id)
            .cloned())
    }

    async fn find_tier(&self, tier_id: TierId) -> AppResult<Option<AccessTier>> {
        Ok(self.tiers.iter().find(|tier| tier.id == tier_id).cloned())
    }

    async fn find_instance(&self, instance_id: InstanceId) -> AppResult<Option<Instance>> {
        Ok(self
            .instances
            .iter()
            .find(|instance| instance.id == instance_id)
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.users.clone())
    }

    async fn list_systems(&self) -> AppResult<Vec<System>> {
        Ok(self.systems.clone())
    }

    async fn list_tiers(&self, system_id: SystemId) -> AppResult<Vec<AccessTier>> {
        Ok(self
            .tiers
            .iter()
            .filter(|tier| tier.system_id == system_id)
            .cloned()
            .collect())
    }

    async fn list_instances(&self, system_id: SystemId) -> AppResult<Vec<Instance>> {
        Ok(self
            .instances
            .iter()
            .filter(|instance| instance.system_id == system_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct FakeGrantRepository {
    grants: Mutex<Vec<AccessGrant>>,
    fail_inserts: bool,
}

#[async_trait]
impl GrantRepository for FakeGrantRepository {
    async fn list_active_grant_keys(&self) -> AppResult<Vec<GrantKey>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active)
            .map(AccessGrant::key)
            .collect())
    }

    async fn count_active_for_key(&self, key: &GrantKey) -> AppResult<u64> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active && &grant.key() == key)
            .count() as u64)
    }

    async fn insert_grants_atomically(&self, new_grants: Vec<NewGrant>) -> AppResult<u64> {
        if self.fail_inserts {
            return Err(AppError::Internal("storage unavailable".to_owned()));
        }

        let mut grants = self.grants.lock().await;

        let mut keys: Vec<GrantKey> = grants
            .iter()
            .filter(|grant| grant.status == GrantStatus::Active)
            .map(AccessGrant::key)
            .collect();
        for new_grant in &new_grants {
            let key = GrantKey {
                user_id: new_grant.user_id,
                system_id: new_grant.system_id,
                tier_id: new_grant.tier_id,
                instance_id: new_grant.instance_id,
            };
            if keys.contains(&key) {
                return Err(AppError::Conflict(
                    "active grant uniqueness violated".to_owned(),
                ));
            }
            keys.push(key);
        }

        let inserted = new_grants.len() as u64;
        for new_grant in new_grants {
            grants.push(AccessGrant {
                id: new_grant.id,
                user_id: new_grant.user_id,
                system_id: new_grant.system_id,
                tier_id: new_grant.tier_id,
                instance_id: new_grant.instance_id,
                status: GrantStatus::Active,
                granted_by: new_grant.granted_by,
                granted_at: new_grant.granted_at,
                removed_at: None,
                notes: new_grant.notes,
            });
        }

        Ok(inserted)
    }

    async fn find_grant(&self, grant_id: GrantId) -> AppResult<Option<AccessGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .find(|grant| grant.id == grant_id)
            .cloned())
    }

    async fn mark_removed(
        &self,
        grant_id: GrantId,
        removed_at: DateTime<Utc>,
    ) -> AppResult<AccessGrant> {
        let mut grants = self.grants.lock().await;
        let grant = grants
            .iter_mut()
            .find(|grant| grant.id == grant_id)
            .ok_or_else(|| AppError::NotFound(format!("grant '{grant_id}'")))?;

        grant.mark_removed(removed_at)?;
        Ok(grant.clone())
    }

    async fn list_grants(&self, query: GrantQuery) -> AppResult<Vec<AccessGrant>> {
        Ok(self
            .grants
            .lock()
            .await
            .iter()
            .filter(|grant| {
                query.user_id.is_none_or(|user_id| grant.user_id == user_id)
                    && query
                        .system_id
                        .is_none_or(|system_id| grant.system_id == system_id)
                    && (!query.active_only || grant.status == GrantStatus::Active)
            })
            .cloned()
            .collect())
    }
}

struct Fixture {
    service: BulkImportService,
    grants: Arc<FakeGrantRepository>,
    user: User,
    acme: System,
    acme_admin: AccessTier,
    acme_prod: Instance,
}

fn email(value: &str) -> EmailAddress {
    EmailAddress::new(value).unwrap_or_else(|_| {
        EmailAddress::new("fallback@example.com").unwrap_or_else(|_| unreachable!())
    })
}

fn fixture() -> Fixture {
    let user = User {
        id: UserId::new(),
        display_name: "Jane Doe".to_owned(),
        email: email("jane.doe@example.com"),
    };
    let acme = System {
        id: SystemId::new(),
        name: "Acme".to_owned(),
        description: None,
    };
    let beta = System {
        id: SystemId::new(),
        name: "Beta".to_owned(),
        description: None,
    };
    let acme_admin = AccessTier {
        id: TierId::new(),
        name: "Admin".to_owned(),
        system_id: acme.id,
    };
    let beta_admin = AccessTier {
        id: TierId::new(),
        name: "Admin".to_owned(),
        system_id: beta.id,
    };
    let acme_prod = Instance {
        id: InstanceId::new(),
        name: "Production".to_owned(),
        system_id: acme.id,
    };

    let directory = Arc::new(FakeDirectoryRepository {
        users: vec![user.clone()],
        systems: vec![acme.clone(), beta.clone()],
        tiers: vec![acme_admin.clone(), beta_admin],
        instances: vec![acme_prod.clone()],
    });
    let grants = Arc::new(FakeGrantRepository::default());

    Fixture {
        service: BulkImportService::new(directory, grants.clone()),
        grants,
        user,
        acme,
        acme_admin,
        acme_prod,
    }
}

fn actor() -> ActorIdentity {
    ActorIdentity::new(Uuid::new_v4(), Some("Ops Admin".to_owned()))
}

fn row(user_email: &str, system_name: &str, tier_name: &str, instance_name: &str) -> RowInput {
    RowInput {
        user_email: user_email.to_owned(),
        system_name: system_name.to_owned(),
        instance_name: (!instance_name.is_empty()).then(|| instance_name.to_owned()),
        access_tier_name: tier_name.to_owned(),
        notes: None,
    }
}

async fn seed_active_grant(fixture: &Fixture, instance_id: Option<InstanceId>) {
    let inserted = fixture
        .grants
        .insert_grants_atomically(vec![NewGrant {
            id: GrantId::new(),
            user_id: fixture.user.id,
            system_id: fixture.acme.id,
            tier_id: fixture.acme_admin.id,
            instance_id,
            granted_by: Uuid::new_v4(),
            granted_at: Utc::now(),
            notes: None,
        }])
        .await;
    assert_eq!(inserted.unwrap_or(0), 1);
}

#[tokio::test]
async fn clean_csv_batch_resolves_every_row() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_csv(
            "user_email,system_name,instance_name,access_tier_name,notes\n\
             jane.doe@example.com,Acme,Production,Admin,onboarding\n\
             JANE.DOE@EXAMPLE.COM,acme,,admin,\n",
        )
        .await
        .unwrap_or_default();

    assert!(report.error_rows.is_empty());
    assert_eq!(report.valid_rows.len(), 2);
    assert_eq!(report.valid_rows[0].row_number, 2);
    assert_eq!(report.valid_rows[0].user_id, fixture.user.id);
    assert_eq!(report.valid_rows[0].instance_id, Some(fixture.acme_prod.id));
    assert_eq!(report.valid_rows[1].instance_id, None);
}

#[tokio::test]
async fn one_bad_row_blocks_commit_but_not_validation() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_rows(vec![
            row("jane.doe@example.com", "Acme", "Admin", ""),
            row("nobody@example.com", "Acme", "Admin", ""),
        ])
        .await
        .unwrap_or_default();

    assert_eq!(report.valid_rows.len(), 1);
    assert_eq!(report.error_rows.len(), 1);
    assert_eq!(report.error_rows[0].row_number, 3);
    assert!(report.error_rows[0].errors[0].contains("nobody@example.com"));

    let refused = fixture.service.commit(&actor(), report).await;
    assert!(matches!(refused, Err(AppError::Validation(_))));
    assert!(fixture.grants.grants.lock().await.is_empty());
}

#[tokio::test]
async fn commit_inserts_every_valid_row_with_actor_and_active_status() {
    let fixture = fixture();
    let acting = actor();

    let report = fixture
        .service
        .validate_rows(vec![
            row("jane.doe@example.com", "Acme", "Admin", ""),
            row("jane.doe@example.com", "Acme", "Admin", "Production"),
        ])
        .await
        .unwrap_or_default();
    assert!(!report.has_errors());

    let inserted = fixture.service.commit(&acting, report).await;
    assert_eq!(inserted.unwrap_or(0), 2);

    let stored = fixture.grants.grants.lock().await;
    assert_eq!(stored.len(), 2);
    assert!(
        stored
            .iter()
            .all(|grant| grant.status == GrantStatus::Active
                && grant.granted_by == acting.subject())
    );
}

#[tokio::test]
async fn blanket_and_instance_scopes_do_not_collide() {
    let fixture = fixture();
    seed_active_grant(&fixture, None).await;

    let report = fixture
        .service
        .validate_rows(vec![row(
            "jane.doe@example.com",
            "Acme",
            "Admin",
            "Production",
        )])
        .await
        .unwrap_or_default();

    assert!(report.error_rows.is_empty());
    assert_eq!(report.valid_rows.len(), 1);
}

#[tokio::test]
async fn duplicate_of_existing_blanket_grant_is_rejected() {
    let fixture = fixture();
    seed_active_grant(&fixture, None).await;

    let report = fixture
        .service
        .validate_rows(vec![row("jane.doe@example.com", "Acme", "Admin", "")])
        .await
        .unwrap_or_default();

    assert!(report.valid_rows.is_empty());
    assert_eq!(report.error_rows.len(), 1);
    assert!(report.error_rows[0].errors[0].contains("already holds an active grant"));
}

#[tokio::test]
async fn intra_batch_duplicates_flag_both_rows() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_rows(vec![
            row("jane.doe@example.com", "Acme", "Admin", ""),
            row("JANE.DOE@example.com", "ACME", "ADMIN", ""),
        ])
        .await
        .unwrap_or_default();

    assert!(report.valid_rows.is_empty());
    assert_eq!(report.error_rows.len(), 2);
    assert!(report.error_rows[0].errors[0].contains("row(s) 3"));
    assert!(report.error_rows[1].errors[0].contains("row(s) 2"));
}

#[tokio::test]
async fn tier_lookup_is_scoped_to_the_named_system() {
    let fixture = fixture();

    // "Deploy" exists only under Beta; naming it with Acme must not
    // silently match the other system's tier.
    let beta = System {
        id: SystemId::new(),
        name: "Beta".to_owned(),
        description: None,
    };
    let beta_deploy = AccessTier {
        id: TierId::new(),
        name: "Deploy".to_owned(),
        system_id: beta.id,
    };
    let directory = Arc::new(FakeDirectoryRepository {
        users: vec![fixture.user.clone()],
        systems: vec![fixture.acme.clone(), beta],
        tiers: vec![beta_deploy],
        instances: Vec::new(),
    });
    let service = BulkImportService::new(directory, fixture.grants.clone());

    let report = service
        .validate_rows(vec![row("jane.doe@example.com", "Acme", "Deploy", "")])
        .await
        .unwrap_or_default();

    assert!(report.valid_rows.is_empty());
    assert_eq!(report.error_rows.len(), 1);
    assert!(report.error_rows[0].errors[0].contains("access_tier_name 'Deploy'"));
    assert!(report.error_rows[0].errors[0].contains("'Acme'"));
}

#[tokio::test]
async fn missing_fields_and_unknown_references_aggregate_per_row() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_rows(vec![row("", "Nowhere", "Admin", "")])
        .await
        .unwrap_or_default();

    assert_eq!(report.error_rows.len(), 1);
    let errors = &report.error_rows[0].errors;
    assert_eq!(errors.len(), 2);
    assert!(errors[0].contains("missing required field 'user_email'"));
    assert!(errors[1].contains("unknown system_name 'Nowhere'"));
}

#[tokio::test]
async fn missing_required_column_is_a_batch_error() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_csv("user_email,system_name\njane.doe@example.com,Acme\n")
        .await
        .unwrap_or_default();

    assert_eq!(report.batch_errors.len(), 1);
    assert!(report.batch_errors[0].contains("access_tier_name"));
    assert!(report.valid_rows.is_empty());
    assert!(report.error_rows.is_empty());

    let refused = fixture.service.commit(&actor(), report).await;
    assert!(matches!(refused, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn short_row_is_reported_in_place_and_others_proceed() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_csv(
            "user_email,system_name,access_tier_name\n\
             jane.doe@example.com,Acme\n\
             jane.doe@example.com,Acme,Admin\n",
        )
        .await
        .unwrap_or_default();

    assert_eq!(report.valid_rows.len(), 1);
    assert_eq!(report.valid_rows[0].row_number, 3);
    assert_eq!(report.error_rows.len(), 1);
    assert_eq!(report.error_rows[0].row_number, 2);
    assert!(report.error_rows[0].errors[0].contains("expected 3 field(s)"));
    // The defective row keeps the uploader's own text for display.
    assert_eq!(report.error_rows[0].row.user_email, "jane.doe@example.com");
    assert_eq!(report.error_rows[0].row.system_name, "Acme");
}

#[tokio::test]
async fn empty_batch_is_a_no_op_success() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_rows(Vec::new())
        .await
        .unwrap_or_default();
    assert!(report.valid_rows.is_empty());
    assert!(report.error_rows.is_empty());

    let inserted = fixture.service.commit(&actor(), report).await;
    assert_eq!(inserted.unwrap_or(1), 0);
    assert!(fixture.grants.grants.lock().await.is_empty());
}

#[tokio::test]
async fn storage_failure_aborts_the_commit_as_infrastructure_error() {
    let fixture = fixture();

    let report = fixture
        .service
        .validate_rows(vec![row("jane.doe@example.com", "Acme", "Admin", "")])
        .await
        .unwrap_or_default();
    assert!(!report.has_errors());

    let directory = Arc::new(FakeDirectoryRepository {
        users: vec![fixture.user.clone()],
        systems: vec![fixture.acme.clone()],
        tiers: vec![fixture.acme_admin.clone()],
        instances: Vec::new(),
    });
    let failing = Arc::new(FakeGrantRepository {
        grants: Mutex::new(Vec::new()),
        fail_inserts: true,
    });
    let service = BulkImportService::new(directory, failing.clone());

    let outcome = service.commit(&actor(), report).await;
    assert!(matches!(outcome, Err(AppError::Internal(_))));
    assert!(failing.grants.lock().await.is_empty());
}
