//! Store integration tests: CRUD and the diff-based incremental UPDATE.

mod common;

use custodia_core::{Account, Profile, User};
use custodia_db_postgres::{AccountStore, Migrator, ProfileStore, UserStore, register_steps};

use common::start_postgres;

async fn migrated_migrator() -> (testcontainers::ContainerAsync<testcontainers_modules::postgres::Postgres>, Migrator)
{
    let (container, config) = start_postgres("custodia_test").await;
    let mut migrator = Migrator::connect(config).await.expect("connect");
    register_steps(&mut migrator).expect("register");
    migrator.migrate().await.expect("migrate");
    (container, migrator)
}

fn sample_user(username: &str) -> User {
    User {
        username: username.into(),
        password: "a-password".into(),
        email: format!("{username}@example.com"),
        email_confirmation: format!("{username}@example.com"),
        given_name: Some("Given".into()),
        family_name: Some("Family".into()),
        is_active: true,
        ..User::default()
    }
}

#[tokio::test]
async fn test_user_create_and_fetch() {
    let (_container, migrator) = migrated_migrator().await;
    let store = UserStore::new(migrator.pool());

    let mut user = sample_user("wanda");
    store.create(&mut user).await.expect("create");

    assert!(!user.identification.id.is_nil());
    let slug = user.identification.slug.clone().unwrap();
    assert!(slug.starts_with("wanda-"));

    let fetched = store
        .get_by_slug(&slug)
        .await
        .expect("get_by_slug")
        .expect("user exists");
    assert_eq!(fetched.username, "wanda");
    assert_eq!(fetched.email, "wanda@example.com");
    assert!(fetched.password_digest.unwrap().starts_with("$argon2id$"));
    assert!(!fetched.is_confirmed);
    assert!(fetched.confirmation_token.is_some());

    let by_username = store
        .get_by_username("wanda")
        .await
        .expect("get_by_username")
        .expect("user exists");
    assert_eq!(by_username.identification.id, user.identification.id);

    assert_eq!(store.get_all().await.expect("get_all").len(), 1);
}

#[tokio::test]
async fn test_user_duplicate_username_conflict() {
    let (_container, migrator) = migrated_migrator().await;
    let store = UserStore::new(migrator.pool());

    let mut first = sample_user("dup");
    store.create(&mut first).await.expect("create");

    let mut second = sample_user("dup");
    let err = store.create(&mut second).await.expect_err("must conflict");
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_user_diff_update_touches_only_changed_columns() {
    let (_container, migrator) = migrated_migrator().await;
    let store = UserStore::new(migrator.pool());

    let mut user = sample_user("updatee");
    store.create(&mut user).await.expect("create");

    // No changes: no round trip, no updated_at.
    let mut unchanged = store
        .get(user.identification.id)
        .await
        .expect("get")
        .expect("exists");
    let did_update = store.update(&mut unchanged).await.expect("update");
    assert!(!did_update, "No-change diff must be a no-op");

    let stored = store
        .get(user.identification.id)
        .await
        .expect("get")
        .expect("exists");
    assert!(stored.audit.updated_at.is_none());

    // Change a single column.
    let mut changed = stored.clone();
    changed.email = "renamed@example.com".into();
    let did_update = store.update(&mut changed).await.expect("update");
    assert!(did_update);

    let stored = store
        .get(user.identification.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(stored.email, "renamed@example.com");
    assert_eq!(stored.username, "updatee", "Unchanged column must survive");
    assert!(stored.audit.updated_at.is_some());
}

#[tokio::test]
async fn test_user_confirm_flow() {
    let (_container, migrator) = migrated_migrator().await;
    let store = UserStore::new(migrator.pool());

    let mut user = sample_user("confirmee");
    store.create(&mut user).await.expect("create");

    let slug = user.identification.slug.clone().unwrap();
    let token = user.confirmation_token.clone().unwrap();

    assert!(!store.confirm(&slug, "wrong-token").await.expect("confirm"));
    assert!(store.confirm(&slug, &token).await.expect("confirm"));

    let stored = store
        .get_by_slug(&slug)
        .await
        .expect("get")
        .expect("exists");
    assert!(stored.is_confirmed);
    assert!(stored.confirmation_token.is_none());

    // Already confirmed: a replay of the same token is rejected.
    assert!(!store.confirm(&slug, &token).await.expect("confirm"));
}

#[tokio::test]
async fn test_user_delete() {
    let (_container, migrator) = migrated_migrator().await;
    let store = UserStore::new(migrator.pool());

    let mut user = sample_user("deletee");
    store.create(&mut user).await.expect("create");

    store.delete(user.identification.id).await.expect("delete");
    assert!(
        store
            .get(user.identification.id)
            .await
            .expect("get")
            .is_none()
    );
}

#[tokio::test]
async fn test_account_crud_and_owner_fk() {
    let (_container, migrator) = migrated_migrator().await;
    let users = UserStore::new(migrator.pool());
    let accounts = AccountStore::new(migrator.pool());

    let mut owner = sample_user("owner");
    users.create(&mut owner).await.expect("create user");

    let mut account = Account {
        name: "Acme".into(),
        owner_id: Some(owner.identification.id),
        account_type: Some("organization".into()),
        email: Some("acme@example.com".into()),
        is_active: true,
        ..Account::default()
    };
    accounts.create(&mut account).await.expect("create account");

    let slug = account.identification.slug.clone().unwrap();
    let fetched = accounts
        .get_by_slug(&slug)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.owner_id, Some(owner.identification.id));

    let mut changed = fetched.clone();
    changed.email = Some("hq@example.com".into());
    assert!(accounts.update(&mut changed).await.expect("update"));

    let stored = accounts
        .get(account.identification.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(stored.email.as_deref(), Some("hq@example.com"));
    assert_eq!(stored.name, "Acme");

    // Owner delete cascades to the account.
    users.delete(owner.identification.id).await.expect("delete owner");
    assert!(
        accounts
            .get(account.identification.id)
            .await
            .expect("get")
            .is_none()
    );
}

#[tokio::test]
async fn test_profile_create_and_update() {
    let (_container, migrator) = migrated_migrator().await;
    let users = UserStore::new(migrator.pool());
    let profiles = ProfileStore::new(migrator.pool());

    let mut owner = sample_user("profiled");
    users.create(&mut owner).await.expect("create user");

    let mut profile = Profile {
        name: "Profiled".into(),
        owner_id: Some(owner.identification.id),
        bio: Some("short bio".into()),
        is_active: true,
        ..Profile::default()
    };
    profiles.create(&mut profile).await.expect("create profile");

    let fetched = profiles
        .get_by_owner(owner.identification.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(fetched.bio.as_deref(), Some("short bio"));

    let mut changed = fetched.clone();
    changed.website = Some("https://example.com".into());
    assert!(profiles.update(&mut changed).await.expect("update"));

    let stored = profiles
        .get_by_slug(changed.identification.slug.as_deref().unwrap())
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(stored.website.as_deref(), Some("https://example.com"));
}
