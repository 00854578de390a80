use chrono::{Duration, Utc};
use media_library::{
    models::{ActivityKind, Folder, HashKind, UpdateFolderRequest, User},
    repository::{FolderStore, IdentityStore, PostgresRepository, Repository},
};
use sqlx::PgPool;
use uuid::Uuid;

// These tests run against a real Postgres. They are ignored by default:
// `DATABASE_URL=... cargo test --test repository_integration_tests -- --ignored`

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Every run uses fresh identities and hashes, so tests never collide with each
/// other or with leftovers from earlier runs.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn create_test_user(repo: &PostgresRepository) -> User {
    let external_id = unique("ext");
    repo.upsert_user(&external_id, &format!("{external_id}@test.com"))
        .await
        .expect("user insert")
}

async fn create_test_folder(repo: &PostgresRepository, owner_id: i64, visible: bool) -> Folder {
    repo.create_folder(
        owner_id,
        "Holiday",
        visible,
        &unique("view"),
        &unique("edit"),
    )
    .await
    .expect("folder insert")
}

async fn activity_count(pool: &PgPool, folder_id: i64, kind: ActivityKind) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM activity WHERE folder_id = $1 AND kind = $2")
        .bind(folder_id)
        .bind(kind.as_str())
        .fetch_one(pool)
        .await
        .expect("activity count")
}

// --- Folder Lookup ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_hash_lookup_matches_only_its_own_column() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let folder = create_test_folder(&repo, owner.id, true).await;

    assert_eq!(
        repo.find_folder_by_hash(&folder.viewhash, HashKind::View).await.unwrap(),
        Some(folder.id)
    );
    assert_eq!(
        repo.find_folder_by_hash(&folder.edithash, HashKind::Edit).await.unwrap(),
        Some(folder.id)
    );

    // A view hash is never an edit hash and vice versa.
    assert_eq!(
        repo.find_folder_by_hash(&folder.viewhash, HashKind::Edit).await.unwrap(),
        None
    );
    assert_eq!(
        repo.find_folder_by_hash(&folder.edithash, HashKind::View).await.unwrap(),
        None
    );
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_hidden_folder_hashes_do_not_resolve() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let folder = create_test_folder(&repo, owner.id, false).await;

    assert_eq!(
        repo.find_folder_by_hash(&folder.viewhash, HashKind::View).await.unwrap(),
        None
    );
    assert_eq!(
        repo.find_folder_by_hash(&folder.edithash, HashKind::Edit).await.unwrap(),
        None
    );

    // Making it visible again brings both hashes back.
    let update = UpdateFolderRequest {
        visible: Some(true),
        ..Default::default()
    };
    repo.update_folder(folder.id, owner.id, update)
        .await
        .unwrap()
        .expect("owner may update");
    assert_eq!(
        repo.find_folder_by_hash(&folder.viewhash, HashKind::View).await.unwrap(),
        Some(folder.id)
    );
}

// --- Sessions ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_expired_session_is_rejected() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let expired = unique("expired");
    repo.create_session(user.id, &expired, Utc::now() - Duration::hours(1))
        .await
        .unwrap();
    let live = unique("live");
    repo.create_session(user.id, &live, Utc::now() + Duration::hours(1))
        .await
        .unwrap();

    assert!(!repo.verify_credential(user.id, &expired).await.unwrap());
    assert!(repo.verify_credential(user.id, &live).await.unwrap());

    // A live token is bound to the user it was issued to.
    let other = create_test_user(&repo).await;
    assert!(!repo.verify_credential(other.id, &live).await.unwrap());

    assert!(repo.revoke_session(user.id, &live).await.unwrap());
    assert!(!repo.verify_credential(user.id, &live).await.unwrap());
}

// --- Owner Actions ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_delete_media_by_non_owner_changes_nothing() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let stranger = create_test_user(&repo).await;
    let folder = create_test_folder(&repo, owner.id, true).await;
    let media = repo
        .add_media(folder.id, owner.id, &unique("key"), "beach.jpg", "image/jpeg")
        .await
        .unwrap();

    assert!(!repo.delete_media(media.id, stranger.id).await.unwrap());
    assert!(repo.get_media(media.id).await.unwrap().is_some());
    assert_eq!(
        activity_count(&ctx.pool, folder.id, ActivityKind::MediaDeleted).await,
        0
    );

    assert!(repo.delete_media(media.id, owner.id).await.unwrap());
    assert!(repo.get_media(media.id).await.unwrap().is_none());
    assert_eq!(
        activity_count(&ctx.pool, folder.id, ActivityKind::MediaDeleted).await,
        1
    );
}
