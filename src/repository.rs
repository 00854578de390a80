use crate::error::StoreError;
use crate::models::{
    ActivityEntry, ActivityKind, Comment, Description, Folder, HashKind, Media, PublicStats,
    UpdateFolderRequest, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

pub type FolderId = i64;

/// IdentityStore
///
/// Verifies an authenticated-tier `(userid, token)` pair. Returns `Ok(false)` for a
/// pair that does not exist or has expired, `Err` only when the store itself failed.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn verify_credential(&self, user_id: i64, token: &str) -> Result<bool, StoreError>;
}

/// FolderStore
///
/// Looks up a *visible* folder by one of its share hashes.
#[async_trait]
pub trait FolderStore: Send + Sync {
    async fn find_folder_by_hash(
        &self,
        hash: &str,
        kind: HashKind,
    ) -> Result<Option<FolderId>, StoreError>;
}

/// Repository Trait
///
/// The full persistence contract used by handlers. It includes the two credential
/// stores as supertraits, so a single `Arc<dyn Repository>` serves both the tier
/// middleware and the business logic.
///
/// Ownership-scoped methods take the caller's `owner_id` and behave as "not found"
/// when the caller does not own the folder.
#[async_trait]
pub trait Repository: IdentityStore + FolderStore {
    // --- Catalog ---
    async fn get_public_stats(&self) -> Result<PublicStats, StoreError>;

    // --- Users & Sessions ---
    async fn upsert_user(&self, external_id: &str, email: &str) -> Result<User, StoreError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
    async fn revoke_session(&self, user_id: i64, token: &str) -> Result<bool, StoreError>;

    // --- Folder Content ---
    async fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError>;
    async fn list_media(&self, folder_id: FolderId) -> Result<Vec<Media>, StoreError>;
    async fn get_media(&self, id: i64) -> Result<Option<Media>, StoreError>;
    async fn list_comments(&self, media_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn add_comment(
        &self,
        media: &Media,
        user_id: Option<i64>,
        author_name: &str,
        body: &str,
    ) -> Result<Comment, StoreError>;
    async fn set_description(
        &self,
        media: &Media,
        body: &str,
        actor: &str,
    ) -> Result<Description, StoreError>;
    async fn list_activity(
        &self,
        folder_id: FolderId,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError>;

    // --- Owner Actions ---
    async fn list_folders(&self, owner_id: i64) -> Result<Vec<Folder>, StoreError>;
    async fn create_folder(
        &self,
        owner_id: i64,
        name: &str,
        visible: bool,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Folder, StoreError>;
    async fn update_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        req: UpdateFolderRequest,
    ) -> Result<Option<Folder>, StoreError>;
    async fn delete_folder(&self, id: FolderId, owner_id: i64) -> Result<bool, StoreError>;
    async fn rehash_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Option<Folder>, StoreError>;
    async fn add_media(
        &self,
        folder_id: FolderId,
        uploader_id: i64,
        file_key: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<Media, StoreError>;
    async fn delete_media(&self, id: i64, owner_id: i64) -> Result<bool, StoreError>;
    async fn delete_comment(&self, id: i64, owner_id: i64) -> Result<bool, StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share persistence access across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const FOLDER_COLUMNS: &str =
    "id, owner_id, name, viewhash, edithash, visible, created_at, updated_at";

const MEDIA_SELECT: &str = r#"
    SELECT m.id, m.folder_id, m.uploader_id, m.file_key, m.filename, m.content_type,
           m.created_at, d.body AS description
    FROM media m
    LEFT JOIN descriptions d ON d.media_id = m.id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at run time so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends an activity row on the connection of an open transaction.
async fn log_activity(
    conn: &mut PgConnection,
    folder_id: FolderId,
    media_id: Option<i64>,
    kind: ActivityKind,
    actor: &str,
) -> Result<(), StoreError> {
    sqlx::query("INSERT INTO activity (folder_id, media_id, kind, actor) VALUES ($1, $2, $3, $4)")
        .bind(folder_id)
        .bind(media_id)
        .bind(kind.as_str())
        .bind(actor)
        .execute(conn)
        .await?;
    Ok(())
}

fn owner_actor(owner_id: i64) -> String {
    format!("user:{owner_id}")
}

#[async_trait]
impl IdentityStore for PostgresRepository {
    async fn verify_credential(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        let valid = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM sessions WHERE user_id = $1 AND token = $2 AND expires_at > NOW())",
        )
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;
        Ok(valid)
    }
}

#[async_trait]
impl FolderStore for PostgresRepository {
    /// find_folder_by_hash
    ///
    /// One query per call; the caller decides the view/edit order.
    async fn find_folder_by_hash(
        &self,
        hash: &str,
        kind: HashKind,
    ) -> Result<Option<FolderId>, StoreError> {
        // `column()` only ever yields one of two fixed identifiers.
        let sql = format!(
            "SELECT id FROM folders WHERE {} = $1 AND visible = true",
            kind.column()
        );
        let id = sqlx::query_scalar::<_, i64>(&sql)
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_public_stats(&self) -> Result<PublicStats, StoreError> {
        let visible_folders =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM folders WHERE visible = true")
                .fetch_one(&self.pool)
                .await?;
        let media = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM media")
            .fetch_one(&self.pool)
            .await?;
        let comments = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments")
            .fetch_one(&self.pool)
            .await?;
        Ok(PublicStats {
            visible_folders,
            media,
            comments,
        })
    }

    /// upsert_user
    ///
    /// Maps an auth-provider identity onto the local numeric user id, creating the
    /// mirror row on first login.
    async fn upsert_user(&self, external_id: &str, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (external_id, email) VALUES ($1, $2)
            ON CONFLICT (external_id) DO UPDATE SET email = EXCLUDED.email
            RETURNING id, external_id, email, display_name, created_at
            "#,
        )
        .bind(external_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, external_id, email, display_name, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sessions (user_id, token, expires_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_session(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM sessions WHERE user_id = $1 AND token = $2")
            .bind(user_id)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(folder)
    }

    async fn list_media(&self, folder_id: FolderId) -> Result<Vec<Media>, StoreError> {
        let media = sqlx::query_as::<_, Media>(&format!(
            "{MEDIA_SELECT} WHERE m.folder_id = $1 ORDER BY m.created_at ASC, m.id ASC"
        ))
        .bind(folder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(media)
    }

    async fn get_media(&self, id: i64) -> Result<Option<Media>, StoreError> {
        let media = sqlx::query_as::<_, Media>(&format!("{MEDIA_SELECT} WHERE m.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(media)
    }

    async fn list_comments(&self, media_id: i64) -> Result<Vec<Comment>, StoreError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, media_id, user_id, author_name, body, created_at
            FROM comments
            WHERE media_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(media_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// add_comment
    ///
    /// Inserts the comment and its `comment_added` activity row atomically.
    async fn add_comment(
        &self,
        media: &Media,
        user_id: Option<i64>,
        author_name: &str,
        body: &str,
    ) -> Result<Comment, StoreError> {
        let mut tx = self.pool.begin().await?;
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (media_id, user_id, author_name, body) VALUES ($1, $2, $3, $4)
            RETURNING id, media_id, user_id, author_name, body, created_at
            "#,
        )
        .bind(media.id)
        .bind(user_id)
        .bind(author_name)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;
        let actor = match user_id {
            Some(id) => owner_actor(id),
            None => format!("guest:{author_name}"),
        };
        log_activity(
            &mut tx,
            media.folder_id,
            Some(media.id),
            ActivityKind::CommentAdded,
            &actor,
        )
        .await?;
        tx.commit().await?;
        Ok(comment)
    }

    async fn set_description(
        &self,
        media: &Media,
        body: &str,
        actor: &str,
    ) -> Result<Description, StoreError> {
        let mut tx = self.pool.begin().await?;
        let description = sqlx::query_as::<_, Description>(
            r#"
            INSERT INTO descriptions (media_id, body, updated_at) VALUES ($1, $2, NOW())
            ON CONFLICT (media_id) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
            RETURNING media_id, body, updated_at
            "#,
        )
        .bind(media.id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;
        log_activity(
            &mut tx,
            media.folder_id,
            Some(media.id),
            ActivityKind::DescriptionUpdated,
            actor,
        )
        .await?;
        tx.commit().await?;
        Ok(description)
    }

    async fn list_activity(
        &self,
        folder_id: FolderId,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, folder_id, media_id, kind, actor, created_at
            FROM activity
            WHERE folder_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(folder_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    // --- OWNER ACTIONS ---

    async fn list_folders(&self, owner_id: i64) -> Result<Vec<Folder>, StoreError> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(folders)
    }

    async fn create_folder(
        &self,
        owner_id: i64,
        name: &str,
        visible: bool,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Folder, StoreError> {
        let mut tx = self.pool.begin().await?;
        let folder = sqlx::query_as::<_, Folder>(&format!(
            r#"
            INSERT INTO folders (owner_id, name, viewhash, edithash, visible)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {FOLDER_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(name)
        .bind(viewhash)
        .bind(edithash)
        .bind(visible)
        .fetch_one(&mut *tx)
        .await?;
        log_activity(
            &mut tx,
            folder.id,
            None,
            ActivityKind::FolderCreated,
            &owner_actor(owner_id),
        )
        .await?;
        tx.commit().await?;
        Ok(folder)
    }

    /// update_folder
    ///
    /// Uses `COALESCE` so only the `Some` fields of `req` are written.
    async fn update_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        req: UpdateFolderRequest,
    ) -> Result<Option<Folder>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let folder = sqlx::query_as::<_, Folder>(&format!(
            r#"
            UPDATE folders
            SET name = COALESCE($3, name),
                visible = COALESCE($4, visible),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {FOLDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(req.name)
        .bind(req.visible)
        .fetch_optional(&mut *tx)
        .await?;
        if folder.is_some() {
            log_activity(
                &mut tx,
                id,
                None,
                ActivityKind::FolderUpdated,
                &owner_actor(owner_id),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(folder)
    }

    async fn delete_folder(&self, id: FolderId, owner_id: i64) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM folders WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn rehash_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Option<Folder>, StoreError> {
        let mut tx = self.pool.begin().await?;
        let folder = sqlx::query_as::<_, Folder>(&format!(
            r#"
            UPDATE folders
            SET viewhash = $3, edithash = $4, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {FOLDER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(viewhash)
        .bind(edithash)
        .fetch_optional(&mut *tx)
        .await?;
        if folder.is_some() {
            log_activity(
                &mut tx,
                id,
                None,
                ActivityKind::FolderRehashed,
                &owner_actor(owner_id),
            )
            .await?;
        }
        tx.commit().await?;
        Ok(folder)
    }

    async fn add_media(
        &self,
        folder_id: FolderId,
        uploader_id: i64,
        file_key: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<Media, StoreError> {
        let mut tx = self.pool.begin().await?;
        let media = sqlx::query_as::<_, Media>(
            r#"
            INSERT INTO media (folder_id, uploader_id, file_key, filename, content_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, folder_id, uploader_id, file_key, filename, content_type, created_at
            "#,
        )
        .bind(folder_id)
        .bind(uploader_id)
        .bind(file_key)
        .bind(filename)
        .bind(content_type)
        .fetch_one(&mut *tx)
        .await?;
        log_activity(
            &mut tx,
            folder_id,
            Some(media.id),
            ActivityKind::MediaAdded,
            &owner_actor(uploader_id),
        )
        .await?;
        tx.commit().await?;
        Ok(media)
    }

    /// delete_media
    ///
    /// Only the owner of the containing folder may delete.
    async fn delete_media(&self, id: i64, owner_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let folder_id = sqlx::query_scalar::<_, i64>(
            r#"
            DELETE FROM media m USING folders f
            WHERE m.id = $1 AND m.folder_id = f.id AND f.owner_id = $2
            RETURNING m.folder_id
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(folder_id) = folder_id else {
            return Ok(false);
        };
        log_activity(
            &mut tx,
            folder_id,
            Some(id),
            ActivityKind::MediaDeleted,
            &owner_actor(owner_id),
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// delete_comment
    ///
    /// Moderation by the owner of the folder the comment's media lives in.
    async fn delete_comment(&self, id: i64, owner_id: i64) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = sqlx::query_as::<_, (i64, i64)>(
            r#"
            DELETE FROM comments c USING media m, folders f
            WHERE c.id = $1 AND c.media_id = m.id AND m.folder_id = f.id AND f.owner_id = $2
            RETURNING m.folder_id, c.media_id
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((folder_id, media_id)) = deleted else {
            return Ok(false);
        };
        log_activity(
            &mut tx,
            folder_id,
            Some(media_id),
            ActivityKind::CommentDeleted,
            &owner_actor(owner_id),
        )
        .await?;
        tx.commit().await?;
        Ok(true)
    }
}
