use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Core Records (Mapped to Database) ---

/// User
///
/// A local mirror of an identity held by the external auth provider. The provider's
/// identifier is kept in `external_id`; everything inside this API refers to the
/// numeric `id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Folder
///
/// A collection of media owned by one user. Guests reach a folder through one of
/// its two share hashes: `viewhash` grants read access (plus commenting),
/// `edithash` additionally allows editing descriptions.
///
/// A folder with `visible = false` cannot be reached through either hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Folder {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub viewhash: String,
    pub edithash: String,
    pub visible: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Media
///
/// One stored file inside a folder. `file_key` is the object key in the bucket.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Media {
    pub id: i64,
    pub folder_id: i64,
    pub uploader_id: Option<i64>,
    pub file_key: String,
    pub filename: String,
    pub content_type: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    // Joined from `descriptions` when present.
    #[sqlx(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub media_id: i64,
    // None for guest comments.
    pub user_id: Option<i64>,
    pub author_name: String,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Description {
    pub media_id: i64,
    pub body: String,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// ActivityEntry
///
/// Append-only log of what happened in a folder. Written in the same transaction
/// as the change it describes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ActivityEntry {
    pub id: i64,
    pub folder_id: i64,
    pub media_id: Option<i64>,
    pub kind: String,
    pub actor: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// ActivityKind
///
/// The closed set of values written to `activity.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    FolderCreated,
    FolderUpdated,
    FolderRehashed,
    MediaAdded,
    MediaDeleted,
    CommentAdded,
    CommentDeleted,
    DescriptionUpdated,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::FolderCreated => "folder_created",
            ActivityKind::FolderUpdated => "folder_updated",
            ActivityKind::FolderRehashed => "folder_rehashed",
            ActivityKind::MediaAdded => "media_added",
            ActivityKind::MediaDeleted => "media_deleted",
            ActivityKind::CommentAdded => "comment_added",
            ActivityKind::CommentDeleted => "comment_deleted",
            ActivityKind::DescriptionUpdated => "description_updated",
        }
    }
}

/// HashKind
///
/// Which of a folder's two share hashes matched during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HashKind {
    View,
    Edit,
}

impl HashKind {
    /// The folder column holding this kind of hash.
    pub fn column(self) -> &'static str {
        match self {
            HashKind::View => "viewhash",
            HashKind::Edit => "edithash",
        }
    }
}

// --- Request Payloads (Input Schemas) ---
//
// Credential fields (`hash`, `userid`, `token`) travel alongside these payloads and
// are consumed by the tier middleware; serde ignores them here.

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateFolderRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

/// UpdateFolderRequest
///
/// Partial update; only `Some` fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateFolderRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    /// Display name for guest comments. Ignored for logged-in users.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SetDescriptionRequest {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema, TS, Default)]
#[ts(export)]
pub struct MediaUploadRequest {
    #[schema(example = "holiday.mp4")]
    pub filename: String,
    /// The MIME type the presigned upload will be constrained to.
    #[schema(example = "video/mp4")]
    pub file_type: String,
}

// --- Output Schemas ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionGrant {
    pub userid: i64,
    pub token: String,
    #[ts(type = "string")]
    pub expires_at: DateTime<Utc>,
}

/// FolderSummary
///
/// What a guest sees of a folder. Never includes the hashes or the owner.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct FolderSummary {
    pub id: i64,
    pub name: String,
    pub access: HashKind,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl FolderSummary {
    pub fn new(folder: &Folder, access: HashKind) -> Self {
        Self {
            id: folder.id,
            name: folder.name.clone(),
            access,
            created_at: folder.created_at,
        }
    }
}

/// MediaItem
///
/// A media record as served to guests, with a short-lived download URL.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MediaItem {
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MediaUploadResponse {
    pub media: Media,
    /// The time-limited URL for the PUT request.
    pub upload_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublicStats {
    pub visible_folders: i64,
    pub media: i64,
    pub comments: i64,
}
