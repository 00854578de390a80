use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use super::{ACTIVITY_LIMIT, MAX_NAME_LEN, owned_folder, required_text, with_download_urls};
use crate::{
    AppState,
    auth::UserSession,
    error::ApiError,
    models::{
        ActivityEntry, Comment, CreateFolderRequest, Folder, MediaItem, MediaUploadRequest,
        MediaUploadResponse, UpdateFolderRequest, User,
    },
};

/// A fresh share hash: 32 lowercase hex characters from a v4 UUID.
fn new_share_hash() -> String {
    Uuid::new_v4().simple().to_string()
}

/// get_me
///
/// [Authenticated Route] The caller's user record.
#[utoipa::path(
    get,
    path = "/me",
    params(
        ("userid" = i64, Query, description = "User ID"),
        ("token" = String, Query, description = "Session token")
    ),
    responses((status = 200, description = "Profile", body = User))
)]
pub async fn get_me(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
) -> Result<Json<User>, ApiError> {
    state
        .repo
        .get_user(user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user not found"))
}

/// logout
///
/// [Authenticated Route] Revokes the session the request was made with.
#[utoipa::path(
    post,
    path = "/logout",
    responses((status = 204, description = "Session revoked"))
)]
pub async fn logout(
    UserSession { user_id, token }: UserSession,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.repo.revoke_session(user_id, &token).await?;
    tracing::info!(user_id, "session revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// list_folders
///
/// [Authenticated Route] Every folder the caller owns, including hidden ones.
#[utoipa::path(
    get,
    path = "/folders",
    responses((status = 200, description = "My folders", body = [Folder]))
)]
pub async fn list_folders(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Folder>>, ApiError> {
    Ok(Json(state.repo.list_folders(user_id).await?))
}

/// create_folder
///
/// [Authenticated Route] Creates a folder with freshly generated view and edit hashes.
/// Folders are visible unless the request says otherwise.
#[utoipa::path(
    post,
    path = "/folders",
    request_body = CreateFolderRequest,
    responses((status = 201, description = "Created", body = Folder))
)]
pub async fn create_folder(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Json(payload): Json<CreateFolderRequest>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let name = required_text("name", &payload.name, MAX_NAME_LEN)?;
    let folder = state
        .repo
        .create_folder(
            user_id,
            &name,
            payload.visible.unwrap_or(true),
            &new_share_hash(),
            &new_share_hash(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(folder)))
}

/// update_folder
///
/// [Authenticated Route] Renames a folder or toggles its visibility.
///
/// *Authorization*: Owner-Only, enforced in the repository query. Hiding a folder
/// immediately invalidates both of its hashes for guests.
#[utoipa::path(
    put,
    path = "/folders/{id}",
    params(("id" = i64, Path, description = "Folder ID")),
    request_body = UpdateFolderRequest,
    responses(
        (status = 200, description = "Updated", body = Folder),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn update_folder(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateFolderRequest>,
) -> Result<Json<Folder>, ApiError> {
    if let Some(name) = payload.name.as_deref() {
        payload.name = Some(required_text("name", name, MAX_NAME_LEN)?);
    }
    state
        .repo
        .update_folder(id, user_id, payload)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("folder not found"))
}

/// delete_folder
///
/// [Authenticated Route] Deletes a folder with all its media, comments and activity.
#[utoipa::path(
    delete,
    path = "/folders/{id}",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn delete_folder(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_folder(id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("folder not found"))
    }
}

/// rehash_folder
///
/// [Authenticated Route] Replaces both share hashes, revoking every link handed out
/// so far.
#[utoipa::path(
    post,
    path = "/folders/{id}/rehash",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "New hashes", body = Folder),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn rehash_folder(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Folder>, ApiError> {
    state
        .repo
        .rehash_folder(id, user_id, &new_share_hash(), &new_share_hash())
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("folder not found"))
}

/// list_folder_media
///
/// [Authenticated Route] Media of one of the caller's folders, with download URLs.
#[utoipa::path(
    get,
    path = "/folders/{id}/media",
    params(("id" = i64, Path, description = "Folder ID")),
    responses((status = 200, description = "Media", body = [MediaItem]))
)]
pub async fn list_folder_media(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let folder = owned_folder(&state, id, user_id).await?;
    let media = state.repo.list_media(folder.id).await?;
    Ok(Json(with_download_urls(&state, media).await?))
}

/// request_media_upload
///
/// [Authenticated Route] Registers a media item and returns a presigned PUT URL for
/// its bytes.
///
/// *Security*: the object key is server-generated (`folders/{id}/{uuid}.{ext}`), the
/// URL expires after ten minutes and is constrained to `file_type`.
#[utoipa::path(
    post,
    path = "/folders/{id}/media",
    params(("id" = i64, Path, description = "Folder ID")),
    request_body = MediaUploadRequest,
    responses(
        (status = 201, description = "Upload URL", body = MediaUploadResponse),
        (status = 502, description = "Storage failure")
    )
)]
pub async fn request_media_upload(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<MediaUploadRequest>,
) -> Result<(StatusCode, Json<MediaUploadResponse>), ApiError> {
    let folder = owned_folder(&state, id, user_id).await?;
    let filename = required_text("filename", &payload.filename, MAX_NAME_LEN)?;
    let file_type = required_text("file_type", &payload.file_type, MAX_NAME_LEN)?;

    let extension = std::path::Path::new(&filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("bin");
    let object_key = format!("folders/{}/{}.{}", folder.id, Uuid::new_v4(), extension);

    let upload_url = state
        .storage
        .get_presigned_upload_url(&object_key, &file_type)
        .await
        .map_err(|e| {
            tracing::error!("storage error: {}", e);
            ApiError::Upstream(e)
        })?;

    let media = state
        .repo
        .add_media(folder.id, user_id, &object_key, &filename, &file_type)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MediaUploadResponse { media, upload_url }),
    ))
}

/// delete_media
///
/// [Authenticated Route] Removes a media record from one of the caller's folders.
#[utoipa::path(
    delete,
    path = "/media/{id}",
    params(("id" = i64, Path, description = "Media ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn delete_media(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_media(id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("media not found"))
    }
}

/// list_media_comments
///
/// [Authenticated Route] Comments on a media item in one of the caller's folders.
#[utoipa::path(
    get,
    path = "/media/{id}/comments",
    params(("id" = i64, Path, description = "Media ID")),
    responses((status = 200, description = "Comments", body = [Comment]))
)]
pub async fn list_media_comments(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let media = state
        .repo
        .get_media(id)
        .await?
        .ok_or(ApiError::NotFound("media not found"))?;
    let owns = state
        .repo
        .get_folder(media.folder_id)
        .await?
        .is_some_and(|folder| folder.owner_id == user_id);
    if !owns {
        return Err(ApiError::NotFound("media not found"));
    }
    Ok(Json(state.repo.list_comments(media.id).await?))
}

/// delete_comment
///
/// [Authenticated Route] Moderation: the folder owner removes any comment in it.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not found or not owner")
    )
)]
pub async fn delete_comment(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.repo.delete_comment(id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("comment not found"))
    }
}

/// folder_activity
///
/// [Authenticated Route] Recent activity of one of the caller's folders.
#[utoipa::path(
    get,
    path = "/folders/{id}/activity",
    params(("id" = i64, Path, description = "Folder ID")),
    responses((status = 200, description = "Activity", body = [ActivityEntry]))
)]
pub async fn folder_activity(
    UserSession { user_id, .. }: UserSession,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let folder = owned_folder(&state, id, user_id).await?;
    Ok(Json(
        state.repo.list_activity(folder.id, ACTIVITY_LIMIT).await?,
    ))
}
