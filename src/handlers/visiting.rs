use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{
    ACTIVITY_LIMIT, MAX_COMMENT_LEN, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, media_in_folder,
    required_text, with_download_urls,
};
use crate::{
    AppState,
    auth::VisitorSession,
    error::ApiError,
    models::{
        ActivityEntry, Comment, CreateCommentRequest, Description, FolderSummary, MediaItem,
        SetDescriptionRequest,
    },
};

const DEFAULT_GUEST_NAME: &str = "Guest";

/// visit_folder
///
/// [Visiting Route] Summary of the folder the share hash resolved to, including
/// whether the hash grants edit access.
#[utoipa::path(
    get,
    path = "/visit/folder",
    params(("hash" = String, Query, description = "Folder view or edit hash")),
    responses(
        (status = 200, description = "Folder", body = FolderSummary),
        (status = 404, description = "Unknown hash")
    )
)]
pub async fn visit_folder(
    visitor: VisitorSession,
    State(state): State<AppState>,
) -> Result<Json<FolderSummary>, ApiError> {
    // The hash only resolves for visible folders, so a miss here means the folder
    // vanished between resolution and this read.
    let folder = state
        .repo
        .get_folder(visitor.folder_id)
        .await?
        .ok_or(ApiError::NotFound("folder not found"))?;
    Ok(Json(FolderSummary::new(&folder, visitor.access)))
}

/// visit_media
///
/// [Visiting Route] Media of the folder with short-lived download URLs.
#[utoipa::path(
    get,
    path = "/visit/media",
    params(("hash" = String, Query, description = "Folder view or edit hash")),
    responses((status = 200, description = "Media", body = [MediaItem]))
)]
pub async fn visit_media(
    visitor: VisitorSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<MediaItem>>, ApiError> {
    let media = state.repo.list_media(visitor.folder_id).await?;
    Ok(Json(with_download_urls(&state, media).await?))
}

/// visit_comments
///
/// [Visiting Route] Comments on one media item of the folder, oldest first.
#[utoipa::path(
    get,
    path = "/visit/media/{id}/comments",
    params(
        ("id" = i64, Path, description = "Media ID"),
        ("hash" = String, Query, description = "Folder view or edit hash")
    ),
    responses(
        (status = 200, description = "Comments", body = [Comment]),
        (status = 404, description = "Media not in this folder")
    )
)]
pub async fn visit_comments(
    visitor: VisitorSession,
    State(state): State<AppState>,
    Path(media_id): Path<i64>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    let media = media_in_folder(&state, visitor.folder_id, media_id).await?;
    Ok(Json(state.repo.list_comments(media.id).await?))
}

/// visit_add_comment
///
/// [Visiting Route] Posts a guest comment. Either hash allows commenting.
#[utoipa::path(
    post,
    path = "/visit/media/{id}/comments",
    params(("id" = i64, Path, description = "Media ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added", body = Comment),
        (status = 400, description = "Empty or oversized comment")
    )
)]
pub async fn visit_add_comment(
    visitor: VisitorSession,
    State(state): State<AppState>,
    Path(media_id): Path<i64>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let body = required_text("body", &payload.body, MAX_COMMENT_LEN)?;
    let author_name = match payload.author_name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => required_text("author_name", name, MAX_NAME_LEN)?,
        _ => DEFAULT_GUEST_NAME.to_string(),
    };
    let media = media_in_folder(&state, visitor.folder_id, media_id).await?;

    let comment = state
        .repo
        .add_comment(&media, None, &author_name, &body)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// visit_set_description
///
/// [Visiting Route] Replaces the description of a media item.
///
/// *Authorization*: only the folder's edit hash may do this; a view hash gets 403.
#[utoipa::path(
    put,
    path = "/visit/media/{id}/description",
    params(("id" = i64, Path, description = "Media ID")),
    request_body = SetDescriptionRequest,
    responses(
        (status = 200, description = "Description stored", body = Description),
        (status = 403, description = "View hash used")
    )
)]
pub async fn visit_set_description(
    visitor: VisitorSession,
    State(state): State<AppState>,
    Path(media_id): Path<i64>,
    Json(payload): Json<SetDescriptionRequest>,
) -> Result<Json<Description>, ApiError> {
    visitor.require_edit()?;
    let body = required_text("body", &payload.body, MAX_DESCRIPTION_LEN)?;
    let media = media_in_folder(&state, visitor.folder_id, media_id).await?;

    let description = state
        .repo
        .set_description(&media, &body, "guest:edit-link")
        .await?;
    Ok(Json(description))
}

/// visit_activity
///
/// [Visiting Route] The folder's most recent activity, newest first.
#[utoipa::path(
    get,
    path = "/visit/activity",
    params(("hash" = String, Query, description = "Folder view or edit hash")),
    responses((status = 200, description = "Activity", body = [ActivityEntry]))
)]
pub async fn visit_activity(
    visitor: VisitorSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    Ok(Json(
        state
            .repo
            .list_activity(visitor.folder_id, ACTIVITY_LIMIT)
            .await?,
    ))
}
