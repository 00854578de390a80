//! Request handlers, grouped by the tier whose router mounts them.
//!
//! A handler module may call helpers from this file and from modules of its own or
//! a lower tier. The imports declared when a route is mounted (`TierRoutes::mount`)
//! are what the layering check verifies.

pub mod authenticated;
pub mod public;
pub mod visiting;

use crate::{
    AppState,
    error::ApiError,
    models::{Folder, Media, MediaItem},
};

/// Most recent activity rows returned by the activity endpoints.
pub const ACTIVITY_LIMIT: i64 = 50;
pub const MAX_COMMENT_LEN: usize = 4000;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
pub const MAX_NAME_LEN: usize = 200;

/// Trims `raw` and rejects it when empty or longer than `max` characters.
pub(crate) fn required_text(field: &str, raw: &str, max: usize) -> Result<String, ApiError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ApiError::BadRequest(format!("{field} must not be empty")));
    }
    if text.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

/// Loads a media item and checks it lives in `folder_id`. A media item from another
/// folder is reported exactly like a missing one.
pub(crate) async fn media_in_folder(
    state: &AppState,
    folder_id: i64,
    media_id: i64,
) -> Result<Media, ApiError> {
    state
        .repo
        .get_media(media_id)
        .await?
        .filter(|media| media.folder_id == folder_id)
        .ok_or(ApiError::NotFound("media not found"))
}

/// Loads a folder owned by `user_id`; someone else's folder is "not found".
pub(crate) async fn owned_folder(
    state: &AppState,
    folder_id: i64,
    user_id: i64,
) -> Result<Folder, ApiError> {
    state
        .repo
        .get_folder(folder_id)
        .await?
        .filter(|folder| folder.owner_id == user_id)
        .ok_or(ApiError::NotFound("folder not found"))
}

/// Attaches a presigned download URL to every media record.
pub(crate) async fn with_download_urls(
    state: &AppState,
    media: Vec<Media>,
) -> Result<Vec<MediaItem>, ApiError> {
    let mut items = Vec::with_capacity(media.len());
    for item in media {
        let download_url = state
            .storage
            .get_presigned_download_url(&item.file_key)
            .await
            .map_err(ApiError::Upstream)?;
        items.push(MediaItem {
            id: item.id,
            filename: item.filename,
            content_type: item.content_type,
            description: item.description,
            created_at: item.created_at,
            download_url,
        });
    }
    Ok(items)
}
