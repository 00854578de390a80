use super::TierRoutes;
use crate::{
    handlers::authenticated as handlers,
    tier::{Capability, Tier},
};
use axum::routing::{delete, get, post, put};

const OWNERSHIP: &[Capability] = &[Capability::FolderOwnership];
const OWNED_CONTENT: &[Capability] = &[Capability::FolderOwnership, Capability::GuestContent];
const OWNED_UPLOADS: &[Capability] = &[Capability::FolderOwnership, Capability::MediaUpload];

/// Authenticated Router Module
///
/// Owner operations. Every request carries `userid` and `token`; the tier middleware
/// verifies them against the session store and handlers receive a `UserSession`.
/// Ownership of the target folder is checked per handler.
pub fn authenticated_routes() -> TierRoutes {
    TierRoutes::new(Tier::Authenticated)
        // --- Session ---
        .mount(
            "/me",
            "get_me",
            &[Capability::SessionAccess],
            get(handlers::get_me),
        )
        .mount(
            "/logout",
            "logout",
            &[Capability::SessionAccess],
            post(handlers::logout),
        )
        // --- Folders ---
        .mount("/folders", "list_folders", OWNERSHIP, get(handlers::list_folders))
        .mount("/folders", "create_folder", OWNERSHIP, post(handlers::create_folder))
        .mount(
            "/folders/{id}",
            "update_folder",
            OWNERSHIP,
            put(handlers::update_folder),
        )
        .mount(
            "/folders/{id}",
            "delete_folder",
            OWNERSHIP,
            delete(handlers::delete_folder),
        )
        // POST /folders/{id}/rehash
        // Rotates both share hashes.
        .mount(
            "/folders/{id}/rehash",
            "rehash_folder",
            OWNERSHIP,
            post(handlers::rehash_folder),
        )
        .mount(
            "/folders/{id}/activity",
            "folder_activity",
            OWNED_CONTENT,
            get(handlers::folder_activity),
        )
        // --- Media ---
        .mount(
            "/folders/{id}/media",
            "list_folder_media",
            &[
                Capability::FolderOwnership,
                Capability::GuestContent,
                Capability::MediaDownload,
            ],
            get(handlers::list_folder_media),
        )
        // POST registers a media row and returns a presigned upload URL.
        .mount(
            "/folders/{id}/media",
            "request_media_upload",
            OWNED_UPLOADS,
            post(handlers::request_media_upload),
        )
        .mount(
            "/media/{id}",
            "delete_media",
            OWNED_UPLOADS,
            delete(handlers::delete_media),
        )
        // --- Comment Moderation ---
        .mount(
            "/media/{id}/comments",
            "list_media_comments",
            OWNED_CONTENT,
            get(handlers::list_media_comments),
        )
        .mount(
            "/comments/{id}",
            "delete_comment",
            OWNED_CONTENT,
            delete(handlers::delete_comment),
        )
}
