use super::TierRoutes;
use crate::{
    handlers::visiting as handlers,
    tier::{Capability, Tier},
};
use axum::routing::{get, post, put};

const FOLDER_CONTENT: &[Capability] = &[Capability::FolderByHash, Capability::GuestContent];

/// Visiting Router Module
///
/// Guest access to a single folder, nested under `/visit`. Every request carries a
/// `hash` (query string or JSON body); the tier middleware resolves it to the folder
/// before the handler runs, and every handler is scoped to that folder.
pub fn visiting_routes() -> TierRoutes {
    TierRoutes::new(Tier::Visiting)
        // GET /visit/folder
        .mount(
            "/folder",
            "visit_folder",
            &[Capability::FolderByHash],
            get(handlers::visit_folder),
        )
        // GET /visit/media
        // Media with presigned download URLs.
        .mount(
            "/media",
            "visit_media",
            &[
                Capability::FolderByHash,
                Capability::GuestContent,
                Capability::MediaDownload,
            ],
            get(handlers::visit_media),
        )
        // GET/POST /visit/media/{id}/comments
        // Either hash may read and post comments.
        .mount(
            "/media/{id}/comments",
            "visit_comments",
            FOLDER_CONTENT,
            get(handlers::visit_comments),
        )
        .mount(
            "/media/{id}/comments",
            "visit_add_comment",
            FOLDER_CONTENT,
            post(handlers::visit_add_comment),
        )
        // PUT /visit/media/{id}/description
        // Edit hash only.
        .mount(
            "/media/{id}/description",
            "visit_set_description",
            FOLDER_CONTENT,
            put(handlers::visit_set_description),
        )
        // GET /visit/activity
        .mount(
            "/activity",
            "visit_activity",
            FOLDER_CONTENT,
            get(handlers::visit_activity),
        )
}
