#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use media_library::{
    AppConfig, AppState, build_http_client,
    error::StoreError,
    models::{
        ActivityEntry, Comment, Description, Folder, HashKind, Media, PublicStats,
        UpdateFolderRequest, User,
    },
    repository::{FolderId, FolderStore, IdentityStore, Repository},
    storage::MockStorageService,
};
use std::sync::{Arc, Mutex};

pub const OWNER_ID: i64 = 7;
pub const OWNER_TOKEN: &str = "owner-token-123";
pub const FOLDER_ID: i64 = 10;
pub const VIEW_HASH: &str = "viewhash0000000000000000000000aa";
pub const EDIT_HASH: &str = "edithash0000000000000000000000bb";
pub const MEDIA_ID: i64 = 100;

/// MockRepo
///
/// In-memory `Repository` for tests. Hash lookups are recorded in `lookups` so tests
/// can assert the order and number of store calls.
#[derive(Default)]
pub struct MockRepo {
    pub folders: Mutex<Vec<Folder>>,
    pub media: Mutex<Vec<Media>>,
    pub comments: Mutex<Vec<Comment>>,
    pub descriptions: Mutex<Vec<Description>>,
    pub activity: Mutex<Vec<ActivityEntry>>,
    pub sessions: Mutex<Vec<(i64, String)>>,
    pub users: Mutex<Vec<User>>,
    pub lookups: Mutex<Vec<(String, HashKind)>>,
    pub verifications: Mutex<Vec<(i64, String)>>,
    /// When true, every store call fails with a timeout.
    pub fail_store: bool,
}

pub fn folder(id: i64, owner_id: i64, viewhash: &str, edithash: &str, visible: bool) -> Folder {
    Folder {
        id,
        owner_id,
        name: format!("Folder {id}"),
        viewhash: viewhash.to_string(),
        edithash: edithash.to_string(),
        visible,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn media(id: i64, folder_id: i64) -> Media {
    Media {
        id,
        folder_id,
        uploader_id: Some(OWNER_ID),
        file_key: format!("folders/{folder_id}/{id}.jpg"),
        filename: format!("photo-{id}.jpg"),
        content_type: "image/jpeg".to_string(),
        created_at: Utc::now(),
        description: None,
    }
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// One visible folder owned by `OWNER_ID` with one media item, and a valid
    /// session for the owner.
    pub fn seeded() -> Self {
        Self::new()
            .with_folder(folder(FOLDER_ID, OWNER_ID, VIEW_HASH, EDIT_HASH, true))
            .with_media(media(MEDIA_ID, FOLDER_ID))
            .with_session(OWNER_ID, OWNER_TOKEN)
    }

    pub fn failing() -> Self {
        Self {
            fail_store: true,
            ..Self::default()
        }
    }

    pub fn with_folder(self, folder: Folder) -> Self {
        self.folders.lock().unwrap().push(folder);
        self
    }

    pub fn with_media(self, media: Media) -> Self {
        self.media.lock().unwrap().push(media);
        self
    }

    pub fn with_comment(self, comment: Comment) -> Self {
        self.comments.lock().unwrap().push(comment);
        self
    }

    pub fn with_session(self, user_id: i64, token: &str) -> Self {
        self.sessions
            .lock()
            .unwrap()
            .push((user_id, token.to_string()));
        self
    }

    pub fn lookup_kinds(&self) -> Vec<HashKind> {
        self.lookups
            .lock()
            .unwrap()
            .iter()
            .map(|(_, kind)| *kind)
            .collect()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.fail_store {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }

    fn log(&self, folder_id: i64, media_id: Option<i64>, kind: &str, actor: &str) {
        let mut activity = self.activity.lock().unwrap();
        let id = activity.len() as i64 + 1;
        activity.push(ActivityEntry {
            id,
            folder_id,
            media_id,
            kind: kind.to_string(),
            actor: actor.to_string(),
            created_at: Utc::now(),
        });
    }

    fn owns(&self, folder_id: i64, owner_id: i64) -> bool {
        self.folders
            .lock()
            .unwrap()
            .iter()
            .any(|f| f.id == folder_id && f.owner_id == owner_id)
    }
}

#[async_trait]
impl IdentityStore for MockRepo {
    async fn verify_credential(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        self.verifications
            .lock()
            .unwrap()
            .push((user_id, token.to_string()));
        self.check()?;
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .any(|(id, t)| *id == user_id && t == token))
    }
}

#[async_trait]
impl FolderStore for MockRepo {
    async fn find_folder_by_hash(
        &self,
        hash: &str,
        kind: HashKind,
    ) -> Result<Option<FolderId>, StoreError> {
        self.lookups.lock().unwrap().push((hash.to_string(), kind));
        self.check()?;
        let found = self.folders.lock().unwrap().iter().find_map(|f| {
            let candidate = match kind {
                HashKind::View => &f.viewhash,
                HashKind::Edit => &f.edithash,
            };
            (f.visible && candidate == hash).then_some(f.id)
        });
        Ok(found)
    }
}

#[async_trait]
impl Repository for MockRepo {
    async fn get_public_stats(&self) -> Result<PublicStats, StoreError> {
        self.check()?;
        Ok(PublicStats {
            visible_folders: self.folders.lock().unwrap().iter().filter(|f| f.visible).count()
                as i64,
            media: self.media.lock().unwrap().len() as i64,
            comments: self.comments.lock().unwrap().len() as i64,
        })
    }

    async fn upsert_user(&self, external_id: &str, email: &str) -> Result<User, StoreError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let user = User {
            id: users.len() as i64 + 1,
            external_id: external_id.to_string(),
            email: email.to_string(),
            display_name: None,
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(Some(User {
            id,
            external_id: format!("ext-{id}"),
            email: format!("user{id}@example.com"),
            display_name: None,
            created_at: Utc::now(),
        }))
    }

    async fn create_session(
        &self,
        user_id: i64,
        token: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.sessions
            .lock()
            .unwrap()
            .push((user_id, token.to_string()));
        Ok(())
    }

    async fn revoke_session(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        self.check()?;
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|(id, t)| !(*id == user_id && t == token));
        Ok(sessions.len() < before)
    }

    async fn get_folder(&self, id: FolderId) -> Result<Option<Folder>, StoreError> {
        self.check()?;
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .find(|f| f.id == id)
            .cloned())
    }

    async fn list_media(&self, folder_id: FolderId) -> Result<Vec<Media>, StoreError> {
        self.check()?;
        Ok(self
            .media
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.folder_id == folder_id)
            .cloned()
            .collect())
    }

    async fn get_media(&self, id: i64) -> Result<Option<Media>, StoreError> {
        self.check()?;
        Ok(self
            .media
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn list_comments(&self, media_id: i64) -> Result<Vec<Comment>, StoreError> {
        self.check()?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.media_id == media_id)
            .cloned()
            .collect())
    }

    async fn add_comment(
        &self,
        media: &Media,
        user_id: Option<i64>,
        author_name: &str,
        body: &str,
    ) -> Result<Comment, StoreError> {
        self.check()?;
        let comment = {
            let mut comments = self.comments.lock().unwrap();
            let comment = Comment {
                id: comments.len() as i64 + 1,
                media_id: media.id,
                user_id,
                author_name: author_name.to_string(),
                body: body.to_string(),
                created_at: Utc::now(),
            };
            comments.push(comment.clone());
            comment
        };
        self.log(
            media.folder_id,
            Some(media.id),
            "comment_added",
            &format!("guest:{author_name}"),
        );
        Ok(comment)
    }

    async fn set_description(
        &self,
        media: &Media,
        body: &str,
        actor: &str,
    ) -> Result<Description, StoreError> {
        self.check()?;
        let description = Description {
            media_id: media.id,
            body: body.to_string(),
            updated_at: Utc::now(),
        };
        {
            let mut descriptions = self.descriptions.lock().unwrap();
            descriptions.retain(|d| d.media_id != media.id);
            descriptions.push(description.clone());
        }
        self.log(media.folder_id, Some(media.id), "description_updated", actor);
        Ok(description)
    }

    async fn list_activity(
        &self,
        folder_id: FolderId,
        limit: i64,
    ) -> Result<Vec<ActivityEntry>, StoreError> {
        self.check()?;
        Ok(self
            .activity
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|a| a.folder_id == folder_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn list_folders(&self, owner_id: i64) -> Result<Vec<Folder>, StoreError> {
        self.check()?;
        Ok(self
            .folders
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_folder(
        &self,
        owner_id: i64,
        name: &str,
        visible: bool,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Folder, StoreError> {
        self.check()?;
        let mut folders = self.folders.lock().unwrap();
        let mut created = folder(
            folders.len() as i64 + 1000,
            owner_id,
            viewhash,
            edithash,
            visible,
        );
        created.name = name.to_string();
        folders.push(created.clone());
        Ok(created)
    }

    async fn update_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        req: UpdateFolderRequest,
    ) -> Result<Option<Folder>, StoreError> {
        self.check()?;
        let mut folders = self.folders.lock().unwrap();
        let Some(folder) = folders
            .iter_mut()
            .find(|f| f.id == id && f.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if let Some(name) = req.name {
            folder.name = name;
        }
        if let Some(visible) = req.visible {
            folder.visible = visible;
        }
        Ok(Some(folder.clone()))
    }

    async fn delete_folder(&self, id: FolderId, owner_id: i64) -> Result<bool, StoreError> {
        self.check()?;
        let mut folders = self.folders.lock().unwrap();
        let before = folders.len();
        folders.retain(|f| !(f.id == id && f.owner_id == owner_id));
        Ok(folders.len() < before)
    }

    async fn rehash_folder(
        &self,
        id: FolderId,
        owner_id: i64,
        viewhash: &str,
        edithash: &str,
    ) -> Result<Option<Folder>, StoreError> {
        self.check()?;
        let mut folders = self.folders.lock().unwrap();
        let Some(folder) = folders
            .iter_mut()
            .find(|f| f.id == id && f.owner_id == owner_id)
        else {
            return Ok(None);
        };
        folder.viewhash = viewhash.to_string();
        folder.edithash = edithash.to_string();
        Ok(Some(folder.clone()))
    }

    async fn add_media(
        &self,
        folder_id: FolderId,
        uploader_id: i64,
        file_key: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<Media, StoreError> {
        self.check()?;
        let mut all = self.media.lock().unwrap();
        let created = Media {
            id: all.len() as i64 + 500,
            folder_id,
            uploader_id: Some(uploader_id),
            file_key: file_key.to_string(),
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            created_at: Utc::now(),
            description: None,
        };
        all.push(created.clone());
        Ok(created)
    }

    async fn delete_media(&self, id: i64, owner_id: i64) -> Result<bool, StoreError> {
        self.check()?;
        let folder_id = self
            .media
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.folder_id);
        match folder_id {
            Some(folder_id) if self.owns(folder_id, owner_id) => {
                self.media.lock().unwrap().retain(|m| m.id != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_comment(&self, id: i64, owner_id: i64) -> Result<bool, StoreError> {
        self.check()?;
        let media_id = self
            .comments
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.media_id);
        let folder_id = media_id.and_then(|media_id| {
            self.media
                .lock()
                .unwrap()
                .iter()
                .find(|m| m.id == media_id)
                .map(|m| m.folder_id)
        });
        match folder_id {
            Some(folder_id) if self.owns(folder_id, owner_id) => {
                self.comments.lock().unwrap().retain(|c| c.id != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

pub fn app_state(repo: Arc<MockRepo>, storage: MockStorageService) -> AppState {
    let config = AppConfig::default();
    AppState {
        repo,
        storage: Arc::new(storage),
        http: build_http_client(config.auth_timeout).expect("http client"),
        config,
    }
}
