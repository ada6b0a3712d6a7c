//! User Identity Cache
//!
//! Mirrors chat-platform avatars into object storage so the CRM can show
//! them. Each user is refreshed at most once per update interval, and an
//! unchanged photo is never uploaded twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use super::{random_hex, BridgeError};
use crate::db::CachedUserProfile;
use crate::directory::ProfileStore;
use crate::storage::ObjectStorage;
use crate::telegram::ChatPlatform;

/// Where and how mirrored avatars are stored.
#[derive(Debug, Clone)]
pub struct AvatarSettings {
    pub folder: String,
    pub content_type: String,
    pub update_interval: Duration,
}

#[derive(Clone)]
pub struct UserIdentityCache {
    chat: Arc<dyn ChatPlatform>,
    storage: Arc<dyn ObjectStorage>,
    profiles: Arc<dyn ProfileStore>,
    settings: AvatarSettings,
}

fn sync_error(err: impl std::fmt::Display) -> BridgeError {
    BridgeError::ProfileSync(err.to_string())
}

impl UserIdentityCache {
    pub fn new(
        chat: Arc<dyn ChatPlatform>,
        storage: Arc<dyn ObjectStorage>,
        profiles: Arc<dyn ProfileStore>,
        settings: AvatarSettings,
    ) -> Self {
        Self {
            chat,
            storage,
            profiles,
            settings,
        }
    }

    fn is_fresh(&self, profile: &CachedUserProfile, now: DateTime<Utc>) -> bool {
        (now - profile.updated_at)
            .to_std()
            .is_ok_and(|age| age < self.settings.update_interval)
    }

    /// Return the cached profile of `user_id`, refreshing it first when stale.
    #[instrument(skip(self, token, now))]
    pub async fn ensure_fresh(
        &self,
        token: &str,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<CachedUserProfile, BridgeError> {
        let cached = self.profiles.get(user_id).await.map_err(sync_error)?;
        if let Some(profile) = &cached {
            if self.is_fresh(profile, now) {
                return Ok(profile.clone());
            }
        }

        let mut profile = cached.unwrap_or_else(|| CachedUserProfile::empty(user_id, now));

        let photo = self
            .chat
            .get_user_profile_photo(token, user_id)
            .await
            .map_err(sync_error)?;

        if let Some(photo) = photo {
            let changed = profile.avatar_source_id.as_deref() != Some(photo.source_id.as_str());
            if let (true, Some(url)) = (changed, photo.url.as_deref()) {
                let data = self.chat.download(url).await.map_err(sync_error)?;
                let key = format!("{}/{}.jpg", self.settings.folder, random_hex(16));
                let public_url = self
                    .storage
                    .upload(&key, data, &self.settings.content_type)
                    .await
                    .map_err(sync_error)?;

                debug!(%key, "Avatar uploaded");
                profile.avatar_source_id = Some(photo.source_id);
                profile.avatar_url = Some(public_url);
            }
        }

        profile.updated_at = now;
        self.profiles.save(&profile).await.map_err(sync_error)?;
        Ok(profile)
    }
}
