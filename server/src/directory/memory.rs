//! In-Memory Directory
//!
//! Process-local implementation of all three directories. Used by the test
//! suite and for running the bridge without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{BotDirectory, ConnectionDirectory, DirectoryError, ProfileStore};
use crate::db::{Bot, CachedUserProfile, Connection};

#[derive(Default)]
struct Inner {
    connections: HashMap<Uuid, Connection>,
    bots: HashMap<String, Bot>,
    profiles: HashMap<i64, CachedUserProfile>,
}

/// Directory backed by in-process maps.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: RwLock<Inner>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionDirectory for MemoryDirectory {
    async fn get_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Connection>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .connections
            .values()
            .find(|c| c.client_id == client_id)
            .cloned())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, DirectoryError> {
        Ok(self.inner.read().await.connections.get(&id).cloned())
    }

    async fn get_by_api_url(&self, api_url: &str) -> Result<Option<Connection>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .connections
            .values()
            .find(|c| c.api_url == api_url)
            .cloned())
    }

    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.connections.values().find(|c| {
            c.id == connection.id
                || c.client_id == connection.client_id
                || c.api_url == connection.api_url
        }) {
            return Err(DirectoryError::Conflict(format!(
                "connection {}",
                existing.api_url
            )));
        }
        inner.connections.insert(connection.id, connection.clone());
        Ok(())
    }

    async fn save(&self, connection: &Connection) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if inner
            .connections
            .values()
            .any(|c| c.id != connection.id && c.api_url == connection.api_url)
        {
            return Err(DirectoryError::Conflict(format!(
                "connection {}",
                connection.api_url
            )));
        }
        let stored = inner
            .connections
            .get_mut(&connection.id)
            .ok_or(DirectoryError::NotFound)?;
        stored.api_url.clone_from(&connection.api_url);
        stored.api_key.clone_from(&connection.api_key);
        stored.transport_url.clone_from(&connection.transport_url);
        stored.transport_token.clone_from(&connection.transport_token);
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn set_active(&self, client_id: &str, active: bool) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .connections
            .values_mut()
            .find(|c| c.client_id == client_id)
            .ok_or(DirectoryError::NotFound)?;
        stored.active = active;
        stored.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl BotDirectory for MemoryDirectory {
    async fn get_by_token(&self, token: &str) -> Result<Option<Bot>, DirectoryError> {
        Ok(self.inner.read().await.bots.get(token).cloned())
    }

    async fn get_by_channel_and_connection(
        &self,
        connection_id: Uuid,
        channel_id: &str,
    ) -> Result<Option<Bot>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bots
            .values()
            .find(|b| b.connection_id == connection_id && b.channel_id == channel_id)
            .cloned())
    }

    async fn list_by_connection(&self, connection_id: Uuid) -> Result<Vec<Bot>, DirectoryError> {
        let inner = self.inner.read().await;
        let mut bots: Vec<Bot> = inner
            .bots
            .values()
            .filter(|b| b.connection_id == connection_id)
            .cloned()
            .collect();
        bots.sort_by_key(|b| b.created_at);
        Ok(bots)
    }

    async fn create(&self, bot: &Bot) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        if inner.bots.contains_key(&bot.token) {
            return Err(DirectoryError::Conflict(format!("bot {}", bot.id)));
        }
        inner.bots.insert(bot.token.clone(), bot.clone());
        Ok(())
    }

    async fn set_active(&self, token: &str, active: bool) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        let stored = inner.bots.get_mut(token).ok_or(DirectoryError::NotFound)?;
        stored.active = active;
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn set_channel(&self, token: &str, channel_id: &str) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().await;
        let stored = inner.bots.get_mut(token).ok_or(DirectoryError::NotFound)?;
        channel_id.clone_into(&mut stored.channel_id);
        stored.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryDirectory {
    async fn get(&self, external_id: i64) -> Result<Option<CachedUserProfile>, DirectoryError> {
        Ok(self.inner.read().await.profiles.get(&external_id).cloned())
    }

    async fn save(&self, profile: &CachedUserProfile) -> Result<(), DirectoryError> {
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.external_id, profile.clone());
        Ok(())
    }
}
