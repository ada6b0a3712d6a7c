//! Directory Database Queries
//!
//! `PostgreSQL` implementation of the connection, bot and profile directories.
//! Uses runtime queries (`sqlx::query` / `sqlx::query_as`) to avoid
//! requiring a live database at compile time.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::models::{Bot, CachedUserProfile, Connection};
use crate::directory::{BotDirectory, ConnectionDirectory, DirectoryError, ProfileStore};

const CONNECTION_COLUMNS: &str = "id, client_id, api_url, api_key, transport_url, \
     transport_token, active, created_at, updated_at";

const BOT_COLUMNS: &str =
    "id, connection_id, token, name, channel_id, active, created_at, updated_at";

/// Directory backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-constraint violation to `Conflict`, everything else to `Database`.
fn map_insert_error(err: sqlx::Error) -> DirectoryError {
    match err.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => DirectoryError::Conflict(
            db_err
                .constraint()
                .unwrap_or("unique constraint")
                .to_string(),
        ),
        _ => DirectoryError::Database(err),
    }
}

fn expect_one_row(rows_affected: u64) -> Result<(), DirectoryError> {
    if rows_affected == 0 {
        Err(DirectoryError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl ConnectionDirectory for PgDirectory {
    async fn get_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Option<Connection>, DirectoryError> {
        let row = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<Connection>, DirectoryError> {
        let row = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_api_url(&self, api_url: &str) -> Result<Option<Connection>, DirectoryError> {
        let row = sqlx::query_as::<_, Connection>(&format!(
            "SELECT {CONNECTION_COLUMNS} FROM connections WHERE api_url = $1"
        ))
        .bind(api_url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create(&self, connection: &Connection) -> Result<(), DirectoryError> {
        sqlx::query(
            r"
            INSERT INTO connections
                (id, client_id, api_url, api_key, transport_url, transport_token, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(connection.id)
        .bind(&connection.client_id)
        .bind(&connection.api_url)
        .bind(&connection.api_key)
        .bind(&connection.transport_url)
        .bind(&connection.transport_token)
        .bind(connection.active)
        .bind(connection.created_at)
        .bind(connection.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(())
    }

    async fn save(&self, connection: &Connection) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            r"
            UPDATE connections
            SET api_url = $2,
                api_key = $3,
                transport_url = $4,
                transport_token = $5,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(connection.id)
        .bind(&connection.api_url)
        .bind(&connection.api_key)
        .bind(&connection.transport_url)
        .bind(&connection.transport_token)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        expect_one_row(result.rows_affected())
    }

    async fn set_active(&self, client_id: &str, active: bool) -> Result<(), DirectoryError> {
        let result = sqlx::query(
            "UPDATE connections SET active = $2, updated_at = NOW() WHERE client_id = $1",
        )
        .bind(client_id)
        .bind(active)
        .execute(&self.pool)
        .await?;
        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl BotDirectory for PgDirectory {
    async fn get_by_token(&self, token: &str) -> Result<Option<Bot>, DirectoryError> {
        let row = sqlx::query_as::<_, Bot>(&format!(
            "SELECT {BOT_COLUMNS} FROM bots WHERE token = $1"
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_by_channel_and_connection(
        &self,
        connection_id: Uuid,
        channel_id: &str,
    ) -> Result<Option<Bot>, DirectoryError> {
        let row = sqlx::query_as::<_, Bot>(&format!(
            "SELECT {BOT_COLUMNS} FROM bots WHERE connection_id = $1 AND channel_id = $2"
        ))
        .bind(connection_id)
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_by_connection(&self, connection_id: Uuid) -> Result<Vec<Bot>, DirectoryError> {
        let rows = sqlx::query_as::<_, Bot>(&format!(
            "SELECT {BOT_COLUMNS} FROM bots WHERE connection_id = $1 ORDER BY created_at ASC"
        ))
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create(&self, bot: &Bot) -> Result<(), DirectoryError> {
        sqlx::query(
            r"
            INSERT INTO bots
                (id, connection_id, token, name, channel_id, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(bot.id)
        .bind(bot.connection_id)
        .bind(&bot.token)
        .bind(&bot.name)
        .bind(&bot.channel_id)
        .bind(bot.active)
        .bind(bot.created_at)
        .bind(bot.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;
        Ok(())
    }

    async fn set_active(&self, token: &str, active: bool) -> Result<(), DirectoryError> {
        let result =
            sqlx::query("UPDATE bots SET active = $2, updated_at = NOW() WHERE token = $1")
                .bind(token)
                .bind(active)
                .execute(&self.pool)
                .await?;
        expect_one_row(result.rows_affected())
    }

    async fn set_channel(&self, token: &str, channel_id: &str) -> Result<(), DirectoryError> {
        let result =
            sqlx::query("UPDATE bots SET channel_id = $2, updated_at = NOW() WHERE token = $1")
                .bind(token)
                .bind(channel_id)
                .execute(&self.pool)
                .await?;
        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl ProfileStore for PgDirectory {
    async fn get(&self, external_id: i64) -> Result<Option<CachedUserProfile>, DirectoryError> {
        let row = sqlx::query_as::<_, CachedUserProfile>(
            r"
            SELECT external_id, avatar_source_id, avatar_url, updated_at
            FROM user_profiles
            WHERE external_id = $1
            ",
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save(&self, profile: &CachedUserProfile) -> Result<(), DirectoryError> {
        sqlx::query(
            r"
            INSERT INTO user_profiles (external_id, avatar_source_id, avatar_url, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE
            SET avatar_source_id = EXCLUDED.avatar_source_id,
                avatar_url = EXCLUDED.avatar_url,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(profile.external_id)
        .bind(&profile.avatar_source_id)
        .bind(&profile.avatar_url)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
