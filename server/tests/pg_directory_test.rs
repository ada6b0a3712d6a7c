//! `PostgreSQL` Directory Tests
//!
//! Require a running database; ignored by default.
//!
//! Run with: `cargo test --test pg_directory_test -- --ignored`

use bridge_server::config::Config;
use bridge_server::db::{self, Bot, CachedUserProfile, Connection, PgDirectory};
use bridge_server::directory::{BotDirectory, ConnectionDirectory, DirectoryError, ProfileStore};
use chrono::Utc;

async fn directory() -> PgDirectory {
    let config = Config::default_for_test();
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to connect to test DB");
    db::run_migrations(&pool).await.expect("Migrations failed");
    PgDirectory::new(pool)
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::now_v7().simple())
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_connection_uniqueness_is_enforced() {
    let dir = directory().await;
    let api_url = format!("https://{}.retailcrm.ru", unique("acc"));
    let first = Connection::new(unique("client"), api_url.clone(), "key".into());
    ConnectionDirectory::create(&dir, &first).await.unwrap();

    let duplicate = Connection::new(unique("client"), api_url.clone(), "key".into());
    let err = ConnectionDirectory::create(&dir, &duplicate)
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Conflict(_)));

    let found = dir.get_by_api_url(&api_url).await.unwrap().unwrap();
    assert_eq!(found.client_id, first.client_id);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_bot_channel_and_activity_round_trip() {
    let dir = directory().await;
    let connection = Connection::new(
        unique("client"),
        format!("https://{}.retailcrm.ru", unique("acc")),
        "key".into(),
    );
    ConnectionDirectory::create(&dir, &connection).await.unwrap();

    let token = unique("1:token");
    let bot = Bot::new(connection.id, token.clone(), "bot".into());
    BotDirectory::create(&dir, &bot).await.unwrap();
    assert!(matches!(
        BotDirectory::create(&dir, &bot).await,
        Err(DirectoryError::Conflict(_))
    ));

    dir.set_channel(&token, "ch-9").await.unwrap();
    BotDirectory::set_active(&dir, &token, true).await.unwrap();

    let stored = dir
        .get_by_channel_and_connection(connection.id, "ch-9")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.token, token);
    assert!(stored.active);
    assert_eq!(dir.list_by_connection(connection.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
async fn test_profile_save_is_an_upsert() {
    let dir = directory().await;
    let external_id = Utc::now().timestamp_micros();
    let mut profile = CachedUserProfile::empty(external_id, Utc::now());
    ProfileStore::save(&dir, &profile).await.unwrap();

    profile.avatar_source_id = Some("photo".into());
    profile.avatar_url = Some("https://cdn.test/a.jpg".into());
    ProfileStore::save(&dir, &profile).await.unwrap();

    let stored = dir.get(external_id).await.unwrap().unwrap();
    assert_eq!(stored.avatar_source_id.as_deref(), Some("photo"));
}
