//! Credential resolution across database, environment and TOML

use serial_test::serial;
use sqlx::SqlitePool;
use tempfile::TempDir;

use curio_common::config::TomlConfig;
use curio_id::config::{resolve_secret, Credentials, SecretSource, OPENAI_API_KEY};
use curio_id::db::{init_database_pool, settings};

const ENV_VARS: &[&str] = &[
    "CURIO_OPENAI_API_KEY",
    "OPENAI_API_KEY",
    "CURIO_GOOGLE_SEARCH_API_KEY",
    "GOOGLE_CUSTOM_SEARCH_API_KEY",
    "CURIO_GOOGLE_SEARCH_ENGINE_ID",
    "GOOGLE_CUSTOM_SEARCH_ENGINE_ID",
];

fn clear_env() {
    for var in ENV_VARS {
        std::env::remove_var(var);
    }
}

async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().unwrap();
    let pool = init_database_pool(&dir.path().join("curio.db")).await.unwrap();
    (dir, pool)
}

#[tokio::test]
#[serial]
async fn test_database_wins_over_env_and_toml() {
    clear_env();
    let (_dir, db) = setup_db().await;
    settings::set_openai_api_key(&db, "sk-db".to_string())
        .await
        .unwrap();
    std::env::set_var("OPENAI_API_KEY", "sk-env");

    let resolved = resolve_secret(&db, &OPENAI_API_KEY, Some("sk-toml"))
        .await
        .unwrap();

    assert_eq!(
        resolved,
        Some(("sk-db".to_string(), SecretSource::Database))
    );
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_env_wins_over_toml() {
    clear_env();
    let (_dir, db) = setup_db().await;
    std::env::set_var("OPENAI_API_KEY", "  sk-env  ");

    let resolved = resolve_secret(&db, &OPENAI_API_KEY, Some("sk-toml"))
        .await
        .unwrap();

    assert_eq!(
        resolved,
        Some(("sk-env".to_string(), SecretSource::Environment))
    );
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_prefixed_env_var_checked_first() {
    clear_env();
    let (_dir, db) = setup_db().await;
    std::env::set_var("CURIO_OPENAI_API_KEY", "sk-curio");
    std::env::set_var("OPENAI_API_KEY", "sk-generic");

    let resolved = resolve_secret(&db, &OPENAI_API_KEY, None).await.unwrap();

    assert_eq!(resolved.map(|(v, _)| v).as_deref(), Some("sk-curio"));
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_blank_values_are_skipped() {
    clear_env();
    let (_dir, db) = setup_db().await;
    settings::set_openai_api_key(&db, "   ".to_string())
        .await
        .unwrap();
    std::env::set_var("OPENAI_API_KEY", "");

    let resolved = resolve_secret(&db, &OPENAI_API_KEY, Some("sk-toml"))
        .await
        .unwrap();
    assert_eq!(resolved, Some(("sk-toml".to_string(), SecretSource::Toml)));

    let resolved = resolve_secret(&db, &OPENAI_API_KEY, Some(" ")).await.unwrap();
    assert_eq!(resolved, None);
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_credentials_resolve_all_backends() {
    clear_env();
    let (_dir, db) = setup_db().await;
    settings::set_google_search_engine_id(&db, "cx-db".to_string())
        .await
        .unwrap();
    std::env::set_var("GOOGLE_CUSTOM_SEARCH_API_KEY", "g-env");

    let toml = TomlConfig {
        openai_api_key: Some("sk-toml".to_string()),
        ..Default::default()
    };
    let credentials = Credentials::resolve(&db, &toml).await.unwrap();

    assert_eq!(credentials.openai_api_key.as_deref(), Some("sk-toml"));
    assert_eq!(
        credentials.search(),
        Some(("g-env".to_string(), "cx-db".to_string()))
    );
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_nothing_configured_is_not_an_error() {
    clear_env();
    let (_dir, db) = setup_db().await;

    let credentials = Credentials::resolve(&db, &TomlConfig::default())
        .await
        .unwrap();

    assert_eq!(credentials, Credentials::default());
    assert!(credentials.search().is_none());
}
