//! Credential resolution for curio-id
//!
//! Backend credentials resolve Database -> ENV -> TOML. A missing credential
//! is not an error: the matching backend is simply left unconfigured and the
//! pipeline degrades (placeholder vision record, empty search results).

use curio_common::config::TomlConfig;
use curio_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

use crate::db::settings;

/// Where a credential was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Database,
    Environment,
    Toml,
}

impl std::fmt::Display for SecretSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SecretSource::Database => "database",
            SecretSource::Environment => "environment",
            SecretSource::Toml => "TOML",
        })
    }
}

/// One credential and the places it may come from
#[derive(Debug, Clone, Copy)]
pub struct Secret {
    /// Human-readable name for logs
    pub name: &'static str,
    /// Key in the settings table
    pub setting_key: &'static str,
    /// Environment variables, checked in order
    pub env_vars: &'static [&'static str],
}

pub const OPENAI_API_KEY: Secret = Secret {
    name: "OpenAI API key",
    setting_key: settings::OPENAI_API_KEY,
    env_vars: &["CURIO_OPENAI_API_KEY", "OPENAI_API_KEY"],
};

pub const GOOGLE_SEARCH_API_KEY: Secret = Secret {
    name: "Google Custom Search API key",
    setting_key: settings::GOOGLE_SEARCH_API_KEY,
    env_vars: &["CURIO_GOOGLE_SEARCH_API_KEY", "GOOGLE_CUSTOM_SEARCH_API_KEY"],
};

pub const GOOGLE_SEARCH_ENGINE_ID: Secret = Secret {
    name: "Google Custom Search engine id",
    setting_key: settings::GOOGLE_SEARCH_ENGINE_ID,
    env_vars: &["CURIO_GOOGLE_SEARCH_ENGINE_ID", "GOOGLE_CUSTOM_SEARCH_ENGINE_ID"],
};

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one credential
///
/// Returns the value from the highest-priority source holding a valid one,
/// warning when more than one source is set.
pub async fn resolve_secret(
    db: &Pool<Sqlite>,
    secret: &Secret,
    toml_value: Option<&str>,
) -> Result<Option<(String, SecretSource)>> {
    let db_value = settings::get_setting::<String>(db, secret.setting_key)
        .await?
        .filter(|v| is_valid_key(v));
    let env_value = secret
        .env_vars
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v)).map(str::to_string);

    let found: Vec<(String, SecretSource)> = [
        (db_value, SecretSource::Database),
        (env_value, SecretSource::Environment),
        (toml_value, SecretSource::Toml),
    ]
    .into_iter()
    .filter_map(|(value, source)| value.map(|v| (v.trim().to_string(), source)))
    .collect();

    if found.len() > 1 {
        let sources: Vec<String> = found.iter().map(|(_, s)| s.to_string()).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            secret.name,
            sources.join(", "),
            found[0].1
        );
    }

    match found.into_iter().next() {
        Some((value, source)) => {
            info!("{} loaded from {}", secret.name, source);
            Ok(Some((value, source)))
        }
        None => {
            warn!(
                "{} not configured (settings key {}, env {})",
                secret.name,
                secret.setting_key,
                secret.env_vars.join(" / ")
            );
            Ok(None)
        }
    }
}

/// Resolved backend credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
}

impl Credentials {
    pub async fn resolve(db: &Pool<Sqlite>, toml: &TomlConfig) -> Result<Self> {
        let value = |resolved: Option<(String, SecretSource)>| resolved.map(|(v, _)| v);

        Ok(Self {
            openai_api_key: value(
                resolve_secret(db, &OPENAI_API_KEY, toml.openai_api_key.as_deref()).await?,
            ),
            google_search_api_key: value(
                resolve_secret(db, &GOOGLE_SEARCH_API_KEY, toml.google_search_api_key.as_deref())
                    .await?,
            ),
            google_search_engine_id: value(
                resolve_secret(
                    db,
                    &GOOGLE_SEARCH_ENGINE_ID,
                    toml.google_search_engine_id.as_deref(),
                )
                .await?,
            ),
        })
    }

    /// Both search credentials are needed for the search backend
    pub fn search(&self) -> Option<(String, String)> {
        match (&self.google_search_api_key, &self.google_search_engine_id) {
            (Some(key), Some(cx)) => Some((key.clone(), cx.clone())),
            _ => None,
        }
    }
}
