//! Shared error type for the Curio crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file present but unusable
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Item, run or setting lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
