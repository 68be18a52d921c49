//! # Curio Common Library
//!
//! Shared code for the Curio services:
//! - Error type used across crates
//! - Configuration loading (root folder, TOML, vendor domain set)
//! - Event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
