//! Configuration loading and root folder resolution
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. `CURIO_ROOT_FOLDER` environment variable
//! 3. `CURIO_ROOT` environment variable
//! 4. `root_folder` key of the module TOML config file
//! 5. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable holding the root folder (primary name)
pub const ROOT_FOLDER_ENV: &str = "CURIO_ROOT_FOLDER";
/// Environment variable holding the root folder (short alias)
pub const ROOT_ENV: &str = "CURIO_ROOT";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "curio.db";
/// Directory (inside the root folder) where stored photos live
pub const IMAGES_DIR: &str = "images";

/// Compiled-in defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
    pub bind_address: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            log_level: "info".to_string(),
            bind_address: "127.0.0.1:5740".to_string(),
        }
    }
}

/// Get OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/curio (or /var/lib/curio for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("curio"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/curio"))
    } else if cfg!(target_os = "macos") {
        // ~/Library/Application Support/curio
        dirs::data_dir()
            .map(|d| d.join("curio"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/curio"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\curio
        dirs::data_local_dir()
            .map(|d| d.join("curio"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\curio"))
    } else {
        PathBuf::from("./curio_data")
    }
}

/// Default TOML config path for a module: `<config_dir>/curio/<module>.toml`
pub fn default_config_path(module_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("curio").join(format!("{}.toml", module_name)))
}

/// Resolves the root folder following the documented priority order
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            config_path: default_config_path(module_name),
        }
    }

    /// Command-line override (highest priority)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// Use an explicit TOML file instead of the platform config location
    pub fn with_config_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.config_path = path;
        }
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        for var in [ROOT_FOLDER_ENV, ROOT_ENV] {
            if let Ok(path) = std::env::var(var) {
                if !path.trim().is_empty() {
                    debug!(module = %self.module_name, var, "Root folder from environment");
                    return PathBuf::from(path);
                }
            }
        }

        if let Some(config_path) = &self.config_path {
            if let Ok(config) = load_toml_config(config_path) {
                if let Some(root) = config.root_folder {
                    debug!(module = %self.module_name, "Root folder from TOML config");
                    return root;
                }
            }
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    /// Create root folder and image directory if missing
    pub fn ensure_directory_exists(&self) -> std::io::Result<()> {
        if !self.root_folder.exists() {
            info!("Creating root folder: {}", self.root_folder.display());
        }
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.images_path())?;
        Ok(())
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    pub fn images_path(&self) -> PathBuf {
        self.root_folder.join(IMAGES_DIR)
    }
}

/// Logging section of the TOML config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Vendor domain set eligible for scoped search and scraping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VendorConfig {
    /// Domains OR-ed together in the scoped search query
    pub domains: Vec<String>,
    /// Domain used for the keyword-less fallback query
    pub primary_domain: String,
    /// Brand assumed when a product page does not name one
    pub default_brand: String,
    /// Product page templates; `{sku}` is replaced by the recovered token
    pub product_url_templates: Vec<String>,
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            domains: vec![
                "hallmark.com".to_string(),
                "hookedonhallmark.com".to_string(),
                "www.ornamentmall.com".to_string(),
            ],
            primary_domain: "hallmark.com".to_string(),
            default_brand: "Hallmark".to_string(),
            product_url_templates: vec![
                "https://www.hallmark.com/products/{sku}".to_string(),
                "https://www.hallmark.com/ornaments/{sku}".to_string(),
                "https://www.hallmark.com/gifts/{sku}".to_string(),
            ],
        }
    }
}

impl VendorConfig {
    /// True if `host` is one of the vendor domains or a subdomain of one.
    /// A leading `www.` is ignored on both sides.
    pub fn contains_host(&self, host: &str) -> bool {
        let host = strip_www(&host.to_ascii_lowercase()).to_string();
        self.domains.iter().any(|domain| {
            let domain = strip_www(&domain.to_ascii_lowercase()).to_string();
            host == domain || host.ends_with(&format!(".{}", domain))
        })
    }

    /// Candidate product page URLs for a SKU-like token, in template order
    pub fn product_urls_for(&self, sku: &str) -> Vec<String> {
        self.product_url_templates
            .iter()
            .map(|template| template.replace("{sku}", sku))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.domains.iter().all(|d| d.trim().is_empty()) {
            return Err(Error::Config("vendors.domains must not be empty".to_string()));
        }
        if self.primary_domain.trim().is_empty() {
            return Err(Error::Config("vendors.primary_domain must not be empty".to_string()));
        }
        Ok(())
    }
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// TOML configuration for the identification service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub bind_address: Option<String>,
    /// Base URL used when building public links to stored photos
    pub public_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub vision_model: Option<String>,
    pub google_search_api_key: Option<String>,
    pub google_search_engine_id: Option<String>,
    #[serde(default)]
    pub vendors: VendorConfig,
}

/// Load TOML config from `path`
///
/// A missing file yields defaults (with a warning); a malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found, using defaults: {}", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.vendors.validate()?;

    info!("Loaded config: {}", path.display());
    Ok(config)
}
