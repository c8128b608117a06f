use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::file::expand_path;
use crate::utils::sql::is_valid_table_name;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_HOST,
    DEFAULT_ORACLE_ENDPOINT, DEFAULT_ORACLE_MAX_ITEMS, DEFAULT_ORACLE_MODEL,
    DEFAULT_ORACLE_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_QUERY_TIMEOUT_SECS,
    DEFAULT_RATE_LIMIT_AUTH_RPM, DEFAULT_RATE_LIMIT_ORACLE_RPM, DEFAULT_REFERENCE_TTL_SECS,
    DEFAULT_ROW_LIMIT, DEFAULT_TABLE, MAX_ROW_LIMIT,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub enabled: Option<bool>,
    pub password: Option<String>,
}

/// Warehouse configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct WarehouseFileConfig {
    pub path: Option<String>,
    pub table: Option<String>,
    pub row_limit: Option<u32>,
    pub query_timeout_secs: Option<u64>,
}

/// Cache configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CacheFileConfig {
    pub max_entries: Option<u64>,
    pub reference_ttl_secs: Option<u64>,
}

/// Oracle configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OracleFileConfig {
    pub enabled: Option<bool>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_items: Option<u32>,
}

/// Rate limit configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub auth_rpm: Option<u32>,
    pub oracle_rpm: Option<u32>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub warehouse: Option<WarehouseFileConfig>,
    pub cache: Option<CacheFileConfig>,
    pub oracle: Option<OracleFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

/// Overwrite `dst` when `src` is set
fn merge_opt<T>(dst: &mut Option<T>, src: Option<T>) {
    if src.is_some() {
        *dst = src;
    }
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            merge_opt(&mut current.host, server.host);
            merge_opt(&mut current.port, server.port);
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            merge_opt(&mut current.enabled, auth.enabled);
            merge_opt(&mut current.password, auth.password);
        }

        if let Some(warehouse) = other.warehouse {
            let current = self
                .warehouse
                .get_or_insert_with(WarehouseFileConfig::default);
            merge_opt(&mut current.path, warehouse.path);
            merge_opt(&mut current.table, warehouse.table);
            merge_opt(&mut current.row_limit, warehouse.row_limit);
            merge_opt(&mut current.query_timeout_secs, warehouse.query_timeout_secs);
        }

        if let Some(cache) = other.cache {
            let current = self.cache.get_or_insert_with(CacheFileConfig::default);
            merge_opt(&mut current.max_entries, cache.max_entries);
            merge_opt(&mut current.reference_ttl_secs, cache.reference_ttl_secs);
        }

        if let Some(oracle) = other.oracle {
            let current = self.oracle.get_or_insert_with(OracleFileConfig::default);
            merge_opt(&mut current.enabled, oracle.enabled);
            merge_opt(&mut current.api_key, oracle.api_key);
            merge_opt(&mut current.model, oracle.model);
            merge_opt(&mut current.endpoint, oracle.endpoint);
            merge_opt(&mut current.timeout_secs, oracle.timeout_secs);
            merge_opt(&mut current.max_items, oracle.max_items);
        }

        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            merge_opt(&mut current.enabled, rate_limit.enabled);
            merge_opt(&mut current.auth_rpm, rate_limit.auth_rpm);
            merge_opt(&mut current.oracle_rpm, rate_limit.oracle_rpm);
        }

        merge_opt(&mut self.debug, other.debug);
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    pub password: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Warehouse configuration
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Explicit database path; `None` uses the data directory
    pub path: Option<PathBuf>,
    pub table: String,
    pub row_limit: u32,
    pub query_timeout_secs: u64,
}

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: u64,
    pub reference_ttl_secs: u64,
}

/// Oracle configuration
#[derive(Clone)]
pub struct OracleConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_items: u32,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_items", &self.max_items)
            .finish()
    }
}

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub auth_rpm: u32,
    pub oracle_rpm: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: DEFAULT_ORACLE_MODEL.to_string(),
            endpoint: DEFAULT_ORACLE_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_ORACLE_TIMEOUT_SECS,
            max_items: DEFAULT_ORACLE_MAX_ITEMS,
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            path: None,
            table: DEFAULT_TABLE.to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            query_timeout_secs: DEFAULT_QUERY_TIMEOUT_SECS,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            reference_ttl_secs: DEFAULT_REFERENCE_TTL_SECS,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auth_rpm: DEFAULT_RATE_LIMIT_AUTH_RPM,
            oracle_rpm: DEFAULT_RATE_LIMIT_ORACLE_RPM,
        }
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub warehouse: WarehouseConfig,
    pub cache: CacheConfig,
    pub oracle: OracleConfig,
    pub rate_limit: RateLimitConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.deklarant/deklarant.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(file_config, cli)
    }

    /// Layer defaults -> file config -> CLI/env overrides
    fn from_layers(file_config: FileConfig, cli: &CliConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_warehouse = file_config.warehouse.unwrap_or_default();
        let file_cache = file_config.cache.unwrap_or_default();
        let file_oracle = file_config.oracle.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        // auth.enabled: file config sets default, --no-auth CLI flag disables
        let auth = AuthConfig {
            enabled: if cli.no_auth {
                false
            } else {
                file_auth.enabled.unwrap_or(true)
            },
            password: cli
                .password
                .clone()
                .or(file_auth.password)
                .filter(|p| !p.is_empty()),
        };

        let warehouse = WarehouseConfig {
            path: cli
                .warehouse
                .as_ref()
                .map(|p| expand_path(&p.to_string_lossy()))
                .or_else(|| file_warehouse.path.as_deref().map(expand_path)),
            table: cli
                .table
                .clone()
                .or(file_warehouse.table)
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
            row_limit: cli
                .row_limit
                .or(file_warehouse.row_limit)
                .unwrap_or(DEFAULT_ROW_LIMIT),
            query_timeout_secs: cli
                .query_timeout
                .or(file_warehouse.query_timeout_secs)
                .unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS),
        };

        let cache = CacheConfig {
            max_entries: cli
                .cache_max_entries
                .or(file_cache.max_entries)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            reference_ttl_secs: cli
                .reference_ttl
                .or(file_cache.reference_ttl_secs)
                .unwrap_or(DEFAULT_REFERENCE_TTL_SECS),
        };

        let oracle = OracleConfig {
            enabled: cli.oracle.or(file_oracle.enabled).unwrap_or(false),
            api_key: cli
                .oracle_api_key
                .clone()
                .or(file_oracle.api_key)
                .filter(|k| !k.is_empty()),
            model: cli
                .oracle_model
                .clone()
                .or(file_oracle.model)
                .unwrap_or_else(|| DEFAULT_ORACLE_MODEL.to_string()),
            endpoint: file_oracle
                .endpoint
                .unwrap_or_else(|| DEFAULT_ORACLE_ENDPOINT.to_string()),
            timeout_secs: cli
                .oracle_timeout
                .or(file_oracle.timeout_secs)
                .unwrap_or(DEFAULT_ORACLE_TIMEOUT_SECS),
            max_items: file_oracle.max_items.unwrap_or(DEFAULT_ORACLE_MAX_ITEMS),
        };

        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate_limit.enabled)
                .unwrap_or(true),
            auth_rpm: file_rate_limit
                .auth_rpm
                .unwrap_or(DEFAULT_RATE_LIMIT_AUTH_RPM),
            oracle_rpm: file_rate_limit
                .oracle_rpm
                .unwrap_or(DEFAULT_RATE_LIMIT_ORACLE_RPM),
        };

        // debug: CLI flag enables, file config sets default
        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            server,
            auth,
            warehouse,
            cache,
            oracle,
            rate_limit,
            debug,
        };

        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            auth_enabled = config.auth.enabled,
            debug = config.debug,
            warehouse_path = ?config.warehouse.path,
            table = %config.warehouse.table,
            row_limit = config.warehouse.row_limit,
            query_timeout_secs = config.warehouse.query_timeout_secs,
            cache_max_entries = config.cache.max_entries,
            reference_ttl_secs = config.cache.reference_ttl_secs,
            oracle_enabled = config.oracle.enabled,
            oracle_model = %config.oracle.model,
            rate_limit_enabled = config.rate_limit.enabled,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port 0 would cause bind failure
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.auth.enabled && self.auth.password.is_none() {
            anyhow::bail!(
                "Configuration error: auth.password is required when auth is enabled. \
                 Set it via --password, DEKLARANT_PASSWORD or auth.password, or pass --no-auth."
            );
        }

        if !is_valid_table_name(&self.warehouse.table) {
            anyhow::bail!(
                "Configuration error: warehouse.table must be an identifier \
                 (optionally schema-qualified). Got: {}",
                self.warehouse.table
            );
        }

        if self.warehouse.row_limit == 0 || self.warehouse.row_limit > MAX_ROW_LIMIT {
            anyhow::bail!(
                "Configuration error: warehouse.row_limit must be between 1 and {}",
                MAX_ROW_LIMIT
            );
        }

        if self.warehouse.query_timeout_secs == 0 {
            anyhow::bail!("Configuration error: warehouse.query_timeout_secs must be greater than 0");
        }

        if self.oracle.enabled {
            if self.oracle.api_key.is_none() {
                anyhow::bail!(
                    "Configuration error: oracle.api_key is required when the oracle is enabled"
                );
            }
            if !self.oracle.endpoint.starts_with("http://")
                && !self.oracle.endpoint.starts_with("https://")
            {
                anyhow::bail!(
                    "Configuration error: oracle.endpoint must start with http:// or https://. Got: {}",
                    self.oracle.endpoint
                );
            }
            if self.oracle.timeout_secs == 0 {
                anyhow::bail!("Configuration error: oracle.timeout_secs must be greater than 0");
            }
        }

        Ok(())
    }
}

/// Get the profile config path (~/.deklarant/deklarant.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
