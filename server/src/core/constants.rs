// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Deklarant";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "deklarant";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".deklarant";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "deklarant.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "DEKLARANT_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "DEKLARANT_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "DEKLARANT_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "DEKLARANT_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "DEKLARANT_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5480;

/// Default request body limit (256 KiB)
pub const DEFAULT_BODY_LIMIT: usize = 256 * 1024;

/// Graceful shutdown timeout for background tasks
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "DEKLARANT_DATA_DIR";

// =============================================================================
// Authentication
// =============================================================================

/// Environment variable for the dashboard password
pub const ENV_PASSWORD: &str = "DEKLARANT_PASSWORD";

/// Cookie name for session token
pub const SESSION_COOKIE_NAME: &str = "deklarant_session";

/// Session token lifetime in hours
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Session id used for every request when auth is disabled
pub const LOCAL_SESSION_ID: &str = "local";

// =============================================================================
// Search Sessions
// =============================================================================

/// Maximum number of live search sessions kept in memory
pub const SESSION_STORE_MAX_ENTRIES: u64 = 1_000;

/// Idle time after which a search session is dropped (8 hours)
pub const SESSION_IDLE_SECS: u64 = 8 * 60 * 60;

// =============================================================================
// Warehouse (DuckDB)
// =============================================================================

/// Environment variable for the warehouse database path
pub const ENV_WAREHOUSE_PATH: &str = "DEKLARANT_WAREHOUSE";

/// Environment variable for the declarations table name
pub const ENV_WAREHOUSE_TABLE: &str = "DEKLARANT_TABLE";

/// Environment variable for the row cap of a search
pub const ENV_ROW_LIMIT: &str = "DEKLARANT_ROW_LIMIT";

/// Environment variable for the warehouse query timeout in seconds
pub const ENV_QUERY_TIMEOUT: &str = "DEKLARANT_QUERY_TIMEOUT";

/// DuckDB database filename
pub const DUCKDB_DB_FILENAME: &str = "deklarant.duckdb";

/// Default declarations table
pub const DEFAULT_TABLE: &str = "declarations";

/// Default row cap for a search
pub const DEFAULT_ROW_LIMIT: u32 = 2_000;

/// Hard upper bound for the configurable row cap
pub const MAX_ROW_LIMIT: u32 = 50_000;

/// Default warehouse query timeout in seconds
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Cache
// =============================================================================

/// Environment variable for maximum cache entries
pub const ENV_CACHE_MAX_ENTRIES: &str = "DEKLARANT_CACHE_MAX_ENTRIES";

/// Environment variable for the reference data TTL in seconds
pub const ENV_REFERENCE_TTL: &str = "DEKLARANT_REFERENCE_TTL";

/// Default maximum cache entries
pub const DEFAULT_CACHE_MAX_ENTRIES: u64 = 10_000;

/// Cache key version prefix
pub const CACHE_KEY_VERSION: &str = "v1";

/// Filter option lists change slowly; one hour
pub const DEFAULT_REFERENCE_TTL_SECS: u64 = 3_600;

// =============================================================================
// Oracle (generative language model)
// =============================================================================

pub const ENV_ORACLE_ENABLED: &str = "DEKLARANT_ORACLE_ENABLED";
pub const ENV_ORACLE_API_KEY: &str = "DEKLARANT_ORACLE_API_KEY";
pub const ENV_ORACLE_MODEL: &str = "DEKLARANT_ORACLE_MODEL";
pub const ENV_ORACLE_TIMEOUT: &str = "DEKLARANT_ORACLE_TIMEOUT";

pub const DEFAULT_ORACLE_MODEL: &str = "models/gemini-pro-latest";
pub const DEFAULT_ORACLE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ORACLE_TIMEOUT_SECS: u64 = 60;

/// Row cap requested from the model for generated SQL
pub const DEFAULT_ORACLE_MAX_ITEMS: u32 = 100;

// =============================================================================
// Rate Limiting
// =============================================================================

/// Environment variable to enable/disable rate limiting
pub const ENV_RATE_LIMIT_ENABLED: &str = "DEKLARANT_RATE_LIMIT_ENABLED";

/// Login attempts per minute per client IP
pub const DEFAULT_RATE_LIMIT_AUTH_RPM: u32 = 10;

/// Oracle calls per minute per session
pub const DEFAULT_RATE_LIMIT_ORACLE_RPM: u32 = 20;

/// Fixed window length for rate limit counters
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;
