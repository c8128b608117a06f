use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CACHE_MAX_ENTRIES, ENV_CONFIG, ENV_DEBUG, ENV_HOST, ENV_ORACLE_API_KEY,
    ENV_ORACLE_ENABLED, ENV_ORACLE_MODEL, ENV_ORACLE_TIMEOUT, ENV_PASSWORD, ENV_PORT,
    ENV_QUERY_TIMEOUT, ENV_RATE_LIMIT_ENABLED, ENV_REFERENCE_TTL, ENV_ROW_LIMIT,
    ENV_WAREHOUSE_PATH, ENV_WAREHOUSE_TABLE,
};

#[derive(Parser)]
#[command(name = "deklarant")]
#[command(version, about = "Customs declarations dashboard", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Disable the password gate (for development)
    #[arg(long, global = true)]
    pub no_auth: bool,

    /// Dashboard password
    #[arg(long, global = true, env = ENV_PASSWORD, hide_env_values = true)]
    pub password: Option<String>,

    /// Enable debug mode
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    // Warehouse options
    /// Path to the DuckDB warehouse file
    #[arg(long, global = true, env = ENV_WAREHOUSE_PATH)]
    pub warehouse: Option<PathBuf>,

    /// Declarations table name
    #[arg(long, global = true, env = ENV_WAREHOUSE_TABLE)]
    pub table: Option<String>,

    /// Maximum rows returned by a search
    #[arg(long, global = true, env = ENV_ROW_LIMIT)]
    pub row_limit: Option<u32>,

    /// Warehouse query timeout in seconds
    #[arg(long, global = true, env = ENV_QUERY_TIMEOUT)]
    pub query_timeout: Option<u64>,

    // Cache options
    /// Maximum number of cache entries
    #[arg(long, global = true, env = ENV_CACHE_MAX_ENTRIES)]
    pub cache_max_entries: Option<u64>,

    /// TTL for filter option lists in seconds
    #[arg(long, global = true, env = ENV_REFERENCE_TTL)]
    pub reference_ttl: Option<u64>,

    // Oracle options
    /// Enable natural-language search and code suggestions
    #[arg(long, global = true, env = ENV_ORACLE_ENABLED)]
    pub oracle: Option<bool>,

    /// API key for the generative language endpoint
    #[arg(long, global = true, env = ENV_ORACLE_API_KEY, hide_env_values = true)]
    pub oracle_api_key: Option<String>,

    /// Model name (e.g. models/gemini-pro-latest)
    #[arg(long, global = true, env = ENV_ORACLE_MODEL)]
    pub oracle_model: Option<String>,

    /// Oracle request timeout in seconds
    #[arg(long, global = true, env = ENV_ORACLE_TIMEOUT)]
    pub oracle_timeout: Option<u64>,

    /// Enable or disable rate limiting
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Load a CSV or Parquet export into the declarations table
    Import {
        /// Source file (.csv, .tsv or .parquet)
        file: PathBuf,
        /// Replace existing rows instead of appending
        #[arg(long)]
        replace: bool,
    },
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (warehouse, caches). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub password: Option<String>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub warehouse: Option<PathBuf>,
    pub table: Option<String>,
    pub row_limit: Option<u32>,
    pub query_timeout: Option<u64>,
    pub cache_max_entries: Option<u64>,
    pub reference_ttl: Option<u64>,
    pub oracle: Option<bool>,
    pub oracle_api_key: Option<String>,
    pub oracle_model: Option<String>,
    pub oracle_timeout: Option<u64>,
    pub rate_limit_enabled: Option<bool>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        no_auth: cli.no_auth,
        password: cli.password,
        debug: cli.debug,
        config: cli.config,
        warehouse: cli.warehouse,
        table: cli.table,
        row_limit: cli.row_limit,
        query_timeout: cli.query_timeout,
        cache_max_entries: cli.cache_max_entries,
        reference_ttl: cli.reference_ttl,
        oracle: cli.oracle,
        oracle_api_key: cli.oracle_api_key,
        oracle_model: cli.oracle_model,
        oracle_timeout: cli.oracle_timeout,
        rate_limit_enabled: cli.rate_limit_enabled,
    };
    (config, cli.command)
}
