//! Core application

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::api::{ApiServer, AuthManager};
use crate::core::banner::{self, BannerInfo};
use crate::core::cli::{self, CliConfig, Commands, SystemCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::cache::{CacheService, RateLimiter};
use crate::data::{DuckdbService, FileAccess, QueryEngine};
use crate::domain::filters::{CATALOG, QueryAssembler, TableName};
use crate::domain::oracle::Oracle;
use crate::domain::{SearchService, SessionStore};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub warehouse: Arc<DuckdbService>,
    pub cache: Arc<CacheService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth: Arc<AuthManager>,
    pub search: Arc<SearchService>,
    pub sessions: SessionStore,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::System {
                command: system_cmd,
            }) => Self::handle_system_command(system_cmd),
            Some(Commands::Import { file, replace }) => Self::import(&cli_config, &file, replace).await,
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn open_warehouse(
        config: &AppConfig,
        storage: &AppStorage,
        file_access: FileAccess,
    ) -> Result<Arc<DuckdbService>> {
        let table = TableName::parse(&config.warehouse.table)
            .context("Invalid warehouse table name")?;
        let path = storage.warehouse_path(config);
        let warehouse = DuckdbService::init(
            Some(&path),
            table,
            config.warehouse.query_timeout_secs,
            file_access,
        )
        .await
        .with_context(|| format!("Failed to open warehouse: {}", path.display()))?;
        Ok(Arc::new(warehouse))
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;
        let warehouse = Self::open_warehouse(&config, &storage, FileAccess::Disabled).await?;

        let cache = Arc::new(
            CacheService::new(&config.cache)
                .map_err(|e| anyhow::anyhow!("Failed to initialize cache service: {}", e))?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        let rate_limiter = Arc::new(RateLimiter::new(Arc::clone(&cache)));
        let auth = Arc::new(AuthManager::new(&config.auth));

        let oracle = Oracle::from_config(&config.oracle, warehouse.table().as_str())
            .context("Failed to initialize oracle client")?;
        let engine: Arc<dyn QueryEngine> = Arc::new(Arc::clone(&warehouse));
        let search = Arc::new(SearchService::new(
            engine,
            QueryAssembler::new(warehouse.table().clone(), config.warehouse.row_limit),
            Arc::clone(&cache),
            oracle,
            Duration::from_secs(config.cache.reference_ttl_secs),
        ));

        let shutdown = ShutdownService::new(Arc::clone(&warehouse));

        Ok(Self {
            shutdown,
            config,
            storage,
            warehouse,
            cache,
            rate_limiter,
            auth,
            search,
            sessions: SessionStore::default(),
        })
    }

    /// Load an export file into the declarations table
    async fn import(cli: &CliConfig, file: &Path, replace: bool) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;
        let warehouse = Self::open_warehouse(&config, &storage, FileAccess::Enabled).await?;

        let imported = warehouse
            .import(file, replace)
            .await
            .with_context(|| format!("Failed to import {}", file.display()))?;
        let total = warehouse.row_count().await?;
        warehouse.checkpoint().await?;
        warehouse.close().await?;

        println!(
            "Imported {} rows from {} ({} rows in {})",
            imported,
            file.display(),
            total,
            config.warehouse.table
        );
        Ok(())
    }

    fn handle_system_command(cmd: SystemCommands) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(yes),
        }
    }

    fn prune_data(skip_confirm: bool) -> Result<()> {
        let data_dir = AppStorage::resolve_data_dir();

        if !data_dir.exists() {
            println!(
                "Nothing to prune. Data directory does not exist: {}",
                data_dir.display()
            );
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting the warehouse while it is open will corrupt it."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        std::fs::remove_dir_all(&data_dir)
            .with_context(|| format!("Failed to delete data directory: {}", data_dir.display()))?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Before anything that can block
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        let rows = match app.warehouse.row_count().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to count declarations");
                0
            }
        };
        let data_dir = app.storage.data_dir().display().to_string();
        let warehouse = app.storage.warehouse_path(&app.config).display().to_string();
        banner::print_banner(&BannerInfo {
            host: &app.config.server.host,
            port: app.config.server.port,
            auth_enabled: app.auth.is_enabled(),
            oracle_enabled: app.search.oracle_enabled(),
            data_dir: &data_dir,
            warehouse: &warehouse,
            table: &app.config.warehouse.table,
            rows,
        });

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown.register(self.start_options_warmup()).await;
        tracing::debug!("Background tasks started");
    }

    /// Fill the option list cache for every categorical filter
    fn start_options_warmup(&self) -> JoinHandle<()> {
        let search = Arc::clone(&self.search);
        let mut shutdown_rx = self.shutdown.subscribe();

        tokio::spawn(async move {
            for spec in CATALOG.iter().filter(|spec| spec.kind.is_categorical()) {
                if *shutdown_rx.borrow() {
                    return;
                }
                tokio::select! {
                    _ = shutdown_rx.changed() => return,
                    result = search.options(spec.key) => {
                        if let Err(e) = result {
                            tracing::warn!(filter = spec.key, error = %e, "Filter options warm-up failed");
                        }
                    }
                }
            }
            tracing::debug!("Filter options warmed up");
        })
    }
}
