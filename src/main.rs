use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use clickrelay::api;
use clickrelay::auth::AuthService;
use clickrelay::config::Config;
use clickrelay::context::ContextOptions;
use clickrelay::site::{self, SiteState};
use clickrelay::storage::{self, CachedStorage, Storage};
use clickrelay::tracking::{DiagnosticLog, GraphApiClient, Relay};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clickrelay=info,tower_http=info".into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    let database = storage::connect(&config.database).await?;
    info!("Database initialized successfully");

    let storage: Arc<dyn Storage> = Arc::new(CachedStorage::new(
        database,
        config.tracking.settings_cache_ttl_secs,
    ));

    // Initialize auth service
    let auth_service = Arc::new(AuthService::from_config(&config.auth));
    if auth_service.is_enabled() {
        info!("🔐 Admin API requires an X-API-Key header");
    } else {
        info!("🔓 Authentication is disabled - all admin API requests are allowed");
    }

    // Conversion relay
    let diagnostics = DiagnosticLog::new(config.tracking.diagnostic_log_path.clone());
    let graph_client = GraphApiClient::from_config(&config.tracking)?;
    let relay = Relay::new(
        Arc::clone(&storage),
        Arc::new(graph_client),
        diagnostics.clone(),
    );

    let site_state = Arc::new(SiteState {
        storage: Arc::clone(&storage),
        relay,
        diagnostics,
        context_options: ContextOptions {
            proxy: config.proxy.clone(),
            admin_path_prefix: config.tracking.admin_path_prefix.clone(),
        },
        conversion_paths: config.tracking.conversion_paths.clone(),
        order_received_path: config.tracking.order_received_path.clone(),
    });

    info!(
        "🎯 Conversion marker renders on: {}",
        config.tracking.conversion_paths.join(", ")
    );
    if let Some(path) = &config.tracking.order_received_path {
        info!("🛒 Order confirmations (when e-commerce is enabled): {}/<order id>", path);
    }
    if let Some(path) = &config.tracking.diagnostic_log_path {
        info!("📝 Diagnostic log (when enabled in settings): {}", path.display());
    }

    // Create routers
    let api_router = api::create_api_router(Arc::clone(&storage), auth_service);
    let site_router = site::create_site_router(site_state);

    // Start API server
    let api_addr = format!("{}:{}", config.api_server.host, config.api_server.port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr).await?;
    info!("🚀 Admin API listening on http://{}", api_addr);

    // Start site server
    let site_addr = format!("{}:{}", config.site_server.host, config.site_server.port);
    let site_listener = tokio::net::TcpListener::bind(&site_addr).await?;
    info!("🚀 Site server listening on http://{}", site_addr);

    // Run both servers concurrently
    tokio::try_join!(
        axum::serve(api_listener, api_router),
        axum::serve(
            site_listener,
            site_router.into_make_service_with_connect_info::<SocketAddr>()
        ),
    )?;

    Ok(())
}
