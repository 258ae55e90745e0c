use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub site_server: ServerConfig,
    pub api_server: ServerConfig,
    pub auth: AuthConfig,
    pub tracking: TrackingConfig,
    pub proxy: ProxyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub enabled: bool,
    #[serde(default)]
    pub api_keys: Vec<String>,
}

/// Settings for the capture and relay pipeline that are fixed per deployment.
///
/// Per-site values (account id, token, event name, flags) live in the
/// database instead, see [`crate::models::Settings`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Base URL of the conversions API, without the version segment
    pub graph_api_base: String,
    pub graph_api_version: String,
    /// Timeout applied to the single outbound POST
    pub request_timeout_secs: u64,
    /// Append-only diagnostic log, written only while debug logging is on
    pub diagnostic_log_path: Option<PathBuf>,
    /// Page paths that render the conversion marker
    pub conversion_paths: Vec<String>,
    /// Order confirmation route prefix, active while e-commerce firing is on
    pub order_received_path: Option<String>,
    /// Requests under this prefix never capture or relay
    pub admin_path_prefix: String,
    pub settings_cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    /// Use the socket address as is
    None,
    /// Trust `CF-Connecting-IP`
    Cloudflare,
    /// Trust `Forwarded` / `X-Forwarded-For`
    Standard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub trusted_proxy_mode: TrustedProxyMode,
    #[serde(default)]
    pub trusted_proxies: Vec<IpNet>,
    #[serde(default)]
    pub num_trusted_proxies: Option<usize>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

impl TrackingConfig {
    pub const DEFAULT_GRAPH_API_BASE: &'static str = "https://graph.facebook.com";
    pub const DEFAULT_GRAPH_API_VERSION: &'static str = "v19.0";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            graph_api_base: Self::DEFAULT_GRAPH_API_BASE.to_string(),
            graph_api_version: Self::DEFAULT_GRAPH_API_VERSION.to_string(),
            request_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            diagnostic_log_path: None,
            conversion_paths: vec!["/thanks".to_string()],
            order_received_path: Some("/checkout/order-received".to_string()),
            admin_path_prefix: "/admin".to_string(),
            settings_cache_ttl_secs: 30,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
}

fn env_list(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./clickrelay.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let site_host = std::env::var("SITE_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let site_port = std::env::var("SITE_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let auth_enabled = env_flag("AUTH_ENABLED").unwrap_or(true);
        let api_keys = env_list("API_KEYS").unwrap_or_default();
        if auth_enabled && api_keys.is_empty() {
            tracing::warn!("AUTH_ENABLED is set but API_KEYS is empty; the admin API will reject every request");
        }

        let defaults = TrackingConfig::default();
        let request_timeout_secs = std::env::var("RELAY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let conversion_paths = env_list("CONVERSION_PATHS")
            .filter(|paths| !paths.is_empty())
            .unwrap_or(defaults.conversion_paths);

        let settings_cache_ttl_secs = std::env::var("SETTINGS_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults.settings_cache_ttl_secs);

        let tracking = TrackingConfig {
            graph_api_base: std::env::var("GRAPH_API_BASE").unwrap_or(defaults.graph_api_base),
            graph_api_version: std::env::var("GRAPH_API_VERSION")
                .unwrap_or(defaults.graph_api_version),
            request_timeout_secs,
            diagnostic_log_path: std::env::var("DIAGNOSTIC_LOG_PATH").ok().map(PathBuf::from),
            conversion_paths,
            // Set to an empty value to turn the route off
            order_received_path: match std::env::var("ORDER_RECEIVED_PATH") {
                Ok(path) => Some(path.trim().to_string()).filter(|p| !p.is_empty()),
                Err(_) => defaults.order_received_path,
            },
            admin_path_prefix: std::env::var("ADMIN_PATH_PREFIX")
                .unwrap_or(defaults.admin_path_prefix),
            settings_cache_ttl_secs,
        };

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            "standard" => TrustedProxyMode::Standard,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, cloudflare, standard"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = env_list("TRUSTED_PROXIES")
            .unwrap_or_default()
            .iter()
            .map(|cidr| {
                cidr.parse::<IpNet>()
                    .with_context(|| format!("invalid CIDR in TRUSTED_PROXIES: {cidr}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .map(|v| v.parse::<usize>())
            .transpose()
            .context("NUM_TRUSTED_PROXIES must be a non-negative integer")?;

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            site_server: ServerConfig {
                host: site_host,
                port: site_port,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            auth: AuthConfig {
                enabled: auth_enabled,
                api_keys,
            },
            tracking,
            proxy: ProxyConfig {
                trusted_proxy_mode,
                trusted_proxies,
                num_trusted_proxies,
            },
        })
    }
}
