use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub midtrans: MidtransConfig,
    #[serde(default)]
    pub ipaymu: IpaymuConfig,
    #[serde(default)]
    pub membership: MembershipConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public base URL of this API, used to build webhook notify URLs.
    pub base_url: String,
    /// Where buyers land after paying (gateway return/cancel pages).
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// Redis URL; when absent the in-process cache is used instead.
    pub url: Option<String>,
    /// How long a pending checkout may sit unsettled before it expires.
    pub intent_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            intent_ttl_seconds: 7200,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MidtransConfig {
    #[serde(default)]
    pub enabled: bool,
    pub server_key: Option<String>,
    pub client_key: Option<String>,
    /// Core API base, e.g. https://api.sandbox.midtrans.com/v2
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct IpaymuConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Merchant virtual account number.
    pub va: Option<String>,
    pub api_key: Option<String>,
    /// e.g. https://sandbox.ipaymu.com/api/v2
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MembershipConfig {
    /// Password assigned to users created lazily at settlement time;
    /// they are expected to reset it on first login.
    pub default_password: String,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            default_password: "Password123!".to_string(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.base_url", "http://localhost:8080")?
            .set_default("server.frontend_url", "http://localhost:3000")?
            .set_default("database.max_connections", 10)?
            .set_default("cache.intent_ttl_seconds", 7200)?
            .set_default("midtrans.enabled", false)?
            .set_default("ipaymu.enabled", false)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with SANGGAR__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("SANGGAR").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                base_url: "http://localhost:8080".to_string(),
                frontend_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://sanggar.db".to_string(),
                max_connections: 10,
            },
            cache: CacheConfig::default(),
            midtrans: MidtransConfig::default(),
            ipaymu: IpaymuConfig::default(),
            membership: MembershipConfig::default(),
        }
    }
}
