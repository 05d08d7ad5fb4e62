use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub cache: CacheSettings,
    pub supabase: SupabaseSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub discover: DiscoverSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub redis_url: String,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
}

/// Hosted backend that still owns the geographic reference data
#[derive(Debug, Clone, Deserialize)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    pub password_pepper: String,
    pub admin_signup_key: Option<String>,
}

fn default_token_ttl() -> u64 { 604_800 }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverSettings {
    #[serde(default = "default_discover_limit")]
    pub default_limit: u16,
    #[serde(default = "default_discover_max_limit")]
    pub max_limit: u16,
    #[serde(default = "default_max_rate")]
    pub default_max_rate: u32,
}

impl Default for DiscoverSettings {
    fn default() -> Self {
        Self {
            default_limit: default_discover_limit(),
            max_limit: default_discover_max_limit(),
            default_max_rate: default_max_rate(),
        }
    }
}

fn default_discover_limit() -> u16 { 20 }
fn default_discover_max_limit() -> u16 { 100 }
fn default_max_rate() -> u32 { 1000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub weights: WeightsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightsConfig {
    #[serde(default = "default_specialty_weight")]
    pub specialty: f64,
    #[serde(default = "default_rating_weight")]
    pub rating: f64,
    #[serde(default = "default_experience_weight")]
    pub experience: f64,
    #[serde(default = "default_price_weight")]
    pub price: f64,
    #[serde(default = "default_popularity_weight")]
    pub popularity: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            specialty: default_specialty_weight(),
            rating: default_rating_weight(),
            experience: default_experience_weight(),
            price: default_price_weight(),
            popularity: default_popularity_weight(),
        }
    }
}

fn default_specialty_weight() -> f64 { 0.40 }
fn default_rating_weight() -> f64 { 0.25 }
fn default_experience_weight() -> f64 { 0.15 }
fn default_price_weight() -> f64 { 0.10 }
fn default_popularity_weight() -> f64 { 0.10 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Output format for the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Plain,
}

impl LogFormat {
    /// Unknown names fall back to plain text
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Plain,
        }
    }
}

impl LoggingSettings {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.format)
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with LEGALTENDR_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., LEGALTENDR__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("LEGALTENDR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = apply_env_overrides(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("LEGALTENDR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply the conventional unprefixed variables on top of the layered config
fn apply_env_overrides(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let overrides = [
        ("DATABASE_URL", "database.url"),
        ("REDIS_URL", "cache.redis_url"),
        ("SUPABASE_URL", "supabase.url"),
        ("SUPABASE_ANON_KEY", "supabase.anon_key"),
        ("JWT_SECRET", "auth.jwt_secret"),
        ("PASSWORD_PEPPER", "auth.password_pepper"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in overrides {
        if let Ok(value) = env::var(var) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
