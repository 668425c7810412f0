use std::time::Duration;

use serde::Deserialize;

use crate::infrastructure::cache::{CacheConfig, SharedCacheType};
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::ResourceCacheConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub cache: CacheSettings,
    pub http: HttpConfig,
    pub catalog: CatalogConfig,
    pub client: ClientConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Cache tiers and generation
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Lifetime of a generated entry
    pub entry_ttl_secs: u64,
    /// Local tier sizing
    pub max_capacity: u64,
    pub generation_timeout_secs: u64,
    pub shared: SharedCacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SharedCacheSettings {
    /// `none`, `in_memory` or `redis`
    pub backend: String,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub operation_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `Cache-Control: max-age` sent with every cached resource
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Artificial cost of each generation
    pub simulated_latency_ms: u64,
}

/// Settings for the `fetch` subcommand
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            entry_ttl_secs: 30,
            max_capacity: 10_000,
            generation_timeout_secs: 10,
            shared: SharedCacheSettings::default(),
        }
    }
}

impl Default for SharedCacheSettings {
    fn default() -> Self {
        Self {
            backend: "none".to_string(),
            redis_url: None,
            key_prefix: "catalog".to_string(),
            operation_timeout_ms: 250,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { max_age_secs: 10 }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/api/productlist".to_string(),
            timeout_secs: 10,
        }
    }
}

impl CacheSettings {
    /// Builds the tier factory configuration
    pub fn to_cache_config(&self) -> Result<CacheConfig, crate::domain::DomainError> {
        let shared_type: SharedCacheType = self.shared.backend.parse()?;

        let mut config = CacheConfig::local_only()
            .with_shared_type(shared_type)
            .with_key_prefix(self.shared.key_prefix.clone())
            .with_local_ttl(Duration::from_secs(self.entry_ttl_secs))
            .with_max_capacity(self.max_capacity)
            .with_operation_timeout(Duration::from_millis(self.shared.operation_timeout_ms));
        config.redis_url = self.shared.redis_url.clone();

        Ok(config)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Settings for the resource cache service
    pub fn resource_cache_config(&self) -> ResourceCacheConfig {
        ResourceCacheConfig::default()
            .with_entry_ttl(Duration::from_secs(self.cache.entry_ttl_secs))
            .with_max_age(Duration::from_secs(self.http.max_age_secs))
            .with_generation_timeout(Duration::from_secs(self.cache.generation_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.cache.entry_ttl_secs, 30);
        assert_eq!(config.cache.shared.backend, "none");
        assert_eq!(config.http.max_age_secs, 10);
        assert_eq!(config.client.timeout_secs, 10);
        assert!(config.observability.metrics.enabled);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"cache": {"shared": {"backend": "redis", "redis_url": "redis://cache:6379"}}}"#,
        )
        .unwrap();

        assert_eq!(config.cache.shared.backend, "redis");
        assert_eq!(config.cache.shared.key_prefix, "catalog");
        assert_eq!(config.cache.entry_ttl_secs, 30);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_to_cache_config() {
        let mut settings = CacheSettings::default();
        settings.shared.backend = "redis".to_string();
        settings.shared.redis_url = Some("redis://cache:6379".to_string());
        settings.entry_ttl_secs = 60;

        let config = settings.to_cache_config().unwrap();

        assert_eq!(config.shared_type, SharedCacheType::Redis);
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.key_prefix.as_deref(), Some("catalog"));
        assert_eq!(config.local_ttl, Duration::from_secs(60));
        assert_eq!(config.operation_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let mut settings = CacheSettings::default();
        settings.shared.backend = "memcached".to_string();

        assert!(settings.to_cache_config().is_err());
    }

    #[test]
    fn test_resource_cache_config() {
        let mut config = AppConfig::default();
        config.http.max_age_secs = 5;

        let resource = config.resource_cache_config();

        assert_eq!(resource.entry_ttl, Duration::from_secs(30));
        assert_eq!(resource.max_age, Duration::from_secs(5));
        assert_eq!(resource.generation_timeout, Duration::from_secs(10));
    }
}
