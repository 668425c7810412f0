//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheSettings, CatalogConfig, ClientConfig, HttpConfig, LogFormat, LoggingConfig,
    ServerConfig, SharedCacheSettings,
};
