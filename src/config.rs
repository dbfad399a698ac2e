use bigdecimal::BigDecimal;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::service::{CoercionPolicy, EngineOptions};

/// 原服务使用的参考药品接口
pub const DEFAULT_CATALOG_URL: &str = "https://685daed17b57aebd2af6da54.mockapi.io/api/v1/drugs";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Http,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub source: CatalogSource,
    pub url: String,
    /// `source = "file"` 时读取的 JSON 文件
    pub path: String,
    pub timeout_secs: u64,
    /// 参考索引缓存时间, 0 表示不缓存
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub overcharge_threshold_pct: f64,
    pub strict_coercion: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3001,
            },
            catalog: CatalogConfig {
                source: CatalogSource::Http,
                url: DEFAULT_CATALOG_URL.to_string(),
                path: "reference_drugs.json".to_string(),
                timeout_secs: 10,
                cache_ttl_secs: 300,
            },
            engine: EngineConfig {
                overcharge_threshold_pct: 10.0,
                strict_coercion: false,
            },
        }
    }
}

impl AppConfig {
    /// 加载顺序: 默认值 -> `audit.toml` (可选) -> `AUDIT__*` 环境变量
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Config::builder().add_source(File::with_name("audit").required(false)))
    }

    fn load_from(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(builder.build()?)
            .add_source(
                Environment::with_prefix("AUDIT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.engine.validate()?;
        Ok(config)
    }
}

impl EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let pct = self.overcharge_threshold_pct;
        if !pct.is_finite() || pct < 0.0 {
            return Err(ConfigError::Message(format!(
                "engine.overcharge_threshold_pct must be a non-negative number, got {pct}"
            )));
        }
        Ok(())
    }

    pub fn options(&self) -> EngineOptions {
        let defaults = EngineOptions::default();
        EngineOptions {
            overcharge_threshold_pct: BigDecimal::from_str(&self.overcharge_threshold_pct.to_string())
                .unwrap_or(defaults.overcharge_threshold_pct),
            coercion: if self.strict_coercion {
                CoercionPolicy::Strict
            } else {
                CoercionPolicy::Lenient
            },
        }
    }
}
