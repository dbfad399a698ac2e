//! 参考药品目录来源

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::config::{CatalogConfig, CatalogSource};
use crate::error::CatalogError;
use crate::models::RawRecord;
use crate::service::{Normalizer, ReferenceIndex};
use super::decoder::into_record;

/// 参考目录提供方: 一次性返回全部原始记录
#[async_trait]
pub trait ReferenceCatalog: Send + Sync {
    async fn fetch(&self) -> Result<Vec<RawRecord>, CatalogError>;
}

/// 远程 JSON 接口
#[derive(Debug, Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    url: String,
}

impl HttpCatalog {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReferenceCatalog for HttpCatalog {
    async fn fetch(&self) -> Result<Vec<RawRecord>, CatalogError> {
        tracing::debug!("Fetching reference catalog from {}", self.url);
        let payload: Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        records_from_payload(payload)
    }
}

/// 本地 JSON 文件
#[derive(Debug, Clone)]
pub struct FileCatalog {
    path: PathBuf,
}

impl FileCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ReferenceCatalog for FileCatalog {
    async fn fetch(&self) -> Result<Vec<RawRecord>, CatalogError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| CatalogError::Io {
                path: self.path.clone(),
                source,
            })?;
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|e| CatalogError::Malformed(e.to_string()))?;
        records_from_payload(payload)
    }
}

/// 内存中的固定目录
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    rows: Vec<RawRecord>,
}

impl StaticCatalog {
    pub fn new(rows: Vec<RawRecord>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl ReferenceCatalog for StaticCatalog {
    async fn fetch(&self) -> Result<Vec<RawRecord>, CatalogError> {
        Ok(self.rows.clone())
    }
}

/// 接受裸数组或 `{"data": [...]}`
fn records_from_payload(payload: Value) -> Result<Vec<RawRecord>, CatalogError> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(CatalogError::Malformed(
                    "expected an array of drugs".to_string(),
                ))
            }
        },
        _ => {
            return Err(CatalogError::Malformed(
                "expected an array of drugs".to_string(),
            ))
        }
    };
    Ok(items.into_iter().map(into_record).collect())
}

struct CachedIndex {
    index: Arc<ReferenceIndex>,
    fetched_at: Instant,
}

/// 带缓存的参考索引
///
/// 已构建的索引永不修改; 过期后整体替换 `Arc`, 进行中的校验继续使用旧索引。
pub struct CachedCatalog {
    inner: Arc<dyn ReferenceCatalog>,
    normalizer: Normalizer,
    ttl: Duration,
    slot: RwLock<Option<CachedIndex>>,
}

impl CachedCatalog {
    /// `ttl` 为 0 时每次都重新获取
    pub fn new(inner: Arc<dyn ReferenceCatalog>, normalizer: Normalizer, ttl: Duration) -> Self {
        Self {
            inner,
            normalizer,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub async fn index(&self) -> Result<Arc<ReferenceIndex>, CatalogError> {
        {
            let slot = self.slot.read().await;
            if let Some(index) = self.fresh(&slot) {
                return Ok(index);
            }
        }

        let mut slot = self.slot.write().await;
        if let Some(index) = self.fresh(&slot) {
            return Ok(index);
        }

        let rows = match self.inner.fetch().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Reference catalog unavailable: {}", e);
                return Err(e);
            }
        };
        let (drugs, warnings) = self.normalizer.reference_drugs(&rows);
        let index = Arc::new(ReferenceIndex::build(drugs));
        tracing::info!(
            "参考目录已加载: {} 条记录, {} 个药品, 重复 {}, 无名称 {}, 告警 {}",
            rows.len(),
            index.len(),
            index.duplicate_count(),
            index.skipped_count(),
            warnings.len()
        );

        *slot = Some(CachedIndex {
            index: Arc::clone(&index),
            fetched_at: Instant::now(),
        });
        Ok(index)
    }

    /// 丢弃缓存, 下次调用重新获取
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    fn fresh(&self, slot: &Option<CachedIndex>) -> Option<Arc<ReferenceIndex>> {
        slot.as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| Arc::clone(&cached.index))
    }
}

/// 根据配置创建目录来源
pub fn from_config(config: &CatalogConfig) -> Result<Arc<dyn ReferenceCatalog>, CatalogError> {
    Ok(match config.source {
        CatalogSource::Http => Arc::new(HttpCatalog::new(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
        )?),
        CatalogSource::File => Arc::new(FileCatalog::new(&config.path)),
    })
}
