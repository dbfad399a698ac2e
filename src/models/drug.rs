use bigdecimal::BigDecimal;
use serde::Serialize;

/// 参考药品目录条目 (只读快照)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceDrug {
    pub name: String,
    /// 标准单价; 缺失时价格规则不做比较
    #[serde(serialize_with = "super::decimal::serialize_opt")]
    pub unit_price: Option<BigDecimal>,
    pub formulation: String,
    pub strength: String,
    pub payer: String,
}

impl ReferenceDrug {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unit_price: None,
            formulation: String::new(),
            strength: String::new(),
            payer: String::new(),
        }
    }

    /// 匹配键 (小写 + 去空白)
    pub fn key(&self) -> String {
        canonical_key(&self.name)
    }
}

/// 药品名称的规范化匹配键
pub fn canonical_key(name: &str) -> String {
    name.trim().to_lowercase()
}
