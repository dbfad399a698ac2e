use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};

/// 差异类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyType {
    Price,
    Formulation,
    Strength,
    Payer,
}

impl DiscrepancyType {
    pub const ALL: [DiscrepancyType; 4] = [
        DiscrepancyType::Price,
        DiscrepancyType::Formulation,
        DiscrepancyType::Strength,
        DiscrepancyType::Payer,
    ];
}

/// 差异中记录的字段值: 价格按数字输出, 其余按文本输出
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[serde(serialize_with = "super::decimal::serialize")]
    Price(BigDecimal),
    Text(String),
}

/// 参考侧的值; `Unmatched` 只在输出时写成 "N/A"
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceValue {
    Matched(FieldValue),
    Unmatched,
}

impl ReferenceValue {
    pub const UNMATCHED_SENTINEL: &'static str = "N/A";

    pub fn is_unmatched(&self) -> bool {
        matches!(self, ReferenceValue::Unmatched)
    }
}

impl Serialize for ReferenceValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ReferenceValue::Matched(value) => value.serialize(serializer),
            ReferenceValue::Unmatched => serializer.serialize_str(Self::UNMATCHED_SENTINEL),
        }
    }
}

/// 单条差异记录, 由规则创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub drug_name: String,
    #[serde(rename = "type")]
    pub kind: DiscrepancyType,
    pub invoice_value: FieldValue,
    pub reference_value: ReferenceValue,
    pub message: String,
    /// 仅价格差异有百分比
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
}
