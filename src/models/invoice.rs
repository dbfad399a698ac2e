use bigdecimal::BigDecimal;
use serde::Serialize;

/// 发票明细行 (上传文件中的一行)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub drug_name: String,
    /// 单价; 无法解析时为 0
    #[serde(serialize_with = "super::decimal::serialize")]
    pub unit_price: BigDecimal,
    pub formulation: String,
    pub strength: String,
    pub payer: String,
    #[serde(
        serialize_with = "super::decimal::serialize_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub quantity: Option<BigDecimal>,
}

impl InvoiceLine {
    pub fn new(drug_name: impl Into<String>, unit_price: BigDecimal) -> Self {
        Self {
            drug_name: drug_name.into(),
            unit_price,
            formulation: String::new(),
            strength: String::new(),
            payer: String::new(),
            quantity: None,
        }
    }

    /// 药品名称为空的行无法参与匹配
    pub fn has_name(&self) -> bool {
        !self.drug_name.trim().is_empty()
    }
}
