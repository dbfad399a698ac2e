//! 原始记录规范化: 字段别名解析, 去空白, 数值宽松转换

use bigdecimal::{BigDecimal, Signed, Zero};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::models::{InvoiceLine, RawRecord, ReferenceDrug, RowWarning};

/// 每个逻辑字段可接受的字段名, 按优先级排列
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases {
    pub drug_name: &'static [&'static str],
    pub unit_price: &'static [&'static str],
    pub formulation: &'static [&'static str],
    pub strength: &'static [&'static str],
    pub payer: &'static [&'static str],
    pub quantity: &'static [&'static str],
}

/// 发票上传文件的列名
pub const INVOICE_ALIASES: FieldAliases = FieldAliases {
    drug_name: &["drugName", "drug_name", "Drug Name"],
    unit_price: &["standardUnitPrice", "unit_price", "Unit Price"],
    formulation: &["formulation", "Formulation"],
    strength: &["strength", "Strength"],
    payer: &["payer", "Payer"],
    quantity: &["quantity", "Quantity"],
};

/// 参考目录接口的字段名 (snake_case 与 camelCase 两套)
pub const REFERENCE_ALIASES: FieldAliases = FieldAliases {
    drug_name: &["name", "drugName"],
    unit_price: &["unit_price", "standardUnitPrice"],
    formulation: &["formulation"],
    strength: &["strength"],
    payer: &["payer"],
    quantity: &[],
};

/// 数值转换失败时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// 静默回退到默认值
    #[default]
    Lenient,
    /// 回退到默认值, 同时记录告警
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    policy: CoercionPolicy,
}

impl Normalizer {
    pub fn new(policy: CoercionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// 规范化单行发票; 从不失败
    pub fn invoice_line(
        &self,
        row: usize,
        raw: &RawRecord,
        warnings: &mut Vec<RowWarning>,
    ) -> InvoiceLine {
        let aliases = &INVOICE_ALIASES;
        let unit_price = match first_value(raw, aliases.unit_price) {
            None => BigDecimal::zero(),
            Some(value) => match parse_price(value) {
                Some(price) => price,
                None => {
                    self.warn(warnings, row, "unit_price", value, "unparseable price, using 0");
                    BigDecimal::zero()
                }
            },
        };
        let quantity = first_value(raw, aliases.quantity).and_then(|value| {
            let parsed = parse_decimal(value).filter(|q| q.is_positive());
            if parsed.is_none() {
                self.warn(warnings, row, "quantity", value, "quantity ignored");
            }
            parsed
        });

        InvoiceLine {
            drug_name: text_field(raw, aliases.drug_name),
            unit_price,
            formulation: text_field(raw, aliases.formulation),
            strength: text_field(raw, aliases.strength),
            payer: text_field(raw, aliases.payer),
            quantity,
        }
    }

    /// 规范化单条参考药品; 价格缺失或无效时为 None
    pub fn reference_drug(
        &self,
        row: usize,
        raw: &RawRecord,
        warnings: &mut Vec<RowWarning>,
    ) -> ReferenceDrug {
        let aliases = &REFERENCE_ALIASES;
        let unit_price = first_value(raw, aliases.unit_price).and_then(|value| {
            let parsed = parse_price(value);
            if parsed.is_none() {
                self.warn(warnings, row, "unit_price", value, "unparseable reference price");
            }
            parsed
        });

        ReferenceDrug {
            name: text_field(raw, aliases.drug_name),
            unit_price,
            formulation: text_field(raw, aliases.formulation),
            strength: text_field(raw, aliases.strength),
            payer: text_field(raw, aliases.payer),
        }
    }

    /// 规范化整批发票行, 丢弃没有药品名称的行
    pub fn invoice_lines(&self, rows: &[RawRecord]) -> (Vec<InvoiceLine>, Vec<RowWarning>) {
        let mut warnings = Vec::new();
        let mut lines = Vec::with_capacity(rows.len());
        for (row, raw) in rows.iter().enumerate() {
            let mut row_warnings = Vec::new();
            let line = self.invoice_line(row, raw, &mut row_warnings);
            if !line.has_name() {
                tracing::debug!("Invoice row {} has no drug name, skipping", row);
                if self.policy == CoercionPolicy::Strict {
                    warnings.push(RowWarning {
                        row,
                        field: "drug_name".to_string(),
                        value: String::new(),
                        message: "row has no drug name, skipped".to_string(),
                    });
                }
                continue;
            }
            warnings.append(&mut row_warnings);
            lines.push(line);
        }
        (lines, warnings)
    }

    pub fn reference_drugs(&self, rows: &[RawRecord]) -> (Vec<ReferenceDrug>, Vec<RowWarning>) {
        let mut warnings = Vec::new();
        let drugs = rows
            .iter()
            .enumerate()
            .map(|(row, raw)| self.reference_drug(row, raw, &mut warnings))
            .collect();
        (drugs, warnings)
    }

    fn warn(
        &self,
        warnings: &mut Vec<RowWarning>,
        row: usize,
        field: &str,
        value: &Value,
        message: &str,
    ) {
        if self.policy == CoercionPolicy::Strict {
            warnings.push(RowWarning {
                row,
                field: field.to_string(),
                value: value_text(value),
                message: message.to_string(),
            });
        }
    }
}

/// 按别名顺序取第一个非空值
fn first_value<'a>(raw: &'a RawRecord, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value_text(value).is_empty())
}

fn text_field(raw: &RawRecord, aliases: &[&str]) -> String {
    first_value(raw, aliases).map(value_text).unwrap_or_default()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// 数值文本的长度上限
const MAX_DECIMAL_TEXT_LEN: usize = 64;
/// 科学计数法指数的绝对值上限
const MAX_DECIMAL_EXPONENT: u64 = 20;
/// 价格保留的小数位
const PRICE_SCALE: i64 = 6;
/// 价格上限 (不含); 与 PRICE_SCALE 一起保证百分比落在 i64 范围内
const MAX_PRICE: i64 = 10_000_000_000;

fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => bounded_decimal(&n.to_string()),
        Value::String(s) => bounded_decimal(s),
        _ => None,
    }
}

/// 超长文本或指数过大的值按无法解析处理, 不交给 `BigDecimal::from_str`
fn bounded_decimal(text: &str) -> Option<BigDecimal> {
    let text = text.trim();
    if text.is_empty() || text.len() > MAX_DECIMAL_TEXT_LEN {
        return None;
    }
    if let Some((_, exponent)) = text.split_once(['e', 'E']) {
        let exponent: i64 = exponent.parse().ok()?;
        if exponent.unsigned_abs() > MAX_DECIMAL_EXPONENT {
            return None;
        }
    }
    BigDecimal::from_str(text).ok()
}

/// 价格: 非负, 小于 MAX_PRICE, 四舍五入到 PRICE_SCALE 位小数
fn parse_price(value: &Value) -> Option<BigDecimal> {
    parse_decimal(value)
        .filter(|p| !p.is_negative() && *p < BigDecimal::from(MAX_PRICE))
        .map(|p| p.round(PRICE_SCALE))
}
