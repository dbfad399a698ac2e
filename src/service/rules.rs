//! 逐字段差异规则。每条规则独立, 对一行发票最多产生一条差异。

use bigdecimal::{BigDecimal, Signed, ToPrimitive};

use crate::models::{
    Discrepancy, DiscrepancyType, FieldValue, InvoiceLine, ReferenceDrug, ReferenceValue,
};
use super::reference_index::ReferenceIndex;

pub const NOT_FOUND_MESSAGE: &str = "Drug not found in reference data";

/// 匹配规则的结果
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Matched(&'a ReferenceDrug),
    Unmatched,
    /// 药品名称为空, 整行跳过
    Skipped,
}

pub fn match_rule<'a>(line: &InvoiceLine, index: &'a ReferenceIndex) -> Lookup<'a> {
    if !line.has_name() {
        return Lookup::Skipped;
    }
    match index.lookup(&line.drug_name) {
        Some(reference) => Lookup::Matched(reference),
        None => Lookup::Unmatched,
    }
}

/// 未找到参考药品时的唯一差异
pub fn unmatched(line: &InvoiceLine) -> Discrepancy {
    Discrepancy {
        drug_name: line.drug_name.clone(),
        kind: DiscrepancyType::Price,
        invoice_value: FieldValue::Price(line.unit_price.clone()),
        reference_value: ReferenceValue::Unmatched,
        message: NOT_FOUND_MESSAGE.to_string(),
        percentage: None,
    }
}

/// 价格规则: 超出参考价 `threshold_pct` 以上 (严格大于) 时报告。
///
/// 参考价缺失或为 0 时无法计算百分比, 不产生差异。
pub fn price_rule(
    line: &InvoiceLine,
    reference: &ReferenceDrug,
    threshold_pct: &BigDecimal,
) -> Option<Discrepancy> {
    let reference_price = match &reference.unit_price {
        Some(price) if price.is_positive() => price,
        _ => {
            tracing::debug!(
                "Reference price for '{}' is missing or zero, price not checked",
                reference.name
            );
            return None;
        }
    };

    // diff / ref * 100 > threshold  <=>  diff * 100 > threshold * ref  (ref > 0)
    let excess = (&line.unit_price - reference_price) * BigDecimal::from(100);
    if excess <= threshold_pct * reference_price {
        return None;
    }

    let percentage = (&excess / reference_price).to_f64()?.round() as i64;
    Some(Discrepancy {
        drug_name: line.drug_name.clone(),
        kind: DiscrepancyType::Price,
        invoice_value: FieldValue::Price(line.unit_price.clone()),
        reference_value: ReferenceValue::Matched(FieldValue::Price(reference_price.clone())),
        message: format!("{}% overcharge", percentage),
        percentage: Some(percentage),
    })
}

pub fn formulation_rule(line: &InvoiceLine, reference: &ReferenceDrug) -> Option<Discrepancy> {
    text_rule(
        line,
        DiscrepancyType::Formulation,
        &line.formulation,
        &reference.formulation,
        "Formulation mismatch",
    )
}

pub fn strength_rule(line: &InvoiceLine, reference: &ReferenceDrug) -> Option<Discrepancy> {
    text_rule(
        line,
        DiscrepancyType::Strength,
        &line.strength,
        &reference.strength,
        "Strength mismatch",
    )
}

pub fn payer_rule(line: &InvoiceLine, reference: &ReferenceDrug) -> Option<Discrepancy> {
    text_rule(
        line,
        DiscrepancyType::Payer,
        &line.payer,
        &reference.payer,
        "Payer mismatch",
    )
}

/// 两侧都非空且不同 (忽略大小写/空白) 才算不一致
fn text_rule(
    line: &InvoiceLine,
    kind: DiscrepancyType,
    invoice_value: &str,
    reference_value: &str,
    message: &str,
) -> Option<Discrepancy> {
    let ours = invoice_value.trim().to_lowercase();
    let theirs = reference_value.trim().to_lowercase();
    if ours.is_empty() || theirs.is_empty() || ours == theirs {
        return None;
    }
    Some(Discrepancy {
        drug_name: line.drug_name.clone(),
        kind,
        invoice_value: FieldValue::Text(invoice_value.to_string()),
        reference_value: ReferenceValue::Matched(FieldValue::Text(reference_value.to_string())),
        message: message.to_string(),
        percentage: None,
    })
}

/// 按固定顺序执行: 匹配 -> 价格 -> 剂型 -> 规格 -> 支付方
pub fn evaluate(
    line: &InvoiceLine,
    index: &ReferenceIndex,
    threshold_pct: &BigDecimal,
) -> Vec<Discrepancy> {
    let reference = match match_rule(line, index) {
        Lookup::Matched(reference) => reference,
        Lookup::Unmatched => return vec![unmatched(line)],
        Lookup::Skipped => return Vec::new(),
    };

    [
        price_rule(line, reference, threshold_pct),
        formulation_rule(line, reference),
        strength_rule(line, reference),
        payer_rule(line, reference),
    ]
    .into_iter()
    .flatten()
    .collect()
}
