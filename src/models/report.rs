use super::{Discrepancy, DiscrepancyType};
use serde::Serialize;

/// 汇总统计, 完全由差异集合推导
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_drugs: usize,
    pub total_discrepancies: usize,
    pub price_discrepancies: usize,
    pub formulation_discrepancies: usize,
    pub strength_discrepancies: usize,
    pub payer_discrepancies: usize,
}

impl ValidationSummary {
    pub fn from_discrepancies(total_drugs: usize, discrepancies: &[Discrepancy]) -> Self {
        let mut summary = Self {
            total_drugs,
            total_discrepancies: discrepancies.len(),
            ..Self::default()
        };
        for d in discrepancies {
            *summary.count_mut(d.kind) += 1;
        }
        summary
    }

    pub fn count_for(&self, kind: DiscrepancyType) -> usize {
        match kind {
            DiscrepancyType::Price => self.price_discrepancies,
            DiscrepancyType::Formulation => self.formulation_discrepancies,
            DiscrepancyType::Strength => self.strength_discrepancies,
            DiscrepancyType::Payer => self.payer_discrepancies,
        }
    }

    fn count_mut(&mut self, kind: DiscrepancyType) -> &mut usize {
        match kind {
            DiscrepancyType::Price => &mut self.price_discrepancies,
            DiscrepancyType::Formulation => &mut self.formulation_discrepancies,
            DiscrepancyType::Strength => &mut self.strength_discrepancies,
            DiscrepancyType::Payer => &mut self.payer_discrepancies,
        }
    }
}

/// 严格模式下记录的数值转换告警
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// 输入中的行序号 (从 0 开始)
    pub row: usize,
    pub field: String,
    pub value: String,
    pub message: String,
}

/// 校验结果: 差异列表 + 汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationResult {
    pub discrepancies: Vec<Discrepancy>,
    pub summary: ValidationSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RowWarning>,
}

impl ValidationResult {
    pub fn with_warnings(mut self, warnings: Vec<RowWarning>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}
