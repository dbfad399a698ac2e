use bigdecimal::BigDecimal;

use crate::models::{InvoiceLine, RawRecord, RowWarning, ValidationResult, ValidationSummary};
use super::normalizer::{CoercionPolicy, Normalizer};
use super::reference_index::ReferenceIndex;
use super::rules;

/// 默认超额阈值 (百分比)
pub const DEFAULT_OVERCHARGE_THRESHOLD_PCT: u32 = 10;

/// 引擎参数
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub overcharge_threshold_pct: BigDecimal,
    pub coercion: CoercionPolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            overcharge_threshold_pct: BigDecimal::from(DEFAULT_OVERCHARGE_THRESHOLD_PCT),
            coercion: CoercionPolicy::Lenient,
        }
    }
}

/// 发票差异校验引擎
///
/// 同步、无状态: 每次调用只依赖传入的发票与参考索引, 可被多个请求并发共享。
#[derive(Debug, Clone, Default)]
pub struct AuditEngine {
    options: EngineOptions,
}

impl AuditEngine {
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn normalizer(&self) -> Normalizer {
        Normalizer::new(self.options.coercion)
    }

    /// 规范化上传的发票行 (丢弃无药品名称的行)
    pub fn normalize_invoice(&self, rows: &[RawRecord]) -> (Vec<InvoiceLine>, Vec<RowWarning>) {
        self.normalizer().invoice_lines(rows)
    }

    /// 规范化参考目录并构建索引
    pub fn build_index(&self, rows: &[RawRecord]) -> (ReferenceIndex, Vec<RowWarning>) {
        let (drugs, warnings) = self.normalizer().reference_drugs(rows);
        (ReferenceIndex::build(drugs), warnings)
    }

    /// 逐行执行规则; `total_drugs` 为传入行数
    pub fn validate(&self, lines: &[InvoiceLine], index: &ReferenceIndex) -> ValidationResult {
        let threshold = &self.options.overcharge_threshold_pct;
        let discrepancies: Vec<_> = lines
            .iter()
            .flat_map(|line| rules::evaluate(line, index, threshold))
            .collect();
        let summary = ValidationSummary::from_discrepancies(lines.len(), &discrepancies);

        tracing::info!(
            "校验完成: 发票行: {}, 参考药品: {}, 差异: {} (价格 {}, 剂型 {}, 规格 {}, 支付方 {})",
            summary.total_drugs,
            index.len(),
            summary.total_discrepancies,
            summary.price_discrepancies,
            summary.formulation_discrepancies,
            summary.strength_discrepancies,
            summary.payer_discrepancies
        );

        ValidationResult {
            discrepancies,
            summary,
            warnings: Vec::new(),
        }
    }

    /// 从原始记录开始的完整流程
    pub fn validate_records(
        &self,
        invoice_rows: &[RawRecord],
        reference_rows: &[RawRecord],
    ) -> ValidationResult {
        let (index, reference_warnings) = self.build_index(reference_rows);
        self.validate_rows_against(invoice_rows, &index)
            .with_warnings(reference_warnings)
    }

    /// 原始发票记录对已构建的索引校验
    pub fn validate_rows_against(
        &self,
        invoice_rows: &[RawRecord],
        index: &ReferenceIndex,
    ) -> ValidationResult {
        let (lines, warnings) = self.normalize_invoice(invoice_rows);
        self.validate(&lines, index).with_warnings(warnings)
    }
}
