pub mod engine;
pub mod normalizer;
pub mod reference_index;
pub mod rules;

pub use engine::{AuditEngine, EngineOptions};
pub use normalizer::{CoercionPolicy, FieldAliases, Normalizer};
pub use reference_index::ReferenceIndex;

use crate::models::{RawRecord, ValidationResult};

/// 使用默认参数校验发票: `validate(invoice, reference) -> {discrepancies, summary}`
pub fn validate(invoice_rows: &[RawRecord], reference_rows: &[RawRecord]) -> ValidationResult {
    AuditEngine::default().validate_records(invoice_rows, reference_rows)
}
