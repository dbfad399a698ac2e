pub mod decimal;
pub mod discrepancy;
pub mod drug;
pub mod invoice;
pub mod report;

pub use discrepancy::{Discrepancy, DiscrepancyType, FieldValue, ReferenceValue};
pub use drug::{canonical_key, ReferenceDrug};
pub use invoice::InvoiceLine;
pub use report::{RowWarning, ValidationResult, ValidationSummary};

/// 解码后的原始记录: 字段名 -> 值, 字段名拼写不固定
pub type RawRecord = serde_json::Map<String, serde_json::Value>;
