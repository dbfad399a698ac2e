use std::path::PathBuf;
use thiserror::Error;

/// 发票文件解码失败 (整批不可读)
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported invoice format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of row objects")]
    NotAnArray,

    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("spreadsheet has no worksheets")]
    EmptyWorkbook,
}

/// 参考药品目录获取失败
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reference catalog request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("failed to read reference catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed reference catalog payload: {0}")]
    Malformed(String),
}

/// 单次校验请求的错误
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("No file uploaded")]
    MissingUpload,

    #[error("invalid upload: {0}")]
    Upload(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("No valid data found in invoice file")]
    EmptyInvoice,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
