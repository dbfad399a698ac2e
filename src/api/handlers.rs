use crate::error::{AuditError, DecodeError};
use crate::models::{RawRecord, ReferenceDrug, ValidationResult};
use crate::service::AuditEngine;
use crate::source::{decode_invoice, CachedCatalog, InvoiceFormat};
use axum::{
    extract::{Json, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 上传表单中的文件字段名
pub const UPLOAD_FIELD: &str = "invoice";

/// 共享状态: 校验引擎 + 参考目录
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuditEngine>,
    pub catalog: Arc<CachedCatalog>,
}

/// 请求体: 已解码的发票行, 可选地附带参考目录
#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub invoice: Vec<RawRecord>,
    #[serde(default)]
    pub reference: Option<Vec<RawRecord>>,
}

/// 校验响应体
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub success: bool,
    pub data: ValidationResult,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceDrugsResponse {
    pub success: bool,
    pub data: Vec<ReferenceDrug>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

/// 健康检查
pub async fn health_check() -> &'static str {
    "OK"
}

/// 上传发票文件 (multipart, 字段 `invoice`) 并校验
pub async fn upload_invoice(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ValidationResponse>, AuditError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AuditError::Upload(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AuditError::Upload(e.to_string()))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }
    let (file_name, content_type, bytes) = upload.ok_or(AuditError::MissingUpload)?;

    tracing::info!(
        "Invoice upload received: {} ({} bytes)",
        file_name.as_deref().unwrap_or("<unnamed>"),
        bytes.len()
    );
    let format = InvoiceFormat::detect(file_name.as_deref(), content_type.as_deref())?;
    let rows = decode_invoice(&bytes, format)?;
    validate_against_catalog(&state, &rows).await
}

/// 已解码的行直接校验; 未提供参考目录时使用配置的目录
pub async fn validate_rows(
    State(state): State<AppState>,
    Json(req): Json<ValidateRequest>,
) -> Result<Json<ValidationResponse>, AuditError> {
    match req.reference {
        Some(reference) => {
            let (lines, warnings) = state.engine.normalize_invoice(&req.invoice);
            if lines.is_empty() {
                return Err(AuditError::EmptyInvoice);
            }
            let (index, reference_warnings) = state.engine.build_index(&reference);
            let data = state
                .engine
                .validate(&lines, &index)
                .with_warnings(warnings)
                .with_warnings(reference_warnings);
            Ok(respond(data))
        }
        None => validate_against_catalog(&state, &req.invoice).await,
    }
}

/// 参考药品列表 (规范化后)
pub async fn reference_drugs(
    State(state): State<AppState>,
) -> Result<Json<ReferenceDrugsResponse>, AuditError> {
    let index = state.catalog.index().await?;
    Ok(Json(ReferenceDrugsResponse {
        success: true,
        data: index.iter().cloned().collect(),
    }))
}

async fn validate_against_catalog(
    state: &AppState,
    rows: &[RawRecord],
) -> Result<Json<ValidationResponse>, AuditError> {
    let (lines, warnings) = state.engine.normalize_invoice(rows);
    if lines.is_empty() {
        return Err(AuditError::EmptyInvoice);
    }
    // 先确认上传有效, 再访问参考目录
    let index = state.catalog.index().await?;
    let data = state.engine.validate(&lines, &index).with_warnings(warnings);
    Ok(respond(data))
}

fn respond(data: ValidationResult) -> Json<ValidationResponse> {
    Json(ValidationResponse {
        success: true,
        data,
        checked_at: Utc::now(),
    })
}

impl IntoResponse for AuditError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AuditError::MissingUpload | AuditError::Upload(_) | AuditError::EmptyInvoice => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AuditError::Decode(DecodeError::UnsupportedFormat(_)) => (
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Failed to parse invoice file".to_string(),
            ),
            AuditError::Decode(_) => (
                StatusCode::BAD_REQUEST,
                "Failed to parse invoice file".to_string(),
            ),
            AuditError::Catalog(_) => (
                StatusCode::BAD_GATEWAY,
                "Failed to fetch reference drugs".to_string(),
            ),
        };
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse {
            success: false,
            error,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
