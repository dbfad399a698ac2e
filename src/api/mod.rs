pub mod handlers;

pub use handlers::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;

/// 上传大小上限
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/upload-invoice", post(upload_invoice))
        .route("/api/validate", post(validate_rows))
        .route("/api/reference-drugs", get(reference_drugs))
        .layer(ServiceBuilder::new().layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)))
        .with_state(state)
}
