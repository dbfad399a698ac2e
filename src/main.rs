use pharmacy_invoice_audit::api::{self, AppState};
use pharmacy_invoice_audit::source::{catalog, CachedCatalog};
use pharmacy_invoice_audit::{AppConfig, AuditEngine};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志 - 使用本地时间格式
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    // 加载配置
    let config = AppConfig::load()?;
    info!("Starting server with config: {:?}", config);

    // 校验引擎 + 参考目录
    let engine = Arc::new(AuditEngine::new(config.engine.options()));
    let source = catalog::from_config(&config.catalog)?;
    let catalog = Arc::new(CachedCatalog::new(
        source,
        engine.normalizer(),
        Duration::from_secs(config.catalog.cache_ttl_secs),
    ));
    info!("Reference catalog source: {:?}", config.catalog.source);

    let app = api::router(AppState { engine, catalog });

    // 启动服务器
    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);
    info!("API Endpoints:");
    info!("  POST /api/upload-invoice   - multipart upload (field `invoice`)");
    info!("  POST /api/validate         - pre-decoded rows");
    info!("  GET  /api/reference-drugs  - normalized reference catalog");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
