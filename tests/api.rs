//! HTTP surface tests driven through the router.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pharmacy_invoice_audit::api::{router, AppState};
use pharmacy_invoice_audit::models::RawRecord;
use pharmacy_invoice_audit::service::Normalizer;
use pharmacy_invoice_audit::source::{CachedCatalog, ReferenceCatalog, StaticCatalog};
use pharmacy_invoice_audit::{AuditEngine, CatalogError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "audit-test-boundary";

struct UnreachableCatalog;

#[async_trait]
impl ReferenceCatalog for UnreachableCatalog {
    async fn fetch(&self) -> Result<Vec<RawRecord>, CatalogError> {
        Err(CatalogError::Malformed("service down".into()))
    }
}

fn reference_rows() -> Vec<RawRecord> {
    serde_json::from_value(json!([
        { "name": "aspirin", "unit_price": 10, "formulation": "tablet", "strength": "500mg", "payer": "MedCare" },
        { "drugName": "Paracetamol", "standardUnitPrice": 5, "formulation": "tablet" }
    ]))
    .unwrap()
}

fn app_with(catalog: Arc<dyn ReferenceCatalog>) -> axum::Router {
    let catalog = CachedCatalog::new(catalog, Normalizer::default(), Duration::from_secs(60));
    router(AppState {
        engine: Arc::new(AuditEngine::default()),
        catalog: Arc::new(catalog),
    })
}

fn app() -> axum::Router {
    app_with(Arc::new(StaticCatalog::new(reference_rows())))
}

fn multipart_upload(field: &str, file_name: &str, content: &str) -> Request<Body> {
    multipart_bytes(field, file_name, content.as_bytes())
}

fn multipart_bytes(field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method("POST")
        .uri("/api/upload-invoice")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_check_responds_ok() {
    let response = app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn upload_csv_reports_discrepancies() {
    let csv = "Drug Name,Unit Price,Formulation,Strength,Payer\n\
               Aspirin,12,tablet,500mg,MedCare\n\
               Ibuprofen,8,tablet,200mg,MedCare\n\
               ,3,,,\n";
    let (status, body) = send(app(), multipart_upload("invoice", "invoice.csv", csv)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["checked_at"].is_string());

    let data = &body["data"];
    assert_eq!(
        data["discrepancies"],
        json!([
            {
                "drug_name": "Aspirin",
                "type": "price",
                "invoice_value": 12,
                "reference_value": 10,
                "message": "20% overcharge",
                "percentage": 20
            },
            {
                "drug_name": "Ibuprofen",
                "type": "price",
                "invoice_value": 8,
                "reference_value": "N/A",
                "message": "Drug not found in reference data"
            }
        ])
    );
    assert_eq!(
        data["summary"],
        json!({
            "total_drugs": 2,
            "total_discrepancies": 2,
            "price_discrepancies": 2,
            "formulation_discrepancies": 0,
            "strength_discrepancies": 0,
            "payer_discrepancies": 0
        })
    );
}

#[tokio::test]
async fn upload_without_invoice_field_is_rejected() {
    let (status, body) = send(app(), multipart_upload("other", "invoice.csv", "a,b\n")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No file uploaded");
}

#[tokio::test]
async fn upload_with_no_named_rows_is_rejected() {
    let csv = "drug_name,unit_price\n,12\n  ,3\n";
    let (status, body) = send(app(), multipart_upload("invoice", "invoice.csv", csv)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No valid data found in invoice file");
}

#[tokio::test]
async fn unreadable_upload_is_a_decode_failure() {
    let (status, body) =
        send(app(), multipart_upload("invoice", "invoice.json", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to parse invoice file");

    let (status, body) = send(app(), multipart_upload("invoice", "invoice.xlsx", "PK")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Failed to parse invoice file");

    let (status, _) = send(app(), multipart_upload("invoice", "invoice.pdf", "%PDF")).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn upload_xlsx_reports_discrepancies() {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in ["Drug Name", "Unit Price", "Formulation"].into_iter().enumerate() {
        sheet.write_string(0, col as u16, header).unwrap();
    }
    sheet.write_string(1, 0, "Aspirin").unwrap();
    sheet.write_number(1, 1, 12).unwrap();
    sheet.write_string(1, 2, "syrup").unwrap();
    sheet.write_string(2, 0, "Paracetamol").unwrap();
    sheet.write_number(2, 1, 5).unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let (status, body) = send(app(), multipart_bytes("invoice", "invoice.xlsx", &bytes)).await;
    assert_eq!(status, StatusCode::OK);
    let data = &body["data"];
    assert_eq!(data["summary"]["total_drugs"], 2);
    assert_eq!(data["summary"]["price_discrepancies"], 1);
    assert_eq!(data["summary"]["formulation_discrepancies"], 1);
    assert_eq!(data["discrepancies"][0]["message"], "20% overcharge");
}

#[tokio::test]
async fn catalog_failure_is_distinct_from_bad_upload() {
    let app = app_with(Arc::new(UnreachableCatalog));
    let csv = "drug_name,unit_price\nAspirin,12\n";
    let (status, body) = send(app, multipart_upload("invoice", "invoice.csv", csv)).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "Failed to fetch reference drugs");
    assert!(body["message"].as_str().unwrap().contains("service down"));
}

#[tokio::test]
async fn validate_rows_with_inline_reference() {
    let request = json_request(
        "/api/validate",
        json!({
            "invoice": [
                { "drug_name": "Aspirin", "unit_price": 10, "strength": "250mg" }
            ],
            "reference": [
                { "name": "ASPIRIN", "unit_price": 10, "strength": "500mg" }
            ]
        }),
    );
    let app = app_with(Arc::new(UnreachableCatalog));
    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let discrepancies = body["data"]["discrepancies"].as_array().unwrap();
    assert_eq!(discrepancies.len(), 1);
    assert_eq!(discrepancies[0]["type"], "strength");
    assert_eq!(discrepancies[0]["message"], "Strength mismatch");
    assert_eq!(discrepancies[0]["invoice_value"], "250mg");
    assert_eq!(discrepancies[0]["reference_value"], "500mg");
}

#[tokio::test]
async fn validate_rows_uses_configured_catalog() {
    let request = json_request(
        "/api/validate",
        json!({ "invoice": [{ "drugName": "paracetamol", "standardUnitPrice": "5.40" }] }),
    );
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["summary"]["total_drugs"], 1);
    assert_eq!(body["data"]["summary"]["total_discrepancies"], 0);
}

#[tokio::test]
async fn reference_drugs_lists_normalized_catalog() {
    let request = Request::get("/api/reference-drugs")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), request).await;
    assert_eq!(status, StatusCode::OK);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["name"], "aspirin");
    assert_eq!(data[1]["name"], "Paracetamol");
    assert_eq!(data[1]["unit_price"], 5);
    assert_eq!(data[1]["strength"], "");
}
