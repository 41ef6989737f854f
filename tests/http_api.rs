use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use cellstore::storage::{ConnectionPool, PoolOptions};
use http_body_util::BodyExt;
use rust_xlsxwriter::Workbook;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const BOUNDARY: &str = "cellstore-test-boundary";

fn app() -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let pool = ConnectionPool::open(&dir.path().join("cells.db"), PoolOptions::default()).unwrap();
    (dir, cellstore::server::router(pool, 16 * 1024 * 1024))
}

fn sales_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("sheet1").unwrap();
    sheet.write_number(0, 0, 42.5).unwrap();
    sheet.write_string(0, 1, "North").unwrap();
    sheet.write_string(0, 2, "  ").unwrap();
    workbook.save_to_buffer().unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str) -> Request<Body> {
    Request::post(uri).body(Body::empty()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn upload(category: &str, filename: &str, content_type: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post(format!("/upload_file?category_name={}", category))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn create_sales(app: &Router) {
    let (status, _) = send(
        app,
        post("/create_category?category_name=Sales&region=EU&type=retail"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_category_returns_row_and_rejects_duplicates() {
    let (_dir, app) = app();

    let (status, body) = send(
        &app,
        post("/create_category?category_name=Sales&region=EU&type=retail"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["id"].as_i64().unwrap() > 0);
    assert_eq!(body["name"], "Sales");
    assert_eq!(body["region"], "EU");
    assert_eq!(body["type"], "retail");

    let (status, body) = send(
        &app,
        post("/create_category?category_name=Sales&region=US&type=other"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Category Sales exists"}));
}

#[tokio::test]
async fn create_category_validates_params() {
    let (_dir, app) = app();

    let (status, body) = send(&app, post("/create_category?category_name=Sales&region=EU")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "type is required");

    let long = "x".repeat(257);
    let (status, _) = send(
        &app,
        post(&format!("/create_category?category_name={}&region=EU&type=t", long)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_then_query() {
    let (_dir, app) = app();
    create_sales(&app).await;

    let (status, body) = send(&app, upload("Sales", "sales.xlsx", XLSX, &sales_workbook())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "filename": "sales.xlsx",
            "sheets": ["sheet1"],
            "float_values": 1,
            "str_values": 1,
        })
    );

    let (status, body) = send(&app, get("/sum_type?type=retail")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"sum": 42.5}));

    let (_, body) = send(&app, get("/sum_type?type=wholesale")).await;
    assert_eq!(body, json!({"sum": 0.0}));

    let (status, body) = send(&app, get("/find_regions?search_term=nORt")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"regions": ["EU"]}));

    let (_, body) = send(&app, get("/find_regions?search_term=42")).await;
    assert_eq!(body, json!({"regions": []}));
}

#[tokio::test]
async fn region_search_ignores_non_ascii_case() {
    let (_dir, app) = app();
    let (status, _) = send(
        &app,
        post("/create_category?category_name=Munich&region=DE&type=retail"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "MÜNCHEN Straße").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let (status, _) = send(&app, upload("Munich", "munich.xlsx", XLSX, &bytes)).await;
    assert_eq!(status, StatusCode::OK);

    // Percent-encoded "münchen" and "ü"
    let (_, body) = send(&app, get("/find_regions?search_term=m%C3%BCnchen")).await;
    assert_eq!(body, json!({"regions": ["DE"]}));
    let (_, body) = send(&app, get("/find_regions?search_term=%C3%BC")).await;
    assert_eq!(body, json!({"regions": ["DE"]}));
}

#[tokio::test]
async fn repeated_upload_doubles_the_sum() {
    let (_dir, app) = app();
    create_sales(&app).await;

    for _ in 0..2 {
        let (status, _) = send(&app, upload("Sales", "sales.xlsx", XLSX, &sales_workbook())).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get("/sum_type?type=retail")).await;
    assert_eq!(body, json!({"sum": 85.0}));
}

#[tokio::test]
async fn upload_failures_are_bad_requests() {
    let (_dir, app) = app();
    create_sales(&app).await;

    let (status, body) = send(&app, upload("Ghost", "a.xlsx", XLSX, &sales_workbook())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Category Ghost exists"}));

    let (status, body) = send(&app, upload("Sales", "a.csv", "text/csv", b"a,b")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Please upload an Excel file (.xlsx/.xls), not text/csv");

    let (status, body) = send(&app, upload("Sales", "a.xlsx", XLSX, b"")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty file");

    let (status, body) = send(&app, upload("Sales", "a.xlsx", XLSX, b"not a workbook")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .starts_with("Exception when parsing file")
    );

    // Nothing from the failed uploads is visible.
    let (_, body) = send(&app, get("/sum_type?type=retail")).await;
    assert_eq!(body, json!({"sum": 0.0}));
}

#[tokio::test]
async fn upload_requires_file_field() {
    let (_dir, app) = app();
    create_sales(&app).await;

    let request = Request::post("/upload_file?category_name=Sales")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(format!("--{}--\r\n", BOUNDARY)))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "file is required");

    let (status, _) = send(&app, post("/upload_file?category_name=Sales")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_search_term_is_rejected() {
    let (_dir, app) = app();
    let (status, _) = send(&app, get("/find_regions?search_term=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn concurrent_duplicate_creation_has_one_winner() {
    let (_dir, app) = app();

    let attempts = (0..6).map(|i| {
        let app = app.clone();
        tokio::spawn(async move {
            send(
                &app,
                post(&format!("/create_category?category_name=Race&region=R{}&type=t", i)),
            )
            .await
            .0
        })
    });

    let mut ok = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await.unwrap() {
            StatusCode::OK => ok += 1,
            status => assert_eq!(status, StatusCode::BAD_REQUEST),
        }
    }
    assert_eq!(ok, 1);
}

#[tokio::test]
async fn health_reports_ok() {
    let (_dir, app) = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}
