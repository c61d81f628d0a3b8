// Smoke suites against a mocked clinic API

use chrono::{NaiveDate, NaiveDateTime};
use clinickit_smoke::{
    ApiClient, Session, SmokeError, SuiteContext, run_exams, run_modules, run_system,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 10)
        .unwrap()
        .and_hms_opt(12, 30, 5)
        .unwrap()
}

fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_partial_json(json!({ "email": "ana@clinic.test" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "tok-123",
            "user": { "id": 4, "name": "Dr. Ana", "role": "admin", "tenant_id": 2 },
            "tenant": { "name": "Clínica Sorriso" }
        })))
        .mount(server)
        .await;
}

async fn logged_in(server: &MockServer) -> (ApiClient, Session) {
    mount_login(server).await;
    let mut client = ApiClient::new(&api_url(server)).unwrap();
    let session = client.login("ana@clinic.test", "secret").await.unwrap();
    (client, session)
}

async fn mount_json(server: &MockServer, verb: &str, route: &str, status: u16, body: serde_json::Value) {
    Mock::given(method(verb))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// POST answers 201 with the record under `key`, PUT on the record answers 200
async fn mount_crud(server: &MockServer, collection: &str, key: &str, id: i64) {
    mount_json(server, "POST", collection, 201, json!({ key: { "id": id } })).await;
    mount_json(server, "PUT", &format!("{}/{}", collection, id), 200, json!({})).await;
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_sets_bearer_token() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    assert_eq!(session.user.id, 4);
    assert_eq!(session.user.name, "Dr. Ana");
    assert_eq!(session.tenant.unwrap().name, "Clínica Sorriso");

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client.get("tasks", &[]).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_login_failure_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .mount(&server)
        .await;

    let mut client = ApiClient::new(&api_url(&server)).unwrap();
    match client.login("ana@clinic.test", "wrong").await {
        Err(SmokeError::LoginFailed { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid credentials");
        }
        other => panic!("expected login failure, got {:?}", other.map(|s| s.token)),
    }
}

// ============================================================================
// Module sweep
// ============================================================================

#[tokio::test]
async fn test_modules_records_failures_and_continues() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    // Patients: listed, edited and created
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .and(query_param("page", "1"))
        .and(query_param("page_size", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "patients": [{ "id": 1, "name": "Maria" }] })),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/patients/1"))
        .and(body_partial_json(json!({ "name": "Maria", "notes": "TEST EDITED - 12:30:05" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "POST", "/api/patients", 201, json!({ "patient": { "id": 11 } })).await;

    // Appointments: the listing fails, so nothing else is tried
    mount_json(&server, "GET", "/api/appointments", 500, json!({})).await;

    // Budgets: nothing to edit
    mount_json(&server, "GET", "/api/budgets", 200, json!({ "budgets": [] })).await;

    // Products: the edit is refused, the create succeeds
    mount_json(&server, "GET", "/api/products", 200, json!({ "products": [{ "id": 3 }] })).await;
    mount_json(&server, "PUT", "/api/products/3", 404, json!({})).await;
    mount_json(&server, "POST", "/api/products", 201, json!({ "product": { "id": 12 } })).await;

    // Tasks: stamped in the description
    mount_json(&server, "GET", "/api/tasks", 200, json!({ "tasks": [{ "id": 7 }] })).await;
    Mock::given(method("PUT"))
        .and(path("/api/tasks/7"))
        .and(body_partial_json(json!({ "description": "TEST EDITED - 12:30:05" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = SuiteContext::new(&client, &session).with_clock(fixed_clock);
    let report = run_modules(&ctx).await;

    assert_eq!(report.created.get("patients"), Some(&1));
    assert_eq!(report.created.get("products"), Some(&1));
    assert_eq!(report.total_created(), 2);
    assert_eq!(report.edited.get("patients"), Some(&1));
    assert_eq!(report.edited.get("tasks"), Some(&1));
    assert_eq!(report.total_edited(), 2);
    assert_eq!(
        report.errors,
        vec!["Appointments GET: 500".to_string(), "Product PUT 3: 404".to_string()]
    );
}

#[tokio::test]
async fn test_modules_books_appointment_for_listed_patient() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    mount_json(&server, "GET", "/api/patients", 200, json!({ "patients": [] })).await;
    mount_json(&server, "POST", "/api/patients", 201, json!({ "patient": { "id": 11 } })).await;
    mount_json(
        &server,
        "GET",
        "/api/appointments",
        200,
        json!({ "appointments": [{ "id": 20, "patient_id": 9 }] }),
    )
    .await;
    mount_json(&server, "PUT", "/api/appointments/20", 200, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_partial_json(json!({
            "patient_id": 9,
            "dentist_id": 4,
            "start_time": "2025-03-13T14:00:00Z"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "appointment": { "id": 21 } })))
        .expect(1)
        .mount(&server)
        .await;
    mount_json(&server, "GET", "/api/budgets", 200, json!({ "budgets": [] })).await;
    mount_json(&server, "GET", "/api/products", 200, json!({ "products": [] })).await;
    mount_json(&server, "POST", "/api/products", 201, json!({ "product": { "id": 12 } })).await;
    mount_json(&server, "GET", "/api/tasks", 200, json!({ "tasks": [] })).await;

    let ctx = SuiteContext::new(&client, &session).with_clock(fixed_clock);
    let report = run_modules(&ctx).await;

    assert!(report.is_clean(), "unexpected errors: {:?}", report.errors);
    assert_eq!(report.created.get("appointments"), Some(&1));
    assert_eq!(report.edited.get("appointments"), Some(&1));
}

// ============================================================================
// Complete system
// ============================================================================

#[tokio::test]
async fn test_system_chains_created_ids() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    mount_crud(&server, "/api/patients", "patient", 11).await;
    mount_crud(&server, "/api/tasks", "task", 13).await;
    mount_crud(&server, "/api/budgets", "budget", 15).await;
    mount_crud(&server, "/api/payments", "payment", 16).await;
    mount_crud(&server, "/api/products", "product", 17).await;
    mount_crud(&server, "/api/suppliers", "supplier", 18).await;
    mount_crud(&server, "/api/campaigns", "campaign", 19).await;
    mount_crud(&server, "/api/prescriptions", "prescription", 20).await;

    // Dependent modules must receive the created patient and product ids
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_partial_json(json!({ "patient_id": 11, "dentist_id": 4 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "appointment": { "id": 12 } })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/appointments/12"))
        .and(body_partial_json(json!({ "status": "confirmed" })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    // Medical records come back as the bare object
    mount_json(&server, "POST", "/api/medical-records", 201, json!({ "id": 14 })).await;
    mount_json(&server, "PUT", "/api/medical-records/14", 200, json!({})).await;

    Mock::given(method("POST"))
        .and(path("/api/stock-movements"))
        .and(body_partial_json(json!({ "product_id": 17, "type": "entry" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "movement": { "id": 30 } })))
        .expect(1)
        .mount(&server)
        .await;

    let steps: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let steps_clone = steps.clone();
    let ctx = SuiteContext::new(&client, &session)
        .with_clock(fixed_clock)
        .with_progress_callback(Arc::new(move |step: &str| {
            steps_clone.lock().unwrap().push(step.to_string());
        }));

    let report = run_system(&ctx).await;

    assert!(report.is_clean(), "unexpected errors: {:?}", report.errors);
    assert!(report.skipped.is_empty());
    assert_eq!(report.total_created(), 11);
    assert_eq!(report.modules_tested(), 11);
    assert_eq!(report.total_edited(), 10);
    assert_eq!(report.edited.get("stock_movements"), None);

    let steps = steps.lock().unwrap();
    assert_eq!(steps.first().map(String::as_str), Some("patients"));
    assert_eq!(steps.last().map(String::as_str), Some("prescriptions"));
    assert_eq!(steps.len(), 11);
}

#[tokio::test]
async fn test_system_skips_modules_without_a_patient() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    mount_json(&server, "POST", "/api/patients", 422, json!({ "error": "cpf" })).await;
    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_partial_json(json!({ "assigned_to": [4], "due_date": "2025-03-15" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "task": { "id": 13 } })))
        .mount(&server)
        .await;
    mount_json(&server, "PUT", "/api/tasks/13", 200, json!({})).await;
    mount_crud(&server, "/api/payments", "payment", 16).await;
    mount_json(&server, "POST", "/api/products", 500, json!({})).await;
    mount_crud(&server, "/api/suppliers", "supplier", 18).await;
    mount_json(&server, "POST", "/api/campaigns", 201, json!({ "campaign": { "id": 19 } })).await;
    mount_json(&server, "PUT", "/api/campaigns/19", 403, json!({})).await;

    let ctx = SuiteContext::new(&client, &session).with_clock(fixed_clock);
    let report = run_system(&ctx).await;

    assert_eq!(
        report.errors,
        vec![
            "Patient POST: 422".to_string(),
            "Product POST: 500".to_string(),
            "Campaign PUT 19: 403".to_string(),
        ]
    );
    assert_eq!(
        report.skipped,
        vec![
            "appointments: no patient id".to_string(),
            "medical_records: no patient id".to_string(),
            "budgets: no patient id".to_string(),
            "stock_movements: no product id".to_string(),
            "prescriptions: no patient id".to_string(),
        ]
    );
    assert_eq!(report.total_created(), 4);
    assert_eq!(report.total_edited(), 3);
}

// ============================================================================
// Exam downloads
// ============================================================================

#[tokio::test]
async fn test_exams_checks_each_download() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/exams"))
        .and(query_param("patient_id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "exams": [
                { "id": 1, "name": "Raio X" },
                { "id": 2, "name": "Tomografia" },
                { "id": 3, "name": "Panorâmica" }
            ]
        })))
        .mount(&server)
        .await;

    for id in [1, 2] {
        mount_json(
            &server,
            "GET",
            &format!("/api/exams/{}/download", id),
            200,
            json!({ "download_url": format!("{}/files/{}.pdf", server.uri(), id), "expires_in": 3600 }),
        )
        .await;
    }
    mount_json(&server, "GET", "/api/exams/3/download", 404, json!({})).await;

    Mock::given(method("HEAD"))
        .and(path("/files/1.pdf"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/files/2.pdf"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ctx = SuiteContext::new(&client, &session);
    let report = run_exams(&ctx, 1).await;

    assert_eq!(report.accessible, 1);
    assert_eq!(
        report.errors,
        vec![
            "Exam #2: HTTP 403 fetching file".to_string(),
            "Exam #3: status 404 fetching download URL".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_exams_listing_failure_is_recorded() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;
    mount_json(&server, "GET", "/api/exams", 500, json!({})).await;

    let ctx = SuiteContext::new(&client, &session);
    let report = run_exams(&ctx, 7).await;

    assert_eq!(report.errors, vec!["Exams GET: 500".to_string()]);
    assert_eq!(report.accessible, 0);
}

#[tokio::test]
async fn test_exams_without_records_is_a_skip() {
    let server = MockServer::start().await;
    let (client, session) = logged_in(&server).await;
    mount_json(&server, "GET", "/api/exams", 200, json!({ "exams": [] })).await;

    let ctx = SuiteContext::new(&client, &session);
    let report = run_exams(&ctx, 1).await;

    assert!(report.is_clean());
    assert_eq!(report.skipped, vec!["no exams for patient 1".to_string()]);
}
