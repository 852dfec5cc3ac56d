//! End-to-end API tests
//!
//! The full router runs over in-memory adapters and a scripted gateway,
//! so these cover auth, role enforcement, and the JSON surface without
//! PostgreSQL or a network.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use core_kernel::{ClassroomId, StudentId, TenantId, Term};
use domain_fees::{FeeCategory, FeeScheduleEntry, Invoice};
use domain_payments::GatewayPaymentStatus;
use interface_api::auth::{create_token, roles};
use interface_api::config::ApiConfig;
use interface_api::{create_router, AppState, Dependencies};
use test_utils::{
    owing_invoice, school_day, session, term_fee, AlwaysHealthy, CapturingReportChannel,
    MemoryCashCountStore, MemoryFeeCatalog, MemoryInvoiceStore, MemorySessionStore,
    MemoryStatementStore, MemoryStudentDirectory, MemoryTransactionStore, ScriptedGateway,
};

const JWT_SECRET: &str = "test-secret";

struct TestApp {
    server: TestServer,
    tenant: TenantId,
    students: Arc<MemoryStudentDirectory>,
    catalog: Arc<MemoryFeeCatalog>,
    invoices: Arc<MemoryInvoiceStore>,
    gateway: Arc<ScriptedGateway>,
    reports: Arc<CapturingReportChannel>,
}

impl TestApp {
    fn spawn() -> Self {
        let students = Arc::new(MemoryStudentDirectory::default());
        let catalog = Arc::new(MemoryFeeCatalog::default());
        let invoices = Arc::new(MemoryInvoiceStore::default());
        let transactions = Arc::new(MemoryTransactionStore::new(invoices.clone()));
        let gateway = Arc::new(ScriptedGateway::default());
        let reports = Arc::new(CapturingReportChannel::default());

        let config = ApiConfig {
            jwt_secret: JWT_SECRET.to_string(),
            ..ApiConfig::default()
        };

        let deps = Dependencies {
            students: students.clone(),
            catalog: catalog.clone(),
            invoices: invoices.clone(),
            transactions: transactions.clone(),
            gateway: gateway.clone(),
            sessions: Arc::new(MemorySessionStore::default()),
            cash_counts: Arc::new(MemoryCashCountStore::default()),
            statements: Arc::new(MemoryStatementStore::default()),
            settled: transactions.clone(),
            reports: reports.clone(),
            health: Arc::new(AlwaysHealthy),
        };

        let server = TestServer::new(create_router(AppState::new(deps, config))).unwrap();

        Self {
            server,
            tenant: TenantId::new(),
            students,
            catalog,
            invoices,
            gateway,
            reports,
        }
    }

    fn token(&self, role: &str) -> String {
        create_token("user-1", self.tenant, vec![role.to_string()], JWT_SECRET, 3600).unwrap()
    }

    /// Seeds a student with a class and an 85,000 tuition schedule entry
    fn seed_roster(&self) -> StudentId {
        let student = StudentId::new();
        let classroom = ClassroomId::new();
        self.students.seed(self.tenant, student, Some(classroom));

        let tuition = FeeCategory::mandatory(self.tenant, "Tuition");
        self.catalog.seed(FeeScheduleEntry::new(
            &tuition,
            classroom,
            Term::First,
            session(),
            term_fee(),
        ));
        student
    }

    /// Seeds an unpaid invoice directly, skipping generation
    fn seed_invoice(&self) -> Invoice {
        let invoice = owing_invoice(self.tenant, StudentId::new());
        self.invoices.seed(invoice.clone());
        invoice
    }
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::spawn();

    let response = app
        .server
        .get(&format!("/api/v1/invoices/{}", uuid::Uuid::new_v4()))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn viewer_cannot_generate_invoices() {
    let app = TestApp::spawn();

    let response = app
        .server
        .post("/api/v1/invoices/generate")
        .authorization_bearer(app.token(roles::VIEWER))
        .json(&json!({ "term": "first", "session": "2025/2026" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoints_are_public() {
    let app = TestApp::spawn();

    app.server.get("/health").await.assert_status_ok();
    app.server.get("/health/ready").await.assert_status_ok();
}

// ============================================================================
// Invoices
// ============================================================================

#[tokio::test]
async fn generation_is_idempotent_over_http() {
    let app = TestApp::spawn();
    let student = app.seed_roster();
    let token = app.token(roles::BURSAR);
    let body = json!({ "term": "first", "session": "2025/2026" });

    let first = app
        .server
        .post("/api/v1/invoices/generate")
        .authorization_bearer(&token)
        .json(&body)
        .await;
    first.assert_status(StatusCode::CREATED);
    let summary: Value = first.json();
    assert_eq!(summary["generated"], 1);
    assert_eq!(summary["already_billed"], 0);

    let second = app
        .server
        .post("/api/v1/invoices/generate")
        .authorization_bearer(&token)
        .json(&body)
        .await;
    second.assert_status(StatusCode::CREATED);
    let summary: Value = second.json();
    assert_eq!(summary["generated"], 0);
    assert_eq!(summary["already_billed"], 1);

    let invoices: Value = app
        .server
        .get(&format!("/api/v1/students/{}/invoices", student))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(invoices.as_array().unwrap().len(), 1);
    assert_eq!(invoices[0]["status"], "owing");
    assert_eq!(invoices[0]["amount"]["amount"], "85000");
}

#[tokio::test]
async fn invalid_session_string_is_rejected() {
    let app = TestApp::spawn();

    let response = app
        .server
        .post("/api/v1/invoices/generate")
        .authorization_bearer(app.token(roles::BURSAR))
        .json(&json!({ "term": "first", "session": "2025-2026" }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

// ============================================================================
// Payments
// ============================================================================

#[tokio::test]
async fn manual_payment_updates_status_and_unlocks_results() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();
    let token = app.token(roles::BURSAR);

    let response = app
        .server
        .post("/api/v1/payments")
        .authorization_bearer(&token)
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "amount": "85000",
            "method": "cash",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["invoice"]["status"], "paid");
    assert_eq!(body["transaction"]["status"], "success");
    assert_eq!(body["transaction"]["recorded_by"], "user-1");

    let access: Value = app
        .server
        .get(&format!("/api/v1/students/{}/access", invoice.student_id))
        .authorization_bearer(&token)
        .add_query_param("term", "first")
        .add_query_param("session", "2025/2026")
        .await
        .json();
    assert_eq!(access["unlocked"], true);
}

#[tokio::test]
async fn overpayment_is_rejected_with_validation_error() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();

    let response = app
        .server
        .post("/api/v1/payments")
        .authorization_bearer(app.token(roles::BURSAR))
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "amount": "90000",
            "method": "bank_transfer",
        }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn webhook_double_delivery_credits_once() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();

    let checkout = app
        .server
        .post("/api/v1/payments/checkout")
        .authorization_bearer(app.token(roles::VIEWER))
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "email": "parent@example.com",
        }))
        .await;
    checkout.assert_status(StatusCode::CREATED);
    let reference = checkout.json::<Value>()["reference"]
        .as_str()
        .unwrap()
        .to_string();

    app.gateway.script(&reference, GatewayPaymentStatus::Success);
    let event = json!({ "event": "charge.success", "data": { "reference": reference } });

    app.server
        .post("/webhooks/gateway")
        .json(&event)
        .await
        .assert_status_ok();
    app.server
        .post("/webhooks/gateway")
        .json(&event)
        .await
        .assert_status_ok();

    let updated: Value = app
        .server
        .get(&format!("/api/v1/invoices/{}", invoice.id.as_uuid()))
        .authorization_bearer(app.token(roles::VIEWER))
        .await
        .json();
    assert_eq!(updated["status"], "paid");
    assert_eq!(updated["amount_paid"]["amount"], "85000");
}

#[tokio::test]
async fn webhook_for_unknown_reference_is_not_found() {
    let app = TestApp::spawn();

    let response = app
        .server
        .post("/webhooks/gateway")
        .json(&json!({ "event": "charge.success", "data": { "reference": "FEE-nope" } }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verify_is_scoped_to_the_callers_tenant() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();

    let checkout = app
        .server
        .post("/api/v1/payments/checkout")
        .authorization_bearer(app.token(roles::BURSAR))
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "email": "parent@example.com",
        }))
        .await;
    let reference = checkout.json::<Value>()["reference"]
        .as_str()
        .unwrap()
        .to_string();

    // Same reference, token for a different school
    let other_tenant =
        create_token("intruder", TenantId::new(), vec![roles::ADMIN.to_string()], JWT_SECRET, 3600)
            .unwrap();
    let response = app
        .server
        .post(&format!("/api/v1/payments/{reference}/verify"))
        .authorization_bearer(other_tenant)
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn abandoned_checkout_stays_pending_on_verify() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();
    let token = app.token(roles::BURSAR);

    let checkout = app
        .server
        .post("/api/v1/payments/checkout")
        .authorization_bearer(&token)
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "email": "parent@example.com",
        }))
        .await;
    let reference = checkout.json::<Value>()["reference"]
        .as_str()
        .unwrap()
        .to_string();

    // Nothing scripted: the gateway reports the checkout abandoned
    let outcome: Value = app
        .server
        .post(&format!("/api/v1/payments/{reference}/verify"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(outcome["outcome"], "still_pending");

    let transactions: Value = app
        .server
        .get(&format!("/api/v1/invoices/{}/transactions", invoice.id.as_uuid()))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(transactions[0]["status"], "pending");
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn day_close_flow_and_conflict_after_close() {
    let app = TestApp::spawn();
    let invoice = app.seed_invoice();
    let token = app.token(roles::BURSAR);

    // One settled cash payment for the day
    app.server
        .post("/api/v1/payments")
        .authorization_bearer(&token)
        .json(&json!({
            "invoice_id": invoice.id.as_uuid(),
            "amount": "50000",
            "method": "cash",
        }))
        .await
        .assert_status(StatusCode::CREATED);

    let today = chrono::Utc::now().date_naive();
    let opened = app
        .server
        .post("/api/v1/reconciliation/sessions")
        .authorization_bearer(&token)
        .json(&json!({ "date": today }))
        .await;
    opened.assert_status(StatusCode::CREATED);
    let session_id = opened.json::<Value>()["id"].as_str().unwrap().to_string();

    // 50 x 1000 in one bundle of 100 minus 50 loose... keep it simple:
    // 50 loose 1000-notes
    let count: Value = app
        .server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/cash-count"))
        .authorization_bearer(&token)
        .json(&json!({
            "entries": [ { "denomination": 1000, "bundle_count": 0, "loose_count": 50 } ]
        }))
        .await
        .json();
    assert_eq!(count["total"]["amount"], "50000");

    let imported: Value = app
        .server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/statement"))
        .authorization_bearer(&token)
        .json(&json!({
            "lines": [ { "date": today, "amount": "50000", "description": "CASH DEP" } ]
        }))
        .await
        .json();
    assert_eq!(imported["imported"], 1);

    let matched: Value = app
        .server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/auto-match"))
        .authorization_bearer(&token)
        .await
        .json();
    assert_eq!(matched["matched"].as_array().unwrap().len(), 1);

    let close = app
        .server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/close"))
        .authorization_bearer(&token)
        .json(&json!({ "note": "till balanced" }))
        .await;
    close.assert_status_ok();
    let report: Value = close.json();
    assert_eq!(report["physical_cash_total"]["amount"], "50000");
    assert_eq!(report["system_cash_total"]["amount"], "50000");
    assert_eq!(report["variance"]["amount"], "0");
    assert_eq!(report["note"], "till balanced");
    assert_eq!(report["unmatched_lines"], 0);
    assert_eq!(app.reports.sent().len(), 1);

    // The day is frozen: closing again conflicts, as does more data
    app.server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/close"))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::CONFLICT);
    app.server
        .post(&format!("/api/v1/reconciliation/sessions/{session_id}/cash-count"))
        .authorization_bearer(&token)
        .json(&json!({ "entries": [] }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn reopening_the_same_day_resumes_the_session() {
    let app = TestApp::spawn();
    let token = app.token(roles::BURSAR);
    let body = json!({ "date": school_day() });

    let first = app
        .server
        .post("/api/v1/reconciliation/sessions")
        .authorization_bearer(&token)
        .json(&body)
        .await;
    let second = app
        .server
        .post("/api/v1/reconciliation/sessions")
        .authorization_bearer(&token)
        .json(&body)
        .await;

    assert_eq!(
        first.json::<Value>()["id"].as_str().unwrap(),
        second.json::<Value>()["id"].as_str().unwrap()
    );
}

#[tokio::test]
async fn reconciliation_requires_bursar_role() {
    let app = TestApp::spawn();

    let response = app
        .server
        .post("/api/v1/reconciliation/sessions")
        .authorization_bearer(app.token(roles::VIEWER))
        .json(&json!({ "date": school_day() }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}
