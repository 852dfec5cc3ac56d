//! HTTP API layer
//!
//! REST surface over the fee ledger, built on Axum. Handlers talk to
//! domain services through the port traits, so the same router runs
//! against PostgreSQL in production and in-memory adapters in tests.
//!
//! Authenticated routes live under `/api/v1` and are tenant-scoped by
//! the JWT. The gateway webhook is the single unauthenticated mutation
//! endpoint; it is safe to expose because settlement re-verifies with
//! the gateway and is idempotent per reference.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod reports;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{Currency, HealthCheckable};
use domain_fees::{FeeCatalog, InvoiceGenerator, InvoiceStore, ResultGate, StudentDirectory};
use domain_payments::{PaymentGateway, PaymentLedger, SettlementVerifier, TransactionStore};
use domain_reconciliation::{
    CashCountStore, ReconciliationService, ReportChannel, SessionStore, SettledLedger,
    StatementStore,
};

use crate::config::ApiConfig;
use crate::handlers::{access, health, invoices, payments, reconciliation, webhooks};
use crate::middleware::{audit_middleware, auth_middleware};

/// Everything the API needs from the outside world
pub struct Dependencies {
    pub students: Arc<dyn StudentDirectory>,
    pub catalog: Arc<dyn FeeCatalog>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub sessions: Arc<dyn SessionStore>,
    pub cash_counts: Arc<dyn CashCountStore>,
    pub statements: Arc<dyn StatementStore>,
    pub settled: Arc<dyn SettledLedger>,
    pub reports: Arc<dyn ReportChannel>,
    pub health: Arc<dyn HealthCheckable>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub invoices: Arc<dyn InvoiceStore>,
    pub transactions: Arc<dyn TransactionStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub generator: Arc<InvoiceGenerator>,
    pub gate: Arc<ResultGate>,
    pub ledger: Arc<PaymentLedger>,
    pub verifier: Arc<SettlementVerifier>,
    pub reconciliation: Arc<ReconciliationService>,
    pub health: Arc<dyn HealthCheckable>,
}

impl AppState {
    /// Wires the domain services over the given ports
    pub fn new(deps: Dependencies, config: ApiConfig) -> Self {
        let currency: Currency = config.currency.parse().unwrap_or(Currency::NGN);

        let generator = Arc::new(InvoiceGenerator::new(
            deps.students,
            deps.catalog,
            deps.invoices.clone(),
        ));
        let gate = Arc::new(ResultGate::new(deps.invoices.clone(), currency));
        let ledger = Arc::new(PaymentLedger::new(
            deps.invoices.clone(),
            deps.transactions.clone(),
            deps.gateway.clone(),
            config.gateway_callback_url.clone(),
        ));
        let verifier = Arc::new(SettlementVerifier::new(
            deps.transactions.clone(),
            deps.gateway,
        ));
        let reconciliation = Arc::new(ReconciliationService::new(
            deps.sessions.clone(),
            deps.cash_counts,
            deps.statements,
            deps.settled,
            deps.reports,
            currency,
        ));

        Self {
            config,
            invoices: deps.invoices,
            transactions: deps.transactions,
            sessions: deps.sessions,
            generator,
            gate,
            ledger,
            verifier,
            reconciliation,
            health: deps.health,
        }
    }

    /// The tenant ledger currency, as configured
    pub fn currency(&self) -> Currency {
        self.config.currency.parse().unwrap_or(Currency::NGN)
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/webhooks/gateway", post(webhooks::gateway_webhook));

    // Invoice routes
    let invoice_routes = Router::new()
        .route("/generate", post(invoices::generate))
        .route("/:id", get(invoices::get_invoice))
        .route("/:id/transactions", get(payments::list_for_invoice));

    // Student routes
    let student_routes = Router::new()
        .route("/:id/invoices", get(invoices::list_for_student))
        .route("/:id/access", get(access::check_access));

    // Payment routes
    let payment_routes = Router::new()
        .route("/", post(payments::record_manual))
        .route("/checkout", post(payments::initiate_checkout))
        .route("/:reference/verify", post(payments::verify));

    // Reconciliation routes
    let reconciliation_routes = Router::new()
        .route("/sessions", post(reconciliation::open_session))
        .route("/sessions/:id", get(reconciliation::get_session))
        .route("/sessions/:id/cash-count", post(reconciliation::submit_cash_count))
        .route("/sessions/:id/statement", post(reconciliation::import_statement))
        .route("/sessions/:id/auto-match", post(reconciliation::auto_match))
        .route("/sessions/:id/close", post(reconciliation::close_day));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/invoices", invoice_routes)
        .nest("/students", student_routes)
        .nest("/payments", payment_routes)
        .nest("/reconciliation", reconciliation_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            audit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
