//! Tests for the payment ledger and settlement verifier
//!
//! The gateway is scripted per-reference so tests can exercise webhook
//! duplication, failures, and timeouts without any network.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use core_kernel::{
    AcademicSession, Currency, InvoiceId, Money, PortError, StudentId, TenantId, Term,
};
use domain_fees::{InsertOutcome, Invoice, InvoiceStatus, InvoiceStore};
use domain_payments::{
    CheckoutSession, GatewayError, GatewayPaymentStatus, GatewayVerification, InitializePayment,
    PaymentError, PaymentGateway, PaymentLedger, PaymentMethod, PaymentTransaction,
    SettlementOutcome, SettlementVerifier, TransactionStatus, TransactionStore,
};

fn ngn(v: rust_decimal::Decimal) -> Money {
    Money::new(v, Currency::NGN)
}

// ============================================================================
// In-memory adapters
// ============================================================================

#[derive(Default)]
struct MemoryInvoices {
    rows: Mutex<Vec<Invoice>>,
    fail_next_apply: Mutex<bool>,
}

impl MemoryInvoices {
    fn seed(&self, invoice: Invoice) {
        self.rows.lock().unwrap().push(invoice);
    }

    /// Makes the next credit fail with a transient error
    fn fail_next_apply(&self) {
        *self.fail_next_apply.lock().unwrap() = true;
    }
}

impl core_kernel::DomainPort for MemoryInvoices {}

#[async_trait]
impl InvoiceStore for MemoryInvoices {
    async fn insert_if_absent(&self, invoice: Invoice) -> Result<InsertOutcome, PortError> {
        self.rows.lock().unwrap().push(invoice);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, tenant: TenantId, id: InvoiceId) -> Result<Invoice, PortError> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.tenant_id == tenant && i.id == id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Invoice", id))
    }

    async fn find_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
        term: Term,
        session: &AcademicSession,
    ) -> Result<Option<Invoice>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|i| {
                i.tenant_id == tenant
                    && i.student_id == student
                    && i.term == term
                    && &i.session == session
            })
            .cloned())
    }

    async fn list_for_student(
        &self,
        tenant: TenantId,
        student: StudentId,
    ) -> Result<Vec<Invoice>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.tenant_id == tenant && i.student_id == student)
            .cloned()
            .collect())
    }

    async fn apply_settled_amount(
        &self,
        tenant: TenantId,
        id: InvoiceId,
        amount: Money,
    ) -> Result<Invoice, PortError> {
        if std::mem::take(&mut *self.fail_next_apply.lock().unwrap()) {
            return Err(PortError::connection("Invoice store unavailable"));
        }
        let mut rows = self.rows.lock().unwrap();
        let invoice = rows
            .iter_mut()
            .find(|i| i.tenant_id == tenant && i.id == id)
            .ok_or_else(|| PortError::not_found("Invoice", id))?;
        invoice.apply_payment(amount);
        Ok(invoice.clone())
    }
}

struct MemoryTransactions {
    rows: Mutex<Vec<PaymentTransaction>>,
    invoices: Arc<MemoryInvoices>,
}

impl MemoryTransactions {
    fn new(invoices: Arc<MemoryInvoices>) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            invoices,
        }
    }
}

impl core_kernel::DomainPort for MemoryTransactions {}

#[async_trait]
impl TransactionStore for MemoryTransactions {
    async fn insert(&self, transaction: PaymentTransaction) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|t| t.reference == transaction.reference) {
            return Err(PortError::conflict("Duplicate transaction reference"));
        }
        rows.push(transaction);
        Ok(())
    }

    async fn post_settled(&self, transaction: PaymentTransaction) -> Result<Invoice, PortError> {
        {
            let rows = self.rows.lock().unwrap();
            if rows.iter().any(|t| t.reference == transaction.reference) {
                return Err(PortError::conflict("Duplicate transaction reference"));
            }
        }
        // All or nothing: the ledger row is only kept once the credit lands
        let invoice = self
            .invoices
            .apply_settled_amount(transaction.tenant_id, transaction.invoice_id, transaction.amount)
            .await?;
        self.rows.lock().unwrap().push(transaction);
        Ok(invoice)
    }

    async fn find_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<PaymentTransaction>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.reference == reference)
            .cloned())
    }

    async fn list_for_invoice(
        &self,
        tenant: TenantId,
        invoice: InvoiceId,
    ) -> Result<Vec<PaymentTransaction>, PortError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.tenant_id == tenant && t.invoice_id == invoice)
            .cloned()
            .collect())
    }

    async fn settle_and_credit(
        &self,
        reference: &str,
        gateway_metadata: Option<&serde_json::Value>,
    ) -> Result<Option<Invoice>, PortError> {
        let (tenant, invoice_id, amount) = {
            let rows = self.rows.lock().unwrap();
            match rows
                .iter()
                .find(|t| t.reference == reference && t.status == TransactionStatus::Pending)
            {
                Some(t) => (t.tenant_id, t.invoice_id, t.amount),
                None => return Ok(None),
            }
        };

        // Credit first, flip after: a failed credit leaves the
        // transaction pending, like the SQL adapter's rollback
        let invoice = self
            .invoices
            .apply_settled_amount(tenant, invoice_id, amount)
            .await?;

        let mut rows = self.rows.lock().unwrap();
        if let Some(txn) = rows
            .iter_mut()
            .find(|t| t.reference == reference && t.status == TransactionStatus::Pending)
        {
            txn.status = TransactionStatus::Success;
            txn.gateway_metadata = gateway_metadata.cloned();
        }
        Ok(Some(invoice))
    }

    async fn mark_failed(&self, reference: &str) -> Result<(), PortError> {
        let mut rows = self.rows.lock().unwrap();
        let txn = rows
            .iter_mut()
            .find(|t| t.reference == reference)
            .ok_or_else(|| PortError::not_found("Transaction", reference))?;
        if txn.status == TransactionStatus::Pending {
            txn.status = TransactionStatus::Failed;
        }
        Ok(())
    }
}

/// Scripted gateway: verification results keyed by reference
#[derive(Default)]
struct ScriptedGateway {
    verifications: Mutex<HashMap<String, GatewayPaymentStatus>>,
    /// Overrides the verified amount for a reference, in minor units
    amount_overrides: Mutex<HashMap<String, i64>>,
    fail_initialize: Mutex<bool>,
}

impl ScriptedGateway {
    fn will_verify(&self, reference: &str, status: GatewayPaymentStatus) {
        self.verifications
            .lock()
            .unwrap()
            .insert(reference.to_string(), status);
    }

    fn will_verify_amount(&self, reference: &str, amount_minor: i64) {
        self.amount_overrides
            .lock()
            .unwrap()
            .insert(reference.to_string(), amount_minor);
    }

    fn fail_next_initialize(&self) {
        *self.fail_initialize.lock().unwrap() = true;
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn initialize(
        &self,
        request: InitializePayment,
    ) -> Result<CheckoutSession, GatewayError> {
        if *self.fail_initialize.lock().unwrap() {
            return Err(GatewayError::Timeout { seconds: 10 });
        }
        // A fresh checkout verifies as incomplete until scripted otherwise
        self.verifications
            .lock()
            .unwrap()
            .entry(request.reference.clone())
            .or_insert(GatewayPaymentStatus::Abandoned);
        self.amount_overrides
            .lock()
            .unwrap()
            .entry(request.reference.clone())
            .or_insert(request.amount_minor);
        Ok(CheckoutSession {
            authorization_url: format!("https://checkout.example/{}", request.reference),
            access_code: "ac_test".to_string(),
            reference: request.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, GatewayError> {
        let status = self
            .verifications
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .ok_or_else(|| GatewayError::Http {
                status: 404,
                message: "Transaction reference not found".to_string(),
            })?;
        let amount_minor = self
            .amount_overrides
            .lock()
            .unwrap()
            .get(reference)
            .copied()
            .unwrap_or(0);
        Ok(GatewayVerification {
            reference: reference.to_string(),
            status,
            amount_minor,
            paid_at: None,
            channel: Some("card".to_string()),
        })
    }
}

// ============================================================================
// Fixture
// ============================================================================

struct Fixture {
    tenant: TenantId,
    invoice_id: InvoiceId,
    invoices: Arc<MemoryInvoices>,
    transactions: Arc<MemoryTransactions>,
    gateway: Arc<ScriptedGateway>,
}

impl Fixture {
    /// One invoice for 85,000 NGN, unpaid
    fn new() -> Self {
        let tenant = TenantId::new();
        let invoice = Invoice::new(
            tenant,
            StudentId::new(),
            Term::First,
            AcademicSession::starting(2025),
            ngn(dec!(85000)),
        );
        let invoice_id = invoice.id;

        let invoices = Arc::new(MemoryInvoices::default());
        invoices.seed(invoice);
        let transactions = Arc::new(MemoryTransactions::new(invoices.clone()));

        Self {
            tenant,
            invoice_id,
            invoices,
            transactions,
            gateway: Arc::new(ScriptedGateway::default()),
        }
    }

    fn ledger(&self) -> PaymentLedger {
        PaymentLedger::new(
            self.invoices.clone(),
            self.transactions.clone(),
            self.gateway.clone(),
            Some("https://fees.example/callback".to_string()),
        )
    }

    fn verifier(&self) -> SettlementVerifier {
        SettlementVerifier::new(self.transactions.clone(), self.gateway.clone())
    }

    async fn invoice(&self) -> Invoice {
        self.invoices.get(self.tenant, self.invoice_id).await.unwrap()
    }
}

// ============================================================================
// Manual payments
// ============================================================================

#[tokio::test]
async fn manual_payment_applies_and_updates_status() {
    let fx = Fixture::new();

    let receipt = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(35000)),
            PaymentMethod::Cash,
            Some("bursar".to_string()),
        )
        .await
        .unwrap();

    assert_eq!(receipt.transaction.status, TransactionStatus::Success);
    assert_eq!(receipt.invoice.status, InvoiceStatus::Partial);
    assert_eq!(receipt.invoice.outstanding(), ngn(dec!(50000)));
}

#[tokio::test]
async fn manual_payment_rejects_overpayment() {
    let fx = Fixture::new();

    let err = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(90000)),
            PaymentMethod::BankTransfer,
            None,
        )
        .await
        .unwrap_err();

    match err {
        PaymentError::ExceedsBalance { outstanding } => {
            assert_eq!(outstanding, ngn(dec!(85000)));
        }
        other => panic!("Expected ExceedsBalance, got {other:?}"),
    }

    // Nothing was recorded or applied
    let invoice = fx.invoice().await;
    assert_eq!(invoice.status, InvoiceStatus::Owing);
    let txns = fx
        .transactions
        .list_for_invoice(fx.tenant, fx.invoice_id)
        .await
        .unwrap();
    assert!(txns.is_empty());
}

#[tokio::test]
async fn manual_payment_failure_records_nothing() {
    let fx = Fixture::new();
    fx.invoices.fail_next_apply();

    let err = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(35000)),
            PaymentMethod::Cash,
            Some("bursar".to_string()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Port(_)));

    // Neither write survived; re-submitting is safe and applies once
    let txns = fx
        .transactions
        .list_for_invoice(fx.tenant, fx.invoice_id)
        .await
        .unwrap();
    assert!(txns.is_empty());
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);

    let receipt = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(35000)),
            PaymentMethod::Cash,
            Some("bursar".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(receipt.invoice.outstanding(), ngn(dec!(50000)));
    let txns = fx
        .transactions
        .list_for_invoice(fx.tenant, fx.invoice_id)
        .await
        .unwrap();
    assert_eq!(txns.len(), 1);
}

#[tokio::test]
async fn manual_payment_rejects_gateway_method() {
    let fx = Fixture::new();

    let err = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(1000)),
            PaymentMethod::Gateway,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Validation(_)));
}

#[tokio::test]
async fn manual_payment_rejects_non_positive_amount() {
    let fx = Fixture::new();

    let err = fx
        .ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(0)),
            PaymentMethod::Cash,
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::Validation(_)));
}

// ============================================================================
// Checkout initiation
// ============================================================================

#[tokio::test]
async fn checkout_defaults_to_outstanding_balance() {
    let fx = Fixture::new();

    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();

    assert_eq!(receipt.transaction.amount, ngn(dec!(85000)));
    assert_eq!(receipt.transaction.status, TransactionStatus::Pending);
    assert_eq!(receipt.checkout.reference, receipt.transaction.reference);

    // The pending transaction exists before any webhook could arrive
    let stored = fx
        .transactions
        .find_by_reference(&receipt.transaction.reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn checkout_failure_marks_transaction_failed() {
    let fx = Fixture::new();
    fx.gateway.fail_next_initialize();

    let err = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PaymentError::Gateway(GatewayError::Timeout { .. })
    ));

    let txns = fx
        .transactions
        .list_for_invoice(fx.tenant, fx.invoice_id)
        .await
        .unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].status, TransactionStatus::Failed);

    // The invoice is untouched
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);
}

#[tokio::test]
async fn checkout_on_paid_invoice_is_rejected() {
    let fx = Fixture::new();
    fx.ledger()
        .record_manual(
            fx.tenant,
            fx.invoice_id,
            ngn(dec!(85000)),
            PaymentMethod::Cash,
            None,
        )
        .await
        .unwrap();

    let err = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PaymentError::Validation(_)));
}

// ============================================================================
// Settlement
// ============================================================================

#[tokio::test]
async fn settlement_credits_invoice_exactly_once() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    fx.gateway
        .will_verify(&reference, GatewayPaymentStatus::Success);

    let verifier = fx.verifier();
    let first = verifier.settle(&reference).await.unwrap();
    match first {
        SettlementOutcome::Settled { ref invoice } => {
            assert_eq!(invoice.status, InvoiceStatus::Paid);
        }
        other => panic!("Expected Settled, got {other:?}"),
    }

    // Duplicate webhook deliveries and manual re-verification are no-ops
    for _ in 0..5 {
        let again = verifier.settle(&reference).await.unwrap();
        assert!(matches!(again, SettlementOutcome::AlreadySettled));
    }

    let invoice = fx.invoice().await;
    assert_eq!(invoice.amount_paid, ngn(dec!(85000)));
    assert_eq!(invoice.status, InvoiceStatus::Paid);

    // The gateway's answer is kept on the settled transaction
    let settled = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    let metadata = settled.gateway_metadata.expect("metadata stored at settlement");
    assert_eq!(metadata["channel"], "card");
}

#[tokio::test]
async fn credit_failure_leaves_transaction_pending_for_retry() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    fx.gateway
        .will_verify(&reference, GatewayPaymentStatus::Success);
    fx.invoices.fail_next_apply();

    let verifier = fx.verifier();
    let err = verifier.settle(&reference).await.unwrap_err();
    assert!(matches!(err, PaymentError::Port(_)));

    // The flip rolled back with the credit, so the money is not lost
    let txn = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);

    // The gateway's retry settles the whole thing
    let outcome = verifier.settle(&reference).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Settled { .. }));
    let invoice = fx.invoice().await;
    assert_eq!(invoice.amount_paid, ngn(dec!(85000)));
    assert_eq!(invoice.status, InvoiceStatus::Paid);
}

#[tokio::test]
async fn failed_verification_marks_transaction_failed() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    fx.gateway
        .will_verify(&reference, GatewayPaymentStatus::Failed);

    let outcome = fx.verifier().settle(&reference).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Failed));

    let txn = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Failed);
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);
}

#[tokio::test]
async fn incomplete_checkout_stays_pending() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    // Scripted default after initialize is an abandoned checkout
    let outcome = fx.verifier().settle(&reference).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::StillPending));

    let txn = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);

    // The payer later completes; re-verification settles it
    fx.gateway
        .will_verify(&reference, GatewayPaymentStatus::Success);
    let outcome = fx.verifier().settle(&reference).await.unwrap();
    assert!(matches!(outcome, SettlementOutcome::Settled { .. }));
}

#[tokio::test]
async fn settlement_rejects_amount_mismatch() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    fx.gateway
        .will_verify(&reference, GatewayPaymentStatus::Success);
    fx.gateway.will_verify_amount(&reference, 100);

    let err = fx.verifier().settle(&reference).await.unwrap_err();
    assert!(matches!(err, PaymentError::AmountMismatch { .. }));

    // No credit happened
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);
    let txn = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
}

#[tokio::test]
async fn settlement_of_unknown_reference_is_not_found() {
    let fx = Fixture::new();
    let err = fx.verifier().settle("FEE-does-not-exist").await.unwrap_err();
    assert!(matches!(err, PaymentError::TransactionNotFound(_)));
}

#[tokio::test]
async fn transient_verify_failure_leaves_state_untouched() {
    let fx = Fixture::new();
    let receipt = fx
        .ledger()
        .initiate_checkout(fx.tenant, fx.invoice_id, "parent@example.com".into(), None)
        .await
        .unwrap();
    let reference = receipt.transaction.reference;

    // Simulate the gateway forgetting the reference (404 on verify)
    fx.gateway.verifications.lock().unwrap().remove(&reference);

    let err = fx.verifier().settle(&reference).await.unwrap_err();
    assert!(matches!(err, PaymentError::Gateway(_)));

    let txn = fx
        .transactions
        .find_by_reference(&reference)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(txn.status, TransactionStatus::Pending);
    assert_eq!(fx.invoice().await.status, InvoiceStatus::Owing);
}
