//! Integration tests for typed identifiers

use core_kernel::{InvoiceId, ReconciliationSessionId, TenantId};
use uuid::Uuid;

#[test]
fn serde_is_transparent_uuid() {
    let id = InvoiceId::new();
    let json = serde_json::to_string(&id).unwrap();
    // Serializes as a bare UUID string, not a prefixed display form
    let uuid: Uuid = serde_json::from_str(&json).unwrap();
    assert_eq!(&uuid, id.as_uuid());
}

#[test]
fn display_and_parse_round_trip() {
    let id = ReconciliationSessionId::new_v7();
    assert!(id.to_string().starts_with("RCN-"));
    let parsed: ReconciliationSessionId = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
}

#[test]
fn v7_ids_are_time_ordered() {
    let a = TenantId::new_v7();
    let b = TenantId::new_v7();
    assert!(a.as_uuid() <= b.as_uuid());
}
