#![allow(dead_code)]

use orivon_canonical::{Email, OrderRef};
use orivon_core::{
    AttemptEngine, AvailabilityResolver, CoreConfig, CoreError, CredentialValidator,
    IdentityResolver, OrderRequest, PaymentProcessor, PurchaseLedger, SessionAuthority, User,
};
use orivon_store::{layout, MemoryStore, RecordAdapter, Row, TabularStore};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

pub const PAYMENT_SECRET: &str = "rzp_test_secret";
pub const ADMIN: &str = "boss@orivon.dev";

/// Records order requests and hands out sequential order references.
#[derive(Default)]
pub struct FakeProcessor {
    pub requests: Mutex<Vec<OrderRequest>>,
}

impl FakeProcessor {
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PaymentProcessor for FakeProcessor {
    fn create_order(&self, request: &OrderRequest) -> Result<OrderRef, CoreError> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(OrderRef::new(format!("order_{}", requests.len())))
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub adapter: RecordAdapter,
    pub config: CoreConfig,
    pub processor: Arc<FakeProcessor>,
}

pub fn config() -> CoreConfig {
    CoreConfig::from_toml_str(&format!(
        r#"
        [credentials]
        secret = "test-signing-secret"

        [payments]
        key_id = "rzp_test_key"
        key_secret = "{PAYMENT_SECRET}"

        [identity]
        admin_emails = ["{ADMIN}"]
        "#
    ))
    .unwrap()
}

pub fn harness() -> Harness {
    harness_with(layout::current())
}

pub fn harness_with(tables: Vec<(&str, orivon_store::TableDef)>) -> Harness {
    let store = Arc::new(MemoryStore::with_layout(tables));
    Harness {
        adapter: RecordAdapter::new(store.clone()),
        store,
        config: config(),
        processor: Arc::new(FakeProcessor::default()),
    }
}

impl Harness {
    pub fn identity(&self) -> IdentityResolver {
        IdentityResolver::new(self.adapter.clone(), &self.config)
    }

    pub fn credentials(&self) -> CredentialValidator {
        CredentialValidator::new(&self.config)
    }

    pub fn sessions(&self) -> SessionAuthority {
        SessionAuthority::new(self.identity(), self.credentials())
    }

    pub fn ledger(&self) -> PurchaseLedger {
        PurchaseLedger::new(self.adapter.clone(), self.processor.clone(), &self.config)
    }

    pub fn attempts(&self) -> AttemptEngine {
        AttemptEngine::new(self.adapter.clone())
    }

    pub fn availability(&self) -> AvailabilityResolver {
        AvailabilityResolver::new(self.adapter.clone())
    }

    pub fn user(&self, email: &str, name: Option<&str>) -> User {
        self.identity()
            .resolve_or_create(&Email::parse(email).unwrap(), name)
            .unwrap()
    }

    pub fn certification(&self, id: &str, title: &str, price: f64) {
        self.store
            .insert(
                "certifications",
                row(json!({"id": id, "title": title, "price_numeric": price, "active": true})),
            )
            .unwrap();
    }

    pub fn question(&self, id: &str, certification: &str, correct: Value, marks: i64) {
        self.store
            .insert(
                "questions",
                row(json!({
                    "question_id": id,
                    "exma_id": certification,
                    "text": format!("question {id}"),
                    "options": ["A", "B", "C", "D"],
                    "marks": marks,
                    "correct_index": correct
                })),
            )
            .unwrap();
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}
