//! Orivon certification core.
//!
//! The resource-lifecycle layer of the platform:
//! - `IdentityResolver` and `CredentialValidator` (with `SessionAuthority`
//!   tying them together) resolve callers to canonical users
//! - `PurchaseLedger` runs the purchase-to-payment state machine
//! - `AttemptEngine` runs exam attempts and scoring
//! - `AvailabilityResolver` gates certificate issuance
//!
//! All persistence goes through `orivon_store::RecordAdapter`. Components
//! take a `CoreConfig` reference at construction and hold no other shared
//! state.

#![deny(missing_docs)]

/// Attempt Engine.
pub mod attempt;
/// Availability Resolver.
pub mod availability;
/// Certification lookups.
pub mod catalog;
/// Configuration loading.
pub mod config;
/// Credential Validator.
pub mod credential;
/// Error taxonomy.
pub mod errors;
/// Identity Resolver.
pub mod identity;
/// Payment processor client.
pub mod payment;
/// Purchase Ledger.
pub mod purchase;
/// Typed records.
pub mod records;
/// Sign-in and request authorization.
pub mod session;

pub use attempt::{
    score_answers, Answer, AttemptEngine, CompletionOutcome, CompletionRequest, StartedAttempt,
    Submission,
};
pub use availability::{AvailabilityResolver, PASS_THRESHOLD};
pub use catalog::Catalog;
pub use config::{ConfigError, CoreConfig};
pub use credential::{Claims, CredentialValidator};
pub use errors::{CoreError, PartialWriteFailure};
pub use identity::IdentityResolver;
pub use payment::{OrderRequest, PaymentProcessor, RazorpayClient};
pub use purchase::{OrderIntent, PaymentOutcome, PurchaseLedger, AUDIT_PRICE};
pub use records::{
    Attempt, AttemptStatus, Certification, ExamResult, ProctorEvent, Purchase, PurchaseStatus,
    Question, Role, Transaction, User,
};
pub use session::{Session, SessionAuthority};
