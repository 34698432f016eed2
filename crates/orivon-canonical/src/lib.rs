//! Canonical primitives for the Orivon certification core.
//!
//! Every value that crosses a component boundary lives in this crate:
//! identifiers with their validation rules, money in minor currency units,
//! and the payment-signature scheme shared with the payment processor.
//!
#![deny(missing_docs)]

/// Core identifiers and newtypes.
pub mod identifiers;
/// Money amounts expressed in minor currency units.
pub mod money;
/// HMAC-SHA256 payment signatures.
pub mod signature;
/// Validation helpers used by canonical types.
pub mod validation;

pub use identifiers::{
    AttemptId, CertificationId, Currency, Email, OrderRef, PaymentRef, PurchaseId, Timestamp,
    UserId,
};
pub use money::MinorUnits;
pub use signature::{hmac_sha256_hex, payment_signature_payload, sign_payment, verify_payment};
pub use validation::ValidationError;
