//! Payment signatures: `hex(HMAC-SHA256(secret, order_ref "|" payment_ref))`.
//!
//! The payment processor signs the pair it returns to the browser after
//! checkout; verification recomputes the MAC locally and never calls out.

use crate::identifiers::{OrderRef, PaymentRef};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lower-case hex HMAC-SHA256 of `message` under `secret`.
pub fn hmac_sha256_hex(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// The signed message for an order/payment pair.
pub fn payment_signature_payload(order: &OrderRef, payment: &PaymentRef) -> String {
    format!("{}|{}", order.as_str(), payment.as_str())
}

/// Computes the signature the processor is expected to send for a payment.
pub fn sign_payment(secret: &[u8], order: &OrderRef, payment: &PaymentRef) -> String {
    hmac_sha256_hex(secret, payment_signature_payload(order, payment).as_bytes())
}

/// Checks a claimed signature in constant time.
///
/// The comparison is over the exact bytes supplied: no trimming and no case
/// folding, so any altered bit is a mismatch.
pub fn verify_payment(
    secret: &[u8],
    order: &OrderRef,
    payment: &PaymentRef,
    claimed: &str,
) -> bool {
    let expected = sign_payment(secret, order, payment);
    bool::from(expected.as_bytes().ct_eq(claimed.as_bytes()))
}
