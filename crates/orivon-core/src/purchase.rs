//! Purchase Ledger.
//!
//! A purchase moves `created -> paid -> issued`. Payment is confirmed by a
//! local HMAC check over `order|payment`; the paid write, the audit ledger
//! entry and the later issued write are independent writes without
//! rollback, each safe to observe on its own.

use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::errors::{CoreError, PartialWriteFailure};
use crate::payment::{OrderRequest, PaymentProcessor};
use crate::records::{Purchase, PurchaseStatus, Transaction, User};
use orivon_canonical::{
    verify_payment, CertificationId, Currency, Email, MinorUnits, OrderRef, PaymentRef, PurchaseId,
    Timestamp, UserId,
};
use orivon_store::row::{integer, text};
use orivon_store::{EntityKind, Filter, FromRow, RecordAdapter, Row};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Price recorded on audit ledger entries, independent of the purchase amount.
pub const AUDIT_PRICE: i64 = 1;

/// Result of `create_order`: what the checkout client needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderIntent {
    /// Local purchase token.
    pub purchase_id: PurchaseId,
    /// Processor order; absent on the free path.
    pub order_ref: Option<OrderRef>,
    /// Amount in minor units.
    pub amount_minor: MinorUnits,
    /// Currency code.
    pub currency: Currency,
    /// Public processor key for the checkout widget.
    pub key_id: Option<String>,
    /// Always `created`.
    pub status: PurchaseStatus,
}

/// Result of `verify_payment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentOutcome {
    /// Purchase that was verified.
    pub purchase_id: PurchaseId,
    /// Status after the call.
    pub status: PurchaseStatus,
    /// False when the purchase was already paid or issued.
    pub transitioned: bool,
    /// Ledger entry id, when one was written and the layout assigns ids.
    pub transaction_id: Option<String>,
    /// Price recorded on the ledger entry.
    pub audit_price: i64,
    /// Secondary writes that failed.
    pub partial_failures: Vec<PartialWriteFailure>,
}

/// Purchase intents, payment verification and the audit ledger.
#[derive(Clone)]
pub struct PurchaseLedger {
    store: RecordAdapter,
    catalog: Catalog,
    processor: Arc<dyn PaymentProcessor>,
    payment_secret: Option<Arc<SecretString>>,
    currency: Currency,
    key_id: Option<String>,
}

impl std::fmt::Debug for PurchaseLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PurchaseLedger")
            .field("currency", &self.currency)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl PurchaseLedger {
    /// Creates a ledger using the payment settings.
    pub fn new(
        store: RecordAdapter,
        processor: Arc<dyn PaymentProcessor>,
        config: &CoreConfig,
    ) -> Self {
        Self {
            catalog: Catalog::new(store.clone()),
            store,
            processor,
            payment_secret: config
                .payments
                .key_secret
                .as_ref()
                .map(|s| Arc::new(SecretString::from(s.expose_secret().to_string()))),
            currency: config.payments.currency.clone(),
            key_id: config.payments.key_id.clone(),
        }
    }

    /// Records a purchase intent for `certification`.
    ///
    /// Free certifications never reach the payment processor; their
    /// purchase carries no order reference.
    pub fn create_order(
        &self,
        user: &User,
        certification: &CertificationId,
    ) -> Result<OrderIntent, CoreError> {
        let cert = self.catalog.certification(certification)?;
        let amount = MinorUnits::from_major(cert.price)?;
        let purchase_id = PurchaseId::generate();

        let order_ref = if amount.is_free() {
            debug!(certification_id = %certification, "free certification, skipping processor");
            None
        } else {
            Some(self.processor.create_order(&OrderRequest {
                amount,
                currency: self.currency.clone(),
                receipt: purchase_id.clone(),
            })?)
        };

        let mut row = Row::new();
        row.insert("id".into(), Value::from(purchase_id.as_str()));
        row.insert("user_id".into(), Value::from(user.id.as_str()));
        row.insert("certification_id".into(), Value::from(certification.as_str()));
        row.insert("amount".into(), Value::from(cert.price));
        row.insert("currency".into(), Value::from(self.currency.as_str()));
        if let Some(order) = &order_ref {
            row.insert("order_ref".into(), Value::from(order.as_str()));
        }
        row.insert("status".into(), Value::from(PurchaseStatus::Created.as_str()));
        row.insert("created_at".into(), Value::from(Timestamp::now().as_str()));
        self.store.insert(EntityKind::Purchase, row)?;

        info!(purchase_id = %purchase_id, amount = amount.value(), "created purchase");
        Ok(OrderIntent {
            purchase_id,
            order_ref,
            amount_minor: amount,
            currency: self.currency.clone(),
            key_id: self.key_id.clone(),
            status: PurchaseStatus::Created,
        })
    }

    /// Loads a purchase; absence is `NotFound`.
    pub fn purchase(&self, id: &PurchaseId) -> Result<Purchase, CoreError> {
        self.store
            .find_as(EntityKind::Purchase, &Filter::new().eq("id", id.as_str()))?
            .ok_or_else(|| CoreError::not_found("purchase", id))
    }

    /// Confirms a payment reported by the checkout client.
    ///
    /// `payer` is the authenticated caller; the audit entry is recorded
    /// under their email.
    pub fn verify_payment(
        &self,
        payer: &User,
        purchase_id: &PurchaseId,
        payment_ref: &str,
        signature: &str,
    ) -> Result<PaymentOutcome, CoreError> {
        let purchase = self.purchase(purchase_id)?;
        let Some(order_ref) = purchase.order_ref.as_ref() else {
            return Err(CoreError::BadRequest(
                "purchase has no order reference".into(),
            ));
        };
        if purchase.status == PurchaseStatus::Failed {
            return Err(CoreError::BadRequest("purchase has failed".into()));
        }
        let secret = self.payment_secret.as_ref().ok_or_else(|| {
            CoreError::Unavailable("payment secret is not configured".into())
        })?;
        let payment = PaymentRef::parse(payment_ref.trim())?;
        if !verify_payment(
            secret.expose_secret().as_bytes(),
            order_ref,
            &payment,
            signature,
        ) {
            warn!(purchase_id = %purchase_id, "payment signature mismatch");
            return Err(CoreError::InvalidSignature);
        }

        if matches!(purchase.status, PurchaseStatus::Paid | PurchaseStatus::Issued) {
            return Ok(PaymentOutcome {
                purchase_id: purchase.id,
                status: purchase.status,
                transitioned: false,
                transaction_id: None,
                audit_price: AUDIT_PRICE,
                partial_failures: Vec::new(),
            });
        }

        let mut changes = Row::new();
        changes.insert("status".into(), Value::from(PurchaseStatus::Paid.as_str()));
        changes.insert("payment_ref".into(), Value::from(payment.as_str()));
        changes.insert("signature".into(), Value::from(signature));
        self.store
            .update(
                EntityKind::Purchase,
                &Filter::new().eq("id", purchase_id.as_str()),
                changes,
            )?
            .ok_or_else(|| CoreError::not_found("purchase", purchase_id))?;
        info!(purchase_id = %purchase_id, "purchase paid");

        let mut partial_failures = Vec::new();
        let title = self.catalog.title_of(&purchase.certification_id);
        let transaction_id =
            match self.write_transaction(&payer.email, AUDIT_PRICE, title.as_deref()) {
                Ok(row) => text(&row, "id"),
                Err(e) => {
                    warn!(purchase_id = %purchase_id, error = %e, "ledger entry not recorded");
                    partial_failures.push(PartialWriteFailure::new("transaction", e));
                    None
                }
            };

        Ok(PaymentOutcome {
            purchase_id: purchase.id,
            status: PurchaseStatus::Paid,
            transitioned: true,
            transaction_id,
            audit_price: AUDIT_PRICE,
            partial_failures,
        })
    }

    /// Appends a manual ledger entry.
    pub fn record_transaction(
        &self,
        email: &Email,
        price: i64,
        course_title: Option<&str>,
    ) -> Result<Transaction, CoreError> {
        let row = self.write_transaction(email, price, course_title)?;
        Transaction::from_row(&row).map_err(|e| CoreError::Store(e.into()))
    }

    /// Ledger entries recorded under `email`, newest first.
    pub fn transactions_for(&self, email: &Email) -> Result<Vec<Transaction>, CoreError> {
        let mut entries: Vec<(Transaction, i64)> = self
            .store
            .find_all(
                EntityKind::Transaction,
                &Filter::new().eq("email", email.as_str()),
            )?
            .into_iter()
            .filter_map(|row| {
                let serial = integer(&row, "id").unwrap_or(0);
                Transaction::from_row(&row).ok().map(|t| (t, serial))
            })
            .collect();
        entries.sort_by(|(a, a_id), (b, b_id)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_id.cmp(a_id))
        });
        Ok(entries.into_iter().map(|(t, _)| t).collect())
    }

    /// Marks the most recent eligible purchase of the pair as issued.
    pub fn issue(
        &self,
        user_id: &UserId,
        certification_id: &CertificationId,
    ) -> Result<Option<PurchaseId>, CoreError> {
        issue_latest(&self.store, user_id, certification_id)
    }

    fn write_transaction(
        &self,
        email: &Email,
        price: i64,
        course_title: Option<&str>,
    ) -> Result<Row, CoreError> {
        let mut row = Row::new();
        row.insert("email".into(), Value::from(email.as_str()));
        row.insert("price".into(), Value::from(price));
        if let Some(title) = course_title.filter(|t| !t.trim().is_empty()) {
            row.insert("course_title".into(), Value::from(title));
        }
        row.insert("created_at".into(), Value::from(Timestamp::now().as_str()));
        Ok(self.store.insert(EntityKind::Transaction, row)?)
    }
}

/// Moves the chosen purchase of (user, certification) to `issued`.
///
/// The most recent `paid` purchase wins; failing that the most recent free
/// `created` one. When only issued purchases exist the latest is reported
/// without a write. Returns `None` when nothing is eligible.
pub(crate) fn issue_latest(
    store: &RecordAdapter,
    user_id: &UserId,
    certification_id: &CertificationId,
) -> Result<Option<PurchaseId>, CoreError> {
    let purchases: Vec<Purchase> = store.find_all_as(
        EntityKind::Purchase,
        &Filter::new()
            .eq("user_id", user_id.as_str())
            .eq("certification_id", certification_id.as_str()),
    )?;

    let chosen = latest(&purchases, |p| p.status == PurchaseStatus::Paid).or_else(|| {
        latest(&purchases, |p| {
            p.status == PurchaseStatus::Created && p.order_ref.is_none()
        })
    });
    let Some(chosen) = chosen else {
        return Ok(latest(&purchases, |p| p.status == PurchaseStatus::Issued).map(|p| p.id.clone()));
    };

    let mut changes = Row::new();
    changes.insert("status".into(), Value::from(PurchaseStatus::Issued.as_str()));
    store.update(
        EntityKind::Purchase,
        &Filter::new().eq("id", chosen.id.as_str()),
        changes,
    )?;
    info!(purchase_id = %chosen.id, "purchase issued");
    Ok(Some(chosen.id.clone()))
}

/// Most recent purchase matching `pred`; later rows win ties.
fn latest(purchases: &[Purchase], pred: impl Fn(&Purchase) -> bool) -> Option<&Purchase> {
    purchases
        .iter()
        .enumerate()
        .filter(|(_, p)| pred(p))
        .max_by(|(ia, a), (ib, b)| a.created_at.cmp(&b.created_at).then(ia.cmp(ib)))
        .map(|(_, p)| p)
}
