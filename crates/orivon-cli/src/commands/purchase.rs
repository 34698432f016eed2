//! Order creation and payment verification commands.

use crate::context::{CliError, Context};
use crate::output;
use orivon_canonical::{CertificationId, PurchaseId};
use orivon_core::CoreError;

pub fn create_order(ctx: &Context, token: &str, certification: String) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let intent = ctx
        .ledger
        .create_order(&user, &CertificationId::parse(certification).map_err(CoreError::from)?)?;
    output::print_json(&intent)
}

pub fn verify_payment(
    ctx: &Context,
    token: &str,
    purchase: String,
    payment: &str,
    signature: &str,
) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let purchase_id = PurchaseId::parse(purchase).map_err(CoreError::from)?;
    let owner = ctx.ledger.purchase(&purchase_id)?.user_id;
    if owner != user.id && !user.is_admin() {
        return Err(CoreError::Forbidden("purchase belongs to another user".into()).into());
    }
    let outcome = ctx
        .ledger
        .verify_payment(&user, &purchase_id, payment, signature)?;
    output::print_json(&outcome)
}
