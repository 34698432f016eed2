//! Availability command.

use crate::context::{CliError, Context};
use crate::output;
use orivon_canonical::CertificationId;
use orivon_core::CoreError;
use serde_json::json;

pub fn run(ctx: &Context, token: &str, certification: String) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let certification = CertificationId::parse(certification).map_err(CoreError::from)?;
    let available = ctx.availability.is_available(&user, &certification)?;
    output::print_json(&json!({
        "user_id": user.id,
        "certification_id": certification,
        "available": available,
    }))
}
