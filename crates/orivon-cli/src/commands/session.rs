//! Sign-in and whoami commands.

use crate::context::{CliError, Context};
use crate::output;

pub fn sign_in(ctx: &Context, email: &str, name: Option<&str>) -> Result<(), CliError> {
    let session = ctx.sessions.sign_in(email, name)?;
    output::print_json(&session)
}

pub fn whoami(ctx: &Context, token: &str) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    output::print_json(&user)
}
