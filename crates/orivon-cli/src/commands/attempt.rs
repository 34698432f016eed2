//! Attempt lifecycle commands.

use crate::context::{json_arg, CliError, Context};
use crate::output;
use orivon_canonical::{AttemptId, CertificationId};
use orivon_core::{Answer, CompletionRequest, CoreError, User};

/// Parses the id and checks the caller may act on the attempt.
///
/// With `allow_unstored`, an id with no stored row passes: it came from a
/// start whose insert failed and has no owner to check.
fn owned_attempt(
    ctx: &Context,
    user: &User,
    attempt: String,
    allow_unstored: bool,
) -> Result<AttemptId, CliError> {
    let attempt_id = AttemptId::parse(attempt).map_err(CoreError::from)?;
    match ctx.attempts.get(&attempt_id) {
        Ok(stored) if stored.user_id != user.id && !user.is_admin() => {
            Err(CoreError::Forbidden("attempt belongs to another user".into()).into())
        }
        Ok(_) => Ok(attempt_id),
        Err(CoreError::NotFound { .. }) if allow_unstored => Ok(attempt_id),
        Err(e) => Err(e.into()),
    }
}

pub fn start(
    ctx: &Context,
    token: &str,
    certification: String,
    metadata: Option<&str>,
) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let certification = CertificationId::parse(certification).map_err(CoreError::from)?;
    let started = ctx
        .attempts
        .start(&user, &certification, json_arg("metadata", metadata)?)?;
    output::print_json(&started)
}

pub fn event(
    ctx: &Context,
    token: &str,
    attempt: String,
    event_type: &str,
    metadata: Option<&str>,
) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let attempt_id = owned_attempt(ctx, &user, attempt, false)?;
    let event = ctx
        .attempts
        .record_event(&attempt_id, event_type, json_arg("metadata", metadata)?)?;
    output::print_json(&event)
}

pub fn submit(ctx: &Context, token: &str, attempt: String, answers: &str) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let attempt_id = owned_attempt(ctx, &user, attempt, false)?;
    let answers: Vec<Answer> = serde_json::from_str(answers)
        .map_err(|e| CliError::Usage(format!("--answers is not a JSON answer list: {e}")))?;
    let submission = ctx.attempts.submit(&attempt_id, &answers)?;
    output::print_json(&submission)
}

pub fn complete(
    ctx: &Context,
    token: &str,
    attempt: String,
    score: i64,
    pass: bool,
    title: Option<String>,
    name: Option<String>,
) -> Result<(), CliError> {
    let user = ctx.caller(token)?;
    let attempt_id = owned_attempt(ctx, &user, attempt, true)?;
    let request = CompletionRequest {
        score,
        pass,
        title,
        name_of_user: Some(name.unwrap_or_else(|| user.display_name.clone())),
        questions: None,
    };
    let outcome = ctx.attempts.complete(&attempt_id, &request)?;
    output::print_json(&outcome)
}
