//! Availability Resolver.
//!
//! Decides whether a certificate may be issued for (user, certification).
//! Denormalized exam results are matched by name (display name or email),
//! a known weak join kept behind this interface; completed attempts are
//! matched by exact user and certification. Either source with a score at
//! or above [`PASS_THRESHOLD`] makes the pair available, so adding rows can
//! never turn a `true` into `false`.

use crate::errors::CoreError;
use crate::records::{Attempt, AttemptStatus, ExamResult, User};
use orivon_canonical::CertificationId;
use orivon_store::{EntityKind, Filter, RecordAdapter};
use tracing::debug;

/// Minimum passing score, fixed regardless of any per-certification setting.
pub const PASS_THRESHOLD: i64 = 75;

/// Certificate availability decisions.
#[derive(Debug, Clone)]
pub struct AvailabilityResolver {
    store: RecordAdapter,
}

impl AvailabilityResolver {
    /// Creates a resolver over the store.
    pub fn new(store: RecordAdapter) -> Self {
        Self { store }
    }

    /// True when a passing exam result or completed attempt exists.
    ///
    /// Read failures propagate; they are never taken as "no evidence".
    pub fn is_available(
        &self,
        user: &User,
        certification: &CertificationId,
    ) -> Result<bool, CoreError> {
        for name in name_candidates(user) {
            let results: Vec<ExamResult> = self.store.find_all_as(
                EntityKind::ExamResult,
                &Filter::new().eq("name_of_user", name.as_str()),
            )?;
            if results
                .iter()
                .any(|r| r.passing_score >= PASS_THRESHOLD as f64)
            {
                debug!(user_id = %user.id, name = %name, "passing exam result found");
                return Ok(true);
            }
        }

        let attempts: Vec<Attempt> = self.store.find_all_as(
            EntityKind::Attempt,
            &Filter::new()
                .eq("user_id", user.id.as_str())
                .eq("certification_id", certification.as_str())
                .eq("status", AttemptStatus::Completed.as_str()),
        )?;
        let passed = attempts
            .iter()
            .any(|a| a.score.map(|s| s >= PASS_THRESHOLD).unwrap_or(false));
        debug!(user_id = %user.id, certification_id = %certification, passed, "availability from attempts");
        Ok(passed)
    }
}

fn name_candidates(user: &User) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in [user.display_name.trim(), user.email.as_str()] {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}
