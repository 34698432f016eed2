//! Attempt Engine.
//!
//! Attempts move `started -> under_review -> completed`. Completion also
//! writes a denormalized exam result and, on a pass, issues the matching
//! purchase; both are secondary writes whose failures are reported, not
//! raised.

use crate::availability::PASS_THRESHOLD;
use crate::errors::{CoreError, PartialWriteFailure};
use crate::purchase::issue_latest;
use crate::records::{Attempt, AttemptStatus, ProctorEvent, Question, User};
use orivon_canonical::{AttemptId, CertificationId, PurchaseId, Timestamp};
use orivon_store::row::render;
use orivon_store::{EntityKind, Filter, FromRow, RecordAdapter, Row, StoreError};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// One submitted answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Question the answer refers to.
    #[serde(deserialize_with = "text_or_number")]
    pub question_id: String,
    /// Chosen option, as text or index.
    #[serde(alias = "selected")]
    pub selected_option: Value,
}

impl Answer {
    /// Builds an answer.
    pub fn new(question_id: impl Into<String>, selected_option: impl Into<Value>) -> Self {
        Self {
            question_id: question_id.into(),
            selected_option: selected_option.into(),
        }
    }
}

fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!("invalid question id: {other}"))),
    }
}

/// Result of `start`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartedAttempt {
    /// Attempt id, generated locally.
    pub attempt_id: AttemptId,
    /// Questions without their correct options.
    pub questions: Vec<Question>,
    /// False when the attempt row could not be stored.
    pub persisted: bool,
}

/// Result of `submit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    /// Scored attempt.
    pub attempt_id: AttemptId,
    /// Always `under_review`.
    pub status: AttemptStatus,
    /// Total marks.
    pub score: i64,
}

/// Input of `complete`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionRequest {
    /// Final score.
    pub score: i64,
    /// Whether the candidate passed.
    #[serde(default)]
    pub pass: bool,
    /// Exam title for the result record.
    #[serde(default)]
    pub title: Option<String>,
    /// Name the result is recorded under.
    #[serde(default)]
    pub name_of_user: Option<String>,
    /// Question payload kept with the result.
    #[serde(default)]
    pub questions: Option<Value>,
}

/// Result of `complete`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionOutcome {
    /// Completed attempt.
    pub attempt_id: AttemptId,
    /// Always `completed`.
    pub status: AttemptStatus,
    /// Recorded score.
    pub score: i64,
    /// Whether the denormalized exam result was written.
    pub exam_result_recorded: bool,
    /// Purchase now issued for this pass, if any.
    pub issued_purchase: Option<PurchaseId>,
    /// Secondary writes that failed.
    pub partial_failures: Vec<PartialWriteFailure>,
}

/// Total marks for `answers` against `questions`.
///
/// Each answer whose option matches its question's correct option adds
/// that question's marks. Unknown question references score nothing.
pub fn score_answers(questions: &[Question], answers: &[Answer]) -> i64 {
    let bank: HashMap<&str, &Question> = questions.iter().map(|q| (q.id.as_str(), q)).collect();
    answers
        .iter()
        .filter_map(|answer| {
            let question = bank.get(answer.question_id.as_str())?;
            let correct = question.correct.as_deref()?;
            (correct.trim() == render(&answer.selected_option).trim()).then_some(question.marks)
        })
        .sum()
}

/// Exam attempts, proctoring events and scoring.
#[derive(Debug, Clone)]
pub struct AttemptEngine {
    store: RecordAdapter,
}

impl AttemptEngine {
    /// Creates an engine over the store.
    pub fn new(store: RecordAdapter) -> Self {
        Self { store }
    }

    /// Starts an attempt and hands out the question set.
    ///
    /// A failed attempt insert is logged and the generated id is still
    /// returned so the exam can proceed and be reconciled later. Only
    /// uniqueness and payload errors are raised.
    pub fn start(
        &self,
        user: &User,
        certification: &CertificationId,
        metadata: Value,
    ) -> Result<StartedAttempt, CoreError> {
        let attempt_id = AttemptId::generate();
        let mut row = Row::new();
        row.insert("id".into(), Value::from(attempt_id.as_str()));
        row.insert("user_id".into(), Value::from(user.id.as_str()));
        row.insert("certification_id".into(), Value::from(certification.as_str()));
        row.insert("status".into(), Value::from(AttemptStatus::Started.as_str()));
        row.insert(
            "metadata".into(),
            if metadata.is_null() {
                Value::Object(Row::new())
            } else {
                metadata
            },
        );
        row.insert("started_at".into(), Value::from(Timestamp::now().as_str()));

        let persisted = match self.store.insert(EntityKind::Attempt, row) {
            Ok(_) => true,
            Err(
                e @ (StoreError::Unavailable(_)
                | StoreError::UnknownTable(_)
                | StoreError::UnknownColumn { .. }
                | StoreError::SchemaMismatch { .. }
                | StoreError::Rejected { .. }),
            ) => {
                warn!(attempt_id = %attempt_id, error = %e, "attempt not stored, continuing");
                false
            }
            Err(e) => return Err(e.into()),
        };

        let questions = self
            .questions_for(certification)?
            .into_iter()
            .map(|mut q| {
                q.correct = None;
                q
            })
            .collect();
        info!(attempt_id = %attempt_id, persisted, "attempt started");
        Ok(StartedAttempt {
            attempt_id,
            questions,
            persisted,
        })
    }

    /// Loads an attempt; absence is `NotFound`.
    pub fn get(&self, attempt_id: &AttemptId) -> Result<Attempt, CoreError> {
        self.store
            .find_as(EntityKind::Attempt, &Filter::new().eq("id", attempt_id.as_str()))?
            .ok_or_else(|| CoreError::not_found("attempt", attempt_id))
    }

    /// Appends a proctoring event to an existing attempt.
    pub fn record_event(
        &self,
        attempt_id: &AttemptId,
        event_type: &str,
        metadata: Value,
    ) -> Result<ProctorEvent, CoreError> {
        let event_type = event_type.trim();
        if event_type.is_empty() {
            return Err(CoreError::BadRequest("event type is empty".into()));
        }
        self.get(attempt_id)?;

        let mut row = Row::new();
        row.insert("attempt_id".into(), Value::from(attempt_id.as_str()));
        row.insert("event_type".into(), Value::from(event_type));
        row.insert(
            "metadata".into(),
            if metadata.is_null() {
                Value::Object(Row::new())
            } else {
                metadata
            },
        );
        row.insert("occurred_at".into(), Value::from(Timestamp::now().as_str()));
        let stored = self.store.insert(EntityKind::ProctorEvent, row)?;
        debug!(attempt_id = %attempt_id, event_type, "proctor event recorded");
        ProctorEvent::from_row(&stored).map_err(|e| CoreError::Store(e.into()))
    }

    /// Proctoring events of an attempt, in recording order.
    pub fn events(&self, attempt_id: &AttemptId) -> Result<Vec<ProctorEvent>, CoreError> {
        self.get(attempt_id)?;
        Ok(self.store.find_all_as(
            EntityKind::ProctorEvent,
            &Filter::new().eq("attempt_id", attempt_id.as_str()),
        )?)
    }

    /// Scores submitted answers and moves the attempt to `under_review`.
    pub fn submit(
        &self,
        attempt_id: &AttemptId,
        answers: &[Answer],
    ) -> Result<Submission, CoreError> {
        let attempt = self.get(attempt_id)?;
        if attempt.status == AttemptStatus::Completed {
            return Err(CoreError::BadRequest("attempt is already completed".into()));
        }
        let Some(certification) = attempt.certification_id.as_ref() else {
            return Err(CoreError::BadRequest(
                "attempt has no certification reference".into(),
            ));
        };

        let questions = self.questions_for(certification)?;
        let score = score_answers(&questions, answers);

        let mut changes = Row::new();
        changes.insert("status".into(), Value::from(AttemptStatus::UnderReview.as_str()));
        changes.insert("score".into(), Value::from(score));
        self.store
            .update(
                EntityKind::Attempt,
                &Filter::new().eq("id", attempt_id.as_str()),
                changes,
            )?
            .ok_or_else(|| CoreError::not_found("attempt", attempt_id))?;

        info!(attempt_id = %attempt_id, score, "attempt submitted");
        Ok(Submission {
            attempt_id: attempt.id,
            status: AttemptStatus::UnderReview,
            score,
        })
    }

    /// Finalizes an attempt with a supplied score.
    ///
    /// The attempt update is the primary effect and its failure is raised.
    /// An attempt that was never stored (degraded start) is reported as a
    /// partial failure and the exam result is still written. The exam
    /// result row and purchase issuance are secondary.
    pub fn complete(
        &self,
        attempt_id: &AttemptId,
        request: &CompletionRequest,
    ) -> Result<CompletionOutcome, CoreError> {
        let mut partial_failures = Vec::new();

        let mut changes = Row::new();
        changes.insert("status".into(), Value::from(AttemptStatus::Completed.as_str()));
        changes.insert("score".into(), Value::from(request.score));
        let attempt = match self.store.update(
            EntityKind::Attempt,
            &Filter::new().eq("id", attempt_id.as_str()),
            changes,
        )? {
            Some(row) => Some(Attempt::from_row(&row).map_err(|e| CoreError::Store(e.into()))?),
            None => {
                warn!(attempt_id = %attempt_id, "attempt not stored, recording exam result only");
                partial_failures.push(PartialWriteFailure::new(
                    "attempt",
                    format!("attempt not found: {attempt_id}"),
                ));
                None
            }
        };
        info!(attempt_id = %attempt_id, score = request.score, pass = request.pass, "attempt completed");

        let exam_result_recorded = match self.write_exam_result(attempt_id, request) {
            Ok(()) => true,
            Err(e) => {
                warn!(attempt_id = %attempt_id, error = %e, "exam result not recorded");
                partial_failures.push(PartialWriteFailure::new("exam_result", e));
                false
            }
        };

        let mut issued_purchase = None;
        let passed = request.pass && request.score >= PASS_THRESHOLD;
        match attempt.as_ref() {
            Some(attempt) if passed => match attempt.certification_id.as_ref() {
                Some(certification) => {
                    match issue_latest(&self.store, &attempt.user_id, certification) {
                        Ok(issued) => issued_purchase = issued,
                        Err(e) => {
                            warn!(attempt_id = %attempt_id, error = %e, "purchase not issued");
                            partial_failures.push(PartialWriteFailure::new("purchase", e));
                        }
                    }
                }
                None => {
                    warn!(attempt_id = %attempt_id, "attempt has no certification, nothing to issue");
                    partial_failures.push(PartialWriteFailure::new(
                        "purchase",
                        "attempt has no certification reference",
                    ));
                }
            },
            None if passed => {
                debug!(attempt_id = %attempt_id, "no stored attempt, issuance skipped");
            }
            _ if request.pass => {
                debug!(attempt_id = %attempt_id, score = request.score, "pass flag below threshold, not issuing");
            }
            _ => {}
        }

        Ok(CompletionOutcome {
            attempt_id: attempt_id.clone(),
            status: AttemptStatus::Completed,
            score: request.score,
            exam_result_recorded,
            issued_purchase,
            partial_failures,
        })
    }

    /// Administrative review: sets status, and optionally score and notes.
    pub fn review(
        &self,
        attempt_id: &AttemptId,
        status: AttemptStatus,
        score: Option<i64>,
        notes: Option<&str>,
    ) -> Result<Attempt, CoreError> {
        let mut changes = Row::new();
        changes.insert("status".into(), Value::from(status.as_str()));
        if let Some(score) = score {
            changes.insert("score".into(), Value::from(score));
        }
        if let Some(notes) = notes {
            changes.insert("review_notes".into(), Value::from(notes));
        }
        let row = self
            .store
            .update(
                EntityKind::Attempt,
                &Filter::new().eq("id", attempt_id.as_str()),
                changes,
            )?
            .ok_or_else(|| CoreError::not_found("attempt", attempt_id))?;
        Attempt::from_row(&row).map_err(|e| CoreError::Store(e.into()))
    }

    /// Question bank of a certification, including correct options.
    pub fn questions_for(&self, certification: &CertificationId) -> Result<Vec<Question>, CoreError> {
        Ok(self.store.find_all_as(
            EntityKind::Question,
            &Filter::new().eq("certification_id", certification.as_str()),
        )?)
    }

    fn write_exam_result(
        &self,
        attempt_id: &AttemptId,
        request: &CompletionRequest,
    ) -> Result<(), CoreError> {
        let mut row = Row::new();
        if let Some(serial) = attempt_id.as_serial() {
            row.insert("attempt_ref".into(), Value::from(serial));
        }
        if let Some(title) = &request.title {
            row.insert("title".into(), Value::from(title.as_str()));
        }
        if let Some(name) = &request.name_of_user {
            row.insert("name_of_user".into(), Value::from(name.as_str()));
        }
        row.insert("passing_score".into(), Value::from(request.score));
        row.insert("pass".into(), Value::from(request.pass));
        if let Some(questions) = &request.questions {
            row.insert("questions".into(), questions.clone());
        }
        row.insert("created_at".into(), Value::from(Timestamp::now().as_str()));
        self.store.insert(EntityKind::ExamResult, row)?;
        Ok(())
    }
}
