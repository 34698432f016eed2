//! Typed records parsed from logical rows.
//!
//! Parsing is lenient about types (numeric strings, integer ids) and strict
//! only about the fields a record cannot exist without.

use orivon_canonical::{AttemptId, CertificationId, Email, OrderRef, PaymentRef, PurchaseId, UserId};
use orivon_store::row::{boolean, integer, non_empty_text, number, text};
use orivon_store::{FromRow, ParseError, Row};
use serde::Serialize;
use serde_json::Value;

fn required(row: &Row, entity: &'static str, field: &'static str) -> Result<String, ParseError> {
    non_empty_text(row, field).ok_or(ParseError::MissingField { entity, field })
}

fn invalid(entity: &'static str, field: &'static str, value: impl ToString) -> ParseError {
    ParseError::InvalidValue {
        entity,
        field,
        value: value.to_string(),
    }
}

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Default role.
    Student,
    /// Operator with review and on-behalf rights.
    Admin,
}

impl Role {
    /// Interprets a stored role; `user`, unknown and missing values are students.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "admin" => Role::Admin,
            _ => Role::Student,
        }
    }

    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Admin => "admin",
        }
    }
}

/// Canonical user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Stable identity key.
    pub id: UserId,
    /// Normalized email.
    pub email: Email,
    /// Display name, defaulting to the email local part.
    pub display_name: String,
    /// Access level.
    pub role: Role,
}

impl User {
    /// True for admins.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl FromRow for User {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        let id = required(row, "user", "id")?;
        let raw_email = required(row, "user", "email")?;
        let email = Email::parse(&raw_email).map_err(|_| invalid("user", "email", &raw_email))?;
        let display_name = non_empty_text(row, "display_name")
            .unwrap_or_else(|| email.local_part().to_string());
        Ok(User {
            id: UserId::new(id),
            email,
            display_name,
            role: Role::from_stored(text(row, "role").as_deref()),
        })
    }
}

/// Purchasable certification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Certification {
    /// Identifier.
    pub id: CertificationId,
    /// Title shown on receipts and results.
    pub title: Option<String>,
    /// Price in major currency units; zero or less is free.
    pub price: f64,
    /// Whether the certification is on sale.
    pub active: bool,
}

impl FromRow for Certification {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        Ok(Certification {
            id: CertificationId::new(required(row, "certification", "id")?),
            title: non_empty_text(row, "title"),
            price: number(row, "price").unwrap_or(0.0),
            active: boolean(row, "active").unwrap_or(true),
        })
    }
}

/// Purchase lifecycle: created, then paid, then issued; or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Intent recorded, payment pending.
    Created,
    /// Payment verified.
    Paid,
    /// Certificate issued after a passing result.
    Issued,
    /// Payment failed.
    Failed,
}

impl PurchaseStatus {
    /// Parses the stored form.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" => Some(PurchaseStatus::Created),
            "paid" => Some(PurchaseStatus::Paid),
            "issued" => Some(PurchaseStatus::Issued),
            "failed" => Some(PurchaseStatus::Failed),
            _ => None,
        }
    }

    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseStatus::Created => "created",
            PurchaseStatus::Paid => "paid",
            PurchaseStatus::Issued => "issued",
            PurchaseStatus::Failed => "failed",
        }
    }
}

/// Purchase intent and its payment state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Purchase {
    /// Locally generated token.
    pub id: PurchaseId,
    /// Buyer.
    pub user_id: UserId,
    /// What was bought.
    pub certification_id: CertificationId,
    /// Price in major units at purchase time.
    pub amount: f64,
    /// Currency code as stored.
    pub currency: Option<String>,
    /// External order reference; absent on the free path.
    pub order_ref: Option<OrderRef>,
    /// Payment reference once verified.
    pub payment_ref: Option<PaymentRef>,
    /// Lifecycle state.
    pub status: PurchaseStatus,
    /// Creation time as stored.
    pub created_at: Option<String>,
}

impl FromRow for Purchase {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        let raw_status = required(row, "purchase", "status")?;
        let status = PurchaseStatus::parse(&raw_status)
            .ok_or_else(|| invalid("purchase", "status", &raw_status))?;
        Ok(Purchase {
            id: PurchaseId::new(required(row, "purchase", "id")?),
            user_id: UserId::new(required(row, "purchase", "user_id")?),
            certification_id: CertificationId::new(required(row, "purchase", "certification_id")?),
            amount: number(row, "amount").unwrap_or(0.0),
            currency: non_empty_text(row, "currency"),
            order_ref: non_empty_text(row, "order_ref").map(OrderRef::new),
            payment_ref: non_empty_text(row, "payment_ref").map(PaymentRef::new),
            status,
            created_at: non_empty_text(row, "created_at"),
        })
    }
}

/// Attempt lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// Exam in progress.
    Started,
    /// Answers scored, awaiting finalization.
    UnderReview,
    /// Finalized with a score.
    Completed,
}

impl AttemptStatus {
    /// Parses the stored form.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "started" => Some(AttemptStatus::Started),
            "under_review" => Some(AttemptStatus::UnderReview),
            "completed" => Some(AttemptStatus::Completed),
            _ => None,
        }
    }

    /// Stored form.
    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::Started => "started",
            AttemptStatus::UnderReview => "under_review",
            AttemptStatus::Completed => "completed",
        }
    }
}

/// Exam attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    /// Identifier.
    pub id: AttemptId,
    /// Candidate.
    pub user_id: UserId,
    /// Certification; absent on layouts that cannot store it.
    pub certification_id: Option<CertificationId>,
    /// Lifecycle state.
    pub status: AttemptStatus,
    /// Score once submitted.
    pub score: Option<i64>,
    /// Free-form client metadata.
    pub metadata: Value,
    /// Start time as stored.
    pub started_at: Option<String>,
    /// Reviewer notes.
    pub review_notes: Option<String>,
}

impl FromRow for Attempt {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        let raw_status = required(row, "attempt", "status")?;
        let status = AttemptStatus::parse(&raw_status)
            .ok_or_else(|| invalid("attempt", "status", &raw_status))?;
        Ok(Attempt {
            id: AttemptId::new(required(row, "attempt", "id")?),
            user_id: UserId::new(required(row, "attempt", "user_id")?),
            certification_id: non_empty_text(row, "certification_id").map(CertificationId::new),
            status,
            score: integer(row, "score"),
            metadata: row.get("metadata").cloned().unwrap_or(Value::Null),
            started_at: non_empty_text(row, "started_at"),
            review_notes: non_empty_text(row, "review_notes"),
        })
    }
}

/// Proctoring event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProctorEvent {
    /// Owning attempt.
    pub attempt_id: AttemptId,
    /// Event type, e.g. `tab_switch`.
    pub event_type: String,
    /// Free-form payload.
    pub metadata: Value,
    /// Time as stored.
    pub occurred_at: Option<String>,
}

impl FromRow for ProctorEvent {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        Ok(ProctorEvent {
            attempt_id: AttemptId::new(required(row, "proctor_event", "attempt_id")?),
            event_type: required(row, "proctor_event", "event_type")?,
            metadata: row.get("metadata").cloned().unwrap_or(Value::Null),
            occurred_at: non_empty_text(row, "occurred_at"),
        })
    }
}

/// Question bank entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    /// Identifier referenced by answers.
    pub id: String,
    /// Prompt.
    pub text: Option<String>,
    /// Options as stored.
    pub options: Value,
    /// Weight; 1 when unspecified.
    pub marks: i64,
    /// Correct option, rendered as text.
    #[serde(skip)]
    pub correct: Option<String>,
}

impl FromRow for Question {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        Ok(Question {
            id: required(row, "question", "id")?,
            text: non_empty_text(row, "text"),
            options: row.get("options").cloned().unwrap_or(Value::Null),
            marks: integer(row, "marks").unwrap_or(1),
            correct: text(row, "correct"),
        })
    }
}

/// Denormalized exam result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamResult {
    /// Title of the exam.
    pub title: Option<String>,
    /// Name the result was recorded under.
    pub name_of_user: Option<String>,
    /// Recorded score.
    pub passing_score: f64,
    /// Pass flag, where the layout stores one.
    pub pass: Option<bool>,
    /// Numeric attempt reference, where known.
    pub attempt_ref: Option<i64>,
}

impl FromRow for ExamResult {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        Ok(ExamResult {
            title: non_empty_text(row, "title"),
            name_of_user: non_empty_text(row, "name_of_user"),
            passing_score: number(row, "passing_score").ok_or(ParseError::MissingField {
                entity: "exam_result",
                field: "passing_score",
            })?,
            pass: boolean(row, "pass"),
            attempt_ref: integer(row, "attempt_ref"),
        })
    }
}

/// Audit ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    /// Identifier, where the layout generates one.
    pub id: Option<String>,
    /// Payer email as recorded.
    pub email: String,
    /// Audit price; nominal, not the purchase amount.
    pub price: i64,
    /// Course title, if recorded.
    pub course_title: Option<String>,
    /// Time as stored.
    pub created_at: Option<String>,
}

impl FromRow for Transaction {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        Ok(Transaction {
            id: non_empty_text(row, "id"),
            email: required(row, "transaction", "email")?,
            price: integer(row, "price").unwrap_or(0),
            course_title: non_empty_text(row, "course_title"),
            created_at: non_empty_text(row, "created_at"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn user_defaults() {
        let user = User::from_row(&row(json!({"id": 7, "email": "Ann@X.com", "role": "user"}))).unwrap();
        assert_eq!(user.id.as_str(), "7");
        assert_eq!(user.email.as_str(), "ann@x.com");
        assert_eq!(user.display_name, "ann");
        assert_eq!(user.role, Role::Student);
        assert!(User::from_row(&row(json!({"email": "a@b.co"}))).is_err());
    }

    #[test]
    fn question_marks_default_to_one() {
        let q = Question::from_row(&row(json!({"id": "q1", "correct": 2}))).unwrap();
        assert_eq!(q.marks, 1);
        assert_eq!(q.correct.as_deref(), Some("2"));
    }

    #[test]
    fn unknown_status_is_invalid() {
        let err = Attempt::from_row(&row(json!({"id": "a", "user_id": "u", "status": "paused"})))
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { field: "status", .. }));
    }
}
