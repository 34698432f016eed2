//! Logical entity schemas.
//!
//! Each entity kind lists its physical table names and, per logical field,
//! the physical column names it has been stored under, most current first.
//! The adapter walks these lists; nothing above the adapter sees a physical
//! name.

use crate::row::Row;

/// One logical field and its candidate physical columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Logical field name.
    pub name: &'static str,
    /// Candidate physical columns, tried in order.
    pub columns: &'static [&'static str],
    /// Writes fail instead of dropping this field when no column accepts it.
    pub mandatory: bool,
}

/// Physical layout candidates for one entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    /// Logical entity name used in errors and logs.
    pub entity: &'static str,
    /// Candidate physical tables, tried in order.
    pub tables: &'static [&'static str],
    /// Logical fields.
    pub fields: &'static [FieldSpec],
}

/// The logical entities persisted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// Canonical user records.
    User,
    /// Purchasable certifications.
    Certification,
    /// Purchase intents and their payment state.
    Purchase,
    /// Exam attempts.
    Attempt,
    /// Append-only proctoring events.
    ProctorEvent,
    /// Denormalized exam results.
    ExamResult,
    /// Question bank entries.
    Question,
    /// Transaction audit ledger entries.
    Transaction,
}

const fn field(
    name: &'static str,
    columns: &'static [&'static str],
    mandatory: bool,
) -> FieldSpec {
    FieldSpec {
        name,
        columns,
        mandatory,
    }
}

static USER: EntitySchema = EntitySchema {
    entity: "user",
    tables: &["User", "users", "users_table"],
    fields: &[
        field("id", &["User_id", "user_id", "id", "UserId"], false),
        field("email", &["email"], true),
        field("display_name", &["displayName", "display_name", "name"], false),
        field("role", &["role"], false),
        field("created_at", &["created_at"], false),
    ],
};

static CERTIFICATION: EntitySchema = EntitySchema {
    entity: "certification",
    tables: &["certifications"],
    fields: &[
        field("id", &["id"], true),
        field("title", &["title", "name"], false),
        field("description", &["description"], false),
        field("price", &["price_numeric", "price"], false),
        field("active", &["active"], false),
        field("duration_minutes", &["duration_minutes"], false),
        field("passing_score", &["passing_score"], false),
    ],
};

static PURCHASE: EntitySchema = EntitySchema {
    entity: "purchase",
    tables: &["purchases"],
    fields: &[
        field("id", &["id"], true),
        field("user_id", &["user_id", "User_id"], true),
        field("certification_id", &["certification_id", "cert_id"], true),
        field("amount", &["amount"], false),
        field("currency", &["currency"], false),
        field("order_ref", &["razorpay_order_id", "order_id"], false),
        field("payment_ref", &["razorpay_payment_id", "payment_id"], false),
        field("signature", &["razorpay_signature", "signature"], false),
        field("status", &["status"], true),
        field("created_at", &["created_at", "inserted_at"], false),
    ],
};

static ATTEMPT: EntitySchema = EntitySchema {
    entity: "attempt",
    tables: &["attempts"],
    fields: &[
        field("id", &["id"], true),
        field("user_id", &["user_id", "User_id", "UserId"], true),
        field(
            "certification_id",
            &["certification_id", "exma_id", "certificationId", "cert_id"],
            false,
        ),
        field("status", &["status", "state"], true),
        field("score", &["score", "passing_score", "points"], true),
        field("metadata", &["metadata"], false),
        field("started_at", &["started_at"], false),
        field("review_notes", &["review_notes"], false),
    ],
};

static PROCTOR_EVENT: EntitySchema = EntitySchema {
    entity: "proctor_event",
    tables: &["proctor_events"],
    fields: &[
        field("id", &["id"], false),
        field("attempt_id", &["attempt_id"], true),
        field("event_type", &["event_type"], true),
        field("metadata", &["metadata"], false),
        field("occurred_at", &["occurred_at", "created_at"], false),
    ],
};

static EXAM_RESULT: EntitySchema = EntitySchema {
    entity: "exam_result",
    tables: &["exams"],
    fields: &[
        field("attempt_ref", &["exma_id"], false),
        field("title", &["title"], false),
        field("name_of_user", &["nameofuser", "name", "Name"], false),
        field("passing_score", &["passing_score", "score"], true),
        field("pass", &["pass_status"], false),
        field("questions", &["questions"], false),
        field("created_at", &["created_at", "inserted_at"], false),
    ],
};

static QUESTION: EntitySchema = EntitySchema {
    entity: "question",
    tables: &["questions"],
    fields: &[
        field("id", &["question_id", "id"], true),
        field("certification_id", &["exma_id", "certification_id"], true),
        field("text", &["text", "question"], false),
        field("options", &["options"], false),
        field("marks", &["marks"], false),
        field("correct", &["correct_index", "correct_option", "answer"], false),
    ],
};

static TRANSACTION: EntitySchema = EntitySchema {
    entity: "transaction",
    tables: &["transactions"],
    fields: &[
        field("id", &["id", "transaction_id"], false),
        field("email", &["mailid", "email"], true),
        field("price", &["price", "amount"], true),
        field("course_title", &["course_title", "course", "certification"], false),
        field("created_at", &["created_at", "inserted_at"], false),
    ],
};

impl EntityKind {
    /// The schema candidates for this kind.
    pub fn schema(self) -> &'static EntitySchema {
        match self {
            EntityKind::User => &USER,
            EntityKind::Certification => &CERTIFICATION,
            EntityKind::Purchase => &PURCHASE,
            EntityKind::Attempt => &ATTEMPT,
            EntityKind::ProctorEvent => &PROCTOR_EVENT,
            EntityKind::ExamResult => &EXAM_RESULT,
            EntityKind::Question => &QUESTION,
            EntityKind::Transaction => &TRANSACTION,
        }
    }
}

impl EntitySchema {
    /// Looks up a logical field.
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Candidate columns of a logical field. Unknown names map to themselves.
    pub fn columns_of(&self, name: &str) -> Vec<String> {
        match self.field(name) {
            Some(spec) => spec.columns.iter().map(|c| c.to_string()).collect(),
            None => vec![name.to_string()],
        }
    }

    /// Whether a logical field must survive writes.
    pub fn is_mandatory(&self, name: &str) -> bool {
        self.field(name).map(|f| f.mandatory).unwrap_or(false)
    }

    /// Rewrites a physical row into logical field names.
    ///
    /// For each field the first candidate column holding a non-null value
    /// wins; every candidate column of the field is consumed. Columns that
    /// belong to no field pass through unchanged.
    pub fn to_logical(&self, mut physical: Row) -> Row {
        let mut logical = Row::new();
        for spec in self.fields {
            let mut chosen = None;
            for column in spec.columns {
                if let Some(value) = physical.remove(*column) {
                    if chosen.is_none() && !value.is_null() {
                        chosen = Some(value);
                    }
                }
            }
            if let Some(value) = chosen {
                logical.insert(spec.name.to_string(), value);
            }
        }
        for (column, value) in physical {
            logical.entry(column).or_insert(value);
        }
        logical
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_column_is_claimed_by_two_fields() {
        for kind in [
            EntityKind::User,
            EntityKind::Certification,
            EntityKind::Purchase,
            EntityKind::Attempt,
            EntityKind::ProctorEvent,
            EntityKind::ExamResult,
            EntityKind::Question,
            EntityKind::Transaction,
        ] {
            let schema = kind.schema();
            let mut seen = std::collections::HashSet::new();
            for spec in schema.fields {
                for column in spec.columns {
                    assert!(seen.insert(*column), "{} claims {column} twice", schema.entity);
                }
            }
        }
    }

    #[test]
    fn first_non_null_candidate_wins() {
        let physical = json!({
            "User_id": null,
            "id": "u-1",
            "displayName": "Jane",
            "email": "jane@x.com",
            "extra": 1
        });
        let logical = EntityKind::User
            .schema()
            .to_logical(physical.as_object().cloned().unwrap());
        assert_eq!(logical["id"], json!("u-1"));
        assert_eq!(logical["display_name"], json!("Jane"));
        assert_eq!(logical["extra"], json!(1));
        assert!(!logical.contains_key("User_id"));
        assert!(!logical.contains_key("displayName"));
    }
}
