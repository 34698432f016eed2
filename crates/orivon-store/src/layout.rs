//! Physical table layouts.
//!
//! `current` mirrors the production schema. `legacy` mirrors an older
//! deployment: different user table and column names, attempts without a
//! certification column, exam results without a pass flag and a ledger
//! without course titles.

use crate::memory::TableDef;

/// Tables of the current production schema.
pub fn current() -> Vec<(&'static str, TableDef)> {
    vec![
        (
            "User",
            TableDef::new(&["User_id", "email", "displayName", "role", "created_at"])
                .unique(&["User_id", "email"])
                .uuid("User_id"),
        ),
        (
            "certifications",
            TableDef::new(&[
                "id",
                "title",
                "description",
                "price_numeric",
                "price",
                "active",
                "duration_minutes",
                "passing_score",
            ])
            .unique(&["id"]),
        ),
        (
            "purchases",
            TableDef::new(&[
                "id",
                "user_id",
                "certification_id",
                "amount",
                "currency",
                "razorpay_order_id",
                "razorpay_payment_id",
                "razorpay_signature",
                "status",
                "created_at",
            ])
            .unique(&["id"]),
        ),
        (
            "attempts",
            TableDef::new(&[
                "id",
                "user_id",
                "certification_id",
                "status",
                "score",
                "metadata",
                "started_at",
                "review_notes",
            ])
            .unique(&["id"]),
        ),
        (
            "proctor_events",
            TableDef::new(&["id", "attempt_id", "event_type", "metadata", "occurred_at"])
                .serial("id"),
        ),
        (
            "exams",
            TableDef::new(&[
                "id",
                "exma_id",
                "title",
                "nameofuser",
                "passing_score",
                "pass_status",
                "questions",
                "created_at",
            ])
            .serial("id"),
        ),
        (
            "questions",
            TableDef::new(&["question_id", "exma_id", "text", "options", "marks", "correct_index"])
                .unique(&["question_id"]),
        ),
        (
            "transactions",
            TableDef::new(&["id", "mailid", "price", "course_title", "created_at"]).serial("id"),
        ),
    ]
}

/// Tables of the legacy schema.
pub fn legacy() -> Vec<(&'static str, TableDef)> {
    vec![
        (
            "users",
            TableDef::new(&["user_id", "email", "display_name", "role", "created_at"])
                .unique(&["user_id", "email"])
                .uuid("user_id"),
        ),
        (
            "certifications",
            TableDef::new(&["id", "name", "price", "active"]).unique(&["id"]),
        ),
        (
            "purchases",
            TableDef::new(&[
                "id",
                "user_id",
                "cert_id",
                "amount",
                "currency",
                "order_id",
                "payment_id",
                "signature",
                "status",
                "inserted_at",
            ])
            .unique(&["id"]),
        ),
        (
            "attempts",
            TableDef::new(&["id", "user_id", "state", "points", "metadata", "started_at"])
                .unique(&["id"]),
        ),
        (
            "proctor_events",
            TableDef::new(&["id", "attempt_id", "event_type", "created_at"]).serial("id"),
        ),
        (
            "exams",
            TableDef::new(&["id", "exma_id", "title", "Name", "score"]).serial("id"),
        ),
        (
            "questions",
            TableDef::new(&["id", "certification_id", "question", "options", "answer"])
                .unique(&["id"]),
        ),
        (
            "transactions",
            TableDef::new(&["transaction_id", "email", "amount", "inserted_at"])
                .serial("transaction_id"),
        ),
    ]
}
