use orivon_store::{
    layout, EntityKind, FileStore, Filter, FromRow, MemoryStore, ParseError, RecordAdapter, Row,
    StoreError, TabularStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn adapter_over(layout: Vec<(&str, orivon_store::TableDef)>) -> (Arc<MemoryStore>, RecordAdapter) {
    let store = Arc::new(MemoryStore::with_layout(layout));
    (store.clone(), RecordAdapter::new(store))
}

#[test]
fn test_user_round_trip_in_current_layout() {
    let (store, adapter) = adapter_over(layout::current());
    let written = adapter
        .insert(
            EntityKind::User,
            row(json!({"id": "u1", "email": "jane@example.com", "display_name": "Jane", "role": "student"})),
        )
        .unwrap();
    assert_eq!(written["display_name"], json!("Jane"));

    let physical = &store.rows("User")[0];
    assert_eq!(physical["User_id"], json!("u1"));
    assert_eq!(physical["displayName"], json!("Jane"));

    let found = adapter
        .find(EntityKind::User, &Filter::new().eq("email", "jane@example.com"))
        .unwrap()
        .unwrap();
    assert_eq!(found["id"], json!("u1"));
    assert_eq!(found["display_name"], json!("Jane"));
    assert!(!found.contains_key("User_id"));
}

#[test]
fn test_legacy_layout_falls_back_to_other_tables_and_columns() {
    let (store, adapter) = adapter_over(layout::legacy());
    adapter
        .insert(
            EntityKind::User,
            row(json!({"id": "u1", "email": "a@b.co", "display_name": "A"})),
        )
        .unwrap();

    let physical = &store.rows("users")[0];
    assert_eq!(physical["user_id"], json!("u1"));
    assert_eq!(physical["display_name"], json!("A"));

    let found = adapter
        .find(EntityKind::User, &Filter::new().eq("id", "u1"))
        .unwrap()
        .unwrap();
    assert_eq!(found["email"], json!("a@b.co"));
}

#[test]
fn test_optional_field_is_stripped() {
    let (store, adapter) = adapter_over(layout::legacy());
    let written = adapter
        .insert(
            EntityKind::Attempt,
            row(json!({
                "id": "a1",
                "user_id": "u1",
                "certification_id": "c1",
                "status": "started",
                "score": 0,
                "review_notes": "none"
            })),
        )
        .unwrap();
    assert!(!written.contains_key("certification_id"));
    assert_eq!(written["status"], json!("started"));

    let physical = &store.rows("attempts")[0];
    assert_eq!(physical["state"], json!("started"));
    assert_eq!(physical["points"], json!(0));
}

#[test]
fn test_mandatory_field_without_column_fails() {
    let store = Arc::new(MemoryStore::with_layout(vec![(
        "transactions",
        orivon_store::TableDef::new(&["id", "mailid"]).serial("id"),
    )]));
    let adapter = RecordAdapter::new(store.clone());
    let err = adapter
        .insert(
            EntityKind::Transaction,
            row(json!({"email": "a@b.co", "price": 1})),
        )
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::SchemaMismatch {
            entity: "transaction",
            field: "price".into()
        }
    );
    assert!(store.rows("transactions").is_empty());
}

#[test]
fn test_unknown_tables_everywhere_reads_absent_but_writes_fail() {
    let (_, adapter) = adapter_over(Vec::new());
    assert_eq!(
        adapter
            .find(EntityKind::User, &Filter::new().eq("email", "x@y.z"))
            .unwrap(),
        None
    );
    assert!(matches!(
        adapter.insert(EntityKind::User, row(json!({"email": "x@y.z"}))),
        Err(StoreError::UnknownTable(_))
    ));
}

#[test]
fn test_outage_is_not_absence() {
    let (store, adapter) = adapter_over(layout::current());
    store.set_unavailable(true);
    assert!(matches!(
        adapter.find(EntityKind::User, &Filter::new().eq("email", "x@y.z")),
        Err(StoreError::Unavailable(_))
    ));
}

#[test]
fn test_reads_try_every_candidate_filter_column() {
    let store = Arc::new(MemoryStore::with_layout(vec![(
        "exams",
        orivon_store::TableDef::new(&["id", "Name", "score"]).serial("id"),
    )]));
    store
        .insert("exams", row(json!({"Name": "Jane Doe", "score": 80})))
        .unwrap();
    let adapter = RecordAdapter::new(store);
    let results = adapter
        .find_all(
            EntityKind::ExamResult,
            &Filter::new().eq("name_of_user", "Jane Doe"),
        )
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["passing_score"], json!(80));
    assert_eq!(results[0]["name_of_user"], json!("Jane Doe"));
}

#[test]
fn test_upsert_merges_on_conflict_field() {
    let (store, adapter) = adapter_over(layout::current());
    adapter
        .upsert(
            EntityKind::User,
            row(json!({"id": "u1", "email": "a@b.co", "role": "student"})),
            "email",
        )
        .unwrap();
    let merged = adapter
        .upsert(
            EntityKind::User,
            row(json!({"email": "a@b.co", "role": "admin"})),
            "email",
        )
        .unwrap();
    assert_eq!(merged["id"], json!("u1"));
    assert_eq!(merged["role"], json!("admin"));
    assert_eq!(store.rows("User").len(), 1);
}

#[test]
fn test_update_maps_key_and_fields() {
    let (store, adapter) = adapter_over(layout::legacy());
    adapter
        .insert(
            EntityKind::Purchase,
            row(json!({"id": "p1", "user_id": "u1", "certification_id": "c1", "status": "created"})),
        )
        .unwrap();
    let updated = adapter
        .update(
            EntityKind::Purchase,
            &Filter::new().eq("id", "p1"),
            row(json!({"status": "paid", "payment_ref": "pay_1"})),
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated["status"], json!("paid"));
    assert_eq!(updated["payment_ref"], json!("pay_1"));
    assert_eq!(store.rows("purchases")[0]["payment_id"], json!("pay_1"));

    let missing = adapter
        .update(
            EntityKind::Purchase,
            &Filter::new().eq("id", "nope"),
            row(json!({"status": "paid"})),
        )
        .unwrap();
    assert!(missing.is_none());
}

#[test]
fn test_unique_violation_propagates() {
    let (_, adapter) = adapter_over(layout::current());
    adapter
        .insert(EntityKind::User, row(json!({"id": "u1", "email": "a@b.co"})))
        .unwrap();
    assert!(matches!(
        adapter.insert(EntityKind::User, row(json!({"id": "u2", "email": "a@b.co"}))),
        Err(StoreError::UniqueViolation { .. })
    ));
}

struct Named {
    email: String,
}

impl FromRow for Named {
    fn from_row(row: &Row) -> Result<Self, ParseError> {
        orivon_store::row::text(row, "email")
            .map(|email| Named { email })
            .ok_or(ParseError::MissingField {
                entity: "user",
                field: "email",
            })
    }
}

#[test]
fn test_typed_reads_skip_malformed_rows() {
    let store = Arc::new(MemoryStore::with_layout(layout::current()));
    store
        .insert("User", row(json!({"User_id": "u1", "email": "a@b.co", "role": "student"})))
        .unwrap();
    store
        .insert("User", row(json!({"User_id": "u2", "role": "student"})))
        .unwrap();
    let adapter = RecordAdapter::new(store);
    let users: Vec<Named> = adapter
        .find_all_as(EntityKind::User, &Filter::new().eq("role", "student"))
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].email, "a@b.co");
}

#[test]
fn test_file_store_persists_between_opens() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("store.json");

    {
        let adapter = RecordAdapter::new(FileStore::open(&path).unwrap());
        adapter
            .insert(EntityKind::User, row(json!({"id": "u1", "email": "a@b.co"})))
            .unwrap();
    }

    let reopened = FileStore::open(&path).unwrap();
    let rows = reopened.select("User", &Filter::new()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], json!("a@b.co"));
}
