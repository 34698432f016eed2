//! End-to-end tests of the `orivon` binary over a snapshot store.

use orivon_canonical::{sign_payment, OrderRef, PaymentRef};
use orivon_store::{FileStore, Row, TabularStore};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const PAYMENT_SECRET: &str = "rzp_test_secret";

struct Workspace {
    dir: TempDir,
    snapshot: PathBuf,
}

fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("orivon.toml"),
        format!(
            r#"
            [credentials]
            secret = "cli-test-secret"

            [payments]
            key_secret = "{PAYMENT_SECRET}"

            [identity]
            admin_emails = ["boss@orivon.dev"]
            "#
        ),
    )
    .unwrap();

    let snapshot = dir.path().join("store.json");
    let store = FileStore::open(&snapshot).unwrap();
    store
        .insert(
            "certifications",
            row(json!({"id": "free-101", "title": "Orientation", "price_numeric": 0, "active": true})),
        )
        .unwrap();
    store
        .insert(
            "certifications",
            row(json!({"id": "rust-201", "title": "Rust Fundamentals", "price_numeric": 499.0, "active": true})),
        )
        .unwrap();
    for (id, correct, marks) in [("q1", "B", 50), ("q2", "A", 50)] {
        store
            .insert(
                "questions",
                row(json!({
                    "question_id": id,
                    "exma_id": "free-101",
                    "options": ["A", "B", "C"],
                    "marks": marks,
                    "correct_index": correct
                })),
            )
            .unwrap();
    }
    Workspace { dir, snapshot }
}

fn run_cli(ws: &Workspace, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_orivon"))
        .env_clear()
        .current_dir(ws.dir.path())
        .arg("--store")
        .arg(&ws.snapshot)
        .args(args)
        .output()
        .expect("Failed to execute CLI");

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8(output.stderr).unwrap();
    (output.status.success(), stdout, stderr)
}

fn run_json(ws: &Workspace, args: &[&str]) -> Value {
    let (success, stdout, stderr) = run_cli(ws, args);
    assert!(success, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).unwrap()
}

fn sign_in(ws: &Workspace, email: &str) -> (String, Value) {
    let session = run_json(ws, &["sign-in", "--email", email, "--name", "Jane Doe"]);
    let token = session["access_token"].as_str().unwrap().to_string();
    (token, session["user"].clone())
}

fn snapshot_rows(path: &Path, table: &str) -> Vec<Row> {
    FileStore::open(path).unwrap().memory().rows(table)
}

#[test]
fn test_sign_in_and_whoami() {
    let ws = workspace();
    let (token, user) = sign_in(&ws, "Jane@Example.com");
    assert_eq!(user["email"], "jane@example.com");
    assert_eq!(user["role"], "student");

    let me = run_json(&ws, &["whoami", "--token", &token]);
    assert_eq!(me["id"], user["id"]);
    assert_eq!(me["display_name"], "Jane Doe");

    let (_, admin) = sign_in(&ws, "boss@orivon.dev");
    assert_eq!(admin["role"], "admin");
    assert_eq!(snapshot_rows(&ws.snapshot, "User").len(), 2);
}

#[test]
fn test_bad_token_fails() {
    let ws = workspace();
    let (success, stdout, stderr) = run_cli(&ws, &["whoami", "--token", "not-a-token"]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_free_certification_end_to_end() {
    let ws = workspace();
    let (token, _) = sign_in(&ws, "jane@example.com");

    let intent = run_json(
        &ws,
        &["create-order", "--token", &token, "--certification", "free-101"],
    );
    assert_eq!(intent["order_ref"], Value::Null);
    assert_eq!(intent["status"], "created");
    let purchase_id = intent["purchase_id"].as_str().unwrap().to_string();

    let started = run_json(
        &ws,
        &[
            "start",
            "--token",
            &token,
            "--certification",
            "free-101",
            "--metadata",
            r#"{"browser":"firefox"}"#,
        ],
    );
    assert_eq!(started["persisted"], true);
    assert_eq!(started["questions"].as_array().unwrap().len(), 2);
    let attempt = started["attempt_id"].as_str().unwrap().to_string();

    let event = run_json(
        &ws,
        &["event", "--token", &token, "--attempt", &attempt, "--type", "tab_switch"],
    );
    assert_eq!(event["event_type"], "tab_switch");

    let submission = run_json(
        &ws,
        &[
            "submit",
            "--token",
            &token,
            "--attempt",
            &attempt,
            "--answers",
            r#"[{"question_id":"q1","selected_option":"B"},{"question_id":"q2","selected_option":"A"}]"#,
        ],
    );
    assert_eq!(submission["score"], 100);
    assert_eq!(submission["status"], "under_review");

    let before = run_json(
        &ws,
        &["availability", "--token", &token, "--certification", "free-101"],
    );
    assert_eq!(before["available"], false);

    let outcome = run_json(
        &ws,
        &[
            "complete", "--token", &token, "--attempt", &attempt, "--score", "100", "--pass",
        ],
    );
    assert_eq!(outcome["status"], "completed");
    assert_eq!(outcome["issued_purchase"], purchase_id.as_str());
    assert_eq!(outcome["exam_result_recorded"], true);

    let after = run_json(
        &ws,
        &["availability", "--token", &token, "--certification", "free-101"],
    );
    assert_eq!(after["available"], true);

    let exams = snapshot_rows(&ws.snapshot, "exams");
    assert_eq!(exams[0]["nameofuser"], "Jane Doe");
}

#[test]
fn test_paid_order_without_processor_keys_fails() {
    let ws = workspace();
    let (token, _) = sign_in(&ws, "jane@example.com");
    let (success, _, stderr) = run_cli(
        &ws,
        &["create-order", "--token", &token, "--certification", "rust-201"],
    );
    assert!(!success);
    assert!(stderr.contains("unavailable"), "{stderr}");
    assert!(snapshot_rows(&ws.snapshot, "purchases").is_empty());
}

#[test]
fn test_verify_payment() {
    let ws = workspace();
    let (token, user) = sign_in(&ws, "jane@example.com");
    FileStore::open(&ws.snapshot)
        .unwrap()
        .insert(
            "purchases",
            row(json!({
                "id": "p-1",
                "user_id": user["id"],
                "certification_id": "rust-201",
                "amount": 499.0,
                "currency": "INR",
                "razorpay_order_id": "order_abc",
                "status": "created"
            })),
        )
        .unwrap();

    let good = sign_payment(
        PAYMENT_SECRET.as_bytes(),
        &OrderRef::new("order_abc".into()),
        &PaymentRef::new("pay_xyz".into()),
    );
    let (success, _, stderr) = run_cli(
        &ws,
        &[
            "verify-payment",
            "--token",
            &token,
            "--purchase",
            "p-1",
            "--payment",
            "pay_xyz",
            "--signature",
            &"0".repeat(64),
        ],
    );
    assert!(!success);
    assert!(stderr.contains("signature"), "{stderr}");

    let outcome = run_json(
        &ws,
        &[
            "verify-payment",
            "--token",
            &token,
            "--purchase",
            "p-1",
            "--payment",
            "pay_xyz",
            "--signature",
            &good,
        ],
    );
    assert_eq!(outcome["status"], "paid");
    assert_eq!(outcome["transitioned"], true);
    let ledger = snapshot_rows(&ws.snapshot, "transactions");
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0]["mailid"], "jane@example.com");
    assert_eq!(ledger[0]["course_title"], "Rust Fundamentals");

    let (intruder, _) = sign_in(&ws, "mallory@example.com");
    let (success, _, stderr) = run_cli(
        &ws,
        &[
            "verify-payment",
            "--token",
            &intruder,
            "--purchase",
            "p-1",
            "--payment",
            "pay_xyz",
            "--signature",
            &good,
        ],
    );
    assert!(!success);
    assert!(stderr.contains("forbidden"), "{stderr}");
}

#[test]
fn test_missing_store_is_reported() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_orivon"))
        .env_clear()
        .current_dir(dir.path())
        .args(["sign-in", "--email", "jane@example.com"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("no store configured"), "{stderr}");
}

#[test]
fn test_complete_unstored_attempt_records_result() {
    let ws = workspace();
    let (token, _) = sign_in(&ws, "jane@example.com");
    let outcome = run_json(
        &ws,
        &[
            "complete", "--token", &token, "--attempt", "offline-1", "--score", "88", "--pass",
        ],
    );
    assert_eq!(outcome["exam_result_recorded"], true);
    assert_eq!(outcome["partial_failures"][0]["target"], "attempt");

    let available = run_json(
        &ws,
        &["availability", "--token", &token, "--certification", "free-101"],
    );
    assert_eq!(available["available"], true);
}
