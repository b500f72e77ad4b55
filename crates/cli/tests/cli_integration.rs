//! CLI integration tests.
//!
//! Uses `assert_cmd` to spawn the `taskripple` binary against a fresh data
//! directory per test and verify exit codes, stdout, and stderr.

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const ADMIN: &str = "admin-001";

/// Helper: a `taskripple` command rooted at `dir`, isolated from the
/// caller's environment.
fn taskripple(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("taskripple");
    cmd.arg("--data-dir")
        .arg(dir)
        .env_remove("TASKRIPPLE_CONFIG")
        .env_remove("TASKRIPPLE_DATA_DIR")
        .env("RUST_LOG", "warn");
    cmd
}

/// Helper: run with `--output json`, assert success, and parse stdout.
fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = taskripple(dir)
        .args(["--output", "json"])
        .args(args)
        .output()
        .expect("failed to run taskripple");
    assert!(
        output.status.success(),
        "taskripple {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn init_store() -> TempDir {
    let dir = TempDir::new().unwrap();
    run_json(dir.path(), &["init"]);
    dir
}

/// Register an account and return (id, referral code).
fn register(dir: &Path, name: &str, referral_code: Option<&str>) -> (String, String) {
    let email = format!("{}@example.com", name);
    let mut args = vec![
        "register", "--name", name, "--email", email.as_str(), "--phone", "555-0100", "--secret", "pw",
    ];
    if let Some(code) = referral_code {
        args.extend(["--referral-code", code]);
    }
    let account = run_json(dir, &args);
    (
        account["id"].as_str().unwrap().to_string(),
        account["referral_code"].as_str().unwrap().to_string(),
    )
}

fn activate(dir: &Path, id: &str) {
    let deposit = run_json(
        dir,
        &["--as", id, "activate", "--payment-ref", "BIN-1", "--proof-ref", "img://1"],
    );
    let tx = deposit["id"].as_str().unwrap();
    run_json(dir, &["--as", ADMIN, "admin", "approve-activation", tx]);
}

fn amount(value: &Value) -> f64 {
    value.as_str().unwrap().parse().unwrap()
}

fn balance(dir: &Path, id: &str) -> f64 {
    amount(&run_json(dir, &["--as", id, "overview"])["balance"])
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let dir = TempDir::new().unwrap();
    taskripple(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "TaskRipple ledger and account lifecycle engine",
        ));
}

#[test]
fn version_exits_0() {
    let dir = TempDir::new().unwrap();
    taskripple(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("taskripple"));
}

// ──────────────────────────────────────────────
// 2. Init and identity
// ──────────────────────────────────────────────

#[test]
fn init_seeds_once() {
    let dir = TempDir::new().unwrap();
    taskripple(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Seeded administrator 'admin-001'"));
    taskripple(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already initialised"));
    assert!(dir.path().join("accounts.json").exists());
}

#[test]
fn starter_tasks_are_listed() {
    let dir = init_store();
    taskripple(dir.path())
        .args(["tasks", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Join Telegram Channel"))
        .stdout(predicate::str::contains("Write a 5-star Review"));

    let images = run_json(dir.path(), &["tasks", "list", "--proof-type", "image"]);
    assert_eq!(images.as_array().unwrap().len(), 1);
}

#[test]
fn register_then_login_returns_same_account() {
    let dir = init_store();
    let (id, code) = register(dir.path(), "ada", None);
    assert_eq!(code.len(), 7);

    let account = run_json(
        dir.path(),
        &["login", "--email", "ada@example.com", "--secret", "pw"],
    );
    assert_eq!(account["id"], id.as_str());
    assert_eq!(account["status"], "PENDING");
    assert!(account.get("secret").is_none());
}

#[test]
fn login_with_wrong_secret_fails() {
    let dir = init_store();
    register(dir.path(), "ada", None);
    taskripple(dir.path())
        .args(["login", "--email", "ada@example.com", "--secret", "nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: invalid credentials"));
}

#[test]
fn duplicate_email_reports_json_code() {
    let dir = init_store();
    register(dir.path(), "ada", None);
    let output = taskripple(dir.path())
        .args([
            "--output", "json", "register", "--name", "Ada", "--email", "ada@example.com",
            "--phone", "1", "--secret", "x",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .find(|l| l.starts_with('{'))
        .expect("JSON error line");
    let err: Value = serde_json::from_str(line).unwrap();
    assert_eq!(err["code"], "duplicate_email");
}

#[test]
fn account_commands_require_identity() {
    let dir = init_store();
    taskripple(dir.path())
        .arg("overview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--as <account-id>"));
}

// ──────────────────────────────────────────────
// 3. Activation and commissions
// ──────────────────────────────────────────────

#[test]
fn activation_pays_level_one_commission() {
    let dir = init_store();
    let (u1, code) = register(dir.path(), "u1", None);
    let (u2, _) = register(dir.path(), "u2", Some(&code));

    activate(dir.path(), &u1);
    activate(dir.path(), &u2);

    assert_eq!(balance(dir.path(), &u1), 5.0);
    assert_eq!(balance(dir.path(), &u2), 0.0);

    let commissions = run_json(
        dir.path(),
        &["--as", u1.as_str(), "history", "--kind", "referral-commission"],
    );
    let commissions = commissions.as_array().unwrap();
    assert_eq!(commissions.len(), 1);
    assert_eq!(commissions[0]["metadata"]["related_user_id"], u2.as_str());
    assert_eq!(commissions[0]["metadata"]["level"], 1);

    let referrals = run_json(dir.path(), &["--as", u1.as_str(), "referrals"]);
    assert_eq!(referrals[0]["id"], u2.as_str());

    taskripple(dir.path())
        .args(["--as", ADMIN, "reconcile"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Balanced"));
}

#[test]
fn second_activation_request_is_rejected() {
    let dir = init_store();
    let (u1, _) = register(dir.path(), "u1", None);
    run_json(
        dir.path(),
        &["--as", u1.as_str(), "activate", "--payment-ref", "A", "--proof-ref", "p"],
    );
    taskripple(dir.path())
        .args(["--as", u1.as_str(), "activate", "--payment-ref", "B", "--proof-ref", "p"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already pending"));
}

#[test]
fn non_admin_cannot_approve() {
    let dir = init_store();
    let (u1, _) = register(dir.path(), "u1", None);
    let deposit = run_json(
        dir.path(),
        &["--as", u1.as_str(), "activate", "--payment-ref", "A", "--proof-ref", "p"],
    );
    taskripple(dir.path())
        .args([
            "--as",
            u1.as_str(),
            "admin",
            "approve-activation",
            deposit["id"].as_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("permission denied"));
}

// ──────────────────────────────────────────────
// 4. Tasks and withdrawals
// ──────────────────────────────────────────────

#[test]
fn approved_submission_credits_reward() {
    let dir = init_store();
    let (u1, _) = register(dir.path(), "u1", None);

    taskripple(dir.path())
        .args(["--as", u1.as_str(), "submit", "task-001", "--image", "img://proof"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("active"));

    activate(dir.path(), &u1);
    let submission = run_json(
        dir.path(),
        &["--as", u1.as_str(), "submit", "task-001", "--image", "img://proof"],
    );
    assert_eq!(submission["status"], "PENDING");

    let pending = run_json(dir.path(), &["--as", ADMIN, "admin", "pending"]);
    assert_eq!(pending["submissions"].as_array().unwrap().len(), 1);

    let outcome = run_json(
        dir.path(),
        &[
            "--as",
            ADMIN,
            "admin",
            "approve-submission",
            submission["id"].as_str().unwrap(),
        ],
    );
    assert_eq!(outcome["applied"], true);
    assert_eq!(balance(dir.path(), &u1), 0.5);

    taskripple(dir.path())
        .args(["--as", u1.as_str(), "submit", "task-001", "--text", "again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already submitted"));
}

#[test]
fn withdrawal_flow_respects_minimum_and_balance() {
    let dir = init_store();
    let (u1, code) = register(dir.path(), "u1", None);
    let (u2, _) = register(dir.path(), "u2", Some(&code));
    activate(dir.path(), &u1);
    activate(dir.path(), &u2);

    taskripple(dir.path())
        .args(["--as", u1.as_str(), "withdraw", "1", "--payment-ref", "W"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("below the minimum"));
    taskripple(dir.path())
        .args(["--as", u1.as_str(), "withdraw", "50", "--payment-ref", "W"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient balance"));

    let withdrawal = run_json(
        dir.path(),
        &["--as", u1.as_str(), "withdraw", "5", "--payment-ref", "W"],
    );
    assert_eq!(balance(dir.path(), &u1), 5.0);
    run_json(
        dir.path(),
        &[
            "--as",
            ADMIN,
            "admin",
            "approve-withdrawal",
            withdrawal["id"].as_str().unwrap(),
        ],
    );
    assert_eq!(balance(dir.path(), &u1), 0.0);

    let overview = run_json(dir.path(), &["--as", ADMIN, "overview"]);
    assert_eq!(amount(&overview["total_paid_out"]), 5.0);
    assert_eq!(overview["active_users"], 3);
}

#[test]
fn admin_can_create_and_delete_tasks() {
    let dir = init_store();
    let task = run_json(
        dir.path(),
        &[
            "--as",
            ADMIN,
            "tasks",
            "create",
            "--title",
            "Follow on X",
            "--reward",
            "0.25",
            "--requirement",
            "Follow the account",
            "--proof-type",
            "text",
        ],
    );
    let id = task["id"].as_str().unwrap().to_string();
    assert_eq!(task["proof_type"], "TEXT");

    let deleted = run_json(dir.path(), &["--as", ADMIN, "tasks", "delete", id.as_str()]);
    assert_eq!(deleted["deleted"], true);
    let again = run_json(dir.path(), &["--as", ADMIN, "tasks", "delete", id.as_str()]);
    assert_eq!(again["deleted"], false);
}

#[test]
fn banned_account_is_blocked() {
    let dir = init_store();
    let (u1, _) = register(dir.path(), "u1", None);
    activate(dir.path(), &u1);
    let account = run_json(
        dir.path(),
        &["--as", ADMIN, "admin", "set-status", u1.as_str(), "banned"],
    );
    assert_eq!(account["status"], "BANNED");

    taskripple(dir.path())
        .args(["--as", u1.as_str(), "submit", "task-002", "--text", "five stars"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("banned"));
}
