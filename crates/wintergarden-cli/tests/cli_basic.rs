//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary against a throwaway data directory and
//! verify outputs.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

const OVERRIDES: [&str; 4] = [
    "WINTERGARDEN_TOKEN",
    "WINTERGARDEN_ALLOWED_CHAT_ID",
    "WINTERGARDEN_ADMIN_ID",
    "WINTERGARDEN_FLOWER_THRESHOLD",
];

fn cli(data_dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_wintergarden-cli"));
    cmd.env("WINTERGARDEN_DATA_DIR", data_dir.path())
        .env("RUST_LOG", "off");
    for name in OVERRIDES {
        cmd.env_remove(name);
    }
    cmd
}

/// Run a CLI command and return (code, stdout, stderr).
fn run_cli(data_dir: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = cli(data_dir)
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.code().unwrap_or(-1), stdout, stderr)
}

fn add(data_dir: &TempDir, user_id: &str, name: &str, amount: &str) -> serde_json::Value {
    let (code, stdout, stderr) = run_cli(
        data_dir,
        &["add", "--user-id", user_id, "--name", name, "--amount", amount],
    );
    assert_eq!(code, 0, "add failed: {stderr}");
    serde_json::from_str(&stdout).expect("add prints JSON")
}

#[test]
fn test_add_reports_progress() {
    let dir = TempDir::new().unwrap();
    let summary = add(&dir, "1", "Anna", "120");
    assert_eq!(summary["user_id"], 1);
    assert_eq!(summary["added"], 120);
    assert!(summary["stitches"].as_u64().unwrap() <= 120);
}

#[test]
fn test_add_rejects_zero() {
    let dir = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&dir, &["add", "--user-id", "1", "--name", "Anna", "--amount", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("positive"));
}

#[test]
fn test_user_show_and_missing() {
    let dir = TempDir::new().unwrap();
    add(&dir, "7", "Vera", "10");

    let (code, stdout, _) = run_cli(&dir, &["user", "7"]);
    assert_eq!(code, 0);
    let profile: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(profile["display_name"], "Vera");

    let (code, _, stderr) = run_cli(&dir, &["user", "8"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("no gardener"));
}

#[test]
fn test_top_json_orders_by_stitches() {
    let dir = TempDir::new().unwrap();
    add(&dir, "1", "small", "5");
    add(&dir, "2", "big", "400");

    let (code, stdout, _) = run_cli(&dir, &["top", "--json", "--limit", "1"]);
    assert_eq!(code, 0);
    let rows: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 1);
    assert_eq!(rows[0]["display_name"], "big");
}

#[test]
fn test_export_and_backup_csv() {
    let dir = TempDir::new().unwrap();
    add(&dir, "1", "Anna", "10");

    let (code, stdout, _) = run_cli(&dir, &["export"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("№,Name,Stitches,Flowers\r\n1,Anna,"));

    let out = dir.path().join("backup.csv");
    let (code, _, _) = run_cli(&dir, &["backup", "--output", out.to_str().unwrap()]);
    assert_eq!(code, 0);
    let csv = std::fs::read_to_string(out).unwrap();
    assert!(csv.starts_with("seq,user_id,name,stitches,caterpillars,created_at\r\n"));
}

#[test]
fn test_reset_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    add(&dir, "1", "Anna", "10");

    let (code, _, _) = run_cli(&dir, &["reset"]);
    assert_ne!(code, 0);

    let (code, stdout, _) = run_cli(&dir, &["reset", "--yes"]);
    assert_eq!(code, 0);
    let summary: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(summary["deleted_users"], 1);

    let (code, _, _) = run_cli(&dir, &["user", "1"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_set_get() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&dir, &["config", "set", "garden.flower_threshold", "250"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(&dir, &["config", "get", "garden.flower_threshold"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "250");

    let (code, _, _) = run_cli(&dir, &["config", "set", "garden.flower_threshold", "0"]);
    assert_ne!(code, 0);
    let (code, _, _) = run_cli(&dir, &["config", "get", "garden.nope"]);
    assert_ne!(code, 0);
}

#[test]
fn test_log_directory_receives_rotated_file() {
    let dir = TempDir::new().unwrap();
    let logs = dir.path().join("logs");
    let (code, _, _) = run_cli(&dir, &["config", "set", "logging.directory", logs.to_str().unwrap()]);
    assert_eq!(code, 0);

    let output = cli(&dir)
        .env("RUST_LOG", "info")
        .args(["add", "--user-id", "1", "--name", "Anna", "--amount", "10"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let files: Vec<_> = std::fs::read_dir(&logs)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("wintergarden") && name.ends_with(".log"));
    let content = std::fs::read_to_string(&files[0]).unwrap();
    assert!(content.contains("stitches added"));
}

#[test]
fn test_chat_loop_replies_and_drops_duplicates() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&dir, &["config", "set", "bot.allowed_chat_id", "-42"]);
    assert_eq!(code, 0);

    let input = [
        r#"{"message_id": 1, "chat_id": -42, "user_id": 9, "first_name": "Lena", "text": "/start"}"#,
        r#"{"message_id": 2, "chat_id": -42, "user_id": 9, "first_name": "Lena", "text": "/add 30"}"#,
        r#"{"message_id": 2, "chat_id": -42, "user_id": 9, "first_name": "Lena", "text": "/add 30"}"#,
        "not json",
        r#"{"message_id": 3, "chat_id": 555, "user_id": 9, "first_name": "Lena", "text": "/add 30"}"#,
        r#"{"message_id": 4, "chat_id": -42, "user_id": 9, "first_name": "Lena", "text": "/top"}"#,
    ]
    .join("\n");

    let mut child = cli(&dir)
        .arg("chat")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let replies: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    // start, add, refused add in another chat, top; the duplicate is silent.
    assert_eq!(replies.len(), 4);
    assert!(replies[0]["text"].as_str().unwrap().contains("Welcome"));
    assert!(replies[1]["text"].as_str().unwrap().contains("Lena"));
    assert_eq!(replies[2]["chat_id"], 555);
    assert!(replies[3]["text"].as_str().unwrap().contains("Top gardeners"));
}
