use rusqlite::Connection;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

const WEBHOOK: &str = "https://discord.com/api/webhooks/X";

fn binary() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_armaguard-settings"));
    command
        .env_remove("ARMAGUARD_DB")
        .env_remove("ARMAGUARD_LOG_DIR")
        .env_remove("ARMAGUARD_LOG")
        .env_remove("RUST_LOG");
    command
}

fn database(dir: &Path, ddl: &str) -> PathBuf {
    let db_path = dir.join("armaguard.db");
    Connection::open(&db_path)
        .expect("open")
        .execute_batch(ddl)
        .expect("ddl");
    db_path
}

fn run(db_path: &Path, args: &[&str], stdin: &str) -> Output {
    let mut child = binary()
        .args(args)
        .arg("--db")
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    // the tool may exit without reading; a closed pipe is fine
    let _ = child.stdin.take().expect("stdin").write_all(stdin.as_bytes());
    child.wait_with_output().expect("wait")
}

fn webhook_value(db_path: &Path) -> Option<String> {
    Connection::open(db_path)
        .expect("open")
        .query_row(
            "SELECT discord_webhook_url FROM security_settings WHERE id = 1",
            [],
            |row| row.get(0),
        )
        .expect("query")
}

#[test]
fn init_on_older_schema_writes_only_present_columns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(
        dir.path(),
        "CREATE TABLE security_settings (id INTEGER PRIMARY KEY, discord_webhook_url TEXT);",
    );

    let output = run(&db_path, &["init"], "");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(webhook_value(&db_path).as_deref(), Some(""));

    let count: i64 = Connection::open(&db_path)
        .expect("open")
        .query_row("SELECT COUNT(*) FROM security_settings", [], |row| row.get(0))
        .expect("count");
    assert_eq!(count, 1);
}

#[test]
fn init_without_table_exits_abnormally() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(dir.path(), "CREATE TABLE traffic_history (id INTEGER);");

    let output = run(&db_path, &["init"], "");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("SCHEMA_UNAVAILABLE"));
}

#[test]
fn show_without_row_exits_with_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(
        dir.path(),
        "CREATE TABLE security_settings (id INTEGER PRIMARY KEY, discord_webhook_url TEXT);",
    );

    let output = run(&db_path, &["show"], "");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("NOT_FOUND"));
}

#[test]
fn webhook_diagnostic_without_table_reports_not_configured() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(dir.path(), "CREATE TABLE traffic_history (id INTEGER);");

    let output = run(&db_path, &["webhook"], "");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("not configured"));
}

#[test]
fn webhook_diagnostic_affirm_and_decline() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(
        dir.path(),
        "CREATE TABLE security_settings (id INTEGER PRIMARY KEY, discord_webhook_url TEXT);",
    );
    Connection::open(&db_path)
        .expect("open")
        .execute(
            "INSERT INTO security_settings (id, discord_webhook_url) VALUES (1, ?1)",
            [WEBHOOK],
        )
        .expect("insert");

    let declined = run(&db_path, &["webhook"], "no\n");
    assert!(declined.status.success());
    assert!(String::from_utf8_lossy(&declined.stdout).contains(WEBHOOK));
    assert_eq!(webhook_value(&db_path).as_deref(), Some(WEBHOOK));

    let affirmed = run(&db_path, &["webhook"], "y\n");
    assert!(affirmed.status.success());
    assert!(String::from_utf8_lossy(&affirmed.stdout).contains("Restart"));
    assert_eq!(webhook_value(&db_path).as_deref(), Some(""));

    let again = run(&db_path, &["webhook"], "y\n");
    assert!(again.status.success());
    assert!(!String::from_utf8_lossy(&again.stdout).contains("(y/n)"));
}

#[test]
fn set_updates_a_single_known_setting() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(
        dir.path(),
        "CREATE TABLE security_settings (id INTEGER PRIMARY KEY, protection_level INTEGER, discord_webhook_url TEXT);",
    );
    assert!(run(&db_path, &["init"], "").status.success());

    let output = run(&db_path, &["set", "protection_level", "0"], "");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let level: i64 = Connection::open(&db_path)
        .expect("open")
        .query_row("SELECT protection_level FROM security_settings WHERE id = 1", [], |row| row.get(0))
        .expect("query");
    assert_eq!(level, 0);

    let rejected = run(&db_path, &["set", "protection_level", "9"], "");
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("INVALID_VALUE"));
}

fn log_contents(log_dir: &Path) -> String {
    let mut contents = String::new();
    for entry in std::fs::read_dir(log_dir).expect("read log dir") {
        let path = entry.expect("entry").path();
        contents.push_str(&std::fs::read_to_string(path).expect("read log file"));
    }
    contents
}

#[test]
fn failures_reach_the_log_file_before_exit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(dir.path(), "CREATE TABLE traffic_history (id INTEGER);");

    for attempt in 0..10 {
        let log_dir = dir.path().join(format!("logs-{}", attempt));
        let log_arg = log_dir.to_string_lossy().into_owned();
        let output = run(&db_path, &["init", "--log-dir", &log_arg], "");
        assert!(!output.status.success());

        let logged = log_contents(&log_dir);
        assert!(logged.contains("command failed"), "attempt {}: {}", attempt, logged);
        assert!(logged.contains("SCHEMA_UNAVAILABLE"));
    }
}

#[test]
fn failures_print_once_without_color_codes_on_piped_stderr() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(dir.path(), "CREATE TABLE traffic_history (id INTEGER);");

    let output = run(&db_path, &["init"], "");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.matches("SCHEMA_UNAVAILABLE").count(), 1, "stderr: {}", stderr);
    assert!(!stderr.contains('\u{1b}'));
}

#[test]
fn locked_database_exits_with_storage_failure() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_path = database(
        dir.path(),
        "CREATE TABLE security_settings (id INTEGER PRIMARY KEY, discord_webhook_url TEXT);",
    );

    let holder = Connection::open(&db_path).expect("open");
    holder.execute_batch("BEGIN EXCLUSIVE;").expect("lock");

    let output = run(&db_path, &["init", "--busy-timeout-ms", "100"], "");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("STORAGE_FAILURE"));

    holder.execute_batch("ROLLBACK;").expect("unlock");
    assert!(run(&db_path, &["init"], "").status.success());
}
