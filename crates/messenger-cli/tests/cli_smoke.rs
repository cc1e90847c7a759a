//! Smoke tests driving the binary over stdin

use assert_cmd::Command;
use predicates::prelude::*;

fn messenger(db_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("messenger").unwrap();
    cmd.env("MESSENGER_DB_DIR", db_dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn missing_arguments_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    messenger(dir.path())
        .arg("chat")
        .arg("5432")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn unparsable_port_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    messenger(dir.path())
        .args(["chat", "not-a-port", "admin"])
        .assert()
        .code(2);
}

#[test]
fn scripted_session_creates_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    messenger(dir.path())
        .args(["chat", "5432", "admin"])
        .write_stdin("1\nalice\nsecret\n\n2\nalice\nsecret\n1\n0\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("User Interface"))
        .stdout(predicate::str::contains("User successfully created!"))
        .stdout(predicate::str::contains("Welcome alice!"))
        .stdout(predicate::str::contains("Bye !"));

    assert!(dir.path().join("chat.db").exists());
}

#[test]
fn users_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    messenger(dir.path())
        .args(["chat", "5432", "admin"])
        .write_stdin("1\nalice\nsecret\n\n0\n")
        .assert()
        .success();

    messenger(dir.path())
        .args(["chat", "5432", "admin"])
        .write_stdin("2\nalice\nsecret\n0\n0\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Welcome alice!"));
}

#[test]
fn end_of_input_exits_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    messenger(dir.path())
        .args([":memory:", "5432", "admin"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Disconnecting from database...Done"));
}

#[test]
fn unopenable_database_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    messenger(&dir.path().join("missing").join("nested"))
        .args(["chat", "5432", "admin"])
        .write_stdin("0\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unable to connect to database"));
}
