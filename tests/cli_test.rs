//! Exit status and output of the binary.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn seed_inputs(dir: &TempDir) {
    let input = dir.path().join("input");
    fs::create_dir_all(&input).unwrap();
    fs::write(
        input.join("users.csv"),
        "UserID,Username,Verified\n1,alice,true\n2,bob,false\n3,carol,true\n",
    )
    .unwrap();
    fs::write(
        input.join("posts.csv"),
        "UserID,Likes,Retweets\n1,10,5\n1,1,1\n2,100,100\n3,0,0\n",
    )
    .unwrap();
}

#[test]
fn test_default_paths() {
    let dir = TempDir::new().unwrap();
    seed_inputs(&dir);

    Command::cargo_bin("top-verified-users")
        .unwrap()
        .current_dir(dir.path())
        .env_remove("RUST_LOG")
        .assert()
        .success();

    let body = fs::read_to_string(dir.path().join("outputs/top_verified_users.csv")).unwrap();
    assert_eq!(body, "Username,Total_Reach\nalice,17\ncarol,0\n");
}

#[test]
fn test_explicit_paths_and_top_n() {
    let dir = TempDir::new().unwrap();
    seed_inputs(&dir);
    let out = dir.path().join("ranked.csv");

    Command::cargo_bin("top-verified-users")
        .unwrap()
        .current_dir(dir.path())
        .args(["--top-n", "1", "--output"])
        .arg(&out)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(out).unwrap(),
        "Username,Total_Reach\nalice,17\n"
    );
}

#[test]
fn test_missing_input_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("top-verified-users")
        .unwrap()
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("input/posts.csv"));

    assert!(!dir.path().join("outputs").exists());
}

#[test]
fn test_zero_top_n_is_rejected() {
    Command::cargo_bin("top-verified-users")
        .unwrap()
        .args(["--top-n", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be at least 1"));
}
