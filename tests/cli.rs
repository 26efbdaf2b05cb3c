use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn repeat(dir: &Path, args: &[&str]) -> Output {
    repeat_with_config(&dir.join("absent.toml"), args)
}

fn repeat_with_config(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bounded-repeat"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn success_appends_and_exits_zero() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "ab\n").unwrap();

    let out = repeat(dir.path(), &[file.to_str().unwrap(), "2", "9"]);
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ab\nab\nab\n");
}

#[test]
fn overflow_truncates_and_exits_nonzero() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "ab\n").unwrap();

    let out = repeat(dir.path(), &[file.to_str().unwrap(), "2", "8"]);
    assert_eq!(out.status.code(), Some(4));
    assert_eq!(std::fs::metadata(&file).unwrap().len(), 0);
}

#[test]
fn empty_file_fails() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "").unwrap();

    let out = repeat(dir.path(), &[file.to_str().unwrap(), "5", "100"]);
    assert_eq!(out.status.code(), Some(3));
    assert_eq!(std::fs::metadata(&file).unwrap().len(), 0);
}

#[test]
fn zero_repetitions_leave_file_unchanged() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "x").unwrap();

    let out = repeat(dir.path(), &["-q", file.to_str().unwrap(), "0", "0"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty());
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "x");
}

#[test]
fn missing_file_fails_without_creating_it() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("missing.txt");

    let out = repeat(dir.path(), &[file.to_str().unwrap(), "1", "10"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(!file.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("error: failed to stat"));
}

#[test]
fn dry_run_never_writes() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "ab\n").unwrap();

    let out = repeat(dir.path(), &["--dry-run", file.to_str().unwrap(), "2", "8"]);
    assert_eq!(out.status.code(), Some(4));
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ab\n");
    assert!(String::from_utf8_lossy(&out.stdout).contains("repetition 2 would grow"));
}

#[test]
fn bad_arguments_are_usage_errors() {
    let dir = tempdir().unwrap();
    let out = repeat(dir.path(), &["f.txt", "many", "9"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn quiet_config_matches_quiet_flag() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("repeat.toml");
    std::fs::write(&config, "[output]\nquiet = true\n").unwrap();
    let file = dir.path().join("f.txt");
    std::fs::write(&file, "ab\n").unwrap();

    let from_config = repeat_with_config(&config, &[file.to_str().unwrap(), "1", "100"]);
    assert_eq!(from_config.status.code(), Some(0));
    assert!(from_config.stdout.is_empty());
    assert!(
        from_config.stderr.is_empty(),
        "stderr: {}",
        String::from_utf8_lossy(&from_config.stderr)
    );

    let from_flag = repeat(dir.path(), &["-q", file.to_str().unwrap(), "1", "100"]);
    assert_eq!(from_flag.status.code(), Some(0));
    assert_eq!(from_config.stderr, from_flag.stderr);
    assert_eq!(std::fs::read_to_string(&file).unwrap(), "ab\nab\nab\n");
}
