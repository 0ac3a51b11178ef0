#![cfg(unix)]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_pipearmor");

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pipearmor-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn run_chain_file(document: &str) -> Output {
    let dir = unique_temp_dir("chain");
    let config = dir.join("pipeline.json");
    std::fs::write(&config, document).expect("config should be writable");

    let output = Command::new(BIN)
        .arg("--log-level")
        .arg("error")
        .arg("chain")
        .arg(&config)
        .stdin(Stdio::null())
        .output()
        .expect("pipearmor should run to completion");
    let _ = std::fs::remove_dir_all(&dir);
    output
}

fn run_chain_stdin(document: &str) -> Output {
    let mut child = Command::new(BIN)
        .arg("--log-level")
        .arg("error")
        .arg("chain")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("pipearmor should start");
    child
        .stdin
        .as_mut()
        .expect("stdin should be piped")
        .write_all(document.as_bytes())
        .expect("stdin should accept the document");
    drop(child.stdin.take());
    child
        .wait_with_output()
        .expect("pipearmor should run to completion")
}

#[test]
fn trivial_pipeline_succeeds() {
    let output = run_chain_file(r#"[["true"]]"#);
    assert!(output.status.success());
}

#[test]
fn document_can_come_from_stdin() {
    let output = run_chain_stdin(r#"[["true"]]"#);
    assert!(output.status.success());
}

#[test]
fn failing_stage_sets_the_exit_code() {
    let output = run_chain_file(r#"[["false"]]"#);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn data_flows_between_stages() {
    let output = run_chain_file(r#"[["sh", "-c", "printf staged"], ["cat"]]"#);
    assert!(output.status.success());
    assert_eq!(output.stdout, b"staged");
}

#[test]
fn last_stage_code_propagates() {
    let output = run_chain_file(r#"[["cat", "/dev/null"], ["sh", "-c", "exit 7"]]"#);
    assert_eq!(output.status.code(), Some(7));
}

#[test]
fn unstartable_stage_is_internal() {
    let output = run_chain_file(r#"[["/non/existing/binary"]]"#);
    assert_eq!(output.status.code(), Some(125));
}

#[test]
fn malformed_document_is_a_usage_error() {
    let output = run_chain_file(r#"[["cat""#);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn empty_document_is_a_usage_error() {
    let output = run_chain_file("[]");
    assert_eq!(output.status.code(), Some(64));
}
