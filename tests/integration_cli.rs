use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::process::{Child, Stdio};
use std::time::{Duration, Instant};

/// Kills the background server when the test ends, pass or fail.
struct ServerProcess(Child);

impl Drop for ServerProcess {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn wait_for(path: &std::path::Path) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !path.exists() {
        assert!(Instant::now() < deadline, "server never created {}", path.display());
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_binary_help() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcp-link"));
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mcp-link"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn test_serve_requires_an_address() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcp-link"));
    cmd.arg("serve")
        .env_remove("MCP_LINK_ADDRESS")
        .env_remove("MCP_LINK_TCP_ADDRESS")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to listen on"));
}

#[test]
fn test_call_rejects_bad_params() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcp-link"));
    cmd.args(["call", "--connect", "tcp:127.0.0.1:1", "tools/list", "--params", "{oops"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_oversized_timeout_is_rejected() {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mcp-link"));
    cmd.args(["--timeout", "1e30", "call", "--connect", "tcp:127.0.0.1:1", "tools/list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--timeout must be a positive number"))
        .stderr(predicate::str::contains("PANIC").not());
}

#[test]
#[cfg(unix)]
fn test_serve_then_call_over_unix_socket() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("cli.sock");
    let resource = dir.path().join("motd.txt");
    std::fs::File::create(&resource)
        .unwrap()
        .write_all(b"hello from disk")
        .unwrap();

    let child = std::process::Command::new(env!("CARGO_BIN_EXE_mcp-link"))
        .arg("serve")
        .arg("--listen")
        .arg(format!("unix:{}", socket.display()))
        .arg("--resource")
        .arg(&resource)
        .env("LOG_LEVEL", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn server");
    let _server = ServerProcess(child);
    wait_for(&socket);

    let address = format!("unix:{}", socket.display());

    Command::new(env!("CARGO_BIN_EXE_mcp-link"))
        .args(["call", "--connect", &address, "tools/call", "--params"])
        .arg(r#"{"name":"echo","arguments":{"text":"ping"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"text\": \"ping\""));

    Command::new(env!("CARGO_BIN_EXE_mcp-link"))
        .args(["call", "--connect", &address, "resources/list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("motd.txt"));

    let canonical = std::fs::canonicalize(&resource).unwrap();
    Command::new(env!("CARGO_BIN_EXE_mcp-link"))
        .args(["call", "--connect", &address, "resources/read", "--params"])
        .arg(format!(r#"{{"uri":"file://{}"}}"#, canonical.display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("hello from disk"));

    Command::new(env!("CARGO_BIN_EXE_mcp-link"))
        .args(["call", "--connect", &address, "prompts/list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Method not found"));
}
