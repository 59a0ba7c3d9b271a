//! CLI integration tests for proofart-cli.
//!
//! These tests run the actual binary and check outputs, exit codes and
//! written files. Every test uses `--mock` or offline commands so no
//! network access is needed.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const CREATOR: &str = "0x1234567890abcdef1234567890abcdef12345678";
const LEDGER_ENV: [&str; 5] = [
    "LEDGER_RPC_URL",
    "LEDGER_CONTRACT_ADDRESS",
    "LEDGER_PRIVATE_KEY",
    "LEDGER_CHAIN_ID",
    "LEDGER_NETWORK_NAME",
];

/// Get a Command for the proofart binary.
fn proofart() -> Command {
    let mut cmd = Command::cargo_bin("proofart").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Run `generate --mock` in `dir` and return the parsed certificate.
fn generate_mock(dir: &Path, prompt: &str) -> serde_json::Value {
    let out = dir.join("art.png");
    proofart()
        .args([
            "generate",
            "--mock",
            "--prompt",
            prompt,
            "--creator",
            CREATOR,
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let proof = fs::read(dir.join("art.png.proof.json")).unwrap();
    serde_json::from_slice(&proof).unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    proofart()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Verifiable authorship"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("hash"))
        .stdout(predicate::str::contains("bind"));
}

#[test]
fn test_version_displays_version() {
    proofart()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("proofart"));
}

#[test]
fn test_help_shows_exit_codes() {
    proofart()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("78"));
}

#[test]
fn test_verify_help_shows_options() {
    proofart()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--hash"))
        .stdout(predicate::str::contains("--file"))
        .stdout(predicate::str::contains("--prompt-hash"));
}

// ============================================================================
// Offline Hash Tests
// ============================================================================

#[test]
fn test_hash_prints_sha256_of_file() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("art.png");
    fs::write(&file, b"abc").unwrap();

    proofart()
        .args(["hash", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad",
        ));
}

#[test]
fn test_missing_file_returns_input_error() {
    proofart()
        .args(["hash", "/nonexistent/art.png"])
        .assert()
        .failure()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_bind_missing_file_returns_input_error() {
    proofart()
        .args([
            "bind",
            "--prompt",
            "a red cube",
            "--file",
            "/nonexistent/art.png",
            "--creator",
            CREATOR,
            "--timestamp",
            "1700000000000",
        ])
        .assert()
        .failure()
        .code(66);
}

// ============================================================================
// Generate Tests
// ============================================================================

#[test]
fn test_generate_mock_writes_artifact_and_certificate() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("art.png");

    proofart()
        .args([
            "generate",
            "--mock",
            "--prompt",
            "a red cube",
            "--creator",
            CREATOR,
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ATTESTED"))
        .stdout(predicate::str::contains("art.png.proof.json"));

    assert!(out.exists(), "Artifact should be written");
    let proof: serde_json::Value =
        serde_json::from_slice(&fs::read(temp.path().join("art.png.proof.json")).unwrap())
            .unwrap();
    assert_eq!(proof["creatorAddress"], CREATOR);
    assert_eq!(proof["type"], "image");
    assert_eq!(proof["registration"]["status"], "registered");
    assert_eq!(proof["combinedHash"].as_str().unwrap().len(), 64);
}

#[test]
fn test_generate_default_output_path() {
    let temp = TempDir::new().unwrap();

    proofart()
        .current_dir(temp.path())
        .args(["generate", "--mock", "--prompt", "a cube", "--creator", CREATOR])
        .assert()
        .success();

    let names: Vec<String> = fs::read_dir(temp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert!(names.iter().any(|n| n.starts_with("proofart-") && n.ends_with(".png")));
    assert!(names.iter().any(|n| n.ends_with(".png.proof.json")));
}

#[test]
fn test_generate_json_prints_certificate() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("art.png");

    let output = proofart()
        .args([
            "generate",
            "--mock",
            "--json",
            "--prompt",
            "a red cube",
            "--creator",
            CREATOR,
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let printed: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(printed["creatorAddress"], CREATOR);
}

#[test]
fn test_generate_without_credentials_is_config_error() {
    let temp = TempDir::new().unwrap();

    proofart()
        .current_dir(temp.path())
        .env_remove("STABILITY_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .args(["generate", "--prompt", "a cube", "--creator", CREATOR])
        .assert()
        .failure()
        .code(78)
        .stderr(predicate::str::contains("API key"));
}

#[test]
fn test_generate_requires_creator() {
    proofart()
        .args(["generate", "--mock", "--prompt", "a cube"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("--creator"));
}

// ============================================================================
// Workflow Tests: generate -> hash -> bind
// ============================================================================

#[test]
fn test_hash_matches_certificate_output_hash() {
    let temp = TempDir::new().unwrap();
    let proof = generate_mock(temp.path(), "a red cube");
    let artifact = temp.path().join("art.png");

    proofart()
        .args(["hash", artifact.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(proof["outputHash"].as_str().unwrap()));
}

#[test]
fn test_bind_reproduces_combined_hash() {
    let temp = TempDir::new().unwrap();
    let proof = generate_mock(temp.path(), "a red cube");
    let artifact = temp.path().join("art.png");
    let timestamp = proof["timestamp"].as_u64().unwrap().to_string();

    proofart()
        .args([
            "bind",
            "--prompt",
            "a red cube",
            "--file",
            artifact.to_str().unwrap(),
            "--creator",
            CREATOR,
            "--timestamp",
            &timestamp,
        ])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            proof["combinedHash"].as_str().unwrap(),
        ));
}

#[test]
fn test_bind_detects_edited_prompt() {
    let temp = TempDir::new().unwrap();
    let proof = generate_mock(temp.path(), "a red cube");
    let artifact = temp.path().join("art.png");
    let timestamp = proof["timestamp"].as_u64().unwrap().to_string();

    let output = proofart()
        .args([
            "bind",
            "--prompt",
            "a blue cube",
            "--file",
            artifact.to_str().unwrap(),
            "--creator",
            CREATOR,
            "--timestamp",
            &timestamp,
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(!stdout.contains(proof["combinedHash"].as_str().unwrap()));
}

// ============================================================================
// Verify Tests (no ledger reachable)
// ============================================================================

#[test]
fn test_verify_malformed_hash_is_usage_error() {
    proofart()
        .args(["verify", "--hash", "not-a-hash"])
        .assert()
        .failure()
        .code(64)
        .stderr(predicate::str::contains("Invalid hash"));
}

#[test]
fn test_verify_without_ledger_is_config_error() {
    let mut cmd = proofart();
    for key in LEDGER_ENV {
        cmd.env_remove(key);
    }

    cmd.args(["verify", "--hash", &"ab".repeat(32)])
        .assert()
        .failure()
        .code(78)
        .stderr(predicate::str::contains("LEDGER_CONTRACT_ADDRESS"));
}

#[test]
fn test_verify_file_requires_prompt_hash() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("art.png");
    fs::write(&file, b"content").unwrap();

    proofart()
        .args([
            "verify",
            "--hash",
            &"ab".repeat(32),
            "--file",
            file.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt-hash"));
}

// ============================================================================
// Output Mode Tests
// ============================================================================

#[test]
fn test_quiet_mode_minimal_output() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("art.png");

    let output = proofart()
        .args([
            "--quiet",
            "generate",
            "--mock",
            "--prompt",
            "a cube",
            "--creator",
            CREATOR,
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    assert!(
        stdout.trim().is_empty(),
        "Quiet mode should have no stdout, got: {}",
        stdout
    );
    assert!(out.exists());
}

#[test]
fn test_color_never_no_ansi() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().join("art.png");

    let output = proofart()
        .args([
            "--color=never",
            "generate",
            "--mock",
            "--prompt",
            "a cube",
            "--creator",
            CREATOR,
            "--out",
            out.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let stderr = String::from_utf8_lossy(&output.get_output().stderr);

    // ANSI escape codes start with \x1b[
    assert!(
        !stdout.contains("\x1b["),
        "Color=never stdout should not contain ANSI codes"
    );
    assert!(
        !stderr.contains("\x1b["),
        "Color=never stderr should not contain ANSI codes"
    );
}

#[test]
fn test_invalid_color_rejected() {
    proofart()
        .args(["--color=sometimes", "hash", "x.png"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("invalid").or(predicate::str::contains("possible values")),
        );
}

#[test]
fn test_conflicting_verbose_quiet_rejected() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("art.png");
    fs::write(&file, b"content").unwrap();

    // Use an actual command (not --help which bypasses conflicts)
    proofart()
        .args(["--verbose", "--quiet", "hash", file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
