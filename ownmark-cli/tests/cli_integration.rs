//! CLI integration tests for ownmark-cli.
//!
//! Only commands that need no network are exercised here: help, digest,
//! claim, argument validation and `track --mock`. Service calls point at a
//! closed local port and only their exit code is checked.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const USER_DIGEST: &str = "b4c9a289323b21a01c3e940f150eb9b8c542587f1abfd8f0e1cc1ffc5e475514";
const EMPTY_DIGEST: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
const TX_HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

/// Get a Command for the ownmark binary.
fn ownmark() -> Command {
    let mut cmd = Command::cargo_bin("ownmark").unwrap();
    // Keep runs hermetic: no real endpoints.
    cmd.env("OWNMARK_API_BASE", "http://127.0.0.1:9/api")
        .env("OWNMARK_EXPLORER_API", "http://127.0.0.1:9/api")
        .env("OWNMARK_EXPLORER_BASE", "https://explorer.test")
        .env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    ownmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ownership claims for watermarked media"))
        .stdout(predicate::str::contains("digest"))
        .stdout(predicate::str::contains("claim"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("anchor"))
        .stdout(predicate::str::contains("track"))
        .stdout(predicate::str::contains("lookup"));
}

#[test]
fn test_version_displays_version() {
    ownmark()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ownmark"));
}

#[test]
fn test_help_shows_exit_codes() {
    ownmark()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_verify_help_shows_options() {
    ownmark()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--claim"))
        .stdout(predicate::str::contains("--preset"))
        .stdout(predicate::str::contains("--media-id"))
        .stdout(predicate::str::contains("--json"));
}

// ============================================================================
// Digest
// ============================================================================

#[test]
fn test_digest_email_is_normalized() {
    ownmark()
        .args(["digest", "--email", "  User@Example.COM "])
        .assert()
        .success()
        .stdout(format!("{USER_DIGEST}\n"));
}

#[test]
fn test_digest_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.bin");
    fs::write(&path, b"").unwrap();

    ownmark()
        .args(["digest", "--file"])
        .arg(&path)
        .assert()
        .success()
        .stdout(format!("{EMPTY_DIGEST}\n"));
}

#[test]
fn test_digest_missing_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    ownmark()
        .args(["digest", "--file"])
        .arg(dir.path().join("nope.png"))
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read file"));
}

#[test]
fn test_digest_requires_one_input() {
    ownmark().arg("digest").assert().failure();
    ownmark()
        .args(["digest", "--email", "a@b.c", "--text", "x"])
        .assert()
        .failure();
}

// ============================================================================
// Claim
// ============================================================================

#[test]
fn test_claim_from_email() {
    ownmark()
        .args(["claim", "user@example.com"])
        .assert()
        .success()
        .stdout(format!("owner:{USER_DIGEST}\n"));
}

#[test]
fn test_claim_with_legacy_media_id() {
    let short = "1F".repeat(16);
    ownmark()
        .args(["claim", "user@example.com", "--media-id", &short])
        .assert()
        .success()
        .stdout(format!(
            "owner:{USER_DIGEST}|media:{}{}\n",
            "0".repeat(32),
            "1f".repeat(16)
        ));
}

#[test]
fn test_claim_respects_pasted_media_segment() {
    let pasted = format!("owner:{USER_DIGEST}|media:{}", "cd".repeat(32));
    ownmark()
        .args(["claim", &pasted, "--media-id", &"ef".repeat(32)])
        .assert()
        .success()
        .stdout(format!("{pasted}\n"));
}

#[test]
fn test_claim_drops_invalid_media_id() {
    ownmark()
        .args(["claim", "user@example.com", "--media-id", "not-hex"])
        .assert()
        .success()
        .stdout(format!("owner:{USER_DIGEST}\n"))
        .stderr(predicate::str::contains("ignored"));
}

#[test]
fn test_claim_with_owner_prefix_is_kept_as_typed() {
    ownmark()
        .args(["claim", "owner:alice@example.com"])
        .assert()
        .success()
        .stdout("owner:alice@example.com\n")
        .stderr(predicate::str::contains("no owner digest"));
}

#[test]
fn test_claim_from_bare_digest() {
    ownmark()
        .args(["claim", &format!("0x{}", USER_DIGEST.to_uppercase())])
        .assert()
        .success()
        .stdout(format!("owner:{USER_DIGEST}\n"));
}

// ============================================================================
// Argument validation (no network reached)
// ============================================================================

#[test]
fn test_verify_oversized_parity_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"not really a png").unwrap();

    ownmark()
        .arg("verify")
        .arg(&path)
        .args(["--claim", "user@example.com", "--ecc-parity", "4294967290"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("ecc_parity_bytes"));
}

#[test]
fn test_verify_unknown_preset_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"not really a png").unwrap();

    ownmark()
        .arg("verify")
        .arg(&path)
        .args(["--claim", "user@example.com", "--preset", "myspace"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("Unknown preset"));
}

#[test]
fn test_verify_missing_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    ownmark()
        .arg("verify")
        .arg(dir.path().join("missing.png"))
        .args(["--claim", "user@example.com"])
        .assert()
        .code(66);
}

#[test]
fn test_anchor_invalid_media_id_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"bytes").unwrap();

    ownmark()
        .args(["anchor", "--owner", "user@example.com", "--media-id", "xyz", "--file"])
        .arg(&path)
        .assert()
        .code(64)
        .stderr(predicate::str::contains("media id"));
}

#[test]
fn test_lookup_invalid_media_id_is_usage_error() {
    ownmark().args(["lookup", "abc"]).assert().code(64);
}

#[test]
fn test_track_invalid_hash_is_usage_error() {
    ownmark()
        .args(["track", "0x1234", "--mock", "0"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("invalid transaction hash"));
}

#[test]
fn test_lookup_requires_media_id_or_file() {
    ownmark().arg("lookup").assert().failure();
}

#[test]
fn test_lookup_missing_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    ownmark()
        .args(["lookup", "--file"])
        .arg(dir.path().join("gone.png"))
        .assert()
        .code(66);
}

// ============================================================================
// Embed
// ============================================================================

#[test]
fn test_embed_help_shows_options() {
    ownmark()
        .args(["embed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--owner"))
        .stdout(predicate::str::contains("--media-id"))
        .stdout(predicate::str::contains("--out"))
        .stdout(predicate::str::contains("--verify"));
}

#[test]
fn test_embed_invalid_owner_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"bytes").unwrap();

    ownmark()
        .arg("embed")
        .arg(&path)
        .args(["--owner", "nobody"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("owner must be an email"));
}

#[test]
fn test_embed_invalid_media_id_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"bytes").unwrap();

    ownmark()
        .arg("embed")
        .arg(&path)
        .args(["--owner", "user@example.com", "--media-id", "xyz"])
        .assert()
        .code(64);
}

#[test]
fn test_embed_missing_file_is_input_error() {
    let dir = TempDir::new().unwrap();
    ownmark()
        .arg("embed")
        .arg(dir.path().join("missing.png"))
        .args(["--owner", "user@example.com"])
        .assert()
        .code(66);
}

#[test]
fn test_embed_unreachable_service_is_network_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photo.png");
    fs::write(&path, b"bytes").unwrap();

    ownmark()
        .arg("embed")
        .arg(&path)
        .args(["--owner", "user@example.com", "--out"])
        .arg(dir.path().join("out.png"))
        .assert()
        .code(69)
        .stderr(predicate::str::contains("Embedding request failed"));
    assert!(!dir.path().join("out.png").exists());
}

// ============================================================================
// Track with the simulated ledger
// ============================================================================

#[test]
fn test_track_mock_confirms() {
    ownmark()
        .args(["track", TX_HASH, "--mock", "2", "--interval", "0", "--block", "99"])
        .assert()
        .success()
        .stdout(predicate::str::contains("pending"))
        .stdout(predicate::str::contains("Anchor confirmed"))
        .stdout(predicate::str::contains("99"))
        .stdout(predicate::str::contains(format!(
            "https://explorer.test/tx/{TX_HASH}"
        )));
}

#[test]
fn test_track_mock_quiet_prints_final_status() {
    ownmark()
        .args(["--quiet", "track", &TX_HASH[2..].to_uppercase(), "--mock", "0", "--interval", "0"])
        .assert()
        .success()
        .stdout("confirmed\n");
}
