//! End-to-end tests driving the `crxpack` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Scratch workspace with a small extension directory.
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let ext = temp_dir.path().join("ext");
        std::fs::create_dir_all(ext.join("js")).expect("failed to create ext dir");
        std::fs::write(
            ext.join("manifest.json"),
            r#"{"name":"Demo","version":"1.4.2","manifest_version":3}"#,
        )
        .expect("failed to write manifest");
        std::fs::write(ext.join("js/background.js"), "chrome.runtime;").expect("write js");
        Self { temp_dir }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.temp_dir.path().join(rel)
    }

    fn crxpack(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_crxpack"));
        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("CRXPACK_KEY");
        cmd.env_remove("CRXPACK_CODEBASE");
        cmd.env_remove("CRXPACK_KEY_SIZE");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    fn run(&self, args: &[&str]) -> Output {
        self.crxpack()
            .args(args)
            .output()
            .expect("failed to run crxpack")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "crxpack failed:\nstdout: {}\nstderr: {}",
        stdout(output),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

#[test]
fn test_help_command() {
    let ctx = TestContext::new();
    let output = ctx.run(&["--help"]);
    assert_success(&output);
    assert!(stdout(&output).contains("Usage:"));
}

#[test]
fn test_pack_generates_key_and_container() {
    let ctx = TestContext::new();
    let output = ctx.run(&["pack", "ext", "--key-size", "1024"]);
    assert_success(&output);

    let crx = read(&ctx.path("ext.crx"));
    assert_eq!(&crx[..4], b"Cr24");
    assert_eq!(&crx[4..8], &[3, 0, 0, 0]);
    assert!(ctx.path("ext.pem").is_file());

    // id from the key and from the container agree
    let from_key = ctx.run(&["id", "ext.pem"]);
    let from_crx = ctx.run(&["id", "ext.crx"]);
    assert_success(&from_key);
    assert_success(&from_crx);
    let id = stdout(&from_key).trim().to_string();
    assert_eq!(id.len(), 32);
    assert!(id.bytes().all(|c| (b'a'..=b'p').contains(&c)));
    assert_eq!(id, stdout(&from_crx).trim());
}

#[test]
fn test_pack_reuses_existing_key() {
    let ctx = TestContext::new();
    assert_success(&ctx.run(&["keygen", "-o", "signing.pem", "--ecdsa"]));
    let key_before = read(&ctx.path("signing.pem"));

    let output = ctx.run(&["pack", "ext", "--key", "signing.pem", "-o", "out.crx"]);
    assert_success(&output);
    assert_eq!(read(&ctx.path("signing.pem")), key_before);

    let id_key = stdout(&ctx.run(&["id", "signing.pem"]));
    let id_crx = stdout(&ctx.run(&["id", "out.crx"]));
    assert_eq!(id_key, id_crx);
}

#[test]
fn test_pack_v2_and_unpack() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "pack",
        "ext",
        "--crx-version",
        "2",
        "--key-size",
        "1024",
        "-o",
        "legacy.crx",
    ]);
    assert_success(&output);
    assert_eq!(&read(&ctx.path("legacy.crx"))[4..8], &[2, 0, 0, 0]);

    assert_success(&ctx.run(&["unpack", "legacy.crx", "-o", "out"]));
    assert_eq!(
        read(&ctx.path("out/js/background.js")),
        b"chrome.runtime;".to_vec()
    );
}

#[test]
fn test_pack_writes_update_manifest() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "pack",
        "ext",
        "--key-size",
        "1024",
        "--codebase",
        "https://example.com/ext.crx",
        "--update-xml",
        "updates.xml",
    ]);
    assert_success(&output);

    let xml = String::from_utf8(read(&ctx.path("updates.xml"))).unwrap();
    assert!(xml.contains("codebase='https://example.com/ext.crx'"));
    assert!(xml.contains("version='1.4.2'"));
    assert!(xml.contains("prodversionmin='73.0.3683'"));
}

#[test]
fn test_update_manifest_without_codebase_fails() {
    let ctx = TestContext::new();
    let output = ctx.run(&["pack", "ext", "--update-xml", "updates.xml"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("codebase"));
    assert!(!ctx.path("ext.pem").exists());
}

#[test]
fn test_config_file_sets_version() {
    let ctx = TestContext::new();
    std::fs::write(ctx.path("crxpack.toml"), "crx_version = 2\nkey_size = 1024\n").unwrap();

    assert_success(&ctx.run(&["pack", "ext"]));
    assert_eq!(&read(&ctx.path("ext.crx"))[4..8], &[2, 0, 0, 0]);
}

#[test]
fn test_inspect_json() {
    let ctx = TestContext::new();
    assert_success(&ctx.run(&["keygen", "-o", "k.pem", "--ecdsa"]));
    assert_success(&ctx.run(&["pack", "ext", "--key", "k.pem"]));

    let output = ctx.run(&["inspect", "ext.crx", "--json"]);
    assert_success(&output);
    let info: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(info["version"], 3);
    assert_eq!(info["proofs"][0]["algorithm"], "sha256-ecdsa");
    assert_eq!(info["crx_id"].as_str().map(str::len), Some(32));
}

#[test]
fn test_inspect_rejects_non_container() {
    let ctx = TestContext::new();
    let output = ctx.run(&["inspect", "ext/manifest.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_keygen_prints_id_and_manifest_key() {
    let ctx = TestContext::new();
    let output = ctx.run(&["keygen", "-o", "k.pem", "--ecdsa"]);
    assert_success(&output);
    let text = stdout(&output);

    let id = stdout(&ctx.run(&["id", "k.pem"]));
    assert!(text.contains(id.trim()));
    // base64 of the fixed P-256 SubjectPublicKeyInfo prefix
    assert!(text.contains("MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE"), "{text}");
}

#[test]
fn test_keygen_refuses_overwrite() {
    let ctx = TestContext::new();
    assert_success(&ctx.run(&["keygen", "-o", "k.pem", "--ecdsa"]));
    assert!(!ctx.run(&["keygen", "-o", "k.pem", "--ecdsa"]).status.success());
    assert_success(&ctx.run(&["keygen", "-o", "k.pem", "--ecdsa", "--force"]));
}

#[test]
fn test_completions() {
    let ctx = TestContext::new();
    let output = ctx.run(&["completions", "bash"]);
    assert_success(&output);
    assert!(stdout(&output).contains("crxpack"));
}
