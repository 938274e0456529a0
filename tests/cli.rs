use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[allow(deprecated)]
fn secrag(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("secrag").expect("binary");
    cmd.current_dir(workdir)
        .env_remove("OPENAI_API_KEY")
        .env_remove("SECRAG_API_KEY")
        .env("SECRAG_API_BASE", "http://127.0.0.1:9");
    cmd
}

#[test]
fn query_without_index_asks_for_build() {
    let temp = tempdir().unwrap();
    secrag(temp.path())
        .args(["query", "Was", "ist", "MFA?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("secrag build"));
}

#[test]
fn search_without_index_asks_for_build() {
    let temp = tempdir().unwrap();
    secrag(temp.path())
        .args(["search", "Phishing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("secrag build"));
}

#[test]
fn build_without_docs_fails_and_writes_nothing() {
    let temp = tempdir().unwrap();
    secrag(temp.path())
        .env("SECRAG_API_KEY", "sk-test")
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No documents found"));
    assert!(!temp.path().join("secrag_index.bin").exists());
    assert!(!temp.path().join("secrag_metadata.bin").exists());
}

#[test]
fn build_reports_missing_docs_before_missing_api_key() {
    let temp = tempdir().unwrap();
    secrag(temp.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No documents found"))
        .stderr(predicate::str::contains("API key").not());
}

#[test]
fn config_masks_api_key() {
    let temp = tempdir().unwrap();
    secrag(temp.path())
        .env("SECRAG_API_KEY", "sk-very-secret-key")
        .env("SECRAG_TOP_K", "5")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("top_k=5"))
        .stdout(predicate::str::contains("api_key=sk-v****"))
        .stdout(predicate::str::contains("very-secret").not());
}
