use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mapmirror() -> Command {
    let mut cmd = Command::cargo_bin("mapmirror").unwrap();
    cmd.env_remove("MAPMIRROR_TOKEN").env_remove("RUST_LOG");
    cmd
}

const APP_MAP: &str =
    r#"{"version":3,"sources":["webpack:///src/app.js"],"sourcesContent":["const x=1;"]}"#;

/// Serves `APP_MAP` at `/app.map`; every other path gets a 404.
async fn start_sourcemap_server() -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/app.map"))
        .respond_with(ResponseTemplate::new(200).set_body_string(APP_MAP))
        .mount(&mock_server)
        .await;
    mock_server
}

fn write_links(dir: &Path, links: &[&str]) -> String {
    let path = dir.join("links.json");
    fs::write(&path, serde_json::to_string(links).unwrap()).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_help() {
    mapmirror()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base-url"))
        .stdout(predicate::str::contains("--batch-size"));
}

#[test]
fn test_generate_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("mapmirror.toml");

    mapmirror()
        .args(["--generate-config", "--config"])
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Generated sample configuration file"));

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("base_url = \"https://cdn.example.com\""));
}

#[test]
fn test_missing_base_url_is_config_error() {
    let temp_dir = TempDir::new().unwrap();

    mapmirror()
        .current_dir(temp_dir.path())
        .args(["--output-format", "plain"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_invalid_base_url_rejected_by_parser() {
    mapmirror()
        .args(["--base-url", "ftp://cdn.example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported scheme"));
}

#[test]
fn test_missing_links_file() {
    let temp_dir = TempDir::new().unwrap();

    mapmirror()
        .current_dir(temp_dir.path())
        .args(["--base-url", "http://127.0.0.1:9", "--output-format", "plain", "-q"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("links.json"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_end_to_end_run() {
    let temp_dir = TempDir::new().unwrap();
    let mock_server = start_sourcemap_server().await;
    let base_url = mock_server.uri();
    let links = write_links(temp_dir.path(), &["/app", "/gone"]);

    mapmirror()
        .current_dir(temp_dir.path())
        .args(["--base-url", &base_url, "--links", &links, "--output-format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files_changed\": 1"));

    assert_eq!(
        fs::read_to_string(temp_dir.path().join("src/app.js")).unwrap(),
        "const x=1;"
    );

    let commit = fs::read_to_string(temp_dir.path().join("commit-message.txt")).unwrap();
    assert_eq!(
        commit,
        format!(
            "chore: Changed 1 file(s)\n\nChanged files:\n./src/app.js (new)\n\n\
             Failed downloads:\n{}/gone.map (HTTP 404)",
            base_url
        )
    );

    let notification = fs::read_to_string(temp_dir.path().join("telegram-message.txt")).unwrap();
    assert!(notification.starts_with("Changed files:\n```\n./src/app.js (new)\n```"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_noop_run_reports_once_and_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join("src")).unwrap();
    fs::write(temp_dir.path().join("src/app.js"), "const x=1;").unwrap();

    let mock_server = start_sourcemap_server().await;
    let links = write_links(temp_dir.path(), &["/app"]);

    mapmirror()
        .current_dir(temp_dir.path())
        .args(["--base-url", &mock_server.uri(), "--links", &links, "--output-format", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing changed").count(1));

    assert!(!temp_dir.path().join("commit-message.txt").exists());
    assert!(!temp_dir.path().join("telegram-message.txt").exists());
}
