//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("c2md")
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_html_file_input() {
    cmd()
        .arg(get_fixture_path("article.html"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Borrowing"))
        .stdout(predicate::str::contains("Copyright 2024").not());
}

#[test]
fn test_cli_stdin_input() {
    let html = std::fs::read_to_string(get_fixture_path("article.html")).unwrap();
    cmd()
        .arg("-")
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("Each value has one owner."));
}

#[test]
fn test_cli_raw_keeps_whole_document() {
    cmd()
        .args(["--raw", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Understanding Ownership"))
        .stdout(predicate::str::contains("analytics").not());
}

#[test]
fn test_cli_selector() {
    cmd()
        .args(["--raw", "--selector", "ul", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("- Each value has one owner."))
        .stdout(predicate::str::contains("Ownership is the set of rules").not());
}

#[test]
fn test_cli_invalid_selector() {
    cmd()
        .args(["--selector", "[[", &get_fixture_path("article.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid CSS selector"));
}

#[test]
fn test_cli_refs_to_stdout() {
    cmd()
        .args(["--raw", "--refs", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("## References"))
        .stdout(predicate::str::contains("https://doc.rust-lang.org/nomicon/"));
}

#[test]
fn test_cli_no_images() {
    cmd()
        .args(["--raw", "--no-images", &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("diagram.png").not());
}

#[test]
fn test_cli_output_dir_with_refs() {
    let tmp = TempDir::new().unwrap();
    let output = format!("{}/", tmp.path().display());

    cmd()
        .args(["--refs", "-f", "ownership", "-o", &output, &get_fixture_path("article.html")])
        .assert()
        .success();

    let markdown = std::fs::read_to_string(tmp.path().join("ownership.md")).unwrap();
    let references = std::fs::read_to_string(tmp.path().join("ownership_refs.md")).unwrap();
    assert!(markdown.contains("[1]"));
    assert!(!markdown.contains("## References"));
    assert!(references.contains("## References"));
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("nested/out.md");

    cmd()
        .args(["-o", output.to_str().unwrap(), &get_fixture_path("article.html")])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(std::fs::read_to_string(&output).unwrap().contains("Borrowing"));
}

#[test]
fn test_cli_metadata_mode() {
    let output = cmd()
        .args(["-m", "metadata", &get_fixture_path("article.html")])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["title"], "Understanding Ownership");
    assert_eq!(json["author"], "Sam Rivera");
    assert_eq!(json["published_date"], "2024-03-15");
    assert_eq!(json["image_count"], 1);
}

#[test]
fn test_cli_metadata_to_dir() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-m", "metadata", "-o", tmp.path().to_str().unwrap(), &get_fixture_path("article.html")])
        .assert()
        .success();

    assert!(tmp.path().join("article_meta.json").exists());
}

#[test]
fn test_cli_markdown_file_passthrough() {
    cmd()
        .arg(get_fixture_path("notes.md"))
        .assert()
        .success()
        .stdout(predicate::str::starts_with("# Meeting Notes"));
}

#[test]
fn test_cli_markdown_file_to_dir() {
    let tmp = TempDir::new().unwrap();
    let output = format!("{}/docs/", tmp.path().display());

    cmd()
        .args(["-o", &output, &get_fixture_path("notes.md")])
        .assert()
        .success();

    assert!(tmp.path().join("docs/notes.md").exists());
}

#[test]
fn test_cli_unsupported_document() {
    cmd()
        .arg(get_fixture_path("report.docx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported document type"));
}

#[test]
fn test_cli_invalid_source() {
    cmd()
        .arg("nonexistent.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source must be a URL"));
}

#[test]
fn test_cli_invalid_mode() {
    cmd()
        .args(["-m", "html", &get_fixture_path("article.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_screenshot_requires_output() {
    cmd()
        .args(["-m", "screenshot", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires -o/--output"));
}

#[test]
fn test_cli_archive_requires_output() {
    cmd()
        .args(["-m", "archive", "https://example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires -o/--output"));
}

#[test]
fn test_cli_browser_mode_rejected_for_local_html() {
    let tmp = TempDir::new().unwrap();
    cmd()
        .args(["-m", "pdf", "-o", tmp.path().to_str().unwrap(), &get_fixture_path("article.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("needs a URL source"));
}

#[test]
fn test_cli_deep_rejected_for_files() {
    cmd()
        .args(["--deep", &get_fixture_path("notes.md")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--deep needs a URL source"));
}

#[test]
fn test_cli_screenshot_quality_range() {
    cmd()
        .args(["--screenshot-quality", "101", &get_fixture_path("article.html")])
        .assert()
        .failure();
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["-v", &get_fixture_path("notes.md")])
        .assert()
        .success()
        .stderr(predicate::str::contains("c2md"));
}
