use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(files_dir.join("guides")).unwrap();
    fs::write(
        files_dir.join("alpha.md"),
        "# Alpha Document\n\nThis is the alpha document about Rust programming.\n\nIt contains information about cargo and crates.",
    )
    .unwrap();
    fs::write(
        files_dir.join("guides/beta.md"),
        "# Beta Document\n\nThis document discusses Python and machine learning.\n\nDeep learning frameworks like PyTorch are covered.",
    )
    .unwrap();
    fs::write(
        files_dir.join("gamma.txt"),
        "Gamma plain text file.\n\nContains notes about deployment and infrastructure.\n\nKubernetes and Docker are mentioned here.",
    )
    .unwrap();
    fs::write(files_dir.join("tiny.md"), "# Tiny\n\ntoo short").unwrap();
    fs::write(files_dir.join("ignored.rs"), "fn main() {}").unwrap();

    let config_content = format!(
        r#"[index]
snapshot_path = "{}/data/index.json"

[chunking]
chunk_size = 200
overlap = 20

[retrieval]
top_k = 5
"#,
        root.display()
    );

    let config_path = config_dir.join("ragrank.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn files_dir(config_path: &Path) -> PathBuf {
    config_path.parent().unwrap().parent().unwrap().join("files")
}

fn run_ragrank(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_ragrank"))
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run ragrank: {}", e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn ingest(config_path: &Path) -> String {
    let dir = files_dir(config_path);
    let (stdout, stderr, success) = run_ragrank(config_path, &["ingest", dir.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    stdout
}

#[test]
fn test_ingest_directory() {
    let (tmp, config_path) = setup_test_env();

    let stdout = ingest(&config_path);
    assert!(stdout.contains("files found: 4"), "got: {}", stdout);
    assert!(stdout.contains("indexed: 3"));
    assert!(stdout.contains("rejected: 1"));
    assert!(stdout.contains("tiny.md"));
    assert!(stdout.contains("ok"));
    assert!(tmp.path().join("data/index.json").exists());
}

#[test]
fn test_ingest_is_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    ingest(&config_path);
    let stdout = ingest(&config_path);
    assert!(stdout.contains("documents in index: 3"), "got: {}", stdout);
}

#[test]
fn test_ingest_dry_run() {
    let (tmp, config_path) = setup_test_env();
    let dir = files_dir(&config_path);

    let (stdout, _, success) =
        run_ragrank(&config_path, &["ingest", "--dry-run", dir.to_str().unwrap()]);
    assert!(success);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("files found: 4"));
    assert!(!tmp.path().join("data/index.json").exists());
}

#[test]
fn test_search_finds_document() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, stderr, success) = run_ragrank(&config_path, &["search", "Rust programming"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.starts_with("1. "), "got: {}", stdout);
    assert!(stdout.contains("Alpha Document"));
    assert!(stdout.contains("id: alpha.md"));
    assert!(!stdout.contains("gamma.txt"));
}

#[test]
fn test_search_explain() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, _, success) = run_ragrank(&config_path, &["search", "machine learning", "--explain"]);
    assert!(success);
    assert!(stdout.contains("id: guides/beta.md"));
    assert!(stdout.contains("explain: semantic="));
}

#[test]
fn test_search_deterministic() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout1, _, _) = run_ragrank(&config_path, &["search", "document"]);
    let (stdout2, _, _) = run_ragrank(&config_path, &["search", "document"]);
    assert_eq!(stdout1, stdout2, "Search results should be deterministic across runs");
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (_, stderr, success) = run_ragrank(&config_path, &["search", "   "]);
    assert!(!success, "Empty query should be rejected");
    assert!(stderr.contains("search query is empty"), "got: {}", stderr);
}

#[test]
fn test_search_rejects_out_of_range_overrides() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (_, stderr, success) = run_ragrank(&config_path, &["search", "rust", "--limit", "0"]);
    assert!(!success, "--limit 0 should be rejected");
    assert!(stderr.contains("top_k must be >= 1"), "got: {}", stderr);

    let (_, stderr, success) = run_ragrank(&config_path, &["search", "rust", "--threshold", "5"]);
    assert!(!success, "--threshold 5 should be rejected");
    assert!(stderr.contains("threshold must be in [0.0, 1.0]"), "got: {}", stderr);

    let (_, _, success) = run_ragrank(&config_path, &["ask", "rust", "--limit", "0"]);
    assert!(!success);
}

#[test]
fn test_search_no_results() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, _, success) = run_ragrank(&config_path, &["search", "xyznonexistent"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_search_before_ingest() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ragrank(&config_path, &["search", "anything"]);
    assert!(success);
    assert!(stdout.contains("No results"));
}

#[test]
fn test_ask_reports_confidence() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_ragrank(&config_path, &["ask", "what is rust?"]);
    assert!(success);
    assert!(stdout.contains("No documents indexed"));

    ingest(&config_path);
    let (stdout, _, success) = run_ragrank(&config_path, &["ask", "rust cargo crates"]);
    assert!(success);
    assert!(stdout.contains("confidence:"));
    assert!(stdout.contains("[1] Alpha Document (document alpha.md)"), "got: {}", stdout);
}

#[test]
fn test_get_and_remove() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, _, success) = run_ragrank(&config_path, &["get", "guides/beta.md"]);
    assert!(success);
    assert!(stdout.contains("title:        Beta Document"));
    assert!(stdout.contains("\"tags\":[\"guides\"]"));
    assert!(stdout.contains("--- Chunks (1) ---"));

    let (stdout, _, success) = run_ragrank(&config_path, &["remove", "guides/beta.md"]);
    assert!(success);
    assert!(stdout.contains("removed guides/beta.md"));

    let (_, stderr, success) = run_ragrank(&config_path, &["get", "guides/beta.md"]);
    assert!(!success);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_similar() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, _, success) = run_ragrank(&config_path, &["similar", "alpha.md"]);
    assert!(success);
    assert!(!stdout.contains("id: alpha.md"));

    let (_, stderr, success) = run_ragrank(&config_path, &["similar", "missing.md"]);
    assert!(!success);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();
    ingest(&config_path);

    let (stdout, _, success) = run_ragrank(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:   3"));
    assert!(stdout.contains("Chunks:      3"));
    assert!(stdout.contains("hash-placeholder (384 dims)"));
    assert!(stdout.contains("Reranker:    disabled"));
}

#[test]
fn test_invalid_config_rejected() {
    let (tmp, _) = setup_test_env();
    let bad = tmp.path().join("config/bad.toml");
    fs::write(&bad, "[chunking]\nchunk_size = 10\noverlap = 10\n").unwrap();

    let (_, stderr, success) = run_ragrank(&bad, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "got: {}", stderr);
}
