use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const STATUTE: &str = "THE BHARATIYA NYAYA SANHITA, 2023
An Act to consolidate the provisions relating to offences.

CHAPTER I
PRELIMINARY
1. Short title and commencement.
(1) This Act may be called the Bharatiya Nyaya Sanhita.
----------
12
2. Definitions.
In this Sanhita, unless the context otherwise requires,
Page 3 of 200
CHAPTER XVII
OF OFFENCES AGAINST PROPERTY
303. Theft.
Whoever, intending to take dishonestly any movable property out of the possession of any person without that person's consent, moves that property, is said to commit theft.
304. Snatching.
Theft is snatching if, in order to commit theft, the offender suddenly or quickly or forcibly seizes or secures or grabs or takes away movable property.
";

fn nyaya_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("nyaya");
    path
}

fn setup_test_env(config_body: &str) -> (TempDir, PathBuf, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let statute_path = root.join("bns.txt");
    fs::write(&statute_path, STATUTE).unwrap();

    let config_path = config_dir.join("nyaya.toml");
    fs::write(&config_path, config_body).unwrap();

    (tmp, config_path, statute_path)
}

fn run_nyaya(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = nyaya_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--progress")
        .arg("off")
        .args(args)
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run nyaya binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_chunk_lists_sections() {
    let (_tmp, config_path, statute) = setup_test_env("");

    let (stdout, stderr, success) = run_nyaya(&config_path, &["chunk", statute.to_str().unwrap()]);
    assert!(success, "chunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("chunk-0"));
    assert!(stdout.contains("Preamble"));
    assert!(stdout.contains("304. Snatching."));
    assert!(stdout.contains("7 sections from 14 lines"));
    assert!(stdout.contains("Longest: 303. Theft. (184 bytes)"));
}

#[test]
fn test_chunk_json() {
    let (_tmp, config_path, statute) = setup_test_env("");

    let (stdout, stderr, success) =
        run_nyaya(&config_path, &["chunk", statute.to_str().unwrap(), "--json"]);
    assert!(success, "chunk --json failed: {}", stderr);

    let chunks: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let chunks = chunks.as_array().unwrap();
    let titles: Vec<&str> = chunks
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Preamble",
            "CHAPTER I",
            "1. Short title and commencement.",
            "2. Definitions.",
            "CHAPTER XVII",
            "303. Theft.",
            "304. Snatching.",
        ]
    );

    // Noise lines are gone from content; spans tile the line sequence.
    let definitions = &chunks[3];
    assert_eq!(
        definitions["content"],
        "2. Definitions.\nIn this Sanhita, unless the context otherwise requires,"
    );
    assert_eq!(chunks[0]["metadata"]["start_line"], 0);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0]["metadata"]["end_line"], pair[1]["metadata"]["start_line"]);
    }
    assert!(!chunks[2]["content"].as_str().unwrap().contains("----"));
}

#[test]
fn test_chunk_with_custom_header_pattern() {
    let (_tmp, config_path, statute) = setup_test_env(
        r#"[chunking]
header_pattern = '^\d+\.\s'
"#,
    );

    let (stdout, stderr, success) =
        run_nyaya(&config_path, &["chunk", statute.to_str().unwrap(), "--json"]);
    assert!(success, "chunk failed: {}", stderr);
    let chunks: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let titles: Vec<&str> = chunks
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles[0], "Preamble");
    assert!(!titles.contains(&"CHAPTER I"));
    assert_eq!(titles.len(), 5);
}

#[test]
fn test_chunk_noise_only_file_fails() {
    let (tmp, config_path, _) = setup_test_env("");
    let noise = tmp.path().join("noise.txt");
    fs::write(&noise, "\n   \n----------\n42\nPage 7\n").unwrap();

    let (_, stderr, success) = run_nyaya(&config_path, &["chunk", noise.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("No sections found"));
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let (tmp, _, statute) = setup_test_env("");
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_nyaya(&missing, &["chunk", statute.to_str().unwrap()]);
    assert!(success, "chunk failed: {}", stderr);
    assert!(stdout.contains("303. Theft."));
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path, statute) = setup_test_env("[retrieval]\ntop_k = 0\n");

    let (_, stderr, success) = run_nyaya(&config_path, &["chunk", statute.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("retrieval.top_k must be >= 1"));
}

#[test]
fn test_invalid_pattern_rejected() {
    let (_tmp, config_path, statute) = setup_test_env("[chunking]\nnoise_pattern = \"[\"\n");

    let (_, stderr, success) = run_nyaya(&config_path, &["chunk", statute.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("invalid chunking pattern"));
}

#[test]
fn test_ask_errors_when_embeddings_disabled() {
    let (_tmp, config_path, statute) = setup_test_env("");

    let (_, stderr, success) = run_nyaya(
        &config_path,
        &["ask", "what is snatching?", "--corpus", statute.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("Embedding provider is disabled"));
}

#[test]
fn test_ask_errors_without_api_key() {
    let (_tmp, config_path, statute) = setup_test_env(
        r#"[embedding]
provider = "gemini"
model = "text-embedding-004"
"#,
    );

    let (_, stderr, success) = run_nyaya(
        &config_path,
        &["ask", "what is snatching?", "--corpus", statute.to_str().unwrap()],
    );
    assert!(!success);
    assert!(stderr.contains("GEMINI_API_KEY"));
}

#[test]
fn test_ask_errors_without_corpus() {
    let (_tmp, config_path, _) = setup_test_env(
        r#"[embedding]
provider = "ollama"
model = "nomic-embed-text"
"#,
    );

    let (_, stderr, success) = run_nyaya(&config_path, &["ask", "what is snatching?"]);
    assert!(!success);
    assert!(stderr.contains("No corpus configured"));
}

#[test]
fn test_unknown_progress_mode() {
    let (_tmp, config_path, statute) = setup_test_env("");
    let output = Command::new(nyaya_binary())
        .arg("--config")
        .arg(&config_path)
        .args(["--progress", "loud", "chunk", statute.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown progress mode"));
}
