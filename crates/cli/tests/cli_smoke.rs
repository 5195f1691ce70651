use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const KB: &str = r#"{"type":"Card","id":"Citi Rewards","properties":{"summary":"Citi Rewards earns 4 mpd on dining"}}
{"type":"Card","id":"DBS Woman's World","properties":{"summary":"DBS Woman's World earns 4 mpd online"}}
{"type":"Wallet","id":"Amaze","properties":{"summary":"Amaze converts offline spend to online"}}
not json at all
{"source":"Citi Rewards","target":"Amaze","relation":"pairs_with","properties":{}}
"#;

#[allow(deprecated)]
fn advisor(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("advisor").expect("binary");
    cmd.current_dir(workdir)
        .env("ADVISOR_EMBEDDING_MODE", "stub")
        .env("ADVISOR_GENERATION_MODE", "stub")
        .env("ADVISOR_INDEX_PATH", workdir.join("data").join("advisor.ragx"))
        .env("ADVISOR_KB_PATH", workdir.join("credit-card-kb.json"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn setup() -> TempDir {
    let temp = tempdir().unwrap();
    fs::write(temp.path().join("credit-card-kb.json"), KB).unwrap();
    temp
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("command run");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid json")
}

#[test]
fn ingest_then_stats_reports_chunks() {
    let temp = setup();
    let root = temp.path();

    let report = json_stdout(advisor(root).args(["ingest", "--json"]));
    assert_eq!(report["stats"]["chunks"], 4);
    assert_eq!(report["stats"]["skipped_lines"], 1);

    let stats = json_stdout(advisor(root).args(["stats", "--json"]));
    assert_eq!(stats["chunks"], 4);
    assert_eq!(stats["sources"], 1);
    assert_eq!(stats["model_id"], "stub/text-embedding-ada-002/1536");
}

#[test]
fn ask_bootstraps_from_kb_and_cites_sources() {
    let temp = setup();
    let root = temp.path();

    let answer = json_stdout(advisor(root).args(["ask", "best card for dining", "--json"]));
    let citations = answer["citations"].as_array().expect("citations");
    assert!(citations.iter().any(|c| c == "credit-card-kb"));
    assert_eq!(answer["used_chunks"].as_array().map(Vec::len), Some(4));
    assert!(root.join("data").join("advisor.ragx").exists());

    advisor(root)
        .args(["ask", "which wallet pairs with Citi Rewards?", "-k", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sources:"));
}

#[test]
fn ingest_text_documents_with_pages() {
    let temp = setup();
    let root = temp.path();
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("guide.txt"),
        "Dining guide\n\nUse Citi Rewards at restaurants.\u{000C}Travel guide",
    )
    .unwrap();

    let report = json_stdout(advisor(root).args(["ingest", "--json", "docs"]));
    assert_eq!(report["stats"]["documents"], 6);
    assert_eq!(report["stats"]["sources"]["guide.txt"], 2);
    assert_eq!(report["stats"]["sources"]["credit-card-kb"], 4);
    assert_eq!(report["index"]["chunks"], 6);
    assert_eq!(report["index"]["sources"], 2);
}

fn write_guide(root: &Path) {
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("guide.txt"), "Travel guide: lounges and miles").unwrap();
}

fn citations(answer: &Value) -> Vec<String> {
    answer["citations"]
        .as_array()
        .expect("citations")
        .iter()
        .filter_map(|c| c.as_str().map(str::to_string))
        .collect()
}

#[test]
fn ingesting_documents_first_still_answers_from_kb() {
    let temp = setup();
    let root = temp.path();
    write_guide(root);

    json_stdout(advisor(root).args(["ingest", "--json", "docs"]));
    let answer = json_stdout(advisor(root).args(["ask", "best card for dining", "--json"]));
    assert!(
        citations(&answer).contains(&"credit-card-kb".to_string()),
        "{answer}"
    );

    let stats = json_stdout(advisor(root).args(["stats", "--json"]));
    assert_eq!(stats["chunks"], 5);
}

#[test]
fn corrupt_snapshot_is_rebuilt_before_ingesting_documents() {
    let temp = setup();
    let root = temp.path();
    write_guide(root);
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data").join("advisor.ragx"), b"RAGXgarbage").unwrap();

    let report = json_stdout(advisor(root).args(["ingest", "--json", "docs"]));
    assert_eq!(report["index"]["chunks"], 5);

    let answer = json_stdout(advisor(root).args(["ask", "best card for dining", "--json"]));
    assert!(
        citations(&answer).contains(&"credit-card-kb".to_string()),
        "{answer}"
    );
}

#[test]
fn failed_rebuild_keeps_previous_snapshot() {
    let temp = setup();
    let root = temp.path();

    json_stdout(advisor(root).args(["ingest", "--json"]));
    advisor(root)
        .args(["rebuild", "--kb", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));

    let stats = json_stdout(advisor(root).args(["stats", "--json"]));
    assert_eq!(stats["chunks"], 4);
}

#[test]
fn blank_question_fails() {
    let temp = setup();
    advisor(temp.path())
        .args(["ask", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("question must not be empty"));
}

#[test]
fn openai_mode_without_key_fails_cleanly() {
    let temp = setup();
    advisor(temp.path())
        .env("ADVISOR_EMBEDDING_MODE", "openai")
        .args(["stats"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn rebuild_replaces_appended_index() {
    let temp = setup();
    let root = temp.path();

    json_stdout(advisor(root).args(["ingest", "--json"]));
    json_stdout(advisor(root).args(["ingest", "--json"]));
    let stats = json_stdout(advisor(root).args(["stats", "--json"]));
    assert_eq!(stats["chunks"], 8);

    let rebuilt = json_stdout(advisor(root).args(["rebuild", "--json"]));
    assert_eq!(rebuilt["chunks"], 4);
    let stats = json_stdout(advisor(root).args(["stats", "--json"]));
    assert_eq!(stats["chunks"], 4);
}
