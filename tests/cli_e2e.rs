//! End-to-end CLI tests for the litopics binary.

// `Command::cargo_bin` is deprecated in assert_cmd >=2.0.17 in favor of
// `cargo::cargo_bin_cmd!` macro. Suppressed until migration to the new API.
#![allow(deprecated)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const THEMES: [&str; 3] = [
    "Neural networks learn image features for tumor detection in radiology scans.",
    "Gene expression profiles reveal protein pathways in cancer cells.",
    "Robots plan motion using reinforcement learning control policies.",
];

/// A command isolated from any user config file.
fn litopics(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("litopics").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("xdg"))
        .env("HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

fn toml_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "\\\\")
}

/// A dataset of 30 articles cycling through three themes.
fn write_dataset(data_dir: &Path) {
    std::fs::create_dir_all(data_dir).unwrap();
    let mut csv = String::from("AB,AD,AU,DP,TA,JT,PL,PT,PMID,TI\n");
    for i in 0..30 {
        let abstract_text = THEMES[i % THEMES.len()];
        csv.push_str(&format!(
            "\"{abstract_text}\",Univ,Author {i},2020,J,Journal,USA,Journal Article,{i},Title {i}\n"
        ));
    }
    std::fs::write(data_dir.join("data.csv"), csv).unwrap();
}

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("litopics.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_binary_help_lists_stages() {
    let home = TempDir::new().unwrap();
    litopics(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("topic-clouds"))
        .stdout(predicate::str::contains("browse"));
}

#[test]
fn test_binary_without_subcommand_fails() {
    let home = TempDir::new().unwrap();
    litopics(home.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_unknown_config_key_reports_line() {
    let home = TempDir::new().unwrap();
    let config = write_config(home.path(), "num_topics = 3\ncolour = \"blue\"\n");
    litopics(home.path())
        .args(["--config", config.to_str().unwrap(), "train"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("colour"))
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_fetch_without_email_fails_before_any_request() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    litopics(home.path())
        .args(["--data-dir", data_dir.to_str().unwrap(), "fetch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("email"));
    assert!(!data_dir.join("data.csv").exists());
}

#[test]
fn test_train_on_degenerate_corpus_writes_empty_artifacts() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    write_dataset(&data_dir);

    litopics(home.path())
        .args(["--data-dir", data_dir.to_str().unwrap(), "preprocess"])
        .assert()
        .success();
    assert!(data_dir.join("lemmas.json").exists());

    // A model from a run with looser pruning.
    litopics(home.path())
        .args([
            "--data-dir",
            data_dir.to_str().unwrap(),
            "train",
            "--min-df",
            "2",
            "--iterations",
            "10",
        ])
        .assert()
        .success();
    assert!(data_dir.join("model/abstracts.model.json").exists());

    // Defaults require 100 documents per term; the dataset has 30.
    litopics(home.path())
        .args(["--data-dir", data_dir.to_str().unwrap(), "train"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no terms survived pruning"));

    let dictionary = std::fs::read_to_string(data_dir.join("model/dictionary.json")).unwrap();
    assert!(!dictionary.contains("neural"));
    let corpus = std::fs::read_to_string(data_dir.join("model/corpus.mm")).unwrap();
    assert_eq!(corpus.lines().nth(1), Some("30 0 0"));
    assert!(!data_dir.join("model/abstracts.model.json").exists());
}

#[test]
fn test_visualizers_skip_without_a_trained_model() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    for stage in ["browse", "topic-clouds"] {
        litopics(home.path())
            .args(["--data-dir", data_dir.to_str().unwrap(), stage])
            .assert()
            .success()
            .stderr(predicate::str::contains("litopics train"));
    }
    assert!(!data_dir.join("ldamodel_viz.html").exists());
    assert!(!data_dir.join("topic_0.svg").exists());
}

#[test]
fn test_run_completes_when_pruning_removes_every_term() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    write_dataset(&data_dir);

    litopics(home.path())
        .args(["--data-dir", data_dir.to_str().unwrap(), "run", "--skip-fetch"])
        .assert()
        .success()
        .stderr(predicate::str::contains("no terms survived pruning"));

    assert!(data_dir.join("model/dictionary.json").exists());
    assert!(data_dir.join("model/corpus.mm").exists());
    assert!(data_dir.join("common_words.svg").exists());
    assert!(!data_dir.join("model/abstracts.model.json").exists());
    assert!(!data_dir.join("topic_0.svg").exists());
    assert!(!data_dir.join("ldamodel_viz.html").exists());
}

#[test]
fn test_run_from_existing_dataset_writes_every_artifact() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    write_dataset(&data_dir);
    let config = write_config(
        home.path(),
        &format!(
            "# small corpus\ndata_dir = \"{}\"\nmin_df = 2\nmax_df_fraction = 0.9\nnum_topics = 3\niterations = 50\ntopic_words = 10\n",
            toml_path(&data_dir)
        ),
    );

    litopics(home.path())
        .args(["-q", "--config", config.to_str().unwrap(), "run", "--skip-fetch"])
        .assert()
        .success();

    for artifact in [
        "lemmas.json",
        "model/dictionary.json",
        "model/corpus.mm",
        "model/abstracts.model.json",
        "common_words.svg",
        "topic_0.svg",
        "topic_1.svg",
        "topic_2.svg",
        "ldamodel_viz.html",
    ] {
        assert!(
            data_dir.join(artifact).exists(),
            "missing artifact {artifact}"
        );
    }

    let corpus = std::fs::read_to_string(data_dir.join("model/corpus.mm")).unwrap();
    assert!(corpus.starts_with("%%MatrixMarket matrix coordinate"));
    let svg = std::fs::read_to_string(data_dir.join("common_words.svg")).unwrap();
    assert!(svg.contains("<svg"));
    assert!(svg.contains(">neural</text>"));
    let html = std::fs::read_to_string(data_dir.join("ldamodel_viz.html")).unwrap();
    assert!(html.contains("\"relevant_terms\""));
}

#[test]
fn test_cli_flags_override_config_file() {
    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    write_dataset(&data_dir);
    let config = write_config(
        home.path(),
        &format!(
            "data_dir = \"{}\"\nmin_df = 500\nmax_df_fraction = 0.9\niterations = 20\n",
            toml_path(&data_dir)
        ),
    );

    litopics(home.path())
        .args(["--config", config.to_str().unwrap(), "preprocess"])
        .assert()
        .success();
    litopics(home.path())
        .args([
            "--config",
            config.to_str().unwrap(),
            "train",
            "--min-df",
            "2",
            "-k",
            "2",
        ])
        .assert()
        .success();
    assert!(data_dir.join("model/abstracts.model.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_writes_dataset_from_mock_service() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };

    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "esearchresult": {"count": "1", "retmax": "1", "retstart": "0", "idlist": ["101"]}
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "PMID- 101\nTI  - Learning to rank.\nAB  - Neural networks rank abstracts.\nAD  - Univ\nAU  - Smith J\nDP  - 2020\nTA  - J\nJT  - Journal\nPL  - USA\nPT  - Journal Article\n",
        ))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let data_dir = home.path().join("data");
    litopics(home.path())
        .args([
            "--data-dir",
            data_dir.to_str().unwrap(),
            "fetch",
            "--email",
            "dev@example.org",
            "--base-url",
            &mock_server.uri(),
            "--first-year",
            "2020",
            "--last-year",
            "2020",
            "--request-interval-ms",
            "0",
        ])
        .assert()
        .success();

    let dataset = std::fs::read_to_string(data_dir.join("data.csv")).unwrap();
    let mut lines = dataset.lines();
    assert_eq!(lines.next(), Some("AB,AD,AU,DP,TA,JT,PL,PT,PMID,TI"));
    assert!(lines.next().unwrap().contains("Neural networks rank abstracts."));
}
