//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use chrono::{Duration, TimeZone, Utc};
use predicates::prelude::*;
use tempfile::TempDir;

use coursekit_core::statistics::{BlockAttempt, StatisticsKey};

fn coursekit() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("coursekit").unwrap()
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

// --- validate ---

#[test]
fn validate_gap_fill_document() {
    coursekit()
        .arg("validate")
        .arg("--document")
        .arg("../../content/colours.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("gapfill, 2 blocks, 4 points"))
        .stdout(predicate::str::contains("All documents valid"));
}

#[test]
fn validate_directory() {
    coursekit()
        .arg("validate")
        .arg("--document")
        .arg("../../content")
        .assert()
        .success()
        .stdout(predicate::str::contains("capitals.json"))
        .stdout(predicate::str::contains("colours.json"))
        .stdout(predicate::str::contains("welcome.json (reminder, 2 blocks"));
}

#[test]
fn validate_nonexistent_file() {
    coursekit()
        .arg("validate")
        .arg("--document")
        .arg("nonexistent.json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn validate_rejects_illegal_block_type() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "bad.json",
        r#"{"itemType": "gapfill", "blocks": [{"id": "block-1", "type": "questionAudio", "data": {}}]}"#,
    );

    coursekit()
        .arg("validate")
        .arg("--document")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not allowed in a gapfill document"));
}

#[test]
fn validate_reports_lint_warnings() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "unsynced.json",
        r#"{"itemType": "gapfill", "blocks": [{"id": "block-1", "type": "questionText", "data": {"content": "A [[blank1]]"}}]}"#,
    );

    coursekit()
        .arg("validate")
        .arg("--document")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[block-1] WARNING"))
        .stdout(predicate::str::contains("warning(s) found"));
}

// --- migrate ---

#[test]
fn migrate_legacy_document() {
    coursekit()
        .arg("migrate")
        .arg("--document")
        .arg("../../content/legacy/welcome.json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""itemType": "reminder""#))
        .stdout(predicate::str::contains(r#""id": "block-2""#))
        .stdout(predicate::str::contains("files/campus.png"));
}

#[test]
fn migrate_needs_item_type_for_bare_lists() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "bare.json", r#"["Hello", "World"]"#);

    coursekit()
        .arg("migrate")
        .arg("--document")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no itemType"));

    let output = dir.path().join("migrated.json");
    coursekit()
        .arg("migrate")
        .arg("--document")
        .arg(&path)
        .arg("--item-type")
        .arg("reminder")
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("reminder, 2 blocks"));

    let migrated = std::fs::read_to_string(&output).unwrap();
    let doc = coursekit_core::parser::parse(&migrated).unwrap();
    assert_eq!(doc.blocks.len(), 2);
}

// --- reconcile ---

#[test]
fn reconcile_reports_then_writes() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "gaps.json",
        r#"{"itemType": "gapfill", "blocks": [{"id": "block-1", "type": "questionText",
            "data": {"content": "[[blank1]] and [[blank3]]",
                     "gaps": [{"index": 1, "correctAnswer": "cats"}, {"index": 2, "correctAnswer": "dogs"}]}}]}"#,
    );

    coursekit()
        .arg("reconcile")
        .arg("--document")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("[block-1] gaps now: [1, 3]"))
        .stdout(predicate::str::contains("--write"));

    coursekit()
        .arg("reconcile")
        .arg("--document")
        .arg(&path)
        .arg("--write")
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated"));

    let doc = coursekit_core::parser::parse(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let coursekit_core::model::BlockData::GapFill(payload) = &doc.blocks[0].data else {
        panic!("expected gap-fill payload");
    };
    let indices: Vec<u32> = payload.gaps.iter().map(|g| g.index).collect();
    assert_eq!(indices, vec![1, 3]);
    assert_eq!(payload.gaps[0].correct_answer, "cats");

    coursekit()
        .arg("reconcile")
        .arg("--document")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("already reconciled"));
}

// --- grade ---

#[test]
fn grade_correct_gap_fill() {
    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/colours.json")
        .arg("--block")
        .arg("block-2")
        .arg("--answer")
        .arg(r#"{"answers": ["Blue", "green"]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Correct (4/4 points, 2/2 parts)"))
        .stdout(predicate::str::contains("Correct answer").not());
}

#[test]
fn grade_partial_gap_fill() {
    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/colours.json")
        .arg("--block")
        .arg("block-2")
        .arg("--answer")
        .arg(r#"{"answers": {"1": "azure"}}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Incorrect (2/4 points, 1/2 parts)"));
}

#[test]
fn grade_all_or_nothing_from_config() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "coursekit.toml", "[grading]\nscoring = \"allOrNothing\"\n");

    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/colours.json")
        .arg("--block")
        .arg("block-2")
        .arg("--answer")
        .arg(r#"{"answers": ["blue", "red"]}"#)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Incorrect (0/4 points, 1/2 parts)"));
}

#[test]
fn grade_json_with_solutions() {
    let output = coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/capitals.json")
        .arg("--block")
        .arg("block-1")
        .arg("--answer")
        .arg(r#"{"answers": [{"questionId": "q1", "selected": 0}, {"questionId": "q2", "selected": [2, 0]}]}"#)
        .arg("--show-solutions")
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["isCorrect"], true);
    assert_eq!(result["pointsEarned"], 2);
    assert_eq!(result["correctAnswer"]["answers"][1]["correct"], serde_json::json!([0, 2]));
}

#[test]
fn grade_malformed_answer() {
    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/capitals.json")
        .arg("--block")
        .arg("block-1")
        .arg("--answer")
        .arg(r#"{"selected": [0]}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid answer format"));
}

#[test]
fn grade_unknown_block() {
    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/capitals.json")
        .arg("--block")
        .arg("block-9")
        .arg("--answer")
        .arg(r#"{"selected": 0}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn grade_ungradable_item_type() {
    coursekit()
        .arg("grade")
        .arg("--document")
        .arg("../../content/legacy/welcome.json")
        .arg("--block")
        .arg("block-1")
        .arg("--answer")
        .arg("{}")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no validator registered"));
}

// --- stats ---

fn attempts_file(dir: &TempDir) -> std::path::PathBuf {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
    let mut attempts = Vec::new();
    let mut push = |student: &str, outcomes: &[bool]| {
        for (i, &correct) in outcomes.iter().enumerate() {
            attempts.push(BlockAttempt::new(
                &StatisticsKey::new(7, "block-2", student),
                serde_json::json!({"answers": ["x"]}),
                serde_json::json!({"answers": {"1": ["blue"]}}),
                correct,
                u32::from(correct),
                1,
                start + Duration::minutes(i as i64),
            ));
        }
    };
    push("alice", &[false, true, true]);
    push("bob", &[false, false]);
    push("carol", &[true, false, false, false]);

    let path = dir.path().join("attempts.json");
    std::fs::write(&path, serde_json::to_string(&attempts).unwrap()).unwrap();
    path
}

#[test]
fn stats_text_summary() {
    let dir = TempDir::new().unwrap();
    let attempts = attempts_file(&dir);

    coursekit()
        .arg("stats")
        .arg("--attempts")
        .arg(&attempts)
        .assert()
        .success()
        .stdout(predicate::str::contains("9 attempts"))
        .stdout(predicate::str::contains("2 need attention"))
        .stdout(predicate::str::contains("bob on 7/block-2: never correct"))
        .stdout(predicate::str::contains("carol on 7/block-2: 3 misses in a row"));
}

#[test]
fn stats_json_and_saved_report() {
    let dir = TempDir::new().unwrap();
    let attempts = attempts_file(&dir);
    let saved = dir.path().join("report.json");

    let output = coursekit()
        .arg("stats")
        .arg("--attempts")
        .arg(&attempts)
        .arg("--format")
        .arg("json")
        .arg("--output")
        .arg(&saved)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["rows"].as_array().unwrap().len(), 3);
    assert_eq!(report["blocks"][0]["totalAttempts"], 9);
    assert!(saved.exists());
}

#[test]
fn stats_markdown_with_threshold_from_config() {
    let dir = TempDir::new().unwrap();
    let attempts = attempts_file(&dir);
    let config = write(&dir, "coursekit.toml", "[attention]\nrecent_mistake_threshold = 4\n");

    coursekit()
        .arg("stats")
        .arg("--attempts")
        .arg(&attempts)
        .arg("--format")
        .arg("markdown")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("### Needs attention"))
        .stdout(predicate::str::contains("| 7 | block-2 | bob |"))
        .stdout(predicate::str::contains("carol").not());
}

// --- init ---

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    coursekit()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created coursekit.toml"))
        .stdout(predicate::str::contains("Created content/example.json"));

    assert!(dir.path().join("coursekit.toml").exists());

    coursekit()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--document")
        .arg("content/example.json")
        .assert()
        .success()
        .stdout(predicate::str::contains("All documents valid"));

    coursekit()
        .current_dir(dir.path())
        .arg("grade")
        .arg("--document")
        .arg("content/example.json")
        .arg("--block")
        .arg("block-2")
        .arg("--answer")
        .arg(r#"{"answers": ["azure"]}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains("Correct (2/2 points, 1/1 parts)"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();
    write(&dir, "coursekit.toml", "# mine\n");

    coursekit()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("coursekit.toml already exists"));

    let config = std::fs::read_to_string(dir.path().join("coursekit.toml")).unwrap();
    assert_eq!(config, "# mine\n");
}
