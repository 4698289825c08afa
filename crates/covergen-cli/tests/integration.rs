#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SLUG: &str = "blood-moon-rising-sara-riouch";

fn covergen(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("covergen").unwrap();
    cmd.current_dir(dir.path())
        .env("COVERGEN_ROOT", dir.path())
        .env_remove("IDEOGRAM_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

/// Offline workspace: placeholder images, no network.
fn init_workspace(dir: &TempDir) {
    std::fs::write(
        dir.path().join("covergen.yaml"),
        "images:\n  provider: placeholder\n",
    )
    .unwrap();
}

fn create_book(dir: &TempDir) {
    covergen(dir)
        .args([
            "new",
            "Blood Moon Rising",
            "Sara Riouch",
            "paranormal romance",
            "A werewolf alpha and a hunted witch are bound by a curse.",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(SLUG));
}

fn status_json(dir: &TempDir) -> serde_json::Value {
    let out = covergen(dir)
        .args(["status", SLUG, "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&out).unwrap()
}

// ---------------------------------------------------------------------------
// covergen steps / new / list
// ---------------------------------------------------------------------------

#[test]
fn steps_lists_pipeline_in_order() {
    let dir = TempDir::new().unwrap();
    covergen(&dir)
        .arg("steps")
        .assert()
        .success()
        .stdout(predicate::str::contains("Input Collection"))
        .stdout(predicate::str::contains("image_generation"))
        .stdout(predicate::str::contains("final_report.json"));
}

#[test]
fn new_creates_project_directory() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    let project = dir.path().join("projects").join(SLUG);
    assert!(project.join("input.json").is_file());
    assert!(project.join("workflow.yaml").is_file());

    let state: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(project.join("workflow.yaml")).unwrap())
            .unwrap();
    assert_eq!(state["current_step_index"], serde_yaml::Value::from(0));
}

#[test]
fn new_without_title_fails() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    covergen(&dir)
        .args(["new", "  ", "Sara Riouch", "romance", "desc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("title must not be empty"));
}

#[test]
fn list_shows_projects() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    covergen(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No projects."));

    create_book(&dir);
    covergen(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Blood Moon Rising"))
        .stdout(predicate::str::contains("0/6 (0%) next: Input Collection"));
}

// ---------------------------------------------------------------------------
// covergen resume / step / status
// ---------------------------------------------------------------------------

#[test]
fn resume_runs_whole_pipeline() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    covergen(&dir)
        .args(["resume", SLUG])
        .assert()
        .success()
        .stdout(predicate::str::contains("6/6 (100%) complete"));

    let status = status_json(&dir);
    assert_eq!(status["is_complete"], true);
    assert_eq!(status["completed_steps"], 6);

    let project = dir.path().join("projects").join(SLUG);
    assert!(project.join("final_report.json").is_file());
    assert!(project
        .join("covers")
        .join(format!("{SLUG}_concept_1_v1.txt"))
        .is_file());

    // Resuming a finished project is a no-op.
    covergen(&dir).args(["resume", SLUG]).assert().success();
}

#[test]
fn resume_once_runs_a_single_step() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    covergen(&dir)
        .args(["resume", SLUG, "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: Market Research"));
    assert_eq!(status_json(&dir)["completed_steps"], 1);
}

#[test]
fn step_accepts_names_and_aliases() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    covergen(&dir).args(["step", SLUG]).assert().success();
    covergen(&dir)
        .args(["step", SLUG, "market_research"])
        .assert()
        .success();
    covergen(&dir)
        .args(["step", SLUG, "cover strategy"])
        .assert()
        .success();

    let status = status_json(&dir);
    assert_eq!(status["completed_steps"], 3);
    assert_eq!(status["current_step_name"], "Prompt Generation");
}

#[test]
fn step_recovers_run_left_by_dead_process() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    let state_file = dir.path().join("projects").join(SLUG).join("workflow.yaml");
    let mut state: serde_yaml::Value =
        serde_yaml::from_str(&std::fs::read_to_string(&state_file).unwrap()).unwrap();
    state["step_results"]["Input Collection"] = serde_yaml::from_str(
        "status: running\n\
         timestamp: 2026-01-01T00:00:00Z\n\
         started_at: 2026-01-01T00:00:00Z\n\
         owner_pid: 4294967294\n\
         owner_token: crashed-run\n\
         attempts: 1\n",
    )
    .unwrap();
    std::fs::write(&state_file, serde_yaml::to_string(&state).unwrap()).unwrap();

    covergen(&dir)
        .args(["step", SLUG])
        .assert()
        .success()
        .stderr(predicate::str::contains("'Input Collection' was interrupted"))
        .stdout(predicate::str::contains("next: Market Research"));
    assert_eq!(status_json(&dir)["completed_steps"], 1);
}

#[test]
fn out_of_order_step_fails_without_changes() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);
    let state_file = dir.path().join("projects").join(SLUG).join("workflow.yaml");
    let before = std::fs::read(&state_file).unwrap();

    covergen(&dir)
        .args(["step", SLUG, "Image Generation"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of order"));

    assert_eq!(std::fs::read(&state_file).unwrap(), before);
}

#[test]
fn unknown_step_and_project_fail() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);

    covergen(&dir)
        .args(["step", SLUG, "Binding"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown step"));

    covergen(&dir)
        .args(["status", "no-such-book"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("project not found"));

    covergen(&dir)
        .args(["step", SLUG, "--rerun"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--rerun needs a step name"));
}

#[test]
fn rerun_regenerates_downstream() {
    let dir = TempDir::new().unwrap();
    init_workspace(&dir);
    create_book(&dir);
    covergen(&dir).args(["resume", SLUG]).assert().success();

    covergen(&dir)
        .args(["step", SLUG, "prompt_generation", "--rerun"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next: Image Generation"));

    let project = dir.path().join("projects").join(SLUG);
    assert!(!project.join("final_report.json").exists());
    assert!(!project.join("generation_results.json").exists());
    assert_eq!(status_json(&dir)["completed_steps"], 4);
}

#[test]
fn image_service_failure_is_recorded_and_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("covergen.yaml"),
        "images:\n  provider: ideogram\n  base_url: http://127.0.0.1:9\n  api_key_env: COVERGEN_TEST_KEY\n  timeout_secs: 5\n",
    )
    .unwrap();
    create_book(&dir);

    covergen(&dir)
        .env("COVERGEN_TEST_KEY", "test-key")
        .args(["resume", SLUG])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Image Generation"));

    let status = status_json(&dir);
    assert_eq!(status["is_failed"], true);
    assert_eq!(status["is_complete"], false);
    assert_eq!(status["completed_steps"], 4);
    assert_eq!(status["current_step_name"], "Image Generation");
    assert!(status["last_error"].as_str().unwrap().len() > 0);
}

#[test]
fn config_warnings_go_to_stderr() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("covergen.yaml"),
        "images:\n  provider: placeholder\n  aspect_ratio: \"5:7\"\n",
    )
    .unwrap();
    covergen(&dir)
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("aspect_ratio"));
}
