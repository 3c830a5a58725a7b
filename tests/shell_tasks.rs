#![cfg(unix)]

use rundag::config::parse_and_validate;
use rundag::dag::Selection;
use rundag::engine::Project;
use rundag::errors::{ExecutionError, TaskError};
use rundag::exec::shell::{env_key, parse_output};
use rundag_test_utils::builders::ManifestBuilder;
use rundag_test_utils::{init_tracing, with_timeout};
use serde_json::json;

fn project(toml: &str) -> Project {
    Project::from_file(&parse_and_validate(toml).unwrap())
}

#[test]
fn env_keys_are_upper_snake_case() {
    assert_eq!(env_key("RUNDAG_UPSTREAM_", "load-data.v2"), "RUNDAG_UPSTREAM_LOAD_DATA_V2");
}

#[tokio::test]
async fn stdout_becomes_the_task_output() {
    init_tracing();
    with_timeout(async {
        let project = project(
            &ManifestBuilder::new()
                .var("env", "dev")
                .task("count", r#"echo '{"rows": 3}'"#, &[])
                .task("label", "echo \"$RUNDAG_TASK-$RUNDAG_VAR_ENV\"", &[])
                .build(),
        );

        let result = project
            .run(&Selection::tasks(["count", "label"]), 2)
            .await
            .unwrap();

        assert!(result.is_success(), "{:?}", result.first_error());
        assert_eq!(project.registry().get("count").unwrap(), json!({ "rows": 3 }));
        assert_eq!(project.registry().get("label").unwrap(), json!("label-dev"));
    })
    .await;
}

#[tokio::test]
async fn upstream_output_is_exposed_as_env() {
    init_tracing();
    with_timeout(async {
        let project = project(
            &ManifestBuilder::new()
                .task("extract", "echo raw", &[])
                .task("load", "echo \"loaded $RUNDAG_UPSTREAM_EXTRACT\"", &[r#"after = "extract""#])
                .build(),
        );

        let result = project.run(&Selection::tasks(["load"]), 1).await.unwrap();

        assert!(result.is_success(), "{:?}", result.first_error());
        assert_eq!(project.registry().get("load").unwrap(), json!("loaded raw"));
    })
    .await;
}

#[tokio::test]
async fn non_zero_exit_fails_with_stderr_tail() {
    init_tracing();
    with_timeout(async {
        let project = project(
            &ManifestBuilder::new()
                .task("broken", "echo 'disk full' >&2; exit 3", &[])
                .build(),
        );

        let result = project.run(&Selection::tasks(["broken"]), 1).await.unwrap();

        match result.first_error() {
            Some(ExecutionError::Task { source: TaskError::Failed(msg), .. }) => {
                assert!(msg.contains("code 3"), "{msg}");
                assert!(msg.contains("disk full"), "{msg}");
            }
            other => panic!("expected task failure, got {other:?}"),
        }
    })
    .await;
}

#[tokio::test]
async fn dependency_with_target_is_not_executed() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let project = project(
            &ManifestBuilder::new()
                .task(
                    "extract",
                    &format!("touch {}; echo done", marker.display()),
                    &[r#"target = "data/extract.csv""#],
                )
                .task("load", "echo \"$RUNDAG_UPSTREAM_EXTRACT\"", &[r#"after = "extract""#])
                .build(),
        );

        let result = project.run(&Selection::tasks(["load"]), 1).await.unwrap();

        assert!(result.is_success(), "{:?}", result.first_error());
        assert!(!marker.exists());
        assert_eq!(project.registry().get("load").unwrap(), json!("data/extract.csv"));
    })
    .await;
}

#[tokio::test]
async fn explicit_task_with_target_runs_and_outputs_target() {
    init_tracing();
    with_timeout(async {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let project = project(
            &ManifestBuilder::new()
                .task(
                    "extract",
                    &format!("touch {}; echo ran", marker.display()),
                    &[r#"target = "data/extract.csv""#],
                )
                .task("load", "echo \"$RUNDAG_UPSTREAM_EXTRACT\"", &[r#"after = "extract""#])
                .build(),
        );

        let result = project
            .run(&Selection::tasks(["extract", "load"]), 1)
            .await
            .unwrap();

        assert!(result.is_success(), "{:?}", result.first_error());
        assert!(marker.exists());
        assert_eq!(project.registry().get("extract").unwrap(), json!("data/extract.csv"));
        // Same input as when `extract` is only pulled in as a dependency.
        assert_eq!(project.registry().get("load").unwrap(), json!("data/extract.csv"));
    })
    .await;
}

#[tokio::test]
async fn literal_null_on_stdout_is_kept_as_text() {
    init_tracing();
    with_timeout(async {
        let project = project(&ManifestBuilder::new().task("nothing", "echo null", &[]).build());

        let result = project.run(&Selection::tasks(["nothing"]), 1).await.unwrap();

        assert!(result.is_success(), "{:?}", result.first_error());
        assert_eq!(project.registry().get("nothing").unwrap(), json!("null"));
    })
    .await;
}

#[test]
fn stdout_parsing_prefers_json_but_never_yields_null() {
    assert_eq!(parse_output("[1, 2]"), json!([1, 2]));
    assert_eq!(parse_output("plain text"), json!("plain text"));
    assert_eq!(parse_output("null"), json!("null"));
    assert_eq!(parse_output(""), json!(""));
}
