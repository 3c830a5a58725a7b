use rundag::dag::Selection;
use rundag::engine::Project;
use rundag::exec::{RunContext, TaskSet};
use rundag::registry::TaskRegistry;
use rundag_test_utils::builders::{chain_abc, descriptors};
use rundag_test_utils::fake_task::{Recorder, ScriptedTask, succeeding_tasks};
use rundag_test_utils::{init_tracing, with_timeout};
use serde_json::json;

#[tokio::test]
async fn nested_run_sees_outer_outputs_but_keeps_its_own() {
    init_tracing();
    with_timeout(async {
        let recorder = Recorder::new();
        let descs = descriptors(&[("seed", &[]), ("child", &["seed"])]);
        let tasks = TaskSet::new()
            .with("seed", ScriptedTask::succeed(&recorder, json!("s")))
            .with("child", ScriptedTask::upstream(&recorder));
        let project = Project::new(descs, tasks);

        let outer = project.run(&Selection::tasks(["seed"]), 1).await.unwrap();
        assert!(outer.is_success());

        // Re-running `seed` in the nested scope does not collide with the
        // outer write.
        let nested = project
            .run_nested(&Selection::tasks(["child"]), 2)
            .await
            .unwrap();
        assert!(nested.result.is_success(), "{:?}", nested.result.first_error());
        assert_eq!(nested.context.registry().get("child").unwrap(), json!("child(s)"));
        assert!(!project.registry().contains("child"));

        assert_eq!(nested.merge(), 2);
        assert_eq!(project.registry().get("child").unwrap(), json!("child(s)"));
    })
    .await;
}

#[tokio::test]
async fn second_top_level_run_hits_write_once_guard() {
    init_tracing();
    with_timeout(async {
        let recorder = Recorder::new();
        let project = Project::new(chain_abc(), succeeding_tasks(&recorder, &["A", "B", "C"]));

        let first = project.run(&Selection::tasks(["A"]), 1).await.unwrap();
        assert!(first.is_success());

        let second = project.run(&Selection::tasks(["A"]), 1).await.unwrap();
        assert!(!second.is_success());
        assert_eq!(second.first_error().and_then(|e| e.task()), Some("A"));
    })
    .await;
}

#[tokio::test]
async fn compile_errors_surface_before_any_task_runs() {
    init_tracing();
    let recorder = Recorder::new();
    let project = Project::new(chain_abc(), succeeding_tasks(&recorder, &["A", "B", "C"]))
        .with_context(RunContext::new(TaskRegistry::new()));

    assert!(project.run(&Selection::tasks(["missing"]), 2).await.is_err());
    assert!(recorder.started().is_empty());
}
