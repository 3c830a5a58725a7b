// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use rundag::config::{load_and_validate, parse_and_validate};
use rundag::errors::{CompileError, RundagError};
use rundag_test_utils::builders::ManifestBuilder;
use tempfile::NamedTempFile;

#[test]
fn loads_manifest_from_file_in_file_order() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[config]
threads = 3

[task.zeta]
cmd = "echo zeta"

[task.alpha]
cmd = "echo alpha"
after = "zeta"

[task.mid]
cmd = "echo mid"
after = ["alpha", "zeta"]
"#
    )
    .unwrap();

    let project = load_and_validate(file.path()).unwrap();

    assert_eq!(project.config.threads, 3);
    assert_eq!(project.task_names().collect::<Vec<_>>(), ["zeta", "alpha", "mid"]);
    let descs = project.descriptors();
    assert_eq!(descs[1].dependencies(), ["zeta"]);
    assert_eq!(descs[2].dependencies(), ["alpha", "zeta"]);
    assert_eq!(project.tasks[2].cmd, "echo mid");
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("Rundag.toml")).unwrap_err();
    assert!(err.to_string().contains("reading project manifest"));
}

#[test]
fn cycle_is_reported_as_compile_error() {
    let toml = ManifestBuilder::new()
        .task("A", "echo A", &[r#"after = ["B"]"#])
        .task("B", "echo B", &[r#"after = "A""#])
        .build();

    match parse_and_validate(&toml) {
        Err(RundagError::Compile(CompileError::CyclicDependency { cycle })) => {
            assert_eq!(cycle, ["A", "B", "A"]);
        }
        other => panic!("expected cycle error, got: {other:?}"),
    }
}

#[test]
fn unknown_after_reference_is_rejected() {
    let toml = ManifestBuilder::new()
        .task("A", "echo A", &[r#"after = ["NonExistent"]"#])
        .build();

    match parse_and_validate(&toml) {
        Err(RundagError::Compile(CompileError::UnresolvedReference { task, dependency })) => {
            assert_eq!(task, "A");
            assert_eq!(dependency, "NonExistent");
        }
        other => panic!("expected unresolved reference, got: {other:?}"),
    }
}

#[test]
fn invalid_after_shapes_are_rejected() {
    for bad in ["after = 3", "after = { name = \"x\" }", "after = [\"ok\", 1]"] {
        let toml = ManifestBuilder::new()
            .task("ok", "echo ok", &[])
            .task("A", "echo A", &[bad])
            .build();

        match parse_and_validate(&toml) {
            Err(RundagError::Compile(CompileError::InvalidDependencyType { task, .. })) => {
                assert_eq!(task, "A");
            }
            other => panic!("expected invalid dependency type for `{bad}`, got: {other:?}"),
        }
    }
}

#[test]
fn retry_defaults_come_from_config_section() {
    let toml = ManifestBuilder::new()
        .config_line("retries = 2")
        .config_line("retry_delay_seconds = 0.25")
        .task("inherits", "echo a", &[])
        .task("overrides", "echo b", &["retries = 0", "retry_delay_seconds = 1.5"])
        .build();

    let project = parse_and_validate(&toml).unwrap();
    let descs = project.descriptors();

    assert_eq!(descs[0].retry().count, 2);
    assert_eq!(descs[0].retry().delay, Duration::from_millis(250));
    assert_eq!(descs[1].retry().count, 0);
    assert_eq!(descs[1].retry().delay, Duration::from_millis(1500));
}

#[test]
fn negative_retry_delay_is_rejected() {
    let toml = ManifestBuilder::new()
        .task("A", "echo A", &["retry_delay_seconds = -1.0"])
        .build();

    assert!(matches!(
        parse_and_validate(&toml),
        Err(RundagError::Compile(CompileError::InvalidRetryPolicy { .. }))
    ));
}

#[test]
fn zero_threads_is_a_config_error() {
    let toml = ManifestBuilder::new()
        .config_line("threads = 0")
        .task("A", "echo A", &[])
        .build();

    match parse_and_validate(&toml) {
        Err(RundagError::ConfigError(msg)) => assert!(msg.contains("threads")),
        other => panic!("expected config error, got: {other:?}"),
    }
}

#[test]
fn empty_project_is_a_config_error() {
    assert!(matches!(
        parse_and_validate("[config]\nthreads = 2\n"),
        Err(RundagError::ConfigError(_))
    ));
}

#[test]
fn vars_and_targets_are_carried() {
    let toml = ManifestBuilder::new()
        .var("env", "dev")
        .task("extract", "echo x", &[r#"target = "data/extract.csv""#])
        .build();

    let project = parse_and_validate(&toml).unwrap();

    assert_eq!(project.vars.get("env").map(String::as_str), Some("dev"));
    assert_eq!(project.tasks[0].target.as_deref(), Some("data/extract.csv"));
    assert_eq!(project.run_context().var("env"), Some("dev"));
    assert!(project.task_set().contains("extract"));
}

#[test]
fn task_without_cmd_fails_to_parse() {
    let toml = "[task.A]\nafter = \"B\"\n";
    assert!(matches!(parse_and_validate(toml), Err(RundagError::TomlError(_))));
}

#[test]
fn dependencies_sharing_an_env_key_are_rejected() {
    let toml = ManifestBuilder::new()
        .task("a-b", "echo 1", &[])
        .task("a_b", "echo 2", &[])
        .task("load", "echo 3", &[r#"after = ["a-b", "a_b"]"#])
        .build();

    match parse_and_validate(&toml) {
        Err(RundagError::ConfigError(msg)) => {
            assert!(msg.contains("RUNDAG_UPSTREAM_A_B"), "{msg}");
            assert!(msg.contains("load"), "{msg}");
        }
        other => panic!("expected env key collision, got: {other:?}"),
    }

    // Either task alone is fine.
    let ok = ManifestBuilder::new()
        .task("a-b", "echo 1", &[])
        .task("a_b", "echo 2", &[])
        .task("load", "echo 3", &[r#"after = "a-b""#])
        .build();
    assert!(parse_and_validate(&ok).is_ok());
}

#[test]
fn vars_sharing_an_env_key_are_rejected() {
    let toml = ManifestBuilder::new()
        .var("run-date", "x")
        .var("run_date", "y")
        .task("A", "echo A", &[])
        .build();

    assert!(matches!(parse_and_validate(&toml), Err(RundagError::ConfigError(_))));
}
