// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

use super::*;
use tempfile::TempDir;

fn write_dag(dir: &TempDir, file_name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(file_name);
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn full_definition_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(
        &dir,
        "etl.yaml",
        r#"
name: etl-daily
schedule: "0 2 * * *"
queue: batch
maxActiveRuns: 2
params: "env=prod"
labels:
  gpu: "true"
limits:
  cpuMillis: 500
  memoryBytes: 1073741824
steps:
  - name: extract
    command: ./extract.sh
  - name: transform
    command: ./transform.sh
    depends: [extract]
  - name: load
    command: ./load.sh
    depends: [transform]
"#,
    );

    let dag = load(&path).unwrap();
    assert_eq!(dag.name, "etl-daily");
    assert_eq!(dag.queue_name(), "batch");
    assert_eq!(dag.max_active_runs, 2);
    assert_eq!(dag.params, "env=prod");
    assert_eq!(dag.limits.cpu_millis, Some(500));
    assert_eq!(dag.steps.len(), 3);
    assert_eq!(dag.execution_order(), ["extract", "transform", "load"]);
    let schedule = dag.schedule.unwrap();
    assert_eq!(schedule.start.len(), 1);
    assert!(schedule.stop.is_empty());
}

#[test]
fn name_defaults_to_file_stem() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(&dir, "nightly.yaml", "steps:\n  - name: a\n    command: 'true'\n");
    assert_eq!(load(&path).unwrap().name, "nightly");
}

#[test]
fn schedule_series_form() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(
        &dir,
        "w.yaml",
        r#"
schedule:
  start:
    - "0 8 * * *"
    - expression: "0 20 * * *"
      catchUp: latest
  stop:
    - "0 23 * * *"
"#,
    );
    let schedule = load(&path).unwrap().schedule.unwrap();
    assert_eq!(schedule.start.len(), 2);
    assert_eq!(schedule.start[0].catch_up, lx_core::CatchUp::None);
    assert_eq!(schedule.start[1].catch_up, lx_core::CatchUp::Latest);
    assert_eq!(schedule.stop.len(), 1);
}

#[test]
fn schedule_list_form() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(&dir, "w.yaml", "schedule: [\"0 8 * * *\", \"0 20 * * *\"]\n");
    assert_eq!(load(&path).unwrap().schedule.unwrap().start.len(), 2);
}

#[test]
fn bad_cron_expression_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(&dir, "w.yaml", "schedule: \"every tuesday\"\n");
    assert!(load(&path).is_err());
}

#[test]
fn dependency_cycle_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_dag(
        &dir,
        "w.yaml",
        r#"
steps:
  - name: a
    command: 'true'
    depends: [b]
  - name: b
    command: 'true'
    depends: [a]
"#,
    );
    assert!(load(&path).is_err());
}

#[test]
fn missing_file_is_an_error() {
    assert!(load(Path::new("/nonexistent/dag.yaml")).is_err());
}
