// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! DAG definition files.
//!
//! YAML documents load into the validated [`Dag`] the execution plane works
//! with. The `schedule` field accepts a single expression, a list, or the
//! full start/stop/restart form.

use anyhow::Context as _;
use lx_core::{CatchUp, CronEntry, Dag, ResourceLimits, ScheduleSpec, Step};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DagFile {
    name: Option<String>,
    schedule: Option<ScheduleField>,
    queue: Option<String>,
    max_active_runs: Option<u32>,
    params: Option<String>,
    labels: HashMap<String, String>,
    working_dir: Option<PathBuf>,
    limits: Option<LimitsField>,
    steps: Vec<StepField>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScheduleField {
    /// `schedule: "0 2 * * *"`
    Single(String),
    /// `schedule: ["0 2 * * *", "0 14 * * *"]`
    Many(Vec<EntryField>),
    /// `schedule: { start: ..., stop: ..., restart: ... }`
    Series {
        #[serde(default)]
        start: Vec<EntryField>,
        #[serde(default)]
        stop: Vec<EntryField>,
        #[serde(default)]
        restart: Vec<EntryField>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EntryField {
    Expression(String),
    Full {
        expression: String,
        #[serde(default, rename = "catchUp")]
        catch_up: CatchUp,
    },
}

impl From<EntryField> for CronEntry {
    fn from(entry: EntryField) -> Self {
        match entry {
            EntryField::Expression(expression) => CronEntry::new(expression),
            EntryField::Full { expression, catch_up } => CronEntry { expression, catch_up },
        }
    }
}

impl From<ScheduleField> for ScheduleSpec {
    fn from(field: ScheduleField) -> Self {
        match field {
            ScheduleField::Single(expression) => ScheduleSpec {
                start: vec![CronEntry::new(expression)],
                ..Default::default()
            },
            ScheduleField::Many(entries) => ScheduleSpec {
                start: entries.into_iter().map(CronEntry::from).collect(),
                ..Default::default()
            },
            ScheduleField::Series { start, stop, restart } => ScheduleSpec {
                start: start.into_iter().map(CronEntry::from).collect(),
                stop: stop.into_iter().map(CronEntry::from).collect(),
                restart: restart.into_iter().map(CronEntry::from).collect(),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LimitsField {
    cpu_millis: Option<u64>,
    memory_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct StepField {
    name: String,
    command: String,
    #[serde(default)]
    depends: Vec<String>,
}

/// Load and validate a DAG definition from `path`.
pub fn load(path: &Path) -> anyhow::Result<Dag> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("reading dag definition {}", path.display()))?;
    let file: DagFile = serde_yaml::from_str(&data)
        .with_context(|| format!("parsing dag definition {}", path.display()))?;

    let name = match file.name {
        Some(name) => name,
        None => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };

    let schedule = file.schedule.map(ScheduleSpec::from);
    if let Some(schedule) = &schedule {
        for entry in
            schedule.start.iter().chain(&schedule.stop).chain(&schedule.restart)
        {
            lx_sched::parse_cron(&entry.expression)?;
        }
    }

    let dag = Dag {
        name,
        location: path.to_path_buf(),
        working_dir: file.working_dir,
        max_active_runs: file.max_active_runs.unwrap_or(1),
        schedule,
        queue: file.queue,
        params: file.params.unwrap_or_default(),
        labels: file.labels,
        limits: file
            .limits
            .map(|l| ResourceLimits { cpu_millis: l.cpu_millis, memory_bytes: l.memory_bytes })
            .unwrap_or_default(),
        steps: file
            .steps
            .into_iter()
            .map(|s| Step { name: s.name, command: s.command, depends: s.depends })
            .collect(),
    };
    dag.validate()?;
    Ok(dag)
}

#[cfg(test)]
#[path = "dagfile_tests.rs"]
mod tests;
