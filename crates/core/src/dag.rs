// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Validated DAG definition handed to the execution plane.
//!
//! Parsing from YAML lives at the CLI boundary; this type is the already
//! validated object the plane schedules, enqueues, and spawns.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use thiserror::Error;

/// Errors from DAG validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagError {
    #[error("dag name {0:?} is empty or contains ':'")]
    InvalidName(String),

    #[error("duplicate step {0:?}")]
    DuplicateStep(String),

    #[error("step {step:?} depends on unknown step {depends:?}")]
    UnknownDependency { step: String, depends: String },

    #[error("dependency cycle involving step {0:?}")]
    Cycle(String),
}

/// One step of a workflow: a shell command plus its upstream dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends: Vec<String>,
}

/// Catch-up policy for missed cron ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatchUp {
    /// Skip missed ticks entirely.
    #[default]
    None,
    /// Run once if any ticks were missed.
    Latest,
    /// Run every missed tick, bounded by the catch-up window.
    All,
}

crate::simple_display! {
    CatchUp {
        None => "none",
        Latest => "latest",
        All => "all",
    }
}

/// A single cron expression with its catch-up policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CronEntry {
    pub expression: String,
    #[serde(default)]
    pub catch_up: CatchUp,
}

impl CronEntry {
    pub fn new(expression: impl Into<String>) -> Self {
        Self { expression: expression.into(), catch_up: CatchUp::None }
    }
}

/// Cron series for a workflow: independent `start`, `stop`, and `restart` sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub start: Vec<CronEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<CronEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restart: Vec<CronEntry>,
}

impl ScheduleSpec {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty() && self.restart.is_empty()
    }
}

/// Resource caps applied to the whole child process tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// CPU budget in millicores (1000 = one full core).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_millis: Option<u64>,
    /// Memory cap in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
}

impl ResourceLimits {
    pub fn is_empty(&self) -> bool {
        self.cpu_millis.is_none() && self.memory_bytes.is_none()
    }
}

/// A workflow definition (directed acyclic graph of steps).
///
/// Immutable to the execution plane once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dag {
    /// Unique workflow name.
    pub name: String,
    /// Source path of the definition file.
    pub location: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    /// Maximum concurrently running attempts; 0 means unlimited.
    #[serde(default = "default_max_active_runs")]
    pub max_active_runs: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleSpec>,
    /// Queue this workflow enqueues into; defaults to the workflow name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    /// Default params string passed to runs without explicit params.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub params: String,
    /// Worker-selector labels: a task for this DAG only matches pollers
    /// whose labels contain every pair.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "ResourceLimits::is_empty")]
    pub limits: ResourceLimits,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
}

fn default_max_active_runs() -> u32 {
    1
}

impl Dag {
    /// Queue name for this workflow (explicit queue or the workflow name).
    pub fn queue_name(&self) -> &str {
        self.queue.as_deref().unwrap_or(&self.name)
    }

    /// Validate name, step uniqueness, dependency references, and acyclicity.
    pub fn validate(&self) -> Result<(), DagError> {
        if self.name.is_empty() || self.name.contains(':') {
            return Err(DagError::InvalidName(self.name.clone()));
        }

        let mut names = HashSet::new();
        for step in &self.steps {
            if !names.insert(step.name.as_str()) {
                return Err(DagError::DuplicateStep(step.name.clone()));
            }
        }
        for step in &self.steps {
            for dep in &step.depends {
                if !names.contains(dep.as_str()) {
                    return Err(DagError::UnknownDependency {
                        step: step.name.clone(),
                        depends: dep.clone(),
                    });
                }
            }
        }

        self.check_cycles()
    }

    /// Step names in a valid execution order (dependencies first).
    ///
    /// Only meaningful after [`Dag::validate`] has passed.
    pub fn execution_order(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.steps.len());
        let mut done: HashSet<&str> = HashSet::new();
        // Kahn's algorithm over the step list; ties resolve in definition order.
        while order.len() < self.steps.len() {
            let mut progressed = false;
            for step in &self.steps {
                if done.contains(step.name.as_str()) {
                    continue;
                }
                if step.depends.iter().all(|d| done.contains(d.as_str())) {
                    done.insert(&step.name);
                    order.push(step.name.as_str());
                    progressed = true;
                }
            }
            if !progressed {
                // Cycle: validate() rejects these; stop rather than spin.
                break;
            }
        }
        order
    }

    fn check_cycles(&self) -> Result<(), DagError> {
        let index: HashMap<&str, &Step> =
            self.steps.iter().map(|s| (s.name.as_str(), s)).collect();
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();

        fn visit<'a>(
            name: &'a str,
            index: &HashMap<&'a str, &'a Step>,
            visiting: &mut HashSet<&'a str>,
            visited: &mut HashSet<&'a str>,
        ) -> Result<(), DagError> {
            if visited.contains(name) {
                return Ok(());
            }
            if !visiting.insert(name) {
                return Err(DagError::Cycle(name.to_string()));
            }
            if let Some(step) = index.get(name) {
                for dep in &step.depends {
                    visit(dep, index, visiting, visited)?;
                }
            }
            visiting.remove(name);
            visited.insert(name);
            Ok(())
        }

        for step in &self.steps {
            visit(&step.name, &index, &mut visiting, &mut visited)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
