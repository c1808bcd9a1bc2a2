// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Argument-vector construction for the run sub-commands.
//!
//! One builder per process, constructed with the binary path and the resolved
//! config path; nothing here reads process-wide state.

use lx_core::{DagRunId, DagRunRef, Operation, Task};
use std::path::PathBuf;

/// A fully assembled child-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CmdSpec {
    pub bin: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    /// Forward the child's stdout/stderr to the parent instead of capturing.
    pub forward_output: bool,
}

impl CmdSpec {
    fn new(bin: PathBuf, args: Vec<String>) -> Self {
        Self { bin, args, working_dir: None, env: Vec::new(), forward_output: false }
    }
}

/// Options for `start` invocations.
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub params: Option<String>,
    pub quiet: bool,
    pub no_queue: bool,
    pub run_id: Option<DagRunId>,
}

impl StartOptions {
    lx_core::setters! {
        set { quiet: bool, no_queue: bool }
        option { params: String, run_id: DagRunId }
    }
}

/// Options for `enqueue` invocations.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOptions {
    pub params: Option<String>,
    pub quiet: bool,
    pub run_id: Option<DagRunId>,
    pub queue: Option<String>,
}

impl EnqueueOptions {
    lx_core::setters! {
        set { quiet: bool }
        option { params: String, run_id: DagRunId, queue: String }
    }
}

/// Options for `restart` invocations.
#[derive(Debug, Clone, Default)]
pub struct RestartOptions {
    pub quiet: bool,
}

impl RestartOptions {
    lx_core::setters! {
        set { quiet: bool }
    }
}

/// Options for `retry` invocations.
#[derive(Debug, Clone, Default)]
pub struct RetryOptions {
    pub step: Option<String>,
    pub disable_max_active_runs: bool,
}

impl RetryOptions {
    lx_core::setters! {
        set { disable_max_active_runs: bool }
        option { step: String }
    }
}

/// Builds [`CmdSpec`]s for every run operation.
#[derive(Debug, Clone)]
pub struct CmdBuilder {
    bin: PathBuf,
    config: Option<PathBuf>,
}

impl CmdBuilder {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into(), config: None }
    }

    pub fn with_config(mut self, config: impl Into<PathBuf>) -> Self {
        self.config = Some(config.into());
        self
    }

    fn push_config(&self, args: &mut Vec<String>) {
        if let Some(config) = &self.config {
            args.push("--config".to_string());
            args.push(config.display().to_string());
        }
    }

    pub fn start(
        &self,
        location: &std::path::Path,
        working_dir: Option<PathBuf>,
        opts: &StartOptions,
    ) -> CmdSpec {
        let mut args = vec!["start".to_string()];
        if let Some(params) = &opts.params {
            args.push("-p".to_string());
            args.push(params.clone());
        }
        if opts.quiet {
            args.push("-q".to_string());
        }
        if opts.no_queue {
            args.push("--no-queue".to_string());
        }
        if let Some(run_id) = &opts.run_id {
            args.push(format!("--run-id={run_id}"));
        }
        self.push_config(&mut args);
        args.push(location.display().to_string());

        let mut spec = CmdSpec::new(self.bin.clone(), args);
        spec.working_dir = working_dir;
        spec
    }

    pub fn enqueue(&self, location: &std::path::Path, opts: &EnqueueOptions) -> CmdSpec {
        let mut args = vec!["enqueue".to_string()];
        if let Some(params) = &opts.params {
            args.push("-p".to_string());
            args.push(params.clone());
        }
        if opts.quiet {
            args.push("-q".to_string());
        }
        if let Some(run_id) = &opts.run_id {
            args.push(format!("--run-id={run_id}"));
        }
        if let Some(queue) = &opts.queue {
            args.push("--queue".to_string());
            args.push(queue.clone());
        }
        self.push_config(&mut args);
        args.push(location.display().to_string());

        let mut spec = CmdSpec::new(self.bin.clone(), args);
        spec.forward_output = true;
        spec
    }

    pub fn dequeue(&self, dag_run: &DagRunRef) -> CmdSpec {
        let mut args = vec!["dequeue".to_string(), format!("--dag-run={dag_run}")];
        self.push_config(&mut args);
        let mut spec = CmdSpec::new(self.bin.clone(), args);
        spec.forward_output = true;
        spec
    }

    pub fn restart(&self, location: &std::path::Path, opts: &RestartOptions) -> CmdSpec {
        let mut args = vec!["restart".to_string()];
        if opts.quiet {
            args.push("-q".to_string());
        }
        self.push_config(&mut args);
        args.push(location.display().to_string());
        CmdSpec::new(self.bin.clone(), args)
    }

    pub fn retry(&self, dag_name: &str, run_id: &DagRunId, opts: &RetryOptions) -> CmdSpec {
        let mut args = vec!["retry".to_string(), format!("--run-id={run_id}")];
        if let Some(step) = &opts.step {
            args.push(format!("--step={step}"));
        }
        if opts.disable_max_active_runs {
            args.push("--disable-max-active-runs".to_string());
        }
        self.push_config(&mut args);
        args.push(dag_name.to_string());
        CmdSpec::new(self.bin.clone(), args)
    }

    /// `start` invocation built from a dispatched task.
    pub fn task_start(&self, task: &Task) -> CmdSpec {
        debug_assert_eq!(task.operation, Operation::Start);
        let mut args = vec!["start".to_string(), "--no-queue".to_string()];
        args.push(format!("--run-id={}", task.run_id));
        if let Some(root) = &task.root {
            args.push(format!("--root={root}"));
        }
        if let Some(parent) = &task.parent {
            args.push(format!("--parent={parent}"));
        }
        self.push_config(&mut args);
        args.push(task.target.clone());
        if !task.params.is_empty() {
            args.push("--".to_string());
            args.push(task.params.clone());
        }
        CmdSpec::new(self.bin.clone(), args)
    }

    /// `retry` invocation built from a dispatched task.
    pub fn task_retry(&self, task: &Task) -> CmdSpec {
        debug_assert_eq!(task.operation, Operation::Retry);
        let mut args = vec!["retry".to_string(), format!("--run-id={}", task.run_id)];
        if !task.step.is_empty() {
            args.push(format!("--step={}", task.step));
        }
        self.push_config(&mut args);
        args.push(task.target.clone());
        CmdSpec::new(self.bin.clone(), args)
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
