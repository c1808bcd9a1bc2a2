// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! File-backed run store.
//!
//! Layout under the state directory:
//!
//! ```text
//! runs/<dag-name>/<run-id>/dag.json
//! runs/<dag-name>/<run-id>/attempts/<attempt-id>/status.json
//! runs/<dag-name>/<run-id>/children/<child-run-id>/...   (root runs only)
//! ```
//!
//! Attempt IDs embed a zero-padded millisecond timestamp plus a per-run
//! sequence, so lexicographic order is creation order. Status writes go to a
//! sibling temp file and are renamed into place; a reader sees either the
//! previous document or the new one.

use crate::error::StoreError;
use crate::run_store::{CreateAttemptOptions, ListStatusOptions, RunAttempt, RunStore};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lx_core::{Dag, DagRunId, DagRunRef, DagRunStatus};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const DAG_FILE: &str = "dag.json";
const STATUS_FILE: &str = "status.json";
const ATTEMPTS_DIR: &str = "attempts";
const CHILDREN_DIR: &str = "children";

/// Run store rooted at `⟨stateDir⟩/runs`.
#[derive(Debug, Clone)]
pub struct FileRunStore {
    root: PathBuf,
}

impl FileRunStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self { root: state_dir.into().join("runs") }
    }

    fn dag_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn run_dir(&self, dag_run: &DagRunRef) -> PathBuf {
        self.dag_dir(&dag_run.name).join(dag_run.id.as_str())
    }

    fn child_run_dir(&self, root: &DagRunRef, child_run_id: &DagRunId) -> PathBuf {
        self.run_dir(root).join(CHILDREN_DIR).join(child_run_id.as_str())
    }

    /// Newest attempt of the run at `run_dir`, or an error naming `what`.
    fn newest_attempt(&self, run_dir: &Path, what: &str) -> Result<FileRunAttempt, StoreError> {
        let dir = newest_entry(&run_dir.join(ATTEMPTS_DIR))
            .ok_or_else(|| StoreError::NoAttempts(what.to_string()))?;
        Ok(FileRunAttempt::existing(run_dir.to_path_buf(), dir))
    }

    /// Run directories of `name`, newest activity first.
    fn runs_of(&self, name: &str) -> Vec<PathBuf> {
        let mut runs: Vec<(String, PathBuf)> = read_dir_sorted(&self.dag_dir(name))
            .into_iter()
            .map(|dir| {
                let newest = newest_entry(&dir.join(ATTEMPTS_DIR))
                    .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_default();
                (newest, dir)
            })
            .collect();
        runs.sort_by(|a, b| b.0.cmp(&a.0));
        runs.into_iter().map(|(_, dir)| dir).collect()
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn create_attempt(
        &self,
        dag: &Dag,
        at: DateTime<Utc>,
        run_id: &DagRunId,
        opts: CreateAttemptOptions,
    ) -> Result<Box<dyn RunAttempt>, StoreError> {
        let run_dir = match &opts.root {
            Some(root) if root.name != dag.name || root.id != *run_id => {
                self.child_run_dir(root, run_id)
            }
            _ => self.run_dir(&DagRunRef::new(&dag.name, run_id.clone())),
        };
        let attempts = run_dir.join(ATTEMPTS_DIR);
        fs::create_dir_all(&attempts)?;
        write_json_atomic(&run_dir.join(DAG_FILE), dag)?;

        let seq = read_dir_sorted(&attempts).len() as u64 + 1;
        let id = format!("att_{:014}_{:03}", at.timestamp_millis().max(0), seq);
        let attempt_dir = attempts.join(&id);
        fs::create_dir_all(&attempt_dir)?;

        tracing::debug!(dag = %dag.name, run_id = %run_id, attempt = %id, retry = opts.retry, "attempt created");
        Ok(Box::new(FileRunAttempt::existing(run_dir, attempt_dir)))
    }

    async fn latest_attempt(&self, name: &str) -> Result<Box<dyn RunAttempt>, StoreError> {
        let run_dir = self
            .runs_of(name)
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NoAttempts(name.to_string()))?;
        Ok(Box::new(self.newest_attempt(&run_dir, name)?))
    }

    async fn recent_attempts(&self, name: &str, n: usize) -> Vec<Box<dyn RunAttempt>> {
        self.runs_of(name)
            .into_iter()
            .take(n)
            .filter_map(|dir| self.newest_attempt(&dir, name).ok())
            .map(|a| Box::new(a) as Box<dyn RunAttempt>)
            .collect()
    }

    async fn find_attempt(&self, dag_run: &DagRunRef) -> Result<Box<dyn RunAttempt>, StoreError> {
        let run_dir = self.run_dir(dag_run);
        if !run_dir.is_dir() {
            return Err(StoreError::RunNotFound(dag_run.to_string()));
        }
        Ok(Box::new(self.newest_attempt(&run_dir, &dag_run.to_string())?))
    }

    async fn find_child_attempt(
        &self,
        root: &DagRunRef,
        child_run_id: &DagRunId,
    ) -> Result<Box<dyn RunAttempt>, StoreError> {
        let run_dir = self.child_run_dir(root, child_run_id);
        if !run_dir.is_dir() {
            return Err(StoreError::RunNotFound(format!("{root}/{child_run_id}")));
        }
        Ok(Box::new(self.newest_attempt(&run_dir, child_run_id.as_str())?))
    }

    async fn list_statuses(&self, opts: ListStatusOptions) -> Result<Vec<DagRunStatus>, StoreError> {
        let since = opts.since.unwrap_or_else(|| Utc::now() - Duration::hours(24));
        let names: Vec<String> = match &opts.name {
            Some(name) => vec![name.clone()],
            None => read_dir_sorted(&self.root)
                .into_iter()
                .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect(),
        };

        let mut out = Vec::new();
        for name in names {
            for run_dir in self.runs_of(&name) {
                let Ok(attempt) = self.newest_attempt(&run_dir, &name) else { continue };
                let Ok(status) = attempt.read_status().await else { continue };
                let stamp = status.started_at.or(status.finished_at);
                if let Some(stamp) = stamp {
                    if stamp < since {
                        continue;
                    }
                    if let Some(until) = opts.until {
                        if stamp > until {
                            continue;
                        }
                    }
                }
                if !opts.statuses.is_empty() && !opts.statuses.contains(&status.status) {
                    continue;
                }
                out.push(status);
            }
        }
        Ok(out)
    }

    async fn remove_old_runs(
        &self,
        name: &str,
        retention_days: i64,
    ) -> Result<Vec<DagRunId>, StoreError> {
        if retention_days < 0 {
            return Ok(Vec::new());
        }
        let cutoff = Utc::now() - Duration::days(retention_days);
        let mut removed = Vec::new();
        for run_dir in self.runs_of(name) {
            let Ok(attempt) = self.newest_attempt(&run_dir, name) else { continue };
            let Ok(status) = attempt.read_status().await else { continue };
            if status.is_active() {
                continue;
            }
            let stamp = status.finished_at.or(status.started_at);
            if stamp.map_or(true, |s| s < cutoff) {
                fs::remove_dir_all(&run_dir)?;
                removed.push(status.run_id.clone());
            }
        }
        if !removed.is_empty() {
            tracing::info!(dag = name, count = removed.len(), "pruned old dag-runs");
        }
        Ok(removed)
    }

    async fn rename_runs(&self, old_name: &str, new_name: &str) -> Result<(), StoreError> {
        let old_dir = self.dag_dir(old_name);
        if !old_dir.is_dir() {
            return Ok(());
        }
        let new_dir = self.dag_dir(new_name);
        if new_dir.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("run history for {new_name:?} already exists"),
            )
            .into());
        }
        fs::rename(old_dir, new_dir)?;
        Ok(())
    }

    async fn remove_run(&self, dag_run: &DagRunRef) -> Result<(), StoreError> {
        let run_dir = self.run_dir(dag_run);
        if !run_dir.is_dir() {
            return Err(StoreError::RunNotFound(dag_run.to_string()));
        }
        fs::remove_dir_all(run_dir)?;
        Ok(())
    }
}

/// One attempt directory plus its open/write cycle state.
#[derive(Debug)]
pub struct FileRunAttempt {
    run_dir: PathBuf,
    attempt_dir: PathBuf,
    open: bool,
    written: bool,
}

impl FileRunAttempt {
    fn existing(run_dir: PathBuf, attempt_dir: PathBuf) -> Self {
        Self { run_dir, attempt_dir, open: false, written: false }
    }
}

#[async_trait]
impl RunAttempt for FileRunAttempt {
    fn id(&self) -> String {
        self.attempt_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    async fn open(&mut self) -> Result<(), StoreError> {
        if self.open {
            return Err(StoreError::AlreadyOpen);
        }
        self.open = true;
        self.written = false;
        Ok(())
    }

    async fn write(&mut self, status: &DagRunStatus) -> Result<(), StoreError> {
        if !self.open {
            return Err(StoreError::NotOpen);
        }
        if self.written {
            return Err(StoreError::AlreadyWritten);
        }
        write_json_atomic(&self.attempt_dir.join(STATUS_FILE), status)?;
        self.written = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.open = false;
        Ok(())
    }

    async fn read_status(&self) -> Result<DagRunStatus, StoreError> {
        let path = self.attempt_dir.join(STATUS_FILE);
        if !path.is_file() {
            return Err(StoreError::NoStatus(self.id()));
        }
        read_json(&path)
    }

    async fn read_dag(&self) -> Result<Dag, StoreError> {
        read_json(&self.run_dir.join(DAG_FILE))
    }
}

/// Write `value` as JSON via a temp file + rename in the same directory.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let data = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|source| StoreError::Corrupt {
        path: path.display().to_string(),
        source,
    })
}

/// Subdirectories of `dir`, sorted ascending by name. Missing dir is empty.
fn read_dir_sorted(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else { return Vec::new() };
    let mut dirs: Vec<PathBuf> =
        entries.filter_map(|e| e.ok()).map(|e| e.path()).filter(|p| p.is_dir()).collect();
    dirs.sort();
    dirs
}

fn newest_entry(dir: &Path) -> Option<PathBuf> {
    read_dir_sorted(dir).into_iter().next_back()
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
