// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Directory-backed DAG catalog for the schedulers.

use lx_core::Dag;
use lx_sched::DagCatalog;
use std::path::PathBuf;
use tracing::warn;

/// Loads definitions from the DAGs directory on every lookup, so edits are
/// picked up without a reload signal.
pub struct DirCatalog {
    dags_dir: PathBuf,
}

impl DirCatalog {
    pub fn new(dags_dir: impl Into<PathBuf>) -> Self {
        Self { dags_dir: dags_dir.into() }
    }
}

impl DagCatalog for DirCatalog {
    fn get(&self, name: &str) -> Option<Dag> {
        for ext in ["yaml", "yml"] {
            let path = self.dags_dir.join(format!("{name}.{ext}"));
            if !path.is_file() {
                continue;
            }
            match crate::dagfile::load(&path) {
                Ok(dag) => return Some(dag),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unloadable dag definition");
                    return None;
                }
            }
        }
        None
    }

    fn all(&self) -> Vec<Dag> {
        let Ok(entries) = std::fs::read_dir(&self.dags_dir) else { return Vec::new() };
        let mut dags: Vec<Dag> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().is_some_and(|ext| ext == "yaml" || ext == "yml")
            })
            .filter_map(|path| match crate::dagfile::load(&path) {
                Ok(dag) => Some(dag),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unloadable dag");
                    None
                }
            })
            .collect();
        dags.sort_by(|a, b| a.name.cmp(&b.name));
        dags
    }
}
