// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Lookup of loaded DAG definitions by name.

use lx_core::Dag;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Source of validated DAG definitions for the schedulers.
pub trait DagCatalog: Send + Sync {
    fn get(&self, name: &str) -> Option<Dag>;
    fn all(&self) -> Vec<Dag>;
}

/// In-memory catalog. The CLI refreshes it from the DAGs directory; tests
/// populate it directly.
#[derive(Default)]
pub struct MemoryCatalog {
    dags: RwLock<HashMap<String, Dag>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, dag: Dag) {
        self.dags.write().insert(dag.name.clone(), dag);
    }

    pub fn remove(&self, name: &str) {
        self.dags.write().remove(name);
    }
}

impl DagCatalog for MemoryCatalog {
    fn get(&self, name: &str) -> Option<Dag> {
        self.dags.read().get(name).cloned()
    }

    fn all(&self) -> Vec<Dag> {
        let mut dags: Vec<Dag> = self.dags.read().values().cloned().collect();
        dags.sort_by(|a, b| a.name.cmp(&b.name));
        dags
    }
}
