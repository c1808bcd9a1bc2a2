// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Run identifiers and references.
//!
//! A run is one execution instance of a DAG. Run IDs are UUID v7 so that
//! lexicographic order matches issuance order; a [`DagRunRef`] pairs the DAG
//! name with a run ID and has the canonical string form `name:id`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// `Uuid::now_v7` uses the crate's internal shared v7 context, so IDs issued
// within the same millisecond still sort by issuance order.
fn next_v7() -> Uuid {
    Uuid::now_v7()
}

/// Errors from parsing run references.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RefError {
    #[error("malformed dag-run reference {0:?} (expected name:run-id)")]
    Malformed(String),
}

/// Unique identifier for a single DAG run.
///
/// Generated IDs are UUID v7 strings, monotonic by issuance time. User-supplied
/// IDs (via `--run-id`) are carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DagRunId(String);

impl DagRunId {
    /// Generate a fresh time-ordered run ID.
    pub fn new() -> Self {
        Self(next_v7().to_string())
    }

    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the ID truncated to at most `n` characters.
    pub fn short(&self, n: usize) -> &str {
        let end = std::cmp::min(n, self.0.len());
        &self.0[..end]
    }
}

impl Default for DagRunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DagRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DagRunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for DagRunId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for DagRunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::borrow::Borrow<str> for DagRunId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for DagRunId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for DagRunId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Reference to a DAG run: `(name, run ID)` with canonical form `name:id`.
///
/// DAG names never contain `:`; the first colon separates name from ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DagRunRef {
    pub name: String,
    pub id: DagRunId,
}

impl DagRunRef {
    pub fn new(name: impl Into<String>, id: impl Into<DagRunId>) -> Self {
        Self { name: name.into(), id: id.into() }
    }
}

impl fmt::Display for DagRunRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}

impl FromStr for DagRunRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, id)) if !name.is_empty() && !id.is_empty() => {
                Ok(Self { name: name.to_string(), id: DagRunId::from_string(id) })
            }
            _ => Err(RefError::Malformed(s.to_string())),
        }
    }
}

impl Serialize for DagRunRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DagRunRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Generate a fresh poller ID for a single poll call.
pub fn new_poller_id() -> String {
    next_v7().to_string()
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
