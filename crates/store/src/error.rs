// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Lattice Authors

//! Storage error taxonomy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("dag-run not found: {0}")]
    RunNotFound(String),

    #[error("no attempts recorded for dag {0:?}")]
    NoAttempts(String),

    #[error("queue {0:?} is empty")]
    QueueEmpty(String),

    #[error("attempt is not open")]
    NotOpen,

    #[error("attempt is already open")]
    AlreadyOpen,

    #[error("status already written in this open cycle")]
    AlreadyWritten,

    #[error("no status recorded for attempt {0}")]
    NoStatus(String),

    #[error("corrupt record at {path}: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True for the queue store's empty sentinel.
    pub fn is_queue_empty(&self) -> bool {
        matches!(self, StoreError::QueueEmpty(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::RunNotFound(_) | StoreError::NoAttempts(_) | StoreError::NoStatus(_)
        )
    }
}
